//! Header tokenization.
//!
//! An SXM file opens with a Latin-1 text header made of key lines and value
//! blocks, terminated by a sentinel line:
//!
//! ```text
//! :NANONIS_VERSION:
//! 2
//! :SCAN_PIXELS:
//!        256        256
//! :DATA_INFO:
//!     Channel Name Unit Direction Calibration Offset
//!     14      Z    m    both      9.000E-9    0.000E+0
//! :SCANIT_END:
//! <binary body>
//! ```
//!
//! A key line is a whole line wrapped in colons (`:KEY:`). Every line after
//! it, up to the next key line or the sentinel, belongs to that key's raw
//! value block. Internal line breaks and leading whitespace are preserved
//! because table-valued entries need them. The byte immediately after the
//! sentinel's line terminator is where the binary body begins.

use tracing::{debug, warn};

use crate::error::HeaderError;

// =============================================================================
// Constants
// =============================================================================

/// Sentinel line terminating the header.
pub const HEADER_SENTINEL: &str = ":SCANIT_END:";

// =============================================================================
// RawEntry
// =============================================================================

/// One header entry before interpretation: a normalized key and its raw,
/// unparsed value block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Normalized key: wrapping colons stripped, `>` replaced with `_`.
    pub key: String,
    /// Raw value block, outer whitespace trimmed, internal structure intact.
    pub raw: String,
}

/// Result of scanning the header region of a file.
#[derive(Debug, Clone)]
pub struct TokenizedHeader {
    /// Entries in order of appearance.
    pub entries: Vec<RawEntry>,
    /// Byte offset immediately after the sentinel's line terminator.
    pub body_offset: usize,
}

// =============================================================================
// Tokenizer
// =============================================================================

/// Split the header region of `bytes` into raw key/value entries and locate
/// the start of the binary body.
///
/// # Errors
/// - `Malformed` if the sentinel line is never found before end-of-file.
/// - `Malformed` if a non-empty value line appears before any key line.
pub fn tokenize(bytes: &[u8]) -> Result<TokenizedHeader, HeaderError> {
    let mut entries: Vec<RawEntry> = Vec::new();
    let mut current: Option<(String, String)> = None;
    let mut pos = 0usize;

    while pos < bytes.len() {
        let line_start = pos;
        let (line_end, next) = match bytes[pos..].iter().position(|&b| b == b'\n') {
            Some(i) => (pos + i, pos + i + 1),
            None => (bytes.len(), bytes.len()),
        };
        // Latin-1 header: lossy conversion never drops ASCII structure.
        let line = String::from_utf8_lossy(&bytes[line_start..line_end]);
        let line = line.trim_end_matches(['\r']);
        let trimmed = line.trim();

        if trimmed == HEADER_SENTINEL {
            if let Some((key, raw)) = current.take() {
                push_entry(&mut entries, key, raw);
            }
            debug!(
                entries = entries.len(),
                body_offset = next,
                "header scan complete"
            );
            return Ok(TokenizedHeader {
                entries,
                body_offset: next,
            });
        }

        if is_key_line(trimmed) {
            if let Some((key, raw)) = current.take() {
                push_entry(&mut entries, key, raw);
            }
            current = Some((normalize_key(trimmed), String::new()));
        } else if let Some((_, ref mut raw)) = current {
            if !raw.is_empty() {
                raw.push('\n');
            }
            raw.push_str(line);
        } else if !trimmed.is_empty() {
            return Err(HeaderError::Malformed {
                offset: line_start,
                reason: "value line before any header key".to_string(),
            });
        }

        pos = next;
    }

    Err(HeaderError::Malformed {
        offset: bytes.len(),
        reason: format!("end-of-header sentinel {HEADER_SENTINEL} not found"),
    })
}

/// Close out an entry, letting a duplicate key overwrite its predecessor.
fn push_entry(entries: &mut Vec<RawEntry>, key: String, raw: String) {
    let raw = raw.trim().to_string();
    if let Some(existing) = entries
        .iter_mut()
        .find(|e| e.key.eq_ignore_ascii_case(&key))
    {
        warn!(key = %key, "duplicate header key, keeping last occurrence");
        existing.raw = raw;
    } else {
        entries.push(RawEntry { key, raw });
    }
}

/// A key line is a whole line wrapped in colons with a non-empty interior.
/// Tab-separated table rows never qualify even when a cell contains a colon.
fn is_key_line(trimmed: &str) -> bool {
    trimmed.len() >= 3
        && trimmed.starts_with(':')
        && trimmed.ends_with(':')
        && !trimmed.contains('\t')
        && !trimmed[1..trimmed.len() - 1].trim().is_empty()
}

/// Strip the wrapping colons and replace `>` with `_`, so
/// `:Z-CONTROLLER>Z (m):` becomes `Z-CONTROLLER_Z (m)`.
fn normalize_key(trimmed: &str) -> String {
    trimmed[1..trimmed.len() - 1].replace('>', "_").trim().to_string()
}

// =============================================================================
// Tests
// =============================================================================
