//! Per-key field interpreters.
//!
//! Each header key is interpreted by a rule selected from a fixed lookup
//! table. Keys without a specialized rule fall back to verbatim text, so
//! unknown instrument metadata never blocks a decode. Adding support for a
//! new key means adding one table entry, not touching the tokenizer.

use serde::Serialize;
use tracing::warn;

use crate::error::HeaderError;

// =============================================================================
// Typed header values
// =============================================================================

/// A header value after interpretation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    /// Free text, whitespace-trimmed.
    Text(String),
    /// Two whitespace-separated positive integers (pixel dimensions).
    IntPair([u32; 2]),
    /// A fixed-count list of floats (scan size, offset, angle, bias).
    Floats(Vec<f64>),
    /// The channel table from `DATA_INFO`.
    Channels(ChannelTable),
    /// A generic tab-separated table (controller settings).
    Table(RawTable),
}

impl HeaderValue {
    /// The text payload, if this value is free text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The float list, if this value is one.
    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            HeaderValue::Floats(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// The integer pair, if this value is one.
    pub fn as_int_pair(&self) -> Option<[u32; 2]> {
        match self {
            HeaderValue::IntPair(p) => Some(*p),
            _ => None,
        }
    }
}

// =============================================================================
// Channel table
// =============================================================================

/// Which sweep directions a channel was recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionMode {
    /// Forward sweep only.
    Forward,
    /// Backward sweep only.
    Backward,
    /// Both sweeps, forward grid stored first.
    Both,
}

impl DirectionMode {
    /// Number of grids stored on disk for this channel.
    pub fn grid_count(self) -> usize {
        match self {
            DirectionMode::Both => 2,
            _ => 1,
        }
    }

    pub fn has_forward(self) -> bool {
        matches!(self, DirectionMode::Forward | DirectionMode::Both)
    }

    pub fn has_backward(self) -> bool {
        matches!(self, DirectionMode::Backward | DirectionMode::Both)
    }
}

/// One row of the channel table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDescriptor {
    /// Instrument channel index.
    pub index: u32,
    /// Channel name, unique within the table. Underscores in the file are
    /// rendered as spaces (`LI_Demod_1_X` → `LI Demod 1 X`).
    pub name: String,
    /// Physical unit of the samples (`m`, `A`, `V`, ...).
    pub unit: String,
    /// Recorded sweep directions.
    pub directions: DirectionMode,
    /// Linear scale factor relating raw counts to the physical value.
    /// Provenance metadata by default; see [`crate::body::CalibrationMode`].
    pub calibration: f64,
    /// Additive term of the same linear transform.
    pub offset: f64,
}

/// The ordered channel table. Row order defines the on-disk ordering of the
/// sample grids in the binary body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelTable {
    rows: Vec<ChannelDescriptor>,
}

impl ChannelTable {
    pub fn iter(&self) -> impl Iterator<Item = &ChannelDescriptor> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a channel descriptor by name (case-sensitive).
    pub fn get(&self, name: &str) -> Option<&ChannelDescriptor> {
        self.rows.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Channel names in table (and therefore on-disk) order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|c| c.name.as_str())
    }

    /// Total number of grids stored in the body across all channels.
    pub fn grid_count(&self) -> usize {
        self.rows.iter().map(|c| c.directions.grid_count()).sum()
    }
}

// =============================================================================
// Generic table
// =============================================================================

/// A tab-separated table kept structurally: a column-name row followed by
/// value rows. Used for controller settings such as `Z-CONTROLLER`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Value of the named column in the first row, if present.
    pub fn value(&self, column: &str) -> Option<&str> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))?;
        self.rows.first()?.get(idx).map(String::as_str)
    }
}

// =============================================================================
// Interpreter lookup
// =============================================================================

/// Interpretation rule for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Text,
    IntPair,
    Floats(usize),
    Channels,
    TabTable,
}

/// Fixed key → rule lookup. Keys missing here fall back to [`Rule::Text`].
const INTERPRETERS: &[(&str, Rule)] = &[
    ("SCAN_PIXELS", Rule::IntPair),
    ("SCAN_RANGE", Rule::Floats(2)),
    ("SCAN_OFFSET", Rule::Floats(2)),
    ("SCAN_TIME", Rule::Floats(2)),
    ("SCAN_ANGLE", Rule::Floats(1)),
    ("BIAS", Rule::Floats(1)),
    ("ACQ_TIME", Rule::Floats(1)),
    ("DATA_INFO", Rule::Channels),
    ("Z-CONTROLLER", Rule::TabTable),
];

fn rule_for(key: &str) -> Rule {
    INTERPRETERS
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, rule)| *rule)
        .unwrap_or(Rule::Text)
}

/// Interpret one raw value block according to its key's rule.
///
/// # Errors
/// `InvalidFieldFormat` when a recognized key's value fails its
/// type-specific parse. Unrecognized keys never fail.
pub fn interpret(key: &str, raw: &str) -> Result<HeaderValue, HeaderError> {
    match rule_for(key) {
        Rule::Text => Ok(HeaderValue::Text(raw.trim().to_string())),
        Rule::IntPair => parse_int_pair(key, raw).map(HeaderValue::IntPair),
        Rule::Floats(count) => parse_floats(key, raw, count).map(HeaderValue::Floats),
        Rule::Channels => parse_channel_table(key, raw).map(HeaderValue::Channels),
        Rule::TabTable => parse_tab_table(key, raw).map(HeaderValue::Table),
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> HeaderError {
    HeaderError::InvalidFieldFormat {
        key: key.to_string(),
        reason: reason.into(),
    }
}

// =============================================================================
// Scalar interpreters
// =============================================================================

fn parse_int_pair(key: &str, raw: &str) -> Result<[u32; 2], HeaderError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() != 2 {
        return Err(invalid(
            key,
            format!("expected 2 integers, got {} tokens", tokens.len()),
        ));
    }
    let mut pair = [0u32; 2];
    for (slot, token) in pair.iter_mut().zip(&tokens) {
        *slot = token
            .parse::<u32>()
            .map_err(|_| invalid(key, format!("non-numeric token {token:?}")))?;
        if *slot == 0 {
            return Err(invalid(key, "dimensions must be strictly positive"));
        }
    }
    Ok(pair)
}

fn parse_floats(key: &str, raw: &str, count: usize) -> Result<Vec<f64>, HeaderError> {
    let values: Vec<f64> = raw
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| invalid(key, format!("non-numeric token {token:?}")))
        })
        .collect::<Result<_, _>>()?;
    if values.len() != count {
        return Err(invalid(
            key,
            format!("expected {count} floats, got {}", values.len()),
        ));
    }
    Ok(values)
}

// =============================================================================
// Table interpreters
// =============================================================================

/// Parse the `DATA_INFO` channel table.
///
/// Each non-empty line is a whitespace-separated row of
/// `index name unit direction calibration offset`. A leading column-header
/// row is detected by a non-numeric token in the index position and skipped.
/// Rows are never silently dropped.
fn parse_channel_table(key: &str, raw: &str) -> Result<ChannelTable, HeaderError> {
    let mut rows: Vec<ChannelDescriptor> = Vec::new();
    let mut header_candidate = true;

    for line in raw.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        // Column-header row: first non-empty line with a non-numeric token in
        // the index position.
        if header_candidate && tokens[0].parse::<u32>().is_err() {
            header_candidate = false;
            continue;
        }
        header_candidate = false;
        if tokens.len() != 6 {
            return Err(invalid(
                key,
                format!("row {:?} has {} columns, expected 6", line, tokens.len()),
            ));
        }

        let index = tokens[0]
            .parse::<u32>()
            .map_err(|_| invalid(key, format!("non-numeric channel index {:?}", tokens[0])))?;
        let name = tokens[1].replace('_', " ");
        let unit = tokens[2].to_string();
        let directions = parse_direction_mode(key, tokens[3])?;
        let calibration = tokens[4]
            .parse::<f64>()
            .map_err(|_| invalid(key, format!("non-numeric calibration {:?}", tokens[4])))?;
        let offset = tokens[5]
            .parse::<f64>()
            .map_err(|_| invalid(key, format!("non-numeric offset {:?}", tokens[5])))?;

        if rows.iter().any(|c| c.name == name) {
            return Err(invalid(key, format!("duplicate channel name {name:?}")));
        }
        if calibration == 0.0 && offset != 0.0 {
            warn!(
                channel = %name,
                offset,
                "channel has zero calibration with non-zero offset"
            );
        }

        rows.push(ChannelDescriptor {
            index,
            name,
            unit,
            directions,
            calibration,
            offset,
        });
    }

    Ok(ChannelTable { rows })
}

fn parse_direction_mode(key: &str, token: &str) -> Result<DirectionMode, HeaderError> {
    match token.to_ascii_lowercase().as_str() {
        "both" => Ok(DirectionMode::Both),
        "fwd" | "forward" => Ok(DirectionMode::Forward),
        "bwd" | "backward" => Ok(DirectionMode::Backward),
        other => Err(invalid(key, format!("unknown direction {other:?}"))),
    }
}

/// Parse a tab-separated table: column names on the first line, one value
/// row per following line. Cells keep their text verbatim.
fn parse_tab_table(key: &str, raw: &str) -> Result<RawTable, HeaderError> {
    let mut lines = raw.lines().filter(|l| !l.trim().is_empty());
    let columns: Vec<String> = match lines.next() {
        Some(line) => split_tabs(line),
        None => return Err(invalid(key, "empty table")),
    };

    let mut rows = Vec::new();
    for line in lines {
        let cells = split_tabs(line);
        if cells.len() != columns.len() {
            return Err(invalid(
                key,
                format!(
                    "row has {} cells, expected {} (columns {:?})",
                    cells.len(),
                    columns.len(),
                    columns
                ),
            ));
        }
        rows.push(cells);
    }

    Ok(RawTable { columns, rows })
}

fn split_tabs(line: &str) -> Vec<String> {
    line.split('\t')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
