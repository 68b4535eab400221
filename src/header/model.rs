//! Typed header model and well-known-key accessors.
//!
//! The model owns one typed value per header key, in order of appearance.
//! Two lookup flavors exist with distinct failure modes:
//!
//! - [`HeaderModel::get`] fails with `UnknownKey`: the caller asked for a
//!   key the file never had, which is a caller error.
//! - The named accessors (`scan_pixels`, `channels`, ...) fail with
//!   `MissingRequiredField`: the file lacks a key the body decoder cannot
//!   proceed without, which is a file defect.

use serde::Serialize;

use crate::error::HeaderError;

use super::fields::{interpret, ChannelTable, HeaderValue, RawTable};
use super::tokenizer::RawEntry;

// =============================================================================
// Well-known keys
// =============================================================================

pub const KEY_SCAN_PIXELS: &str = "SCAN_PIXELS";
pub const KEY_SCAN_RANGE: &str = "SCAN_RANGE";
pub const KEY_SCAN_OFFSET: &str = "SCAN_OFFSET";
pub const KEY_SCAN_ANGLE: &str = "SCAN_ANGLE";
pub const KEY_SCAN_DIR: &str = "SCAN_DIR";
pub const KEY_BIAS: &str = "BIAS";
pub const KEY_ACQ_TIME: &str = "ACQ_TIME";
pub const KEY_DATA_INFO: &str = "DATA_INFO";
pub const KEY_COMMENT: &str = "COMMENT";
pub const KEY_REC_DATE: &str = "REC_DATE";
pub const KEY_REC_TIME: &str = "REC_TIME";
pub const KEY_Z_CONTROLLER: &str = "Z-CONTROLLER";

// =============================================================================
// Scan geometry
// =============================================================================

/// Physical scan-line acquisition order: whether scan lines were recorded
/// bottom-to-top (`up`) or top-to-bottom (`down`). Determines whether the
/// on-disk row order needs a vertical flip at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanDirection {
    Up,
    Down,
}

/// Everything the body decoder needs from the header: pixel dimensions,
/// physical scan size and scan direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanGeometry {
    /// Pixel dimensions as `[columns, rows]`, both strictly positive.
    pub pixels: [u32; 2],
    /// Physical scan size in meters, `[width, height]`, both positive.
    pub range: [f64; 2],
    /// Scan-line acquisition order.
    pub direction: ScanDirection,
}

impl ScanGeometry {
    /// Samples per scan line.
    pub fn columns(&self) -> usize {
        self.pixels[0] as usize
    }

    /// Number of scan lines.
    pub fn rows(&self) -> usize {
        self.pixels[1] as usize
    }

    /// Samples in one grid.
    pub fn samples_per_grid(&self) -> usize {
        self.rows() * self.columns()
    }
}

/// Z feedback controller settings, parsed from the `Z-CONTROLLER` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZController {
    /// Whether the feedback loop was on during acquisition.
    pub feedback_on: bool,
    /// Feedback setpoint value.
    pub setpoint: f64,
    /// Setpoint unit, empty if the file gives none.
    pub setpoint_unit: String,
}

// =============================================================================
// HeaderModel
// =============================================================================

/// The interpreted header: every key present in the raw header mapped to its
/// typed value, in order of appearance. Order is preserved for display only
/// and carries no semantic weight.
#[derive(Debug, Clone)]
pub struct HeaderModel {
    entries: Vec<(String, HeaderValue)>,
}

impl HeaderModel {
    /// Interpret a tokenized header. Fails on the first field whose value
    /// does not match its key's rule.
    pub fn from_entries(raw_entries: Vec<RawEntry>) -> Result<Self, HeaderError> {
        let mut entries = Vec::with_capacity(raw_entries.len());
        for entry in raw_entries {
            let value = interpret(&entry.key, &entry.raw)?;
            entries.push((entry.key, value));
        }
        Ok(HeaderModel { entries })
    }

    /// Typed value for `key` (case-insensitive).
    ///
    /// # Errors
    /// `UnknownKey` if the key is not present in the header.
    pub fn get(&self, key: &str) -> Result<&HeaderValue, HeaderError> {
        self.lookup(key).ok_or_else(|| HeaderError::UnknownKey {
            key: key.to_string(),
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Keys in order of appearance.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, key: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    fn required(&self, key: &'static str) -> Result<&HeaderValue, HeaderError> {
        self.lookup(key)
            .ok_or(HeaderError::MissingRequiredField { key })
    }

    // -------------------------------------------------------------------------
    // Required accessors (body decoder dependencies)
    // -------------------------------------------------------------------------

    /// Pixel dimensions as `[columns, rows]`.
    pub fn scan_pixels(&self) -> Result<[u32; 2], HeaderError> {
        self.required(KEY_SCAN_PIXELS)?
            .as_int_pair()
            .ok_or(HeaderError::MissingRequiredField {
                key: KEY_SCAN_PIXELS,
            })
    }

    /// Physical scan size in meters, `[width, height]`.
    pub fn scan_range(&self) -> Result<[f64; 2], HeaderError> {
        let floats = self
            .required(KEY_SCAN_RANGE)?
            .as_floats()
            .ok_or(HeaderError::MissingRequiredField { key: KEY_SCAN_RANGE })?;
        let range = [floats[0], floats[1]];
        if range.iter().any(|&v| v <= 0.0 || !v.is_finite()) {
            return Err(HeaderError::InvalidFieldFormat {
                key: KEY_SCAN_RANGE.to_string(),
                reason: format!("scan size must be positive, got {range:?}"),
            });
        }
        Ok(range)
    }

    /// Scan-line acquisition order from `SCAN_DIR`.
    pub fn scan_direction(&self) -> Result<ScanDirection, HeaderError> {
        let text = self
            .required(KEY_SCAN_DIR)?
            .as_text()
            .ok_or(HeaderError::MissingRequiredField { key: KEY_SCAN_DIR })?;
        match text.to_ascii_lowercase().as_str() {
            "up" => Ok(ScanDirection::Up),
            "down" => Ok(ScanDirection::Down),
            other => Err(HeaderError::InvalidFieldFormat {
                key: KEY_SCAN_DIR.to_string(),
                reason: format!("expected \"up\" or \"down\", got {other:?}"),
            }),
        }
    }

    /// The channel table from `DATA_INFO`.
    pub fn channels(&self) -> Result<&ChannelTable, HeaderError> {
        match self.required(KEY_DATA_INFO)? {
            HeaderValue::Channels(table) => Ok(table),
            _ => Err(HeaderError::MissingRequiredField { key: KEY_DATA_INFO }),
        }
    }

    /// The combined geometry the body decoder runs on.
    pub fn geometry(&self) -> Result<ScanGeometry, HeaderError> {
        Ok(ScanGeometry {
            pixels: self.scan_pixels()?,
            range: self.scan_range()?,
            direction: self.scan_direction()?,
        })
    }

    // -------------------------------------------------------------------------
    // Optional accessors
    // -------------------------------------------------------------------------

    /// Bias voltage in volts.
    pub fn bias(&self) -> Option<f64> {
        self.lookup(KEY_BIAS)?.as_floats()?.first().copied()
    }

    /// Scan frame rotation in degrees.
    pub fn scan_angle(&self) -> Option<f64> {
        self.lookup(KEY_SCAN_ANGLE)?.as_floats()?.first().copied()
    }

    /// Scan frame center in meters, `[x, y]`.
    pub fn scan_offset(&self) -> Option<[f64; 2]> {
        let floats = self.lookup(KEY_SCAN_OFFSET)?.as_floats()?;
        Some([floats[0], floats[1]])
    }

    /// Acquisition time in seconds.
    pub fn acquisition_time(&self) -> Option<f64> {
        self.lookup(KEY_ACQ_TIME)?.as_floats()?.first().copied()
    }

    /// Operator comment, verbatim.
    pub fn comment(&self) -> Option<&str> {
        self.lookup(KEY_COMMENT)?.as_text()
    }

    /// Recording date as written in the file (`DD.MM.YYYY`).
    pub fn rec_date(&self) -> Option<&str> {
        self.lookup(KEY_REC_DATE)?.as_text()
    }

    /// Recording time as written in the file (`HH:MM:SS`).
    pub fn rec_time(&self) -> Option<&str> {
        self.lookup(KEY_REC_TIME)?.as_text()
    }

    /// Z feedback controller settings, if the table is present and its
    /// `on` / `Setpoint` columns parse.
    pub fn z_controller(&self) -> Option<ZController> {
        let HeaderValue::Table(table) = self.lookup(KEY_Z_CONTROLLER)? else {
            return None;
        };
        parse_z_controller(table)
    }
}

fn parse_z_controller(table: &RawTable) -> Option<ZController> {
    let feedback_on = table.value("on")? == "1";
    // Setpoint cell reads like "1.000E-10 A": value then optional unit.
    let mut setpoint_tokens = table.value("Setpoint")?.split_whitespace();
    let setpoint = setpoint_tokens.next()?.parse::<f64>().ok()?;
    let setpoint_unit = setpoint_tokens.next().unwrap_or("").to_string();
    Some(ZController {
        feedback_on,
        setpoint,
        setpoint_unit,
    })
}

// =============================================================================
// Tests
// =============================================================================
