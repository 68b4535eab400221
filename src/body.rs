//! Binary body decoding.
//!
//! The body is a contiguous run of big-endian IEEE-754 float32 samples whose
//! layout is fully determined by the header: channels appear in channel-table
//! order, and each channel stores one `rows × columns` row-major grid per
//! recorded direction, forward before backward.
//!
//! # Orientation rules
//!
//! - The first on-disk sample of a grid is its top-left corner. When the scan
//!   direction is `down` the on-disk rows run opposite to acquisition order,
//!   so the decoder flips grid rows vertically; row 0 of a decoded grid is
//!   always the start-of-scan line.
//! - The probe retraces each line in the opposite column order on the
//!   backward sweep, so backward grids get their columns reversed whenever
//!   one is present.

use std::collections::HashMap;

use ndarray::{Array2, Axis};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{BodyError, SxmError};
use crate::header::{ChannelDescriptor, HeaderModel, ScanDirection, ScanGeometry};

// =============================================================================
// Constants
// =============================================================================

/// Bytes per sample (big-endian float32).
pub const SAMPLE_SIZE: usize = 4;

/// Escape marker some acquisition files place between the header sentinel
/// and the first sample, after one or more blank lines.
const DATA_START_MARKER: [u8; 2] = [0x1A, 0x04];

// =============================================================================
// Types
// =============================================================================

/// A stored sweep direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

/// How to treat the per-channel calibration/offset pair at decode time.
///
/// Samples in SXM files are normally stored as physical engineering-unit
/// values, with calibration/offset describing how the instrument produced
/// them. Files carrying raw instrument counts instead can be decoded with
/// [`CalibrationMode::Apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationMode {
    /// Samples are already physical values; keep them as stored.
    #[default]
    Stored,
    /// Samples are raw counts; compute `physical = raw × calibration + offset`.
    Apply,
}

/// Decoded grids for one channel, keyed by sweep direction. Only directions
/// the channel actually recorded are present. Grids are shaped
/// `rows × columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFrame {
    forward: Option<Array2<f32>>,
    backward: Option<Array2<f32>>,
}

impl ChannelFrame {
    /// The grid for `direction`, if that sweep was recorded.
    pub fn get(&self, direction: Direction) -> Option<&Array2<f32>> {
        match direction {
            Direction::Forward => self.forward.as_ref(),
            Direction::Backward => self.backward.as_ref(),
        }
    }

    pub fn forward(&self) -> Option<&Array2<f32>> {
        self.forward.as_ref()
    }

    pub fn backward(&self) -> Option<&Array2<f32>> {
        self.backward.as_ref()
    }

    /// Recorded directions, forward first.
    pub fn directions(&self) -> impl Iterator<Item = Direction> + '_ {
        [
            self.forward.as_ref().map(|_| Direction::Forward),
            self.backward.as_ref().map(|_| Direction::Backward),
        ]
        .into_iter()
        .flatten()
    }
}

// =============================================================================
// Layout
// =============================================================================

/// Total byte length the header-described layout requires.
pub fn required_len(geometry: &ScanGeometry, grid_count: usize) -> usize {
    SAMPLE_SIZE * geometry.samples_per_grid() * grid_count
}

/// Locate the first sample byte at or after `body_offset`.
///
/// Real acquisition files pad the sentinel with blank lines and the
/// `0x1A 0x04` escape marker; synthetic files start samples immediately. The
/// skip is only committed when the marker is actually found, so leading
/// sample bytes that happen to look like newlines are never consumed.
fn data_start(bytes: &[u8], body_offset: usize) -> usize {
    let mut pos = body_offset;
    while pos < bytes.len() && (bytes[pos] == b'\n' || bytes[pos] == b'\r') {
        pos += 1;
    }
    if bytes[pos..].starts_with(&DATA_START_MARKER) {
        pos + DATA_START_MARKER.len()
    } else {
        body_offset
    }
}

// =============================================================================
// Decoder
// =============================================================================

/// Decode the binary body into per-channel frames.
///
/// # Errors
/// - `MissingRequiredField` if the header lacks pixel dimensions, scan size,
///   scan direction or the channel table.
/// - `Truncated` if fewer bytes remain than the layout requires. Surplus
///   bytes are tolerated with a warning.
pub fn decode_body(
    bytes: &[u8],
    body_offset: usize,
    header: &HeaderModel,
    calibration: CalibrationMode,
) -> Result<HashMap<String, ChannelFrame>, SxmError> {
    let geometry = header.geometry()?;
    let table = header.channels()?;

    let data = &bytes[data_start(bytes, body_offset).min(bytes.len())..];
    let required = required_len(&geometry, table.grid_count());
    if data.len() < required {
        return Err(BodyError::Truncated {
            required,
            actual: data.len(),
        }
        .into());
    }
    if data.len() > required {
        warn!(
            excess = data.len() - required,
            required, "trailing bytes after the last sample grid"
        );
    }

    debug!(
        channels = table.len(),
        grids = table.grid_count(),
        rows = geometry.rows(),
        columns = geometry.columns(),
        "decoding body"
    );

    let mut frames = HashMap::with_capacity(table.len());
    let mut cursor = 0usize;
    for channel in table.iter() {
        let forward = channel
            .directions
            .has_forward()
            .then(|| read_grid(data, &mut cursor, &geometry, channel, calibration));
        let mut backward = channel
            .directions
            .has_backward()
            .then(|| read_grid(data, &mut cursor, &geometry, channel, calibration));

        // The probe retraces the line in opposite column order.
        if let Some(grid) = backward.as_mut() {
            grid.invert_axis(Axis(1));
        }

        frames.insert(channel.name.clone(), ChannelFrame { forward, backward });
    }

    Ok(frames)
}

/// Read one `rows × columns` grid from `data` at `*cursor`, normalizing row
/// order so row 0 is the start-of-scan line. Bounds were validated up front.
fn read_grid(
    data: &[u8],
    cursor: &mut usize,
    geometry: &ScanGeometry,
    channel: &ChannelDescriptor,
    calibration: CalibrationMode,
) -> Array2<f32> {
    let (rows, columns) = (geometry.rows(), geometry.columns());
    let mut grid = Array2::zeros((rows, columns));

    for r in 0..rows {
        for c in 0..columns {
            let i = *cursor;
            let raw = f32::from_be_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
            grid[[r, c]] = match calibration {
                CalibrationMode::Stored => raw,
                CalibrationMode::Apply => {
                    (f64::from(raw) * channel.calibration + channel.offset) as f32
                }
            };
            *cursor += SAMPLE_SIZE;
        }
    }

    if geometry.direction == ScanDirection::Down {
        grid.invert_axis(Axis(0));
    }
    grid
}

// =============================================================================
// Tests
// =============================================================================
