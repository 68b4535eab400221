//! The decoded image façade.
//!
//! [`SpmImage`] composes the interpreted header and the decoded per-channel
//! grids behind read-only accessors. A decode is one strictly forward pass
//! (tokenize, interpret, decode body) that either yields a complete image or
//! propagates the first error with no partial object.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::body::{decode_body, CalibrationMode, ChannelFrame, Direction};
use crate::error::SxmError;
use crate::header::{tokenize, ChannelTable, HeaderModel, ScanDirection};
use crate::report;

// =============================================================================
// LoadOptions
// =============================================================================

/// Knobs for a decode. `Default` gives a quiet, full decode with samples
/// taken as stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Print the header-key table, channel table and grid shapes to stdout.
    /// A side effect only; the returned image is identical either way.
    pub verbose: bool,
    /// Stop after the header phase; the image exposes metadata but no grids.
    pub header_only: bool,
    /// Whether to apply the per-channel calibration transform to samples.
    pub calibration: CalibrationMode,
}

// =============================================================================
// SpmImage
// =============================================================================

/// A decoded SXM image: header metadata plus one [`ChannelFrame`] per
/// channel. Immutable after construction.
#[derive(Debug, Clone)]
pub struct SpmImage {
    source: Option<PathBuf>,
    header: HeaderModel,
    pixels: [u32; 2],
    size: [f64; 2],
    direction: ScanDirection,
    table: ChannelTable,
    frames: HashMap<String, ChannelFrame>,
}

impl SpmImage {
    /// Decode the file at `path` with default options.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SxmError> {
        Self::load_with(path, LoadOptions::default())
    }

    /// Decode the file at `path`.
    ///
    /// The file is read into memory in one pass and the handle released
    /// before any parsing happens, so a parse failure never holds it open.
    pub fn load_with(path: impl AsRef<Path>, options: LoadOptions) -> Result<Self, SxmError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading file");
        let bytes = fs::read(path).map_err(|source| SxmError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut image = Self::from_bytes(&bytes, options)?;
        image.source = Some(path.to_path_buf());
        Ok(image)
    }

    /// Decode an in-memory file image.
    pub fn from_bytes(bytes: &[u8], options: LoadOptions) -> Result<Self, SxmError> {
        let tokenized = tokenize(bytes)?;
        let header = HeaderModel::from_entries(tokenized.entries)?;
        let geometry = header.geometry()?;
        // Required even in header-only mode so the table-dependent accessors
        // below cannot dangle.
        let table = header.channels()?.clone();

        if options.verbose {
            print!("{}", report::header_keys_table(&header, 4));
            print!("{}", report::channel_table(&table));
        }

        let frames = if options.header_only {
            HashMap::new()
        } else {
            decode_body(bytes, tokenized.body_offset, &header, options.calibration)?
        };

        if options.verbose && !options.header_only {
            print!("{}", report::data_shapes(&table, &frames));
        }

        Ok(SpmImage {
            source: None,
            header,
            pixels: geometry.pixels,
            size: geometry.range,
            direction: geometry.direction,
            table,
            frames,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Path the image was loaded from, if it came from disk.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The full interpreted header.
    pub fn header(&self) -> &HeaderModel {
        &self.header
    }

    /// Pixel dimensions as `[columns, rows]`.
    pub fn scan_pixels(&self) -> [u32; 2] {
        self.pixels
    }

    /// Physical scan size in meters, `[width, height]`.
    pub fn scan_size(&self) -> [f64; 2] {
        self.size
    }

    /// Scan-line acquisition order.
    pub fn scan_direction(&self) -> ScanDirection {
        self.direction
    }

    /// The channel table, in on-disk order.
    pub fn channels(&self) -> &ChannelTable {
        &self.table
    }

    /// Channel names in table order.
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels().names().collect()
    }

    /// The decoded frame for `name`.
    ///
    /// # Errors
    /// `UnknownChannel` if `name` is absent from the channel table, or if
    /// the image was loaded header-only and has no grids.
    pub fn channel(&self, name: &str) -> Result<&ChannelFrame, SxmError> {
        self.frames
            .get(name)
            .ok_or_else(|| SxmError::UnknownChannel {
                name: name.to_string(),
            })
    }

    /// Convenience: the grid for one channel and direction.
    ///
    /// # Errors
    /// `UnknownChannel` if the channel is absent or never recorded that
    /// direction.
    pub fn grid(&self, name: &str, direction: Direction) -> Result<&ndarray::Array2<f32>, SxmError> {
        self.channel(name)?
            .get(direction)
            .ok_or_else(|| SxmError::UnknownChannel {
                name: format!("{name} ({direction:?})"),
            })
    }
}

// =============================================================================
// Tests
// =============================================================================
