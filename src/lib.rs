//! # nanonis-sxm
//!
//! A decoder for Nanonis SXM scanning-probe-microscopy files: a Latin-1 text
//! header followed by a big-endian float32 sample grid per channel and sweep
//! direction.
//!
//! ## Features
//!
//! - **Two-phase decode**: the header is fully tokenized and interpreted
//!   before the binary body is touched, because the body layout (channel
//!   count, grid shape, sweep directions) is only knowable from the header.
//! - **Typed header model**: every key gets a typed value (scalars, float
//!   lists, the channel table); unknown keys are preserved as text.
//! - **Orientation normalization**: down scans are flipped so row 0 is
//!   always the start-of-scan line; backward sweeps get their columns
//!   reversed to match the forward grids.
//! - **Calibrated grids**: channel data comes back as `ndarray::Array2<f32>`
//!   in physical units, ready for analysis or rendering.
//!
//! ## Architecture
//!
//! - [`header`] - tokenizer, per-key field interpreters, typed header model
//! - [`body`] - binary layout computation and grid decoding
//! - [`image`] - the [`SpmImage`] façade composing both
//! - [`report`] - human-readable header/channel dumps
//! - [`error`] - the error taxonomy
//!
//! ## Example
//!
//! ```rust,no_run
//! use nanonis_sxm::{Direction, SpmImage};
//!
//! fn main() -> Result<(), nanonis_sxm::SxmError> {
//!     let image = SpmImage::load("scan001.sxm")?;
//!
//!     let [columns, rows] = image.scan_pixels();
//!     let [width, height] = image.scan_size();
//!     println!("{columns}x{rows} px over {width}x{height} m");
//!
//!     let topography = image.grid("Z", Direction::Forward)?;
//!     println!("mean height: {}", topography.mean().unwrap_or(0.0));
//!     Ok(())
//! }
//! ```

pub mod body;
pub mod error;
pub mod header;
pub mod image;
pub mod report;

// Re-export commonly used types
pub use body::{decode_body, CalibrationMode, ChannelFrame, Direction, SAMPLE_SIZE};
pub use error::{BodyError, HeaderError, SxmError};
pub use header::{
    interpret, tokenize, ChannelDescriptor, ChannelTable, DirectionMode, HeaderModel, HeaderValue,
    RawEntry, RawTable, ScanDirection, ScanGeometry, TokenizedHeader, ZController, HEADER_SENTINEL,
};
pub use image::{LoadOptions, SpmImage};
