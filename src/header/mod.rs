//! ASCII header parsing.
//!
//! The header phase is strictly two-step so each step stays independently
//! testable:
//!
//! 1. [`tokenizer`] splits the header byte range into raw key/value blocks
//!    and locates the start of the binary body.
//! 2. [`fields`] interprets each block into a typed [`HeaderValue`] via a
//!    fixed per-key rule table; [`model`] collects the results into the
//!    [`HeaderModel`] the body decoder runs on.

mod fields;
mod model;
mod tokenizer;

pub use fields::{
    interpret, ChannelDescriptor, ChannelTable, DirectionMode, HeaderValue, RawTable,
};
pub use model::{
    HeaderModel, ScanDirection, ScanGeometry, ZController, KEY_DATA_INFO, KEY_SCAN_DIR,
    KEY_SCAN_PIXELS, KEY_SCAN_RANGE,
};
pub use tokenizer::{tokenize, RawEntry, TokenizedHeader, HEADER_SENTINEL};
