#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for sequence reading.
///
/// Defines [`SequenceError`] variants for file access and malformed headers.
pub mod error;

/// Sequence metafile header parsing.
///
/// Reads the image dimensions, per-frame transforms, validity flags and the
/// transform names of a `.mha` sequence.
pub mod metafile;

/// Raw pixel extraction from the binary payload that follows the header.
pub mod pixels;

pub use error::SequenceError;
