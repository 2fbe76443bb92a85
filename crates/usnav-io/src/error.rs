/// An error type for reading sequence metafiles.
#[derive(thiserror::Error, Debug)]
pub enum SequenceError {
    /// Error when the sequence file does not exist.
    #[error("Sequence file does not exist: {0}")]
    FileNotFound(std::path::PathBuf),

    /// Error to open or read the file.
    #[error("Failed to read the sequence file. {0}")]
    Io(#[from] std::io::Error),

    /// The header has no `DimSize` record.
    #[error("DimSize record not found in the sequence header")]
    DimensionsNotFound,

    /// The `DimSize` record does not hold exactly three integers.
    #[error("Malformed DimSize record: {0}")]
    MalformedDimensions(String),

    /// The header has no `ElementDataFile = LOCAL` record.
    #[error("Pixel data marker not found in the sequence header")]
    PixelDataNotFound,

    /// The requested frame lies beyond the end of the pixel data.
    #[error("Frame {0} is beyond the end of the pixel data")]
    FrameOutOfRange(usize),

    /// The pixel buffer length does not match the frame size.
    #[error("Pixel buffer length ({0}) does not match the frame size ({1}x{2})")]
    InvalidPixelBuffer(usize, usize, usize),
}
