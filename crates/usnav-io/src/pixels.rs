use std::{
    io::{BufRead, BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use crate::{
    error::SequenceError,
    metafile::{next_header_line, open_sequence, ELEMENT_DATA_FILE_LOCAL},
};

/// A single-channel 8-bit ultrasound frame.
///
/// Pixels are stored row-major, `width * height` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl FrameImage {
    /// Create a frame from its pixel buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::InvalidPixelBuffer`] if `data.len() != width * height`.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, SequenceError> {
        if width.checked_mul(height) != Some(data.len()) {
            return Err(SequenceError::InvalidPixelBuffer(data.len(), width, height));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width of the frame in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the frame in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Borrow the raw pixels.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Consume the frame and return its pixel buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

/// Byte offset of the pixel payload, i.e. the first byte after the
/// `ElementDataFile = LOCAL` header line.
pub fn find_pixel_data_offset(path: impl AsRef<Path>) -> Result<u64, SequenceError> {
    let mut reader = BufReader::new(open_sequence(path.as_ref())?);
    find_pixel_data_offset_from_reader(&mut reader)
}

/// Byte offset of the pixel payload within a buffered sequence file.
pub fn find_pixel_data_offset_from_reader<R: BufRead>(reader: &mut R) -> Result<u64, SequenceError> {
    let mut offset = 0u64;
    let mut buf = Vec::new();
    while let Some(line) = next_header_line(reader, &mut buf)? {
        offset += buf.len() as u64;
        if line.contains(ELEMENT_DATA_FILE_LOCAL) {
            return Ok(offset);
        }
    }
    Err(SequenceError::PixelDataNotFound)
}

/// Absolute byte offset of frame `index` in the sequence file.
///
/// Computed in 64 bits. Returns `None` if the offset does not fit.
pub fn frame_byte_offset(
    data_offset: u64,
    index: usize,
    width: usize,
    height: usize,
) -> Option<u64> {
    (width as u64)
        .checked_mul(height as u64)?
        .checked_mul(index as u64)?
        .checked_add(data_offset)
}

/// Read the pixels of frame `index` from a sequence file.
///
/// # Arguments
///
/// * `path` - The path to the `.mha` sequence file.
/// * `data_offset` - Offset of the pixel payload, see [`find_pixel_data_offset`].
/// * `index` - Zero-based frame index.
/// * `width` - Frame width in pixels.
/// * `height` - Frame height in pixels.
pub fn read_frame_pixels(
    path: impl AsRef<Path>,
    data_offset: u64,
    index: usize,
    width: usize,
    height: usize,
) -> Result<FrameImage, SequenceError> {
    let mut file = open_sequence(path.as_ref())?;
    read_frame_pixels_from(&mut file, data_offset, index, width, height)
}

/// Read the pixels of frame `index` from any seekable reader.
pub fn read_frame_pixels_from<R: Read + Seek>(
    reader: &mut R,
    data_offset: u64,
    index: usize,
    width: usize,
    height: usize,
) -> Result<FrameImage, SequenceError> {
    let frame_len = width
        .checked_mul(height)
        .ok_or(SequenceError::InvalidPixelBuffer(0, width, height))?;
    let offset = frame_byte_offset(data_offset, index, width, height)
        .ok_or(SequenceError::FrameOutOfRange(index))?;
    reader.seek(SeekFrom::Start(offset))?;

    let mut data = vec![0u8; frame_len];
    reader.read_exact(&mut data).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => SequenceError::FrameOutOfRange(index),
        _ => SequenceError::Io(e),
    })?;

    FrameImage::new(width, height, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn sequence_bytes(width: usize, height: usize, frames: usize) -> (Vec<u8>, u64) {
        let header = format!(
            "ObjectType = Image\r\nDimSize = {width} {height} {frames}\r\n{ELEMENT_DATA_FILE_LOCAL}\r\n"
        );
        let mut bytes = header.into_bytes();
        let offset = bytes.len() as u64;
        for frame in 0..frames {
            bytes.extend((0..width * height).map(|p| (frame * 10 + p) as u8));
        }
        (bytes, offset)
    }

    #[test]
    fn test_find_pixel_data_offset() -> Result<(), SequenceError> {
        let (bytes, expected) = sequence_bytes(3, 2, 2);
        let offset = find_pixel_data_offset_from_reader(&mut Cursor::new(&bytes))?;
        assert_eq!(offset, expected);
        Ok(())
    }

    #[test]
    fn test_pixel_data_not_found() {
        let res = find_pixel_data_offset_from_reader(&mut "DimSize = 1 1 1\n".as_bytes());
        assert!(matches!(res, Err(SequenceError::PixelDataNotFound)));
    }

    #[test]
    fn test_read_frame_pixels_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let (bytes, _) = sequence_bytes(3, 2, 3);
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("frames.mha");
        std::fs::File::create(&file_path)?.write_all(&bytes)?;

        let offset = find_pixel_data_offset(&file_path)?;
        let frame = read_frame_pixels(&file_path, offset, 2, 3, 2)?;
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.as_slice(), &[20, 21, 22, 23, 24, 25]);
        assert_eq!(frame.get(1, 1), Some(24));
        assert_eq!(frame.get(3, 0), None);
        assert_eq!(frame.into_vec(), vec![20, 21, 22, 23, 24, 25]);
        Ok(())
    }

    #[test]
    fn test_read_frame_out_of_range() {
        let (bytes, offset) = sequence_bytes(4, 4, 2);
        let res = read_frame_pixels_from(&mut Cursor::new(&bytes), offset, 2, 4, 4);
        assert!(matches!(res, Err(SequenceError::FrameOutOfRange(2))));
    }

    #[test]
    fn test_frame_byte_offset_is_64_bit() {
        let offset = frame_byte_offset(100, 5_000, 1024, 1024);
        assert_eq!(offset, Some(100 + 5_000 * 1024 * 1024));
        assert!(offset.is_some_and(|o| o > u32::MAX as u64));
    }

    #[test]
    fn test_oversized_frames_are_rejected() {
        assert_eq!(frame_byte_offset(0, 2, usize::MAX, usize::MAX), None);
        assert_eq!(frame_byte_offset(u64::MAX, 1, 1, 1), None);

        let (bytes, offset) = sequence_bytes(2, 2, 1);
        let res = read_frame_pixels_from(&mut Cursor::new(&bytes), offset, 1, usize::MAX, 2);
        assert!(matches!(res, Err(SequenceError::InvalidPixelBuffer(0, _, 2))));
        let res = read_frame_pixels_from(&mut Cursor::new(&bytes), offset, usize::MAX, 2, 2);
        assert!(matches!(res, Err(SequenceError::FrameOutOfRange(_))));

        let res = FrameImage::new(usize::MAX, 2, Vec::new());
        assert!(matches!(res, Err(SequenceError::InvalidPixelBuffer(0, _, 2))));
    }

    #[test]
    fn test_frame_image_size_mismatch() {
        let res = FrameImage::new(4, 4, vec![0; 15]);
        assert!(matches!(res, Err(SequenceError::InvalidPixelBuffer(15, 4, 4))));
    }
}
