use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use usnav_io::metafile::{FrameTransforms, SequenceDimensions};
use usnav_pose::Pose;

/// Tracking status of a recorded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The tracking data of the frame is reliable.
    Ok,
    /// The tracking data of the frame is missing or unreliable.
    Invalid,
}

impl FrameStatus {
    /// Status from a validity flag.
    pub fn from_valid(valid: bool) -> Self {
        match valid {
            true => Self::Ok,
            false => Self::Invalid,
        }
    }

    /// Whether the status is [`FrameStatus::Ok`].
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl std::fmt::Display for FrameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Invalid => write!(f, "INVALID"),
        }
    }
}

/// One tracked frame of a recorded sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Position of the frame in the sequence.
    pub index: usize,
    /// Pose of the tracked probe when the frame was recorded.
    pub pose: Pose,
    /// Whether the tracking data of the frame is reliable.
    pub valid: bool,
    /// Derived path of the frame image.
    pub source_image_path: String,
}

/// Location of the binary pixel payload of a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSource {
    /// The sequence file.
    pub path: PathBuf,
    /// Byte offset of the first frame in the file.
    pub data_offset: u64,
}

/// An immutable snapshot of a loaded sequence.
///
/// `frame_count` is the number of frames declared by the header. Frames past
/// the last parsed transform record have no pose and count as invalid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameLibrary {
    frames: Vec<Frame>,
    image_width: usize,
    image_height: usize,
    frame_count: usize,
    tags: BTreeSet<String>,
    pixel_source: Option<PixelSource>,
}

impl FrameLibrary {
    /// Create a library where the declared frame count equals the number of frames.
    pub fn from_frames(image_width: usize, image_height: usize, frames: Vec<Frame>) -> Self {
        Self {
            frame_count: frames.len(),
            frames,
            image_width,
            image_height,
            tags: BTreeSet::new(),
            pixel_source: None,
        }
    }

    /// Create a library from the parsed sequence header.
    ///
    /// # Arguments
    ///
    /// * `dimensions` - The `DimSize` record of the header.
    /// * `transforms` - The per-frame records of the header.
    /// * `pixel_source` - Where the frame pixels are stored, if known.
    pub fn from_sequence(
        dimensions: SequenceDimensions,
        transforms: FrameTransforms,
        pixel_source: Option<PixelSource>,
    ) -> Self {
        let FrameTransforms {
            transforms,
            filenames,
            tags,
            validity,
            ..
        } = transforms;

        let frames = transforms
            .iter()
            .zip(filenames)
            .enumerate()
            .map(|(index, (transform, source_image_path))| Frame {
                index,
                pose: Pose::from_flat(transform),
                valid: validity.get(index).copied().unwrap_or(false),
                source_image_path,
            })
            .collect();

        Self {
            frames,
            image_width: dimensions.width,
            image_height: dimensions.height,
            frame_count: dimensions.frame_count,
            tags,
            pixel_source,
        }
    }

    /// All frames with a parsed pose, in sequence order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The frame at `index`, if its pose was parsed.
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Number of frames declared by the sequence.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Whether the library has no frames to navigate.
    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// Image width in pixels.
    pub fn image_width(&self) -> usize {
        self.image_width
    }

    /// Image height in pixels.
    pub fn image_height(&self) -> usize {
        self.image_height
    }

    /// Image dimensions as `(width, height)`.
    pub fn image_dimensions(&self) -> (usize, usize) {
        (self.image_width, self.image_height)
    }

    /// Transform names found in the sequence header.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Whether frame `index` has a pose with reliable tracking data.
    pub fn is_valid(&self, index: usize) -> bool {
        self.frames.get(index).is_some_and(|frame| frame.valid)
    }

    /// Tracking status of frame `index`.
    pub fn status(&self, index: usize) -> FrameStatus {
        FrameStatus::from_valid(self.is_valid(index))
    }

    /// Where the pixels of the sequence are stored.
    pub fn pixel_source(&self) -> Option<&PixelSource> {
        self.pixel_source.as_ref()
    }

    /// Path of the loaded sequence file.
    pub fn source_path(&self) -> Option<&Path> {
        self.pixel_source.as_ref().map(|source| source.path.as_path())
    }
}
