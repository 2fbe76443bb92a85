use usnav_pose::{
    geometry::{orientation_distance, point_to_slice_distance},
    Pose,
};

use crate::library::{Frame, FrameLibrary};

/// Distance assigned to frames that cannot be matched.
pub const INVALID_DISTANCE: f64 = f64::MAX;

/// Score of one recorded frame against the pointer pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMatch {
    /// Index of the frame in the library.
    pub frame_index: usize,
    /// Distance from the pointer tip to the frame image plane.
    pub distance: f64,
    /// Orientation distance between the pointer and the frame.
    ///
    /// Reported alongside the ranking but not used to order it.
    pub orientation_distance: f64,
}

impl FrameMatch {
    /// Whether the frame could be scored.
    pub fn is_valid(&self) -> bool {
        self.distance < INVALID_DISTANCE
    }
}

/// Score a single frame against the pointer pose.
///
/// Invalid frames, and frames whose plane is degenerate, get
/// [`INVALID_DISTANCE`] for both metrics.
pub fn score_frame(pointer: &Pose, frame: &Frame) -> FrameMatch {
    let invalid = FrameMatch {
        frame_index: frame.index,
        distance: INVALID_DISTANCE,
        orientation_distance: INVALID_DISTANCE,
    };
    if !frame.valid {
        return invalid;
    }

    let distance = point_to_slice_distance(pointer, &frame.pose);
    if !distance.is_finite() {
        log::debug!("Frame {} has a degenerate image plane", frame.index);
        return invalid;
    }

    FrameMatch {
        frame_index: frame.index,
        distance,
        orientation_distance: orientation_distance(pointer, &frame.pose),
    }
}

/// Rank every frame of the library by its distance to the pointer tip.
///
/// # Arguments
///
/// * `pointer` - The pose of the tracked pointer.
/// * `library` - The recorded frames.
///
/// # Returns
///
/// One [`FrameMatch`] per frame, closest first. Ties keep sequence order and
/// invalid frames are always last.
///
/// Example:
///
/// ```
/// use usnav_nav::{library::{Frame, FrameLibrary}, matcher::match_frames};
/// use usnav_pose::{glam::{DMat3, DVec3}, Pose};
///
/// let frame = |index: usize, z: f64| Frame {
///     index,
///     pose: Pose::from_rotation_translation(DMat3::IDENTITY, DVec3::new(0.0, 0.0, z)),
///     valid: true,
///     source_image_path: String::new(),
/// };
/// let library = FrameLibrary::from_frames(2, 2, vec![frame(0, 10.0), frame(1, 1.0)]);
/// let pointer = Pose::from_rotation_translation(DMat3::IDENTITY, DVec3::new(5.0, 5.0, 0.0));
///
/// let ranking = match_frames(&pointer, &library);
/// assert_eq!(ranking[0].frame_index, 1);
/// assert_eq!(ranking[0].distance, 1.0);
/// ```
pub fn match_frames(pointer: &Pose, library: &FrameLibrary) -> Vec<FrameMatch> {
    let mut matches = library
        .frames()
        .iter()
        .map(|frame| score_frame(pointer, frame))
        .collect::<Vec<_>>();

    matches.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.frame_index.cmp(&b.frame_index))
    });

    matches
}

/// The closest valid frame to the pointer tip, if any.
pub fn best_match(pointer: &Pose, library: &FrameLibrary) -> Option<FrameMatch> {
    library
        .frames()
        .iter()
        .map(|frame| score_frame(pointer, frame))
        .filter(FrameMatch::is_valid)
        .min_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.frame_index.cmp(&b.frame_index))
        })
}
