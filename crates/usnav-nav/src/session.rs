use std::{collections::BTreeSet, path::Path, sync::Arc};

use usnav_io::{
    metafile::{read_frame_transforms, read_header_dimensions},
    pixels::{find_pixel_data_offset, read_frame_pixels, FrameImage},
    SequenceError,
};
use usnav_pose::{ImageToProbeCalibration, Pose};

use crate::{
    library::{FrameLibrary, FrameStatus, PixelSource},
    matcher::{match_frames, FrameMatch},
    navigator::{FrameChangedCallback, FrameNavigator},
};

/// Receiver of the current frame, e.g. a renderer.
pub trait FrameSink {
    /// Display `image`. `image_to_world` places the image pixels in tracker
    /// space and is `None` when the frame has no tracked pose.
    fn present(&mut self, image: &FrameImage, image_to_world: Option<&Pose>);
}

/// Pose updates delivered by the tracking subsystem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackingEvent {
    /// The pointer moved to a new pose.
    PointerPose(Pose),
    /// The pointer is no longer tracked.
    PointerDetached,
}

/// Lifecycle hooks of the hosting scene.
///
/// All hooks default to doing nothing.
pub trait SceneObserver {
    /// A node was added to the scene.
    fn node_added(&mut self, _name: &str) {}
    /// A node was removed from the scene.
    fn node_removed(&mut self, _name: &str) {}
    /// The observer was attached to a scene.
    fn scene_attached(&mut self) {}
    /// The scene finished a batch update.
    fn scene_updated(&mut self) {}
}

/// Summary of a sequence load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of frames declared by the header.
    pub declared_frames: usize,
    /// Number of transform records parsed.
    pub parsed_frames: usize,
    /// Number of parsed records with invalid tracking data.
    pub invalid_frames: usize,
    /// Parsing stopped early on an incomplete transform record.
    pub truncated: bool,
}

impl LoadReport {
    /// Whether only part of the transform section could be read.
    pub fn is_partial(&self) -> bool {
        self.truncated
    }
}

/// A loaded sequence together with its navigation state.
///
/// The session owns the current [`FrameLibrary`] snapshot, the navigation
/// cursor and the pixels of the current frame. Every navigation step reloads
/// the current frame and hands it to the registered [`FrameSink`].
pub struct NavigationSession {
    navigator: FrameNavigator,
    calibration: ImageToProbeCalibration,
    sink: Option<Box<dyn FrameSink + Send>>,
    current_image: Option<FrameImage>,
    pointer: Option<Pose>,
    last_matches: Vec<FrameMatch>,
    listeners: Vec<FrameChangedCallback>,
}

impl NavigationSession {
    /// Create an empty session with the given image-to-probe calibration.
    pub fn new(calibration: ImageToProbeCalibration) -> Self {
        Self {
            navigator: FrameNavigator::default(),
            calibration,
            sink: None,
            current_image: None,
            pointer: None,
            last_matches: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Register the receiver of the current frame.
    pub fn with_frame_sink(mut self, sink: impl FrameSink + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Register a callback run after every navigation step.
    ///
    /// Callbacks run once the new frame has been reloaded and handed to the
    /// [`FrameSink`].
    pub fn on_frame_changed<F>(&mut self, callback: F)
    where
        F: FnMut(usize) + Send + 'static,
    {
        self.listeners.push(Box::new(callback));
    }

    /// Load a sequence file and go to its first frame.
    ///
    /// The previous sequence stays active if the header cannot be read. An
    /// incomplete transform record is accepted as a partial load.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the `.mha` sequence file.
    pub fn load_sequence(&mut self, path: impl AsRef<Path>) -> Result<LoadReport, SequenceError> {
        let path = path.as_ref();
        let dimensions = read_header_dimensions(path)?;
        let transforms = read_frame_transforms(path)?;
        let pixel_source = match find_pixel_data_offset(path) {
            Ok(data_offset) => Some(PixelSource {
                path: path.to_path_buf(),
                data_offset,
            }),
            Err(SequenceError::PixelDataNotFound) => {
                log::warn!("No pixel data in {}", path.display());
                None
            }
            Err(e) => return Err(e),
        };

        let report = LoadReport {
            declared_frames: dimensions.frame_count,
            parsed_frames: transforms.len(),
            invalid_frames: transforms.validity.iter().filter(|v| !**v).count(),
            truncated: transforms.truncated,
        };

        let library = FrameLibrary::from_sequence(dimensions, transforms, pixel_source);
        self.last_matches.clear();
        self.navigator.set_library(Arc::new(library));
        self.refresh();
        if !self.navigator.library().is_empty() {
            self.notify();
        }

        log::info!(
            "Loaded {}: {}x{} pixels, {} frames, {} transform records ({} invalid){}",
            path.display(),
            dimensions.width,
            dimensions.height,
            report.declared_frames,
            report.parsed_frames,
            report.invalid_frames,
            if report.truncated { ", truncated" } else { "" }
        );

        Ok(report)
    }

    /// Snapshot of the loaded library.
    pub fn library(&self) -> Arc<FrameLibrary> {
        self.navigator.library().clone()
    }

    /// Index of the current frame.
    pub fn current_frame(&self) -> usize {
        self.navigator.current_frame()
    }

    /// Number of frames in the loaded sequence.
    pub fn frame_count(&self) -> usize {
        self.navigator.frame_count()
    }

    /// Image dimensions as `(width, height)`.
    pub fn image_dimensions(&self) -> (usize, usize) {
        self.navigator.library().image_dimensions()
    }

    /// Tracking status of the current frame.
    pub fn current_frame_status(&self) -> FrameStatus {
        self.navigator.library().status(self.current_frame())
    }

    /// Transform names found in the sequence header.
    pub fn available_transform_tags(&self) -> &BTreeSet<String> {
        self.navigator.library().tags()
    }

    /// The image-to-probe calibration of the session.
    pub fn calibration(&self) -> &ImageToProbeCalibration {
        &self.calibration
    }

    /// Pixels of the current frame, if they could be read.
    pub fn current_image(&self) -> Option<&FrameImage> {
        self.current_image.as_ref()
    }

    /// Pose of the current image in tracker space: frame pose times calibration.
    pub fn image_to_world(&self) -> Option<Pose> {
        self.navigator
            .library()
            .frame(self.current_frame())
            .map(|frame| frame.pose * self.calibration.pose())
    }

    /// Rank all frames against a pointer pose.
    pub fn match_pointer_pose(&self, pointer: &Pose) -> Vec<FrameMatch> {
        match_frames(pointer, self.navigator.library())
    }

    /// The last tracked pointer pose.
    pub fn pointer(&self) -> Option<&Pose> {
        self.pointer.as_ref()
    }

    /// The ranking computed for the last pointer pose.
    pub fn last_matches(&self) -> &[FrameMatch] {
        &self.last_matches
    }

    /// Process a tracking update.
    ///
    /// # Returns
    ///
    /// The closest valid frame for a new pointer pose.
    pub fn handle_event(&mut self, event: TrackingEvent) -> Option<FrameMatch> {
        match event {
            TrackingEvent::PointerPose(pose) => {
                self.pointer = Some(pose);
                self.last_matches = self.match_pointer_pose(&pose);
                // invalid frames sort last
                let best = self.last_matches.first().copied().filter(FrameMatch::is_valid);
                if let Some(best) = best {
                    log::debug!(
                        "Closest frame {} at {:.3}, orientation {:.3}",
                        best.frame_index,
                        best.distance,
                        best.orientation_distance
                    );
                }
                best
            }
            TrackingEvent::PointerDetached => {
                self.pointer = None;
                self.last_matches.clear();
                None
            }
        }
    }

    /// Go to frame `frame`, wrapping out of range indices.
    pub fn go_to_frame(&mut self, frame: isize) -> usize {
        self.navigate(|nav| nav.go_to_frame(frame))
    }

    /// Step to the next frame.
    pub fn next_frame(&mut self) -> usize {
        self.navigate(FrameNavigator::next_frame)
    }

    /// Step to the previous frame.
    pub fn previous_frame(&mut self) -> usize {
        self.navigate(FrameNavigator::previous_frame)
    }

    /// Go to the next frame with valid tracking data.
    pub fn next_valid_frame(&mut self) -> usize {
        self.navigate(FrameNavigator::next_valid_frame)
    }

    /// Go to the previous frame with valid tracking data.
    pub fn previous_valid_frame(&mut self) -> usize {
        self.navigate(FrameNavigator::previous_valid_frame)
    }

    /// Go to the next frame with invalid tracking data.
    pub fn next_invalid_frame(&mut self) -> usize {
        self.navigate(FrameNavigator::next_invalid_frame)
    }

    /// Go to the previous frame with invalid tracking data.
    pub fn previous_invalid_frame(&mut self) -> usize {
        self.navigate(FrameNavigator::previous_invalid_frame)
    }

    fn navigate(&mut self, step: impl FnOnce(&mut FrameNavigator) -> usize) -> usize {
        if self.navigator.library().is_empty() {
            return self.current_frame();
        }
        let current = step(&mut self.navigator);
        self.refresh();
        self.notify();
        current
    }

    fn notify(&mut self) {
        let current = self.current_frame();
        for listener in self.listeners.iter_mut() {
            listener(current);
        }
    }

    // reload the pixels of the current frame and hand them to the sink
    fn refresh(&mut self) {
        let library = self.navigator.library().clone();
        if library.is_empty() {
            self.current_image = None;
            return;
        }
        let Some(source) = library.pixel_source() else {
            self.current_image = None;
            return;
        };

        let index = self.current_frame();
        let (width, height) = library.image_dimensions();
        self.current_image =
            match read_frame_pixels(&source.path, source.data_offset, index, width, height) {
                Ok(image) => Some(image),
                Err(e) => {
                    log::error!("Failed to read frame {}: {}", index, e);
                    None
                }
            };

        let image_to_world = self.image_to_world();
        if let (Some(sink), Some(image)) = (self.sink.as_mut(), self.current_image.as_ref()) {
            sink.present(image, image_to_world.as_ref());
        }
    }
}

impl Default for NavigationSession {
    fn default() -> Self {
        Self::new(ImageToProbeCalibration::default())
    }
}

impl std::fmt::Debug for NavigationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationSession")
            .field("navigator", &self.navigator)
            .field("calibration", &self.calibration)
            .field("has_sink", &self.sink.is_some())
            .field("pointer", &self.pointer)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl SceneObserver for NavigationSession {
    fn scene_attached(&mut self) {
        self.refresh();
    }

    fn scene_updated(&mut self) {
        self.refresh();
    }
}
