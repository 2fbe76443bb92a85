#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// The in-memory library of tracked frames built from a sequence.
pub mod library;

/// Ranking of recorded frames against a tracked pointer pose.
///
/// Frames are ordered by the distance from the pointer tip to their image
/// plane. Frames with invalid tracking data are always ranked last.
pub mod matcher;

/// Wrapping navigation over the frames of a library.
pub mod navigator;

/// Sequence loading, navigation and pointer tracking behind a single handle.
pub mod session;

pub use library::{Frame, FrameLibrary, FrameStatus, PixelSource};
pub use matcher::{best_match, match_frames, FrameMatch};
pub use navigator::FrameNavigator;
pub use session::{FrameSink, LoadReport, NavigationSession, SceneObserver, TrackingEvent};
