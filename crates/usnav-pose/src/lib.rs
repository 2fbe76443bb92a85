#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Fixed image-to-probe calibration.
pub mod calibration;

/// Point-to-plane and orientation distances between poses.
pub mod geometry;

/// The 4x4 pose type and its flat and block conversions.
pub mod pose;

pub use calibration::{CalibrationError, ImageToProbeCalibration};
pub use pose::{Pose, PoseError, FLAT_TRANSFORM_LEN};

pub use glam;
