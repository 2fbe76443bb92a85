use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pose::Pose;

/// Error types for loading a calibration.
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    /// Error reading the calibration file
    #[error("error reading calibration file")]
    Io(#[from] std::io::Error),

    /// Error decoding the calibration json
    #[error("invalid calibration json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Static offset between the ultrasound image plane and the tracked probe.
///
/// The transform maps image pixel coordinates into the probe frame, so the
/// pose of an image in tracker space is `probe_to_tracker * image_to_probe`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageToProbeCalibration {
    /// Upper 3x4 block of the transform, row-major.
    pub rows: [[f64; 4]; 3],
}

impl ImageToProbeCalibration {
    /// Create a calibration from the upper 3x4 block of the transform.
    pub fn new(rows: [[f64; 4]; 3]) -> Self {
        Self { rows }
    }

    /// The calibration as a pose.
    pub fn pose(&self) -> Pose {
        Pose::from_rows(&self.rows)
    }

    /// Parse a calibration from a json string of the form `{"rows": [[..4], [..4], [..4]]}`.
    pub fn from_json_str(json: &str) -> Result<Self, CalibrationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a calibration from a json file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

impl Default for ImageToProbeCalibration {
    /// The calibration of the reference probe used to record the sequences.
    fn default() -> Self {
        Self::new([
            [0.107535, 0.00094824, 0.0044213, -65.9013],
            [0.0044901, -0.00238041, -0.106347, -3.05698],
            [-0.000844189, 0.105271, -0.00244457, -17.1613],
        ])
    }
}
