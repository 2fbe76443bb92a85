use glam::{DMat3, DMat4, DVec3};

/// Number of values in a flat 3x4 transform.
pub const FLAT_TRANSFORM_LEN: usize = 12;

/// Error types for pose conversions.
#[derive(Debug, thiserror::Error)]
pub enum PoseError {
    /// Not enough values to fill the upper 3x4 block of a pose.
    #[error("expected 12 values for a 3x4 transform, got {0}")]
    InsufficientValues(usize),
}

/// A 4x4 homogeneous rigid transform.
///
/// The upper 3x3 block holds the rotation, the fourth column holds the
/// translation. Poses built from flat transforms always carry `[0, 0, 0, 1]`
/// as their bottom row.
///
/// # Examples
///
/// ```
/// use usnav_pose::Pose;
///
/// let pose = Pose::from_rows(&[
///     [1.0, 0.0, 0.0, 10.0],
///     [0.0, 1.0, 0.0, 20.0],
///     [0.0, 0.0, 1.0, 30.0],
/// ]);
///
/// assert_eq!(pose.translation().to_array(), [10.0, 20.0, 30.0]);
/// assert_eq!(pose.get(1, 3), 20.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose(DMat4);

impl Pose {
    /// The identity pose.
    pub const IDENTITY: Self = Self(DMat4::IDENTITY);

    /// Wrap a 4x4 matrix as a pose. The matrix is stored as given.
    pub fn from_matrix(matrix: DMat4) -> Self {
        Self(matrix)
    }

    /// Build a pose from a rotation block and a translation vector.
    pub fn from_rotation_translation(rotation: DMat3, translation: DVec3) -> Self {
        Self(DMat4::from_cols(
            rotation.x_axis.extend(0.0),
            rotation.y_axis.extend(0.0),
            rotation.z_axis.extend(0.0),
            translation.extend(1.0),
        ))
    }

    /// Build a pose from the three upper rows of the matrix.
    pub fn from_rows(rows: &[[f64; 4]; 3]) -> Self {
        let mut matrix = DMat4::IDENTITY;
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                matrix.col_mut(j)[i] = *value;
            }
        }
        Self(matrix)
    }

    /// Build a pose from a row-major flat 3x4 transform.
    ///
    /// When fewer than [`FLAT_TRANSFORM_LEN`] values are given the identity
    /// pose is returned. Use [`Pose::try_from`] to detect that case.
    ///
    /// # Arguments
    ///
    /// * `values` - Row-major values of the upper 3x4 block. Extra values are ignored.
    pub fn from_flat(values: &[f32]) -> Self {
        Self::try_from(values).unwrap_or(Self::IDENTITY)
    }

    /// Serialize the upper 3x4 block as row-major single precision values.
    pub fn to_flat(&self) -> [f32; FLAT_TRANSFORM_LEN] {
        let mut flat = [0.0f32; FLAT_TRANSFORM_LEN];
        for (k, value) in flat.iter_mut().enumerate() {
            *value = self.get(k / 4, k % 4) as f32;
        }
        flat
    }

    /// The three upper rows of the matrix.
    pub fn to_rows(&self) -> [[f64; 4]; 3] {
        let mut rows = [[0.0; 4]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = self.get(i, j);
            }
        }
        rows
    }

    /// Element at `row`, `col`.
    ///
    /// PRECONDITION: `row < 4` and `col < 4`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.0.col(col)[row]
    }

    /// The first three entries of column `index`.
    ///
    /// Column 2 is the normal of the image plane for a slice pose and
    /// column 3 is the translation.
    ///
    /// PRECONDITION: `index < 4`.
    #[inline]
    pub fn column(&self, index: usize) -> DVec3 {
        self.0.col(index).truncate()
    }

    /// The upper 3x3 rotation block.
    #[inline]
    pub fn rotation(&self) -> DMat3 {
        DMat3::from_mat4(self.0)
    }

    /// The translation column.
    #[inline]
    pub fn translation(&self) -> DVec3 {
        self.column(3)
    }

    /// The underlying 4x4 matrix.
    #[inline]
    pub fn as_matrix(&self) -> &DMat4 {
        &self.0
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<DMat4> for Pose {
    fn from(matrix: DMat4) -> Self {
        Self(matrix)
    }
}

impl From<Pose> for DMat4 {
    fn from(pose: Pose) -> Self {
        pose.0
    }
}

impl TryFrom<&[f32]> for Pose {
    type Error = PoseError;

    fn try_from(values: &[f32]) -> Result<Self, Self::Error> {
        if values.len() < FLAT_TRANSFORM_LEN {
            return Err(PoseError::InsufficientValues(values.len()));
        }
        let mut matrix = DMat4::IDENTITY;
        for (k, value) in values.iter().take(FLAT_TRANSFORM_LEN).enumerate() {
            matrix.col_mut(k % 4)[k / 4] = *value as f64;
        }
        Ok(Self(matrix))
    }
}

// Pose composition: `a * b` applies `b` first.
impl std::ops::Mul<Pose> for Pose {
    type Output = Pose;

    #[inline]
    fn mul(self, rhs: Pose) -> Self::Output {
        Pose(self.0 * rhs.0)
    }
}
