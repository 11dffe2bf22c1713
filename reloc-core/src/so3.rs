use nalgebra::{Const, IsometryMatrix3, Rotation3, Vector3, Vector6};

/// Contains a small translation and rotation that will be appended to
/// the reference frame of some pose.
///
/// This is a member of the lie algebra se(3). Pose refinement optimizes one of these
/// against a fixed starting pose, so the six parameters stay unconstrained.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Se3TangentSpace {
    pub translation: Vector3<f64>,
    pub rotation: Vector3<f64>,
}

impl Se3TangentSpace {
    #[inline(always)]
    pub fn new(mut translation: Vector3<f64>, mut rotation: Vector3<f64>) -> Self {
        if translation.iter().any(|n| n.is_nan()) {
            translation = Vector3::zeros();
        }
        if rotation.iter().any(|n| n.is_nan()) {
            rotation = Vector3::zeros();
        }
        Self {
            translation,
            rotation,
        }
    }

    #[inline(always)]
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: Vector3::zeros(),
        }
    }

    /// Gets the isometry that represents this tangent space transformation.
    ///
    /// The rotation is the exponential map of `rotation` and is applied about the origin,
    /// then `translation` is added.
    #[must_use]
    #[inline(always)]
    pub fn isometry(self) -> IsometryMatrix3<f64> {
        let rotation = Rotation3::from_scaled_axis(self.rotation);
        IsometryMatrix3::from_parts(self.translation.into(), rotation)
    }

    /// Packs the tangent space as `[tx, ty, tz, rx, ry, rz]`.
    #[inline(always)]
    pub fn to_vec(&self) -> Vector6<f64> {
        Vector6::new(
            self.translation.x,
            self.translation.y,
            self.translation.z,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        )
    }

    #[inline(always)]
    pub fn from_vec(v: Vector6<f64>) -> Self {
        Self::new(
            v.rows_generic(0, Const::<3>).into_owned(),
            v.rows_generic(3, Const::<3>).into_owned(),
        )
    }
}
