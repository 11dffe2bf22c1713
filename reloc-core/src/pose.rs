use crate::{PointMatch, Se3TangentSpace};
use derive_more::{AsMut, AsRef, From, Into};
use nalgebra::{IsometryMatrix3, Matrix4, Point3, Rotation3, Vector3};
use sample_consensus::Model;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// This trait is implemented by the poses in this library:
///
/// * [`CameraToWorld`] - Transforms camera space points into world space
/// * [`WorldToCamera`] - Transforms world space points into camera space
///
/// Both are always proper rigid transforms. The rotation is stored as a rotation matrix, so
/// scaling and reflection cannot be represented.
pub trait Pose: From<IsometryMatrix3<f64>> + Clone + Copy {
    type Inverse: Pose;

    /// Retrieve the isometry.
    fn isometry(self) -> IsometryMatrix3<f64>;

    /// Creates a pose with no change in position or orientation.
    fn identity() -> Self {
        IsometryMatrix3::identity().into()
    }

    /// Takes the inverse of the pose.
    fn inverse(self) -> Self::Inverse {
        self.isometry().inverse().into()
    }

    /// Create the pose from rotation and translation.
    fn from_parts(translation: Vector3<f64>, rotation: Rotation3<f64>) -> Self {
        IsometryMatrix3::from_parts(translation.into(), rotation).into()
    }

    /// Retrieve the homogeneous 4x4 matrix.
    fn homogeneous(self) -> Matrix4<f64> {
        self.isometry().to_homogeneous()
    }

    /// Applies a tangent space motion on the left of the pose (after the pose itself).
    #[must_use]
    fn retract(self, delta: Se3TangentSpace) -> Self {
        (delta.isometry() * self.isometry()).into()
    }

    /// Transform a euclidean point.
    fn transform(self, input: Point3<f64>) -> Point3<f64> {
        self.isometry() * input
    }
}

/// This contains a camera pose, which is a pose of the camera relative to the world.
/// This transforms camera points (with depth as `z`) into world coordinates.
///
/// This is the transform a relocaliser hands back to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraToWorld(pub IsometryMatrix3<f64>);

impl Pose for CameraToWorld {
    type Inverse = WorldToCamera;

    #[inline(always)]
    fn isometry(self) -> IsometryMatrix3<f64> {
        self.into()
    }
}

impl Model<PointMatch> for CameraToWorld {
    /// The euclidean distance between the transformed camera point and the world point.
    #[inline(always)]
    fn residual(&self, data: &PointMatch) -> f64 {
        let &PointMatch(camera, world) = data;
        (self.transform(camera) - world).norm()
    }
}

/// This contains a world pose, which is a pose of the world relative to the camera.
/// This maps world points into camera points, changing an absolute position into
/// a vector relative to the camera.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct WorldToCamera(pub IsometryMatrix3<f64>);

impl Pose for WorldToCamera {
    type Inverse = CameraToWorld;

    #[inline(always)]
    fn isometry(self) -> IsometryMatrix3<f64> {
        self.into()
    }
}
