use nalgebra::Point3;

/// Camera space point to world space point match
///
/// The first point is observed by the depth camera, the second is where that same
/// surface point lies in the world.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct PointMatch(pub Point3<f64>, pub Point3<f64>);
