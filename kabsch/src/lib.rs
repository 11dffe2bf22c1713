//! Closed-form solution to the absolute orientation problem.
//!
//! Given `n >= 3` points observed in camera space and the world space points they correspond to,
//! find the rotation `R` and translation `t` minimizing
//!
//! ```text
//! sum_i | R * c_i + t - w_i |^2
//! ```
//!
//! Both point sets are centred on their centroids, the rotation is recovered from the SVD of their
//! cross-covariance, and the translation then maps the camera centroid onto the world centroid.
//! If the SVD yields a reflection, the axis of least variance is flipped so the result is always
//! a proper rotation.

use reloc_core::{
    nalgebra::{IsometryMatrix3, Matrix3, Rotation3, Vector3},
    sample_consensus::Estimator,
    CameraToWorld, PointMatch,
};

/// Performs the [Kabsch algorithm](https://en.wikipedia.org/wiki/Kabsch_algorithm),
/// producing a [`CameraToWorld`] pose.
#[derive(Copy, Clone, Debug)]
pub struct Kabsch {
    pub epsilon: f64,
    pub iterations: usize,
}

impl Kabsch {
    pub fn new() -> Self {
        Default::default()
    }

    /// Aligns the camera points of the matches onto their world points.
    ///
    /// Returns `None` if fewer than three matches are given, the SVD does not converge,
    /// or the result is not finite.
    pub fn align<I>(&self, data: I) -> Option<CameraToWorld>
    where
        I: Iterator<Item = PointMatch> + Clone,
    {
        let (count, camera_sum, world_sum) = data.clone().fold(
            (0usize, Vector3::zeros(), Vector3::zeros()),
            |(count, camera_sum, world_sum), PointMatch(camera, world)| {
                (count + 1, camera_sum + camera.coords, world_sum + world.coords)
            },
        );
        if count < 3 {
            return None;
        }
        let camera_centroid = camera_sum / count as f64;
        let world_centroid = world_sum / count as f64;

        let covariance: Matrix3<f64> = data
            .map(|PointMatch(camera, world)| {
                (world.coords - world_centroid) * (camera.coords - camera_centroid).transpose()
            })
            .sum();

        let svd = covariance.try_svd(true, true, self.epsilon, self.iterations)?;
        let mut u = svd.u?;
        let v_t = svd.v_t?;
        if (u * v_t).determinant() < 0.0 {
            // Flip the direction with the least variance to turn the reflection into a rotation.
            let (smallest, _) = svd.singular_values.argmin();
            u.column_mut(smallest).neg_mut();
        }
        let rotation = Rotation3::from_matrix_unchecked(u * v_t);
        let translation = world_centroid - rotation * camera_centroid;

        let pose = IsometryMatrix3::from_parts(translation.into(), rotation);
        if pose.to_homogeneous().iter().all(|n| n.is_finite()) {
            Some(CameraToWorld(pose))
        } else {
            None
        }
    }
}

impl Default for Kabsch {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            iterations: 1000,
        }
    }
}

impl Estimator<PointMatch> for Kabsch {
    type Model = CameraToWorld;
    type ModelIter = Option<CameraToWorld>;
    const MIN_SAMPLES: usize = 3;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = PointMatch> + Clone,
    {
        self.align(data)
    }
}
