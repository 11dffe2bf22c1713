use crate::Colour;
use arrayvec::ArrayVec;
use core::f64::consts::PI;
use nalgebra::{Matrix3, Point3, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The maximum number of modes the forest keeps for a single pixel.
pub const MAX_MODES: usize = 10;

/// A Gaussian guess of the world position of the surface seen at a pixel.
///
/// Modes come from the leaves the pixel lands in. The `support` is the number of training
/// samples that fell into the mode, so a mode with more support is more trusted.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Mode {
    /// The mean world position.
    pub position: Point3<f64>,
    /// The mean colour of the training samples in the mode.
    pub colour: Colour,
    /// The number of training samples supporting the mode.
    pub support: u32,
    inverse_covariance: Matrix3<f64>,
    /// `L^T` where `L * L^T` is the inverse covariance.
    whitening: Matrix3<f64>,
    /// `ln(1 / sqrt((2 pi)^3 |covariance|))`
    log_normaliser: f64,
}

impl Mode {
    /// Creates a mode from its covariance.
    ///
    /// Returns `None` if the covariance is not symmetric positive-definite.
    pub fn new(
        position: Point3<f64>,
        covariance: Matrix3<f64>,
        colour: Colour,
        support: u32,
    ) -> Option<Self> {
        if !is_symmetric(&covariance) {
            return None;
        }
        Self::from_inverse_covariance(position, covariance.try_inverse()?, colour, support)
    }

    /// Creates a mode from the inverse of its covariance, which is how forest leaves store it.
    ///
    /// Returns `None` if the matrix is not symmetric positive-definite.
    pub fn from_inverse_covariance(
        position: Point3<f64>,
        inverse_covariance: Matrix3<f64>,
        colour: Colour,
        support: u32,
    ) -> Option<Self> {
        if !is_symmetric(&inverse_covariance) {
            return None;
        }
        let l = inverse_covariance.cholesky()?.l();
        // The determinant of the inverse covariance is the squared product of the diagonal of L.
        let log_determinant: f64 = l.diagonal().iter().map(|n| 2.0 * n.ln()).sum();
        let log_normaliser = 0.5 * (log_determinant - 3.0 * (2.0 * PI).ln());
        if !log_normaliser.is_finite() {
            return None;
        }
        Some(Self {
            position,
            colour,
            support,
            inverse_covariance,
            whitening: l.transpose(),
            log_normaliser,
        })
    }

    pub fn inverse_covariance(&self) -> &Matrix3<f64> {
        &self.inverse_covariance
    }

    /// The matrix [`Mode::whiten`] applies to the offset from the mean.
    pub fn whitening(&self) -> &Matrix3<f64> {
        &self.whitening
    }

    /// The offset of `point` from the mean expressed in units of standard deviation.
    ///
    /// Its squared norm is the squared Mahalanobis distance.
    #[inline]
    pub fn whiten(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.whitening * (point - self.position)
    }

    #[inline]
    pub fn mahalanobis_squared(&self, point: &Point3<f64>) -> f64 {
        self.whiten(point).norm_squared()
    }

    /// The natural log of the Gaussian density of the mode at `point`.
    #[inline]
    pub fn log_density(&self, point: &Point3<f64>) -> f64 {
        self.log_normaliser - 0.5 * self.mahalanobis_squared(point)
    }

    /// The natural log of `support * density(point)`.
    ///
    /// A mode without support scores negative infinity.
    #[inline]
    pub fn log_score(&self, point: &Point3<f64>) -> f64 {
        f64::from(self.support).ln() + self.log_density(point)
    }
}

fn is_symmetric(matrix: &Matrix3<f64>) -> bool {
    let tolerance = 1e-9 * matrix.amax().max(1.0);
    (matrix - matrix.transpose()).amax() <= tolerance
}

/// The modes the forest predicts for one pixel, best supported first.
///
/// An empty prediction marks the pixel as unusable.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Prediction {
    modes: ArrayVec<Mode, MAX_MODES>,
}

impl Prediction {
    /// Collects the modes, keeping at most [`MAX_MODES`].
    pub fn new(modes: impl IntoIterator<Item = Mode>) -> Self {
        Self {
            modes: modes.into_iter().take(MAX_MODES).collect(),
        }
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn mode(&self, ix: usize) -> Option<&Mode> {
        self.modes.get(ix)
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Finds the mode that best explains the world point, returning its index and its
    /// [`Mode::log_score`].
    ///
    /// The comparison happens in the log domain so that a point far away from every mode still
    /// picks the closest one instead of underflowing to a tie at zero. Ties keep the earliest mode.
    /// Returns `None` if there are no modes or every score is NaN.
    pub fn best_mode(&self, point: &Point3<f64>) -> Option<(usize, f64)> {
        self.modes
            .iter()
            .enumerate()
            .map(|(ix, mode)| (ix, mode.log_score(point)))
            .filter(|&(_, score)| !score.is_nan())
            .reduce(|best, next| if next.1 > best.1 { next } else { best })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn isotropic(position: Point3<f64>, sigma: f64, support: u32) -> Mode {
        Mode::new(
            position,
            Matrix3::identity() * sigma * sigma,
            [0; 3],
            support,
        )
        .unwrap()
    }

    #[test]
    fn density_matches_textbook_gaussian() {
        let mode = isotropic(Point3::new(1.0, 2.0, 3.0), 0.5, 1);
        let point = Point3::new(1.5, 2.0, 3.0);
        let m2: f64 = 1.0;
        let expected = (-0.5 * m2).exp() / ((2.0 * PI).powi(3) * 0.25f64.powi(3)).sqrt();
        assert_relative_eq!(mode.mahalanobis_squared(&point), m2, epsilon = 1e-12);
        assert_relative_eq!(mode.log_density(&point).exp(), expected, epsilon = 1e-12);
    }

    #[test]
    fn full_covariance_mahalanobis() {
        let covariance = Matrix3::new(2.0, 0.5, 0.0, 0.5, 1.0, 0.2, 0.0, 0.2, 0.5);
        let mode = Mode::new(Point3::origin(), covariance, [0; 3], 3).unwrap();
        let point = Point3::new(0.3, -0.2, 0.4);
        let expected = point.coords.dot(&(covariance.try_inverse().unwrap() * point.coords));
        assert_relative_eq!(mode.mahalanobis_squared(&point), expected, epsilon = 1e-12);
    }

    #[test]
    fn rejects_indefinite_and_asymmetric_matrices() {
        let indefinite = Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, 1.0));
        assert!(Mode::new(Point3::origin(), indefinite, [0; 3], 1).is_none());
        let mut asymmetric = Matrix3::identity();
        asymmetric[(0, 1)] = 0.5;
        assert!(Mode::from_inverse_covariance(Point3::origin(), asymmetric, [0; 3], 1).is_none());
    }

    #[test]
    fn best_mode_prefers_closest_supported_mode() {
        let prediction = Prediction::new([
            isotropic(Point3::new(0.0, 0.0, 0.0), 0.1, 5),
            isotropic(Point3::new(1.0, 0.0, 0.0), 0.1, 5),
        ]);
        assert_eq!(prediction.best_mode(&Point3::new(0.9, 0.0, 0.0)).unwrap().0, 1);
        // Far from both, the closer one still wins even though both densities underflow.
        assert_eq!(prediction.best_mode(&Point3::new(-500.0, 0.0, 0.0)).unwrap().0, 0);
        assert!(Prediction::default().best_mode(&Point3::origin()).is_none());
    }

    #[test]
    fn keeps_at_most_max_modes() {
        let mode = isotropic(Point3::origin(), 1.0, 1);
        let prediction = Prediction::new(core::iter::repeat(mode).take(MAX_MODES + 4));
        assert_eq!(prediction.len(), MAX_MODES);
    }
}
