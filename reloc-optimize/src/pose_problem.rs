use levenberg_marquardt::LeastSquaresProblem;
use reloc_core::{
    nalgebra::{
        dimension::{Dynamic, U1, U6},
        storage::Owned,
        DVector, Matrix3, OMatrix, Point3, VecStorage, Vector3, Vector6,
    },
    CameraToWorld, Mode, Pose, Se3TangentSpace,
};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// How the offset between a transformed point and its mode is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum ResidualForm {
    /// The offset whitened by the mode's covariance.
    Mahalanobis,
    /// The plain world space offset.
    Euclidean,
}

impl ResidualForm {
    #[inline]
    pub fn residual(self, world: &Point3<f64>, mode: &Mode) -> Vector3<f64> {
        match self {
            ResidualForm::Mahalanobis => mode.whiten(world),
            ResidualForm::Euclidean => world - mode.position,
        }
    }

    /// Jacobian of [`ResidualForm::residual`] with respect to the world point.
    #[inline]
    pub fn jacobian(self, mode: &Mode) -> Matrix3<f64> {
        match self {
            ResidualForm::Mahalanobis => *mode.whitening(),
            ResidualForm::Euclidean => Matrix3::identity(),
        }
    }
}

/// A camera point tied to the mode it should land on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub camera: Point3<f64>,
    pub mode: Mode,
}

impl Anchor {
    #[inline]
    pub fn residual(&self, form: ResidualForm, pose: CameraToWorld) -> Vector3<f64> {
        form.residual(&pose.transform(self.camera), &self.mode)
    }
}

/// The sum of squared residuals of every anchor under `pose`.
///
/// Distances are squared before summing, so this is the quantity Levenberg-Marquardt minimizes
/// and not a sum of plain Mahalanobis distances.
pub fn residual_energy(form: ResidualForm, pose: CameraToWorld, anchors: &[Anchor]) -> f64 {
    anchors
        .iter()
        .map(|anchor| anchor.residual(form, pose).norm_squared())
        .sum()
}

/// Optimizes a twist applied to a fixed starting pose so the anchors land on their modes.
///
/// There are three residuals per anchor, and the Jacobian is analytic.
#[derive(Clone)]
pub struct PoseRefinementProblem<'a> {
    base: CameraToWorld,
    twist: Vector6<f64>,
    anchors: &'a [Anchor],
    form: ResidualForm,
}

impl<'a> PoseRefinementProblem<'a> {
    pub fn new(base: CameraToWorld, anchors: &'a [Anchor], form: ResidualForm) -> Self {
        Self {
            base,
            twist: Vector6::zeros(),
            anchors,
            form,
        }
    }

    /// The starting pose moved by the current twist.
    pub fn pose(&self) -> CameraToWorld {
        self.base.retract(Se3TangentSpace::from_vec(self.twist))
    }
}

impl<'a> LeastSquaresProblem<f64, Dynamic, U6> for PoseRefinementProblem<'a> {
    type ResidualStorage = VecStorage<f64, Dynamic, U1>;
    type JacobianStorage = Owned<f64, Dynamic, U6>;
    type ParameterStorage = Owned<f64, U6>;

    fn set_params(&mut self, x: &Vector6<f64>) {
        self.twist = *x;
    }

    fn params(&self) -> Vector6<f64> {
        self.twist
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let pose = self.pose();
        let residuals = DVector::from_iterator(
            3 * self.anchors.len(),
            self.anchors.iter().flat_map(|anchor| {
                let r = anchor.residual(self.form, pose);
                [r.x, r.y, r.z]
            }),
        );
        if residuals.iter().all(|n| n.is_finite()) {
            Some(residuals)
        } else {
            None
        }
    }

    fn jacobian(&self) -> Option<OMatrix<f64, Dynamic, U6>> {
        let twist = Se3TangentSpace::from_vec(self.twist).isometry();
        let mut jacobian = OMatrix::<f64, Dynamic, U6>::zeros(3 * self.anchors.len());
        for (ix, anchor) in self.anchors.iter().enumerate() {
            // The base pose moves the camera point, then the twist rotates it about the origin.
            let rotated = twist.rotation * self.base.transform(anchor.camera);
            let dr_dw = self.form.jacobian(&anchor.mode);
            // dW/dT is the identity and dW/dR is -[rotated]x, exact at a zero rotation.
            jacobian.fixed_slice_mut::<3, 3>(3 * ix, 0).copy_from(&dr_dw);
            jacobian
                .fixed_slice_mut::<3, 3>(3 * ix, 3)
                .copy_from(&(dr_dw * -rotated.coords.cross_matrix()));
        }
        if jacobian.iter().all(|n| n.is_finite()) {
            Some(jacobian)
        } else {
            None
        }
    }
}
