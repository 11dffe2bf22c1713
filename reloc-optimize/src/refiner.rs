use crate::{residual_energy, Anchor, PoseRefinementProblem, ResidualForm};
use levenberg_marquardt::LevenbergMarquardt;
use log::*;
use reloc_core::{CameraToWorld, Correspondence, Pose, PoseCandidate, PredictedFrame};

/// Refines the pose of a candidate against the modes its correspondences land on.
///
/// A refined pose is only kept if it strictly lowers the residual energy, so refinement never
/// makes a candidate worse.
///
/// ```
/// use reloc_optimize::{PoseRefiner, ResidualForm};
///
/// let refiner = PoseRefiner::new()
///     .residual(ResidualForm::Euclidean)
///     .inlier_radius(0.1);
/// assert_eq!(refiner.minimum_correspondences, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct PoseRefiner {
    pub residual: ResidualForm,
    /// Correspondences whose transformed point is further than this from the mode mean are
    /// left out of refinement.
    pub inlier_radius: f64,
    /// Passed to [`LevenbergMarquardt::with_patience`].
    pub patience: usize,
    /// Refinement is skipped with fewer inlying correspondences than this.
    pub minimum_correspondences: usize,
}

impl PoseRefiner {
    pub fn new() -> Self {
        Default::default()
    }

    #[must_use]
    pub fn residual(self, residual: ResidualForm) -> Self {
        Self { residual, ..self }
    }

    #[must_use]
    pub fn inlier_radius(self, inlier_radius: f64) -> Self {
        Self {
            inlier_radius,
            ..self
        }
    }

    #[must_use]
    pub fn patience(self, patience: usize) -> Self {
        Self { patience, ..self }
    }

    #[must_use]
    pub fn minimum_correspondences(self, minimum_correspondences: usize) -> Self {
        Self {
            minimum_correspondences,
            ..self
        }
    }

    /// Resolves the correspondences against `pose`, keeping those within the inlier radius.
    ///
    /// A correspondence with a stored mode keeps it, even when another mode of the pixel would
    /// score higher at `pose`. A pending one takes the mode that best explains its transformed
    /// point.
    ///
    /// # Panics
    ///
    /// If a correspondence refers to an unusable pixel or a mode the pixel does not have.
    pub fn anchors(
        &self,
        pose: CameraToWorld,
        correspondences: &[Correspondence],
        frame: &PredictedFrame,
    ) -> Vec<Anchor> {
        correspondences
            .iter()
            .filter_map(|&Correspondence { pixel, mode }| {
                let (camera, prediction) = frame.observation(pixel);
                let world = pose.transform(camera);
                let mode = match mode {
                    Some(ix) => *prediction.mode(ix).unwrap_or_else(|| {
                        panic!("pixel {} has no mode {}", pixel, ix);
                    }),
                    None => {
                        let (ix, _) = prediction.best_mode(&world).unwrap_or_else(|| {
                            panic!("no mode of pixel {} can score {:?}", pixel, world);
                        });
                        prediction.modes()[ix]
                    }
                };
                if (world - mode.position).norm() <= self.inlier_radius {
                    Some(Anchor { camera, mode })
                } else {
                    None
                }
            })
            .collect()
    }

    /// Optimizes `pose` against the anchors.
    ///
    /// Returns `None` if there are too few anchors or the optimized pose does not lower the
    /// residual energy.
    pub fn refine_pose(&self, pose: CameraToWorld, anchors: &[Anchor]) -> Option<CameraToWorld> {
        if anchors.len() < self.minimum_correspondences.max(1) {
            return None;
        }
        let before = residual_energy(self.residual, pose, anchors);
        let (problem, report) = LevenbergMarquardt::new()
            .with_patience(self.patience)
            .minimize(PoseRefinementProblem::new(pose, anchors, self.residual));
        let refined = problem.pose();
        let after = residual_energy(self.residual, refined, anchors);
        debug!(
            "refinement of {} anchors terminated with {:?}, energy {} -> {}",
            anchors.len(),
            report.termination,
            before,
            after
        );
        if after.is_finite() && after < before {
            Some(refined)
        } else {
            None
        }
    }

    /// Refines the candidate in place, returning whether its pose changed.
    ///
    /// The correspondences and energy of the candidate are left alone.
    pub fn refine(&self, candidate: &mut PoseCandidate, frame: &PredictedFrame) -> bool {
        let anchors = self.anchors(candidate.pose, &candidate.correspondences, frame);
        match self.refine_pose(candidate.pose, &anchors) {
            Some(pose) => {
                candidate.pose = pose;
                true
            }
            None => false,
        }
    }
}

impl Default for PoseRefiner {
    fn default() -> Self {
        Self {
            residual: ResidualForm::Mahalanobis,
            inlier_radius: 0.2,
            patience: 100,
            minimum_correspondences: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reloc_core::{
        nalgebra::{Matrix3, Point3, Rotation3, Vector3},
        DenseImage, Mode, PatchFeature, Prediction,
    };

    fn mode(x: f64) -> Mode {
        Mode::new(Point3::new(x, 0.0, 1.0), Matrix3::identity() * 0.01, [0; 3], 4).unwrap()
    }

    /// Every pixel sees the camera point `(0, 0, 1)` and predicts modes at `x = 0` and `x = 1`.
    fn frame() -> PredictedFrame {
        let features = DenseImage::from_fn(3, 1, |_, _| {
            PatchFeature::new(Point3::new(0.0, 0.0, 1.0), [0; 3])
        });
        let predictions = DenseImage::from_fn(3, 1, |_, _| Prediction::new([mode(0.0), mode(1.0)]));
        PredictedFrame::new(features, predictions).unwrap()
    }

    #[test]
    fn stored_modes_are_kept_and_pending_ones_resolved() {
        let frame = frame();
        let pose = CameraToWorld::from_parts(Vector3::new(0.9, 0.0, 0.0), Rotation3::identity());
        let correspondences = [
            Correspondence::resolved(0, 0),
            Correspondence::resolved(1, 1),
            Correspondence::pending(2),
        ];
        let anchors = PoseRefiner::new().anchors(pose, &correspondences, &frame);
        // The first stored mode is 0.9 away, the other two land on the mode at x = 1.
        assert_eq!(anchors.len(), 2);
        assert!(anchors.iter().all(|a| a.mode.position.x == 1.0));
    }

    #[test]
    fn too_few_anchors_are_left_alone() {
        let frame = frame();
        let pose = CameraToWorld::from_parts(Vector3::new(0.05, 0.0, 0.0), Rotation3::identity());
        let mut candidate = PoseCandidate::new(
            0,
            pose,
            (0..3).map(Correspondence::pending).collect(),
        );
        assert!(!PoseRefiner::new().refine(&mut candidate, &frame));
        assert_eq!(candidate.pose, pose);
    }

    #[test]
    #[should_panic(expected = "has no mode 7")]
    fn missing_stored_mode_panics() {
        PoseRefiner::new().anchors(
            CameraToWorld::identity(),
            &[Correspondence::resolved(0, 7)],
            &frame(),
        );
    }
}
