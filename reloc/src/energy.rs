use core::f64::consts::LN_10;
use float_ord::FloatOrd;
use reloc_core::{CameraToWorld, Correspondence, Pose, PoseCandidate, PredictedFrame};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// The mean energy of the correspondences under `pose`. Lower is better.
///
/// Each correspondence takes the mode with the highest `support * density` at its transformed
/// point, whatever mode it was built with. The density of that mode divided by the number of
/// modes of the pixel is floored at `energy_floor`, and the correspondence contributes its
/// negated base 10 logarithm.
///
/// # Panics
///
/// If there are no correspondences, a correspondence refers to an unusable pixel, or the best mode
/// of a pixel has no support.
pub fn pose_energy(
    pose: CameraToWorld,
    correspondences: &[Correspondence],
    frame: &PredictedFrame,
    energy_floor: f64,
) -> f64 {
    assert!(
        !correspondences.is_empty(),
        "cannot compute the energy of a pose without correspondences"
    );
    let log_floor = energy_floor.ln();
    let total: f64 = correspondences
        .iter()
        .map(|&Correspondence { pixel, .. }| {
            let (camera, prediction) = frame.observation(pixel);
            let world = pose.transform(camera);
            let (ix, log_score) = prediction.best_mode(&world).unwrap_or_else(|| {
                panic!("no mode of pixel {} can score {:?}", pixel, world);
            });
            let support = prediction.modes()[ix].support;
            assert!(support > 0, "mode {} of pixel {} has no support", ix, pixel);
            let normalised =
                log_score - (prediction.len() as f64).ln() - f64::from(support).ln();
            -normalised.max(log_floor) / LN_10
        })
        .sum();
    total / correspondences.len() as f64
}

/// Computes the energy of every candidate.
pub fn score_candidates(
    candidates: &mut [PoseCandidate],
    frame: &PredictedFrame,
    energy_floor: f64,
) {
    let score = |candidate: &mut PoseCandidate| {
        candidate.energy = pose_energy(
            candidate.pose,
            &candidate.correspondences,
            frame,
            energy_floor,
        );
    };
    #[cfg(not(feature = "rayon"))]
    {
        candidates.iter_mut().for_each(score);
    }
    #[cfg(feature = "rayon")]
    {
        candidates.par_iter_mut().for_each(score);
    }
}

/// Sorts candidates by ascending energy. Candidates with equal energy keep their order.
pub fn sort_candidates(candidates: &mut [PoseCandidate]) {
    candidates.sort_by_key(|candidate| FloatOrd(candidate.energy));
}
