use crate::{
    generate_candidates, score_candidates, sort_candidates, PixelSampler, RelocError,
    RelocSettings,
};
use log::*;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use reloc_core::{
    CameraToWorld, Correspondence, DenseImage, PatchFeature, PoseCandidate, PredictedFrame,
    Prediction,
};
use reloc_optimize::PoseRefiner;
use std::time::Instant;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The outcome of a successful relocalisation attempt.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Relocalisation {
    /// The sole survivor of preemptive RANSAC.
    pub candidate: PoseCandidate,
    /// The number of candidates hypothesis generation produced.
    pub initial_candidates: usize,
    /// The size of the pool after generation (and trimming), then after each round.
    pub pool_sizes: Vec<usize>,
}

impl Relocalisation {
    pub fn pose(&self) -> CameraToWorld {
        self.candidate.pose
    }
}

/// Estimates the camera pose of a frame by preemptive RANSAC.
///
/// Many candidates are generated from minimal sets, then each round every surviving candidate is
/// scored against a fresh batch of pixels and the worse half is discarded, until one is left.
#[derive(Debug, Clone)]
pub struct PreemptiveRansac {
    settings: RelocSettings,
    refiner: PoseRefiner,
}

impl PreemptiveRansac {
    pub fn new(settings: RelocSettings) -> Result<Self, RelocError> {
        settings.validate()?;
        Ok(Self {
            settings,
            refiner: settings.refiner(),
        })
    }

    pub fn settings(&self) -> &RelocSettings {
        &self.settings
    }

    /// Wraps the images into a frame and runs [`PreemptiveRansac::estimate_pose`].
    pub fn estimate_pose_from_images(
        &self,
        features: DenseImage<PatchFeature>,
        predictions: DenseImage<Prediction>,
    ) -> Result<Relocalisation, RelocError> {
        self.estimate_pose(&PredictedFrame::new(features, predictions)?)
    }

    /// Runs one relocalisation attempt.
    ///
    /// The same frame and settings always give the same result.
    pub fn estimate_pose(&self, frame: &PredictedFrame) -> Result<Relocalisation, RelocError> {
        let settings = &self.settings;
        let valid = frame.valid_features();
        let required = settings.minimal_set_size.max(settings.batch_size);
        if valid < required {
            return Err(RelocError::InsufficientData { valid, required });
        }

        let start = Instant::now();
        let mut candidates = generate_candidates(frame, settings);
        candidates.retain(|candidate| !candidate.correspondences.is_empty());
        let initial_candidates = candidates.len();
        info!(
            "generated {} of {} initial candidates",
            initial_candidates, settings.initial_candidates
        );
        debug!("candidate generation took {:?}", start.elapsed());
        if candidates.is_empty() {
            return Err(RelocError::NoPoseFound);
        }

        let mut rng = Pcg64::seed_from_u64(settings.seed);
        let sampler = PixelSampler::new(frame, settings.pixel_sample_attempts);

        if candidates.len() > settings.trim_threshold {
            let start = Instant::now();
            let set_size = candidates[0].correspondences.len();
            let samples = sampler.sample_with_replacement(&mut rng, settings.batch_size);
            append_samples(&mut candidates, &samples);
            score_candidates(&mut candidates, frame, settings.energy_floor);
            sort_candidates(&mut candidates);
            candidates.truncate(settings.trim_threshold);
            // The trim batch only ranks the candidates, it does not stay with them.
            if settings.trim_threshold > 1 {
                for candidate in &mut candidates {
                    candidate.correspondences.truncate(set_size);
                }
            }
            debug!(
                "trimmed to {} candidates in {:?}",
                candidates.len(),
                start.elapsed()
            );
        }

        let mut pool_sizes = vec![candidates.len()];
        let mut marker = vec![false; frame.len()];
        while candidates.len() > 1 {
            let start = Instant::now();
            let samples = sampler.sample_unmarked(&mut rng, settings.batch_size, &mut marker);
            append_samples(&mut candidates, &samples);
            if settings.refine_poses {
                let refined = self.refine(&mut candidates, frame);
                debug!("refined {}/{} candidates", refined, candidates.len());
            }
            score_candidates(&mut candidates, frame, settings.energy_floor);
            sort_candidates(&mut candidates);
            candidates.truncate(candidates.len() / 2);
            pool_sizes.push(candidates.len());
            debug!(
                "round {} kept {} candidates in {:?}",
                pool_sizes.len() - 1,
                candidates.len(),
                start.elapsed()
            );
        }

        let candidate = candidates.pop().ok_or(RelocError::NoPoseFound)?;
        info!(
            "relocalised with candidate {} at energy {}: {:?}",
            candidate.id,
            candidate.energy,
            candidate.pose.0.translation.vector
        );
        Ok(Relocalisation {
            candidate,
            initial_candidates,
            pool_sizes,
        })
    }

    /// Refines every candidate, returning how many of them moved.
    fn refine(&self, candidates: &mut [PoseCandidate], frame: &PredictedFrame) -> usize {
        #[cfg(not(feature = "rayon"))]
        {
            candidates
                .iter_mut()
                .map(|candidate| self.refiner.refine(candidate, frame))
                .filter(|&refined| refined)
                .count()
        }
        #[cfg(feature = "rayon")]
        {
            candidates
                .par_iter_mut()
                .map(|candidate| self.refiner.refine(candidate, frame))
                .filter(|&refined| refined)
                .count()
        }
    }
}

/// Appends the sampled pixels to every candidate.
fn append_samples(candidates: &mut [PoseCandidate], samples: &[Correspondence]) {
    #[cfg(not(feature = "rayon"))]
    {
        for candidate in candidates {
            candidate.correspondences.extend_from_slice(samples);
        }
    }
    #[cfg(feature = "rayon")]
    {
        candidates
            .par_iter_mut()
            .for_each(|candidate| candidate.correspondences.extend_from_slice(samples));
    }
}
