use crate::RelocSettings;
use kabsch::Kabsch;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use reloc_core::{
    colours_agree, nalgebra::Point3, Correspondence, PointMatch, PoseCandidate, PredictedFrame,
};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// One point of a hypothesis under construction.
#[derive(Debug, Clone, Copy)]
struct Pick {
    pixel: usize,
    mode: usize,
    camera: Point3<f64>,
    world: Point3<f64>,
}

/// Builds pose hypotheses from random minimal sets of pixel to mode correspondences.
#[derive(Debug, Clone, Copy)]
pub struct HypothesisGenerator<'a> {
    frame: &'a PredictedFrame,
    settings: &'a RelocSettings,
    kabsch: Kabsch,
}

impl<'a> HypothesisGenerator<'a> {
    pub fn new(frame: &'a PredictedFrame, settings: &'a RelocSettings) -> Self {
        Self {
            frame,
            settings,
            kabsch: Kabsch::new(),
        }
    }

    /// Tries to produce a candidate, starting over up to `max_hypothesis_retries` times.
    ///
    /// Returns `None` if every try ran out of draws or gave a degenerate alignment.
    pub fn generate(&self, id: usize, rng: &mut impl Rng) -> Option<PoseCandidate> {
        if self.frame.is_empty() {
            return None;
        }
        (0..self.settings.max_hypothesis_retries).find_map(|_| {
            let picks = self.pick_minimal_set(&mut *rng)?;
            let pose = self.kabsch.align(
                picks
                    .iter()
                    .map(|pick| PointMatch(pick.camera, pick.world)),
            )?;
            let correspondences = picks
                .iter()
                .map(|pick| Correspondence::resolved(pick.pixel, pick.mode))
                .collect();
            Some(PoseCandidate::new(id, pose, correspondences))
        })
    }

    fn pick_minimal_set(&self, rng: &mut impl Rng) -> Option<Vec<Pick>> {
        let settings = self.settings;
        let mut picks: Vec<Pick> = Vec::with_capacity(settings.minimal_set_size);
        for _ in 0..settings.max_sample_iterations {
            if picks.len() == settings.minimal_set_size {
                break;
            }
            let pixel = rng.gen_range(0..self.frame.len());
            if !self.frame.is_usable(pixel) {
                continue;
            }
            let feature = self.frame.feature(pixel);
            let camera = match feature.position {
                Some(camera) => camera,
                None => continue,
            };
            let prediction = self.frame.prediction(pixel);
            let mode = if settings.use_all_modes {
                rng.gen_range(0..prediction.len())
            } else {
                0
            };
            let chosen = &prediction.modes()[mode];

            // Only the first point is checked for colour.
            if picks.is_empty()
                && !colours_agree(feature.colour, chosen.colour, settings.colour_tolerance)
            {
                continue;
            }
            let candidate = Pick {
                pixel,
                mode,
                camera,
                world: chosen.position,
            };
            if settings.check_mode_separation && !self.separated(&picks, &candidate) {
                continue;
            }
            if settings.check_rigidity && !self.rigid(&picks, &candidate) {
                continue;
            }
            picks.push(candidate);
        }
        if picks.len() == settings.minimal_set_size {
            Some(picks)
        } else {
            None
        }
    }

    fn separated(&self, picks: &[Pick], candidate: &Pick) -> bool {
        picks.iter().all(|pick| {
            (pick.world - candidate.world).norm() >= self.settings.min_mode_separation
        })
    }

    /// A rigid motion preserves distances, so the camera and world distances to every point
    /// already picked must agree.
    fn rigid(&self, picks: &[Pick], candidate: &Pick) -> bool {
        let tolerance = 0.5 * self.settings.max_translation_error;
        picks.iter().all(|pick| {
            let camera = (pick.camera - candidate.camera).norm();
            let world = (pick.world - candidate.world).norm();
            camera >= self.settings.min_mode_separation && (camera - world).abs() <= tolerance
        })
    }
}

/// Runs `initial_candidates` independent generation trials.
///
/// Trial `i` draws from its own generator seeded with `seed + 1 + i`, so the result is the same
/// whether or not the trials run in parallel. Candidates come back in trial order.
pub fn generate_candidates(
    frame: &PredictedFrame,
    settings: &RelocSettings,
) -> Vec<PoseCandidate> {
    let generator = HypothesisGenerator::new(frame, settings);
    let trial = |id: usize| {
        let mut rng = Pcg64::seed_from_u64(settings.seed.wrapping_add(1 + id as u64));
        generator.generate(id, &mut rng)
    };
    #[cfg(not(feature = "rayon"))]
    {
        (0..settings.initial_candidates).filter_map(trial).collect()
    }
    #[cfg(feature = "rayon")]
    {
        (0..settings.initial_candidates)
            .into_par_iter()
            .filter_map(trial)
            .collect()
    }
}
