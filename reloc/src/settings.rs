use crate::RelocError;
use reloc_optimize::{PoseRefiner, ResidualForm};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The settings for a relocalisation attempt.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RelocSettings {
    /// The number of correspondences each pose hypothesis is solved from
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_minimal_set_size")
    )]
    pub minimal_set_size: usize,
    /// Draw any mode of a sampled pixel rather than always its first one
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_use_all_modes"))]
    pub use_all_modes: bool,
    /// The per-channel colour difference allowed between the first pixel of a hypothesis and its mode
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_colour_tolerance")
    )]
    pub colour_tolerance: u8,
    /// Require the modes of a hypothesis to be at least `min_mode_separation` apart in world space
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_check_mode_separation")
    )]
    pub check_mode_separation: bool,
    /// The minimum distance between the points of a hypothesis
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_min_mode_separation")
    )]
    pub min_mode_separation: f64,
    /// Require the camera space distances of a hypothesis to match its world space distances
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_check_rigidity")
    )]
    pub check_rigidity: bool,
    /// Twice the difference allowed between a camera space and a world space distance
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_max_translation_error")
    )]
    pub max_translation_error: f64,
    /// The number of pixels drawn while assembling one hypothesis before starting over
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_max_sample_iterations")
    )]
    pub max_sample_iterations: usize,
    /// The number of times a hypothesis is started over before the trial gives up
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_max_hypothesis_retries")
    )]
    pub max_hypothesis_retries: usize,
    /// The number of hypothesis generation trials
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_initial_candidates")
    )]
    pub initial_candidates: usize,
    /// The pool is cut down to this many candidates after a first scoring when it is larger.
    /// Must be positive.
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_trim_threshold")
    )]
    pub trim_threshold: usize,
    /// The number of pixels sampled to score the candidates each round
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_batch_size"))]
    pub batch_size: usize,
    /// The number of draws spent on one pixel of a batch before the batch is cut short
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_pixel_sample_attempts")
    )]
    pub pixel_sample_attempts: usize,
    /// The smallest normalised score a correspondence can contribute
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_energy_floor"))]
    pub energy_floor: f64,
    /// Refine every candidate each round before scoring
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_refine_poses"))]
    pub refine_poses: bool,
    /// The residual minimized by refinement
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_refine_residual")
    )]
    pub refine_residual: ResidualForm,
    /// Correspondences further than this from their mode are left out of refinement
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_refine_inlier_radius")
    )]
    pub refine_inlier_radius: f64,
    /// The patience of the Levenberg-Marquardt solver used for refinement
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_refine_patience")
    )]
    pub refine_patience: usize,
    /// Seeds every random generator of an attempt
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_seed"))]
    pub seed: u64,
}

impl RelocSettings {
    /// Checks that the settings describe a runnable attempt.
    pub fn validate(&self) -> Result<(), RelocError> {
        let non_negative = |n: f64| n.is_finite() && n >= 0.0;
        if self.minimal_set_size < 3 {
            return Err(RelocError::InvalidSettings(
                "minimal_set_size must be at least 3",
            ));
        }
        if self.batch_size == 0 {
            return Err(RelocError::InvalidSettings("batch_size must be positive"));
        }
        if self.trim_threshold == 0 {
            return Err(RelocError::InvalidSettings(
                "trim_threshold must be positive",
            ));
        }
        if self.initial_candidates == 0 {
            return Err(RelocError::InvalidSettings(
                "initial_candidates must be positive",
            ));
        }
        if !non_negative(self.min_mode_separation) {
            return Err(RelocError::InvalidSettings(
                "min_mode_separation must be finite and non-negative",
            ));
        }
        if !non_negative(self.max_translation_error) {
            return Err(RelocError::InvalidSettings(
                "max_translation_error must be finite and non-negative",
            ));
        }
        if !non_negative(self.refine_inlier_radius) {
            return Err(RelocError::InvalidSettings(
                "refine_inlier_radius must be finite and non-negative",
            ));
        }
        if !(self.energy_floor.is_finite() && self.energy_floor > 0.0) {
            return Err(RelocError::InvalidSettings(
                "energy_floor must be finite and positive",
            ));
        }
        Ok(())
    }

    /// The refiner used when `refine_poses` is set.
    pub fn refiner(&self) -> PoseRefiner {
        PoseRefiner::new()
            .residual(self.refine_residual)
            .inlier_radius(self.refine_inlier_radius)
            .patience(self.refine_patience)
    }
}

impl Default for RelocSettings {
    fn default() -> Self {
        Self {
            minimal_set_size: default_minimal_set_size(),
            use_all_modes: default_use_all_modes(),
            colour_tolerance: default_colour_tolerance(),
            check_mode_separation: default_check_mode_separation(),
            min_mode_separation: default_min_mode_separation(),
            check_rigidity: default_check_rigidity(),
            max_translation_error: default_max_translation_error(),
            max_sample_iterations: default_max_sample_iterations(),
            max_hypothesis_retries: default_max_hypothesis_retries(),
            initial_candidates: default_initial_candidates(),
            trim_threshold: default_trim_threshold(),
            batch_size: default_batch_size(),
            pixel_sample_attempts: default_pixel_sample_attempts(),
            energy_floor: default_energy_floor(),
            refine_poses: default_refine_poses(),
            refine_residual: default_refine_residual(),
            refine_inlier_radius: default_refine_inlier_radius(),
            refine_patience: default_refine_patience(),
            seed: default_seed(),
        }
    }
}

fn default_minimal_set_size() -> usize {
    3
}

fn default_use_all_modes() -> bool {
    true
}

fn default_colour_tolerance() -> u8 {
    30
}

fn default_check_mode_separation() -> bool {
    true
}

fn default_min_mode_separation() -> f64 {
    0.3
}

fn default_check_rigidity() -> bool {
    false
}

fn default_max_translation_error() -> f64 {
    0.05
}

fn default_max_sample_iterations() -> usize {
    6000
}

fn default_max_hypothesis_retries() -> usize {
    20
}

fn default_initial_candidates() -> usize {
    1024
}

fn default_trim_threshold() -> usize {
    64
}

fn default_batch_size() -> usize {
    500
}

fn default_pixel_sample_attempts() -> usize {
    50
}

fn default_energy_floor() -> f64 {
    1e-6
}

fn default_refine_poses() -> bool {
    false
}

fn default_refine_residual() -> ResidualForm {
    ResidualForm::Mahalanobis
}

fn default_refine_inlier_radius() -> f64 {
    0.2
}

fn default_refine_patience() -> usize {
    100
}

fn default_seed() -> u64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(RelocSettings::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_unrunnable_settings() {
        let settings = RelocSettings {
            minimal_set_size: 2,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(RelocError::InvalidSettings(_))
        ));
        let settings = RelocSettings {
            min_mode_separation: f64::NAN,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
        let settings = RelocSettings {
            energy_floor: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_a_trim_to_nothing() {
        let settings = RelocSettings {
            trim_threshold: 0,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(RelocError::InvalidSettings("trim_threshold must be positive"))
        );
        let settings = RelocSettings {
            trim_threshold: 1,
            ..Default::default()
        };
        assert_eq!(settings.validate(), Ok(()));
    }
}
