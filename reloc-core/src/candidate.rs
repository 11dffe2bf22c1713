use crate::CameraToWorld;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Pairs a sampled pixel with the mode chosen for it.
///
/// Correspondences that were sampled only to score candidates have no mode. Their mode is
/// picked against the candidate pose every time it is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Correspondence {
    /// The linear pixel index.
    pub pixel: usize,
    /// The index of the mode within the pixel's prediction.
    pub mode: Option<usize>,
}

impl Correspondence {
    /// A correspondence with a fixed mode, as used to build a hypothesis.
    pub fn resolved(pixel: usize, mode: usize) -> Self {
        Self {
            pixel,
            mode: Some(mode),
        }
    }

    /// A correspondence whose mode is chosen during scoring.
    pub fn pending(pixel: usize) -> Self {
        Self { pixel, mode: None }
    }
}

/// A pose hypothesis competing in preemptive RANSAC.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PoseCandidate {
    /// Identifies the hypothesis generation trial that produced the candidate.
    pub id: usize,
    pub pose: CameraToWorld,
    pub correspondences: Vec<Correspondence>,
    /// Lower is better.
    pub energy: f64,
}

impl PoseCandidate {
    pub fn new(id: usize, pose: CameraToWorld, correspondences: Vec<Correspondence>) -> Self {
        Self {
            id,
            pose,
            correspondences,
            energy: 0.0,
        }
    }
}
