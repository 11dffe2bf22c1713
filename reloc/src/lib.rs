//! # Relocalisation
//!
//! Recovers the pose of an RGB-D camera from a single frame once dense tracking has been lost.
//!
//! Every pixel of a [`reloc_core::PredictedFrame`] carries the camera space point seen by the
//! depth sensor and the world space modes a regression forest predicts for it. Any three pixels
//! with the right modes pin down the camera pose, so [`PreemptiveRansac`] builds many hypotheses
//! from random minimal sets, then culls them in rounds:
//!
//! 1. Hypotheses are generated in independent, individually seeded trials.
//! 2. If there are more than `trim_threshold`, one batch of pixels ranks them and the rest are cut.
//! 3. Each round samples a new batch of pixels, scores every candidate against all the pixels it
//!    has seen so far, and keeps the better half.
//!
//! [`Relocaliser`] wraps this for use alongside a dense [`Tracker`]: when tracking fails, the
//! estimated pose is handed to the tracker and it gets to try again.
//!
//! An attempt is deterministic for a given frame and [`RelocSettings`], with or without the
//! `rayon` feature.

mod energy;
mod error;
mod hypothesis;
mod ransac;
mod relocaliser;
mod sampler;
mod settings;

pub use energy::*;
pub use error::*;
pub use hypothesis::*;
pub use ransac::*;
pub use relocaliser::*;
pub use sampler::*;
pub use settings::*;
