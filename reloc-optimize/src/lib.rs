//! Continuous refinement of pose candidates.
//!
//! A [`reloc_core::PoseCandidate`] coming out of hypothesis generation was solved from just a
//! minimal set of correspondences. Once preemptive RANSAC has sampled more pixels for it,
//! [`PoseRefiner`] can pull the pose towards every mode those pixels agree with. The candidate's
//! correspondences are turned into [`Anchor`]s against its current pose, then Levenberg-Marquardt
//! optimizes a twist applied on top of that pose.

mod pose_problem;
mod refiner;

pub use pose_problem::*;
pub use refiner::*;
