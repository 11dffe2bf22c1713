//! # Relocalisation core
//!
//! This library provides the shared types used by the crates that recover a camera pose from a
//! single RGB-D frame after dense tracking has been lost. The pose is not searched for by matching
//! against keyframes. Instead a regression forest has already been evaluated on every pixel of the
//! frame, and each pixel carries:
//!
//! * A [`PatchFeature`], the 3d point the depth sensor observed in camera space (if any) together
//!   with the colour of the pixel.
//! * A [`Prediction`], a handful of [`Mode`]s, each one a Gaussian guess of where that point lies in
//!   world space along with the number of training samples that supported it.
//!
//! Both buffers are packed into a [`PredictedFrame`] which stays immutable for a whole relocalisation
//! attempt, so it can be shared between threads without locks.
//!
//! A pose hypothesis is a [`PoseCandidate`]: a [`CameraToWorld`] transform and the list of
//! [`Correspondence`]s that were used to build and score it.
//!
//! ## Coordinate frames
//!
//! - `c` a point observed in camera space (from depth)
//! - `w` a mode mean in world space
//! - `T` the [`CameraToWorld`] pose of the camera
//!
//! ```text
//!            T
//!   c  ------------>  T * c  ~  w
//! camera            world
//! ```
//!
//! A perfect pose maps every camera point exactly onto the mean of one of the modes predicted for
//! its pixel. Noise, occluders and ambiguous predictions are what make the search hard.

mod candidate;
mod feature;
mod frame;
mod image;
mod matches;
mod pose;
mod prediction;
mod so3;

pub use candidate::*;
pub use feature::*;
pub use frame::*;
pub use image::*;
pub use matches::*;
pub use nalgebra;
pub use pose::*;
pub use prediction::*;
pub use sample_consensus;
pub use so3::*;
