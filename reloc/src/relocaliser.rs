use crate::{PreemptiveRansac, RelocError, RelocSettings};
use log::*;
use reloc_core::{CameraToWorld, PredictedFrame};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The quality the dense tracker reports for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum TrackingResult {
    Good,
    Poor,
    Failed,
}

/// The dense tracker a [`Relocaliser`] hands recovered poses to.
pub trait Tracker {
    /// Replaces the tracked camera pose.
    fn set_pose(&mut self, pose: CameraToWorld);

    /// Runs one tracking step from the current pose.
    fn track(&mut self) -> TrackingResult;
}

/// Relocalises the camera whenever tracking fails.
#[derive(Debug, Clone)]
pub struct Relocaliser {
    ransac: PreemptiveRansac,
}

impl Relocaliser {
    pub fn new(settings: RelocSettings) -> Result<Self, RelocError> {
        Ok(Self {
            ransac: PreemptiveRansac::new(settings)?,
        })
    }

    pub fn ransac(&self) -> &PreemptiveRansac {
        &self.ransac
    }

    /// Processes the tracking result of a frame.
    ///
    /// Anything but [`TrackingResult::Failed`] is passed through. On failure the pose is estimated
    /// from the frame, handed to the tracker, and the result of one more tracking step is returned.
    /// If no pose can be estimated the tracker is left alone and the frame stays failed.
    pub fn process<T>(
        &self,
        result: TrackingResult,
        frame: &PredictedFrame,
        tracker: &mut T,
    ) -> TrackingResult
    where
        T: Tracker + ?Sized,
    {
        if result != TrackingResult::Failed {
            return result;
        }
        match self.ransac.estimate_pose(frame) {
            Ok(relocalisation) => {
                tracker.set_pose(relocalisation.pose());
                let result = tracker.track();
                info!("tracking after relocalisation: {:?}", result);
                result
            }
            Err(e) => {
                warn!("relocalisation failed: {}", e);
                TrackingResult::Failed
            }
        }
    }
}
