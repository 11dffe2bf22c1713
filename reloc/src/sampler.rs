use log::*;
use rand::Rng;
use reloc_core::{Correspondence, PredictedFrame};

/// Draws usable pixels to score pose candidates with.
#[derive(Debug, Clone, Copy)]
pub struct PixelSampler<'a> {
    frame: &'a PredictedFrame,
    attempts: usize,
}

impl<'a> PixelSampler<'a> {
    /// `attempts` is the number of draws spent on one slot of a batch before giving up on the
    /// rest of the batch.
    pub fn new(frame: &'a PredictedFrame, attempts: usize) -> Self {
        Self { frame, attempts }
    }

    /// Draws up to `count` usable pixels. The same pixel may come up more than once.
    pub fn sample_with_replacement(
        &self,
        rng: &mut impl Rng,
        count: usize,
    ) -> Vec<Correspondence> {
        self.sample(rng, count, None)
    }

    /// Draws up to `count` usable pixels whose flag in `marker` is unset, setting it.
    ///
    /// Keeping the marker across rounds means no pixel is ever sampled twice in one attempt.
    pub fn sample_unmarked(
        &self,
        rng: &mut impl Rng,
        count: usize,
        marker: &mut [bool],
    ) -> Vec<Correspondence> {
        assert_eq!(
            marker.len(),
            self.frame.len(),
            "marker must have one flag per pixel"
        );
        self.sample(rng, count, Some(marker))
    }

    fn sample(
        &self,
        rng: &mut impl Rng,
        count: usize,
        mut marker: Option<&mut [bool]>,
    ) -> Vec<Correspondence> {
        let mut samples = Vec::with_capacity(count);
        if self.frame.is_empty() {
            return samples;
        }
        for _ in 0..count {
            let found = (0..self.attempts)
                .map(|_| rng.gen_range(0..self.frame.len()))
                .find(|&pixel| {
                    self.frame.is_usable(pixel)
                        && marker.as_ref().map_or(true, |marker| !marker[pixel])
                });
            match found {
                Some(pixel) => {
                    if let Some(marker) = marker.as_mut() {
                        marker[pixel] = true;
                    }
                    samples.push(Correspondence::pending(pixel));
                }
                None => {
                    warn!(
                        "could not sample a usable pixel, returning {}/{}",
                        samples.len(),
                        count
                    );
                    break;
                }
            }
        }
        samples
    }
}
