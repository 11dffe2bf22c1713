use crate::{DenseImage, PatchFeature, Prediction};
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("a {width}x{height} image needs {expected} pixels, but the buffer holds {actual}")]
    BufferSize {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },
    #[error("feature image is {features:?} but prediction image is {predictions:?}")]
    DimensionMismatch {
        features: (usize, usize),
        predictions: (usize, usize),
    },
}

/// The patch features and forest predictions of one RGB-D frame.
///
/// Both images have the same dimensions, so a linear pixel index addresses both.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedFrame {
    features: DenseImage<PatchFeature>,
    predictions: DenseImage<Prediction>,
}

impl PredictedFrame {
    pub fn new(
        features: DenseImage<PatchFeature>,
        predictions: DenseImage<Prediction>,
    ) -> Result<Self, FrameError> {
        if features.dimensions() != predictions.dimensions() {
            return Err(FrameError::DimensionMismatch {
                features: features.dimensions(),
                predictions: predictions.dimensions(),
            });
        }
        Ok(Self {
            features,
            predictions,
        })
    }

    pub fn features(&self) -> &DenseImage<PatchFeature> {
        &self.features
    }

    pub fn predictions(&self) -> &DenseImage<Prediction> {
        &self.predictions
    }

    pub fn width(&self) -> usize {
        self.features.width()
    }

    pub fn height(&self) -> usize {
        self.features.height()
    }

    /// The number of pixels in the frame.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[inline(always)]
    pub fn feature(&self, pixel: usize) -> &PatchFeature {
        &self.features[pixel]
    }

    #[inline(always)]
    pub fn prediction(&self, pixel: usize) -> &Prediction {
        &self.predictions[pixel]
    }

    /// The camera space point observed at the pixel, if its depth was valid.
    #[inline(always)]
    pub fn camera_point(&self, pixel: usize) -> Option<Point3<f64>> {
        self.features[pixel].position
    }

    /// A pixel can be sampled if it has a valid feature and at least one mode.
    #[inline(always)]
    pub fn is_usable(&self, pixel: usize) -> bool {
        self.features[pixel].is_valid() && !self.predictions[pixel].is_empty()
    }

    /// The camera point and prediction of a pixel that takes part in a correspondence.
    ///
    /// # Panics
    ///
    /// Correspondences are only ever built from usable pixels, so this panics if the pixel has no
    /// valid feature or no modes.
    pub fn observation(&self, pixel: usize) -> (Point3<f64>, &Prediction) {
        let camera = self.features[pixel]
            .position
            .unwrap_or_else(|| panic!("correspondence pixel {} has no valid feature", pixel));
        let prediction = &self.predictions[pixel];
        assert!(
            !prediction.is_empty(),
            "correspondence pixel {} has no modes",
            pixel
        );
        (camera, prediction)
    }

    /// The number of pixels with a valid depth reading.
    pub fn valid_features(&self) -> usize {
        self.features.iter().filter(|f| f.is_valid()).count()
    }
}
