use nalgebra::Point3;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// An 8-bit RGB colour.
pub type Colour = [u8; 3];

/// The per-pixel output of the RGB-D patch feature extractor that relocalisation consumes.
///
/// Pixels without a usable depth reading have no `position` and can never take part in a
/// correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PatchFeature {
    /// The back-projected point in camera space.
    pub position: Option<Point3<f64>>,
    /// The colour observed at the pixel.
    pub colour: Colour,
}

impl PatchFeature {
    pub fn new(position: Point3<f64>, colour: Colour) -> Self {
        Self {
            position: Some(position),
            colour,
        }
    }

    /// A pixel with no valid depth.
    pub fn invalid() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        self.position.is_some()
    }
}

/// Checks that every channel of `a` is within `tolerance` of the same channel of `b`.
#[inline]
pub fn colours_agree(a: Colour, b: Colour, tolerance: u8) -> bool {
    a.iter()
        .zip(b.iter())
        .all(|(&a, &b)| (i16::from(a) - i16::from(b)).unsigned_abs() <= u16::from(tolerance))
}
