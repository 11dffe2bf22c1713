use crate::FrameError;
use core::ops::Index;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A dense row-major buffer holding one `T` for every pixel of a `width x height` frame.
///
/// Pixels are addressed either by `(x, y)` or by their linear index `y * width + x`.
/// Correspondences store the linear index.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct DenseImage<T> {
    width: usize,
    height: usize,
    pixels: Vec<T>,
}

impl<T> DenseImage<T> {
    /// Wraps an existing row-major buffer.
    pub fn new(width: usize, height: usize, pixels: Vec<T>) -> Result<Self, FrameError> {
        let expected = width * height;
        if pixels.len() != expected {
            return Err(FrameError::BufferSize {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds the image by calling `f(x, y)` for every pixel in row-major order.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// The number of pixels.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Converts `(x, y)` into a linear pixel index.
    #[inline(always)]
    pub fn linear_index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Converts a linear pixel index back into `(x, y)`.
    #[inline(always)]
    pub fn coordinates(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x < self.width && y < self.height {
            self.pixels.get(self.linear_index(x, y))
        } else {
            None
        }
    }

    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + Clone + '_ {
        self.pixels.iter()
    }
}

impl<T> Index<usize> for DenseImage<T> {
    type Output = T;

    #[inline(always)]
    fn index(&self, index: usize) -> &T {
        &self.pixels[index]
    }
}
