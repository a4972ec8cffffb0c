use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::{Error, SimResult};

/// A decoded thumbnail as handed over by the thumbnail collaborator or read back from storage.
/// It has not been validated yet; convert it into a [`Miniature`] to use it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB samples, three per pixel.
    pub samples: Vec<u8>,
}

/// A small RGB image (typically 32x32) used as the unit of comparison.
///
/// Pixels are addressed by their flat index `y * width + x`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Miniature {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl Miniature {
    /// Create a miniature from row-major RGB samples.
    /// # Errors
    /// Returns `Err` if either dimension is zero, or if `samples` does not hold exactly
    /// `width * height * 3` values.
    pub fn new(width: u32, height: u32, samples: Vec<u8>) -> SimResult<Self> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage);
        }

        let expected = width as usize * height as usize * 3;
        if samples.len() != expected {
            return Err(Error::BufferSize {
                width,
                height,
                expected,
                actual: samples.len(),
            });
        }

        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Create a miniature from a sequence of `[r, g, b]` pixels in raster order.
    /// # Errors
    /// See [`Miniature::new`].
    pub fn from_pixels(
        width: u32,
        height: u32,
        pixels: impl IntoIterator<Item = [u8; 3]>,
    ) -> SimResult<Self> {
        let samples = pixels.into_iter().flatten().collect::<Vec<_>>();
        Self::new(width, height, samples)
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The number of pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len() / 3
    }

    /// The raw row-major RGB samples.
    #[must_use]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    #[must_use]
    pub fn pixel(&self, index: usize) -> [u8; 3] {
        let s = &self.samples[index * 3..index * 3 + 3];
        [s[0], s[1], s[2]]
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.samples.chunks_exact(3).map(|s| [s[0], s[1], s[2]])
    }

    /// The (x, y) position of a flat pixel index.
    #[must_use]
    pub const fn coords(&self, index: usize) -> (u32, u32) {
        let width = self.width as usize;
        ((index % width) as u32, (index / width) as u32)
    }

    /// The mean of every sample of every channel, floored. Used as the coarse bucketing key
    /// when searching for similar miniatures.
    #[must_use]
    pub fn global_intensity(&self) -> u32 {
        let total = self.samples.iter().map(|&s| u64::from(s)).sum::<u64>();
        (total / self.samples.len() as u64) as u32
    }

    #[must_use]
    pub fn into_raw(self) -> RawImage {
        RawImage {
            width: self.width,
            height: self.height,
            samples: self.samples,
        }
    }
}

impl TryFrom<RawImage> for Miniature {
    type Error = Error;

    fn try_from(raw: RawImage) -> Result<Self, Self::Error> {
        Self::new(raw.width, raw.height, raw.samples)
    }
}

impl TryFrom<RgbImage> for Miniature {
    type Error = Error;

    fn try_from(img: RgbImage) -> Result<Self, Self::Error> {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }
}

//Utilities for testing
#[doc(hidden)]
pub mod test_util {
    use std::cmp::Ordering;

    use rand::prelude::*;

    use super::Miniature;

    #[doc(hidden)]
    impl Miniature {
        #[must_use]
        pub fn uniform(width: u32, height: u32, colour: [u8; 3]) -> Self {
            let n = width as usize * height as usize;
            Self::from_pixels(width, height, std::iter::repeat(colour).take(n))
                .expect("uniform dimensions are nonzero")
        }

        /// A miniature where every sample is drawn uniformly from `lo..=hi`.
        #[must_use]
        pub fn random_miniature(width: u32, height: u32, lo: u8, hi: u8, rng: &mut StdRng) -> Self {
            let n = width as usize * height as usize * 3;
            let samples = (0..n).map(|_| rng.gen_range(lo..=hi)).collect();
            Self::new(width, height, samples).expect("random dimensions are nonzero")
        }

        /// Total absolute sample difference between two miniatures of the same dimensions.
        #[must_use]
        pub fn sample_distance(&self, other: &Self) -> u64 {
            self.samples
                .iter()
                .zip(other.samples.iter())
                .map(|(a, b)| u64::from(a.abs_diff(*b)))
                .sum()
        }

        /// Nudge random samples away from their starting value until the total absolute
        /// sample difference from `self` is exactly `target_distance`.
        #[must_use]
        pub fn with_sample_distance(&self, target_distance: u64, rng: &mut StdRng) -> Self {
            let mut ret = self.clone();
            let mut curr_distance = 0;
            while curr_distance < target_distance {
                let idx = rng.gen_range(0..ret.samples.len());
                let (orig, curr) = (self.samples[idx], ret.samples[idx]);

                //only ever move a sample further from where it started, so each step adds exactly 1.
                let next = match curr.cmp(&orig) {
                    Ordering::Greater => curr.checked_add(1),
                    Ordering::Less => curr.checked_sub(1),
                    Ordering::Equal if curr == u8::MAX || (curr > 0 && rng.gen_bool(0.5)) => {
                        curr.checked_sub(1)
                    }
                    Ordering::Equal => curr.checked_add(1),
                };

                if let Some(next) = next {
                    ret.samples[idx] = next;
                    curr_distance += 1;
                }
            }
            assert_eq!(self.sample_distance(&ret), target_distance);
            ret
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Miniature, RawImage};
    use crate::Error;

    #[test]
    fn test_buffer_length_mismatch() {
        let res = Miniature::new(2, 2, vec![0; 11]);
        assert_eq!(
            res,
            Err(Error::BufferSize {
                width: 2,
                height: 2,
                expected: 12,
                actual: 11
            })
        );
    }

    #[test]
    fn test_empty_image() {
        assert_eq!(Miniature::new(0, 4, vec![]), Err(Error::EmptyImage));
    }

    #[test]
    fn test_coords_and_pixels() {
        #[rustfmt::skip]
        let pixen = [
            [1, 2, 3], [4, 5, 6], [7, 8, 9],
            [10, 11, 12], [13, 14, 15], [16, 17, 18],
        ];
        let mini = Miniature::from_pixels(3, 2, pixen).unwrap();
        assert_eq!(mini.len(), 6);
        assert_eq!(mini.coords(4), (1, 1));
        assert_eq!(mini.pixel(4), [13, 14, 15]);
        assert_eq!(mini.pixels().count(), 6);
    }

    #[test]
    fn test_global_intensity_is_floored_mean() {
        let mini = Miniature::from_pixels(2, 1, [[0, 0, 1], [0, 0, 0]]).unwrap();
        assert_eq!(mini.global_intensity(), 0);

        let mini = Miniature::uniform(4, 4, [10, 20, 30]);
        assert_eq!(mini.global_intensity(), 20);
    }

    #[test]
    fn test_raw_round_trip() {
        let raw = RawImage {
            width: 1,
            height: 2,
            samples: vec![1, 2, 3, 4, 5, 6],
        };
        let mini = Miniature::try_from(raw.clone()).unwrap();
        assert_eq!(mini.into_raw(), raw);
    }

    #[test]
    fn test_from_rgb_image() {
        let img = image::RgbImage::from_pixel(3, 3, image::Rgb([9, 8, 7]));
        let mini = Miniature::try_from(img).unwrap();
        assert_eq!(mini.dimensions(), (3, 3));
        assert_eq!(mini.pixel(8), [9, 8, 7]);
    }
}
