use std::borrow::Cow;

use crate::definitions::{DistanceMetric, Normalizer};
use crate::Miniature;

/// Pixel data in the form the comparator measures distances on. Depending on the
/// [`Normalizer`] this either borrows the miniature's samples or owns transformed ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPixels<'a> {
    width: u32,
    height: u32,
    samples: Cow<'a, [u8]>,
}

impl NormalizedPixels<'_> {
    #[must_use]
    pub fn pixel(&self, index: usize) -> [u8; 3] {
        let s = &self.samples[index * 3..index * 3 + 3];
        [s[0], s[1], s[2]]
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn is_borrowed(&self) -> bool {
        matches!(self.samples, Cow::Borrowed(_))
    }
}

/// Decides whether two pixels are close enough to belong to the same pixel group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelComparator {
    radius: u32,
    normalizer: Normalizer,
    metric: DistanceMetric,
}

impl PixelComparator {
    #[must_use]
    pub const fn new(radius: u32, normalizer: Normalizer, metric: DistanceMetric) -> Self {
        Self {
            radius,
            normalizer,
            metric,
        }
    }

    #[must_use]
    pub const fn radius(&self) -> u32 {
        self.radius
    }

    #[must_use]
    pub const fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    #[must_use]
    pub const fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Apply the configured normalizer to a miniature.
    #[must_use]
    pub fn normalize_data<'a>(&self, mini: &'a Miniature) -> NormalizedPixels<'a> {
        let samples = match self.normalizer {
            Normalizer::None => Cow::Borrowed(mini.samples()),
            Normalizer::Smooth => Cow::Owned(box_mean(mini)),
            Normalizer::Gray => Cow::Owned(
                mini.pixels()
                    .flat_map(|[r, g, b]| {
                        let mean = ((u16::from(r) + u16::from(g) + u16::from(b) + 1) / 3) as u8;
                        [mean; 3]
                    })
                    .collect(),
            ),
        };

        NormalizedPixels {
            width: mini.width(),
            height: mini.height(),
            samples,
        }
    }

    #[must_use]
    pub fn distance(&self, p: [u8; 3], q: [u8; 3]) -> u32 {
        let diffs = p.iter().zip(q.iter()).map(|(a, b)| u32::from(a.abs_diff(*b)));
        match self.metric {
            DistanceMetric::Manhattan => diffs.sum(),
            DistanceMetric::Chebyshev => diffs.max().unwrap_or(0),
        }
    }

    /// Whether the pixels at two flat indices are within the comparator radius.
    /// Indices must be in range.
    #[must_use]
    pub fn pixels_are_close(&self, data: &NormalizedPixels, index_a: usize, index_b: usize) -> bool {
        self.distance(data.pixel(index_a), data.pixel(index_b)) <= self.radius
    }

    /// The representative colour of a set of pixels: the per-channel mean of the original
    /// (non-normalized) pixels. Kept as floating point; rounding is left to the reader.
    #[must_use]
    pub fn common_color(&self, mini: &Miniature, members: &[usize]) -> [f64; 3] {
        let mut sums = [0u64; 3];
        for &idx in members {
            for (sum, sample) in sums.iter_mut().zip(mini.pixel(idx)) {
                *sum += u64::from(sample);
            }
        }

        let n = members.len().max(1) as f64;
        sums.map(|s| s as f64 / n)
    }
}

//mean of the 3x3 neighbourhood of every pixel, using only the neighbours inside the image.
fn box_mean(mini: &Miniature) -> Vec<u8> {
    let (width, height) = (mini.width() as usize, mini.height() as usize);
    let samples = mini.samples();
    let mut ret = Vec::with_capacity(samples.len());

    for y in 0..height {
        let rows = y.saturating_sub(1)..=(y + 1).min(height - 1);
        for x in 0..width {
            let cols = x.saturating_sub(1)..=(x + 1).min(width - 1);
            let mut sums = [0u32; 3];
            let mut count = 0u32;
            for ny in rows.clone() {
                for nx in cols.clone() {
                    let base = (ny * width + nx) * 3;
                    for (c, sum) in sums.iter_mut().enumerate() {
                        *sum += u32::from(samples[base + c]);
                    }
                    count += 1;
                }
            }
            ret.extend(sums.map(|s| ((s + count / 2) / count) as u8));
        }
    }

    ret
}
