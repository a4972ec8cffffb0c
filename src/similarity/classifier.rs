use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// The coarse description of a miniature used to decide which miniatures are worth comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct MiniatureSignature {
    /// Floored mean of every sample. See [`crate::Miniature::global_intensity`].
    pub gray: u32,
    /// Number of pixel groups kept by [`crate::GroupComputer::compute_groups`].
    pub nb_groups: usize,
}

/// Images sharing one intensity, bucketed by their pixel group count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NbGroupsClassifier {
    counts: Vec<usize>,
    buckets: Vec<Vec<usize>>,
}

impl NbGroupsClassifier {
    /// Bucket `indices` (positions in `signatures`) by group count. Counts are sorted ascending
    /// and each bucket keeps its indices in input order.
    #[must_use]
    pub fn classify(signatures: &[MiniatureSignature], indices: &[usize]) -> Self {
        let mut by_count = BTreeMap::<usize, Vec<usize>>::new();
        for &idx in indices {
            by_count.entry(signatures[idx].nb_groups).or_default().push(idx);
        }

        let (counts, buckets) = by_count.into_iter().unzip();
        Self { counts, buckets }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    #[must_use]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    #[must_use]
    pub fn bucket(&self, i: usize) -> &[usize] {
        &self.buckets[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> + '_ {
        self.counts
            .iter()
            .copied()
            .zip(self.buckets.iter().map(Vec::as_slice))
    }

    /// The range of bucket positions whose count lies within `tolerance` of `count`.
    #[must_use]
    pub fn count_window(&self, count: usize, tolerance: usize) -> Range<usize> {
        let lo = count.saturating_sub(tolerance);
        let hi = count.saturating_add(tolerance);
        let start = self.counts.partition_point(|&c| c < lo);
        let end = self.counts.partition_point(|&c| c <= hi);
        start..end
    }

    /// Total number of images over all buckets.
    #[must_use]
    pub fn nb_images(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
}

/// Images bucketed first by global intensity, then by group count.
///
/// For each intensity bucket `i`, `j_limit(i)` is one past the last bucket whose intensity is
/// still within `gray_dec` of bucket `i`, so only buckets `i < j < j_limit(i)` need to be
/// cross-compared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrayClassifier {
    grays: Vec<u32>,
    classifiers: Vec<NbGroupsClassifier>,
    j_limits: Vec<usize>,
    gray_dec: u32,
}

impl GrayClassifier {
    #[must_use]
    pub fn classify(signatures: &[MiniatureSignature], indices: &[usize], gray_dec: u32) -> Self {
        let mut by_gray = BTreeMap::<u32, Vec<usize>>::new();
        for &idx in indices {
            by_gray.entry(signatures[idx].gray).or_default().push(idx);
        }

        let (grays, classifiers): (Vec<_>, Vec<_>) = by_gray
            .into_iter()
            .map(|(gray, idxs)| (gray, NbGroupsClassifier::classify(signatures, &idxs)))
            .unzip();

        let j_limits = grays
            .iter()
            .map(|&gray| get_end_index(&grays, gray, gray_dec))
            .collect();

        Self {
            grays,
            classifiers,
            j_limits,
            gray_dec,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.grays.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grays.is_empty()
    }

    #[must_use]
    pub fn grays(&self) -> &[u32] {
        &self.grays
    }

    #[must_use]
    pub fn classifier(&self, i: usize) -> &NbGroupsClassifier {
        &self.classifiers[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &NbGroupsClassifier)> + '_ {
        self.grays.iter().copied().zip(self.classifiers.iter())
    }

    #[must_use]
    pub fn j_limit(&self, i: usize) -> usize {
        self.j_limits[i]
    }

    #[must_use]
    pub const fn gray_dec(&self) -> u32 {
        self.gray_dec
    }

    /// The range of bucket positions whose intensity lies within `gray_dec` of `gray`.
    #[must_use]
    pub fn window(&self, gray: u32) -> Range<usize> {
        let start = self
            .grays
            .partition_point(|&g| g < gray.saturating_sub(self.gray_dec));
        start..get_end_index(&self.grays, gray, self.gray_dec)
    }

    /// Lazily yield every pair of distinct intensity buckets `(i, j)`, `i < j`, that are within
    /// `gray_dec` of each other.
    pub fn cross_comparisons(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.len()).flat_map(move |i| (i + 1..self.j_limits[i]).map(move |j| (i, j)))
    }

    /// Lazily yield every `(self bucket, other bucket)` pair whose intensities are within
    /// `gray_dec` of each other. Used to compare new images against already checked ones.
    pub fn cross_comparisons_with<'a>(
        &'a self,
        other: &'a Self,
    ) -> impl Iterator<Item = (usize, usize)> + 'a {
        self.grays
            .iter()
            .enumerate()
            .flat_map(move |(i, &gray)| other.window(gray).map(move |j| (i, j)))
    }
}

//one past the last position in sorted `grays` whose value is at most `gray + gray_dec`.
fn get_end_index(grays: &[u32], gray: u32, gray_dec: u32) -> usize {
    let limit = gray.saturating_add(gray_dec);
    grays.partition_point(|&g| g <= limit)
}

/// The number of image pairs comparing two buckets of sizes `a` and `b` costs. When both
/// sides are the same bucket only unordered pairs of distinct images are counted.
#[must_use]
pub const fn compute_nb_couples(a: usize, b: usize, same_bucket: bool) -> usize {
    if same_bucket {
        a * a.saturating_sub(1) / 2
    } else {
        a * b
    }
}
