use std::collections::HashSet;

use bitvec::prelude::*;
use itertools::Itertools;
use log::trace;

use crate::definitions::{DENSE_CANDIDATE_LIMIT, PROGRESS_INTERVAL};
use crate::similarity::notifier::ProgressTicker;
use crate::{compute_nb_couples, GrayClassifier, MiniatureSignature, NbGroupsClassifier, Notifier};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Storage {
    Dense(BitVec),
    Sparse(HashSet<(u32, u32)>),
}

/// The set of image pairs worth scoring. Pairs are unordered and an image is never paired
/// with itself.
///
/// Small maps are an `n * n` bitmap addressed `i * n + j` with `i < j`. Above
/// [`DENSE_CANDIDATE_LIMIT`] images the bitmap would dominate memory use, so pairs are kept
/// in a hash set instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMap {
    n: usize,
    count: usize,
    storage: Storage,
}

impl CandidateMap {
    /// An empty map over `n` images, picking the representation from `n`.
    #[must_use]
    pub fn new(n: usize) -> Self {
        if n <= DENSE_CANDIDATE_LIMIT {
            Self::dense(n)
        } else {
            Self::sparse(n)
        }
    }

    #[must_use]
    pub fn dense(n: usize) -> Self {
        Self {
            n,
            count: 0,
            storage: Storage::Dense(bitvec![0; n * n]),
        }
    }

    #[must_use]
    pub fn sparse(n: usize) -> Self {
        Self {
            n,
            count: 0,
            storage: Storage::Sparse(HashSet::new()),
        }
    }

    #[must_use]
    pub const fn nb_images(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn is_dense(&self) -> bool {
        matches!(self.storage, Storage::Dense(_))
    }

    /// Mark the pair `(i, j)`. Returns false if it was already marked or if `i == j`.
    pub fn mark(&mut self, i: usize, j: usize) -> bool {
        debug_assert!(i < self.n && j < self.n);
        if i == j {
            return false;
        }

        let (lo, hi) = (i.min(j), i.max(j));
        let inserted = match &mut self.storage {
            Storage::Dense(bits) => {
                let idx = lo * self.n + hi;
                !bits.replace(idx, true)
            }
            Storage::Sparse(set) => set.insert((lo as u32, hi as u32)),
        };

        if inserted {
            self.count += 1;
        }
        inserted
    }

    #[must_use]
    pub fn contains(&self, i: usize, j: usize) -> bool {
        if i == j || i >= self.n || j >= self.n {
            return false;
        }

        let (lo, hi) = (i.min(j), i.max(j));
        match &self.storage {
            Storage::Dense(bits) => bits[lo * self.n + hi],
            Storage::Sparse(set) => set.contains(&(lo as u32, hi as u32)),
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Every marked pair as `(i, j)` with `i < j`, in ascending order.
    #[must_use]
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        match &self.storage {
            Storage::Dense(bits) => bits
                .iter_ones()
                .map(|idx| (idx / self.n, idx % self.n))
                .collect(),
            Storage::Sparse(set) => set
                .iter()
                .map(|&(i, j)| (i as usize, j as usize))
                .sorted_unstable()
                .collect(),
        }
    }
}

/// The outcome of candidate collection.
#[derive(Debug, Clone)]
pub struct Candidates {
    pub map: CandidateMap,
    /// Pairs the bucket scan visited, summed from bucket sizes. Only used for reporting.
    pub estimated: usize,
}

/// Collect every pair of images that might reach the similarity threshold.
///
/// `signatures` covers every image; `new` and `old` are positions into it. Pairs are taken
/// from three places:
/// * two new images in the same intensity bucket,
/// * two new images in different intensity buckets within `gray_dec` of each other,
/// * a new image and an old image whose intensities are within `gray_dec`.
///
/// In every case the group counts must also be within `max_group_count_delta`. Pairs of
/// two old images are never collected.
pub fn collect_candidates(
    signatures: &[MiniatureSignature],
    new: &[usize],
    old: &[usize],
    gray_dec: u32,
    max_group_count_delta: usize,
    notifier: &dyn Notifier,
) -> Candidates {
    let new_classifier = GrayClassifier::classify(signatures, new, gray_dec);
    let old_classifier = GrayClassifier::classify(signatures, old, gray_dec);
    trace!(
        "Classified {} new videos into {} intensity buckets, {} old videos into {}",
        new.len(),
        new_classifier.len(),
        old.len(),
        old_classifier.len()
    );

    let mut collector = Collector {
        map: CandidateMap::new(signatures.len()),
        estimated: 0,
        delta: max_group_count_delta,
    };

    let total = new_classifier.len()
        + new_classifier.cross_comparisons().count()
        + new_classifier
            .cross_comparisons_with(&old_classifier)
            .count();
    let mut ticker = ProgressTicker::new(notifier, "Collecting candidates", total, PROGRESS_INTERVAL);

    for (_, classifier) in new_classifier.iter() {
        collector.within(classifier);
        ticker.tick();
    }

    for (i, j) in new_classifier.cross_comparisons() {
        collector.between(new_classifier.classifier(i), new_classifier.classifier(j));
        ticker.tick();
    }

    for (i, j) in new_classifier.cross_comparisons_with(&old_classifier) {
        collector.between(new_classifier.classifier(i), old_classifier.classifier(j));
        ticker.tick();
    }
    ticker.finish();

    Candidates {
        map: collector.map,
        estimated: collector.estimated,
    }
}

struct Collector {
    map: CandidateMap,
    estimated: usize,
    delta: usize,
}

impl Collector {
    //pairs inside one intensity bucket: each count bucket with itself and with the larger
    //count buckets inside the tolerance.
    fn within(&mut self, classifier: &NbGroupsClassifier) {
        for (a, (count, bucket)) in classifier.iter().enumerate() {
            self.estimated += compute_nb_couples(bucket.len(), bucket.len(), true);
            for (&i, &j) in bucket.iter().tuple_combinations() {
                self.map.mark(i, j);
            }

            let window = classifier.count_window(count, self.delta);
            for b in (a + 1).max(window.start)..window.end {
                self.cross(bucket, classifier.bucket(b));
            }
        }
    }

    //pairs between two distinct intensity buckets.
    fn between(&mut self, lhs: &NbGroupsClassifier, rhs: &NbGroupsClassifier) {
        for (count, bucket) in lhs.iter() {
            for b in rhs.count_window(count, self.delta) {
                self.cross(bucket, rhs.bucket(b));
            }
        }
    }

    fn cross(&mut self, lhs: &[usize], rhs: &[usize]) {
        self.estimated += compute_nb_couples(lhs.len(), rhs.len(), false);
        for (&i, &j) in lhs.iter().cartesian_product(rhs) {
            self.map.mark(i, j);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::NullNotifier;

    fn sigs(raw: &[(u32, usize)]) -> Vec<MiniatureSignature> {
        raw.iter()
            .map(|&(gray, nb_groups)| MiniatureSignature { gray, nb_groups })
            .collect()
    }

    #[test]
    fn test_dense_and_sparse_agree() {
        let mut dense = CandidateMap::dense(10);
        let mut sparse = CandidateMap::sparse(10);
        for (i, j) in [(3, 1), (1, 3), (9, 0), (4, 4), (2, 7)] {
            assert_eq!(dense.mark(i, j), sparse.mark(i, j));
        }

        assert_eq!(dense.len(), 3);
        assert_eq!(dense.pairs(), vec![(0, 9), (1, 3), (2, 7)]);
        assert_eq!(dense.pairs(), sparse.pairs());
        assert!(sparse.contains(7, 2));
        assert!(!sparse.contains(4, 4));
    }

    #[test]
    fn test_representation_follows_limit() {
        assert!(CandidateMap::new(DENSE_CANDIDATE_LIMIT).is_dense());
        assert!(!CandidateMap::new(DENSE_CANDIDATE_LIMIT + 1).is_dense());
    }

    #[test]
    fn test_collects_within_and_across_buckets() {
        //0,1: same bucket. 2: nearby intensity. 3: too bright. 4: too many groups.
        let signatures = sigs(&[(100, 5), (100, 5), (110, 6), (200, 5), (100, 90)]);
        let out = collect_candidates(&signatures, &[0, 1, 2, 3, 4], &[], 26, 40, &NullNotifier);

        assert_eq!(out.map.pairs(), vec![(0, 1), (0, 2), (1, 2)]);
        assert_eq!(out.estimated, 3);
    }

    #[test]
    fn test_new_against_old() {
        //0 is new. 1 and 2 are old and close to each other, 3 is old and far away.
        let signatures = sigs(&[(50, 3), (60, 3), (60, 3), (250, 3)]);
        let out = collect_candidates(&signatures, &[0], &[1, 2, 3], 26, 40, &NullNotifier);

        assert_eq!(out.map.pairs(), vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn test_nothing_new() {
        let signatures = sigs(&[(50, 3), (50, 3)]);
        let out = collect_candidates(&signatures, &[], &[0, 1], 26, 40, &NullNotifier);
        assert!(out.map.is_empty());
    }
}
