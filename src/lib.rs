#![allow(clippy::let_and_return)]
#![allow(clippy::len_without_is_empty)]
#![warn(clippy::cast_lossless)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::todo)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::unimplemented)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::panic)]
#![allow(clippy::doc_markdown)]

//! # Overview
//! `vid_sim_finder_lib` finds visually similar videos by comparing small thumbnails
//! ("miniatures") taken from them.
//!
//! It has two layers:
//! * Segmentation: [`GroupComputer`] splits a miniature into [`PixelGroup`]s, which are
//!   maximal runs of spatially connected pixels whose colours are close according to a
//!   [`PixelComparator`].
//! * Similarity: [`SimilarityFinder`] buckets miniatures by global intensity and by the
//!   number of pixel groups they contain, only compares miniatures that land in nearby
//!   buckets, and joins the pairs that score above the similarity threshold into
//!   similarity clusters.
//!
//! # High Level API
//! ```rust
//! use vid_sim_finder_lib::{Miniature, SimilarityConfig, SimilarityEntry, SimilarityState};
//!
//! // Two identical grey miniatures and one bright one.
//! let grey = Miniature::from_pixels(4, 4, std::iter::repeat([100, 100, 100]).take(16)).unwrap();
//! let bright = Miniature::from_pixels(4, 4, std::iter::repeat([250, 250, 250]).take(16)).unwrap();
//!
//! let entries = vec![
//!     SimilarityEntry::new("a.mp4", grey.clone()),
//!     SimilarityEntry::new("b.mp4", grey),
//!     SimilarityEntry::new("c.mp4", bright),
//! ];
//!
//! let outcome =
//!     vid_sim_finder_lib::find_similar_videos(&entries, &SimilarityConfig::default()).unwrap();
//!
//! assert_eq!(outcome.groups.len(), 1);
//! assert_eq!(outcome.assignments["a.mp4"], SimilarityState::Group(1));
//! assert_eq!(outcome.assignments["b.mp4"], SimilarityState::Group(1));
//! assert_eq!(outcome.assignments["c.mp4"], SimilarityState::Dismissed);
//! ```
//!
//! # How it works
//! Every miniature gets a signature: its global intensity (the floored mean of all of its
//! samples) and the number of pixel groups [`GroupComputer::compute_groups`] finds in it.
//! The default scorer ([`PixelAgreementScorer`]) measures the mean per-sample agreement of two
//! miniatures, so two miniatures whose intensities differ by more than
//! `255 * (1 - similarity_percent)` can never reach the threshold. Miniatures are therefore
//! sorted into intensity buckets and only buckets inside that window are cross-compared.
//! Buckets are further split by group count, and pairs whose group counts differ by more
//! than [`SimilarityConfig::max_group_count_delta`] are skipped.
//!
//! Matched pairs are fed to a [`Graph`] and drained into connected components, so
//! similarity is transitive: if A matches B and B matches C, then A, B and C share a
//! cluster even when A and C do not match directly.
//!
//! # Persistence
//! The library never mutates caller state. [`SimilarityFinder::find_similar_videos`] returns
//! a [`SimilarityOutcome`] mapping every affected key to its new [`SimilarityState`]. The
//! caller applies it, and must make sure only one run assigns ids at a time, because fresh
//! ids are allocated from the largest id seen in the input.

mod config;
mod definitions;
mod errors;
mod pixel_groups;
mod similarity;

pub use config::SimilarityConfig;

pub use definitions::{
    gray_dec, DistanceMetric, Normalizer, DEFAULT_GROUP_MIN_SIZE, DEFAULT_MAX_GROUP_COUNT_DELTA,
    DEFAULT_PIXEL_DISTANCE_RADIUS, DEFAULT_SIMILARITY_PERCENT, DENSE_CANDIDATE_LIMIT,
    MINIATURE_SIZE, PROGRESS_INTERVAL, SCORE_BATCH_SIZE,
};

pub use errors::Error;

pub use pixel_groups::{
    comparator::{NormalizedPixels, PixelComparator},
    graph::{Graph, PopGroups},
    group_computer::{BatchGroups, GroupComputer},
    miniature::{Miniature, RawImage},
    pixel_group::{GroupRect, PixelGroup},
};

pub use similarity::{
    candidates::{collect_candidates, CandidateMap, Candidates},
    classifier::{compute_nb_couples, GrayClassifier, MiniatureSignature, NbGroupsClassifier},
    matches::similarity_group::{SimilarityGroup, TooFewEntries},
    notifier::{LogNotifier, Notification, Notifier, NullNotifier},
    scorer::{PixelAgreementScorer, SimilarityScorer},
    similarity_finder::{
        find_similar_videos, similarity_clusters, SimilarityEntry, SimilarityFinder,
        SimilarityOutcome, SimilarityReport, SimilarityState,
    },
};

#[doc(hidden)]
pub use pixel_groups::miniature::test_util;

type SimResult<T> = Result<T, crate::Error>;
