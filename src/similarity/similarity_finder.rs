use std::collections::{BTreeMap, HashMap};

use log::{debug, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::*;

/// Where a video stands in the similarity search.
///
/// The persistence layer stores this as a nullable integer: `None` for
/// [`SimilarityState::Unchecked`], `-1` for [`SimilarityState::Dismissed`] and the
/// positive id for [`SimilarityState::Group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum SimilarityState {
    /// Never compared against the rest of the database.
    #[default]
    Unchecked,
    /// Compared, and found similar to nothing.
    Dismissed,
    /// Part of the similarity cluster with this id.
    Group(u32),
}

impl SimilarityState {
    /// Read back a persisted value. Ids that are not positive or do not fit a `u32` are
    /// treated as dismissed.
    #[must_use]
    pub fn from_db(value: Option<i64>) -> Self {
        match value {
            None => Self::Unchecked,
            Some(id) => match u32::try_from(id) {
                Ok(id) if id > 0 => Self::Group(id),
                _ => Self::Dismissed,
            },
        }
    }

    #[must_use]
    pub const fn to_db(self) -> Option<i64> {
        match self {
            Self::Unchecked => None,
            Self::Dismissed => Some(-1),
            Self::Group(id) => Some(id as i64),
        }
    }

    #[must_use]
    pub const fn group_id(self) -> Option<u32> {
        match self {
            Self::Group(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_unchecked(self) -> bool {
        matches!(self, Self::Unchecked)
    }
}

/// A video taking part in a similarity search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityEntry<K> {
    /// Identifies the video in the returned assignments. Keys must be unique.
    pub key: K,
    pub miniature: Miniature,
    /// Video length, used to order clusters and their members.
    pub length: u64,
    pub state: SimilarityState,
}

impl<K> SimilarityEntry<K> {
    /// An unchecked entry of length 0.
    pub fn new(key: K, miniature: Miniature) -> Self {
        Self {
            key,
            miniature,
            length: 0,
            state: SimilarityState::Unchecked,
        }
    }

    #[must_use]
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = length;
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: SimilarityState) -> Self {
        self.state = state;
        self
    }
}

/// Counts describing one run of the similarity search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimilarityReport {
    pub nb_new: usize,
    pub nb_old: usize,
    /// Pairs visited while collecting candidates.
    pub estimated_comparisons: usize,
    /// Distinct candidate pairs that were scored.
    pub comparisons: usize,
    /// Pairs an exhaustive search of new against new and old would have scored.
    pub theoretical_max: usize,
    pub nb_matches: usize,
    pub nb_groups: usize,
    /// Videos that are members of a newly assigned group.
    pub nb_images: usize,
    pub nb_dismissed: usize,
}

/// The result of a similarity search. Nothing is applied to the caller's data; the caller
/// persists `assignments` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityOutcome<K> {
    /// The new state of every video whose state changed. Unchecked videos always appear.
    pub assignments: BTreeMap<K, SimilarityState>,
    /// Newly assigned clusters, ordered by size then by shortest member.
    pub groups: Vec<SimilarityGroup<K>>,
    pub report: SimilarityReport,
}

impl<K> SimilarityOutcome<K> {
    fn nothing_to_do(nb_old: usize) -> Self {
        Self {
            assignments: BTreeMap::new(),
            groups: vec![],
            report: SimilarityReport {
                nb_old,
                ..SimilarityReport::default()
            },
        }
    }
}

/// Searches a set of videos for visually similar ones.
///
/// Only unchecked videos are searched: each is compared against the other unchecked videos
/// and against the already checked ones, skipping pairs whose signatures rule out a match.
pub struct SimilarityFinder<'a, S = PixelAgreementScorer> {
    config: SimilarityConfig,
    scorer: S,
    notifier: &'a dyn Notifier,
    cancel_check: Option<&'a dyn Fn() -> bool>,
    max_existing_id: u32,
}

impl SimilarityFinder<'static> {
    /// A finder using [`PixelAgreementScorer`] that reports through [`LogNotifier`].
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn new(config: SimilarityConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scorer: PixelAgreementScorer,
            notifier: &LogNotifier,
            cancel_check: None,
            max_existing_id: 0,
        })
    }
}

impl<'a, S: SimilarityScorer> SimilarityFinder<'a, S> {
    #[must_use]
    pub fn with_scorer<T: SimilarityScorer>(self, scorer: T) -> SimilarityFinder<'a, T> {
        SimilarityFinder {
            config: self.config,
            scorer,
            notifier: self.notifier,
            cancel_check: self.cancel_check,
            max_existing_id: self.max_existing_id,
        }
    }

    #[must_use]
    pub fn with_notifier<'b>(self, notifier: &'b dyn Notifier) -> SimilarityFinder<'b, S>
    where
        'a: 'b,
    {
        SimilarityFinder {
            config: self.config,
            scorer: self.scorer,
            notifier,
            cancel_check: self.cancel_check,
            max_existing_id: self.max_existing_id,
        }
    }

    /// Polled between scoring batches. When it returns true the search stops with
    /// [`Error::Cancelled`].
    #[must_use]
    pub fn with_cancel_check<'b>(self, check: &'b dyn Fn() -> bool) -> SimilarityFinder<'b, S>
    where
        'a: 'b,
    {
        SimilarityFinder {
            config: self.config,
            scorer: self.scorer,
            notifier: self.notifier,
            cancel_check: Some(check),
            max_existing_id: self.max_existing_id,
        }
    }

    /// The largest similarity id in use anywhere in the caller's database, including videos
    /// left out of `entries`. Fresh ids are allocated above it.
    #[must_use]
    pub fn with_max_existing_id(mut self, max_existing_id: u32) -> Self {
        self.max_existing_id = max_existing_id;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Search `entries` for similar videos.
    ///
    /// Every unchecked entry ends up either in a similarity group or dismissed. An already
    /// grouped entry keeps its id unless an unchecked entry joins its cluster, in which case
    /// the whole cluster is relabelled with one fresh id. Fresh ids start above the largest id
    /// present in `entries` or given to [`Self::with_max_existing_id`], so only one search may
    /// assign ids at a time.
    ///
    /// # Errors
    /// * [`Error::Cancelled`] if the cancel check fired.
    /// * [`Error::Scorer`] if the scorer failed.
    /// * [`Error::IdsExhausted`] if no fresh ids are left.
    pub fn find_similar_videos<K>(
        &self,
        entries: &[SimilarityEntry<K>],
    ) -> SimResult<SimilarityOutcome<K>>
    where
        K: Ord + Clone + Sync,
    {
        let (new, old): (Vec<usize>, Vec<usize>) =
            (0..entries.len()).partition(|&i| entries[i].state.is_unchecked());

        if new.is_empty() {
            self.notifier.notify(Notification::NothingToDo);
            return Ok(SimilarityOutcome::nothing_to_do(old.len()));
        }
        debug!("Searching {} unchecked videos against {} checked videos", new.len(), old.len());

        let computer = self.config.group_computer();
        let signatures = entries
            .par_iter()
            .map(|entry| computer.signature(&entry.miniature))
            .collect::<Vec<_>>();

        let candidates = collect_candidates(
            &signatures,
            &new,
            &old,
            self.config.gray_dec(),
            self.config.max_group_count_delta,
            self.notifier,
        );

        let pairs = candidates.map.pairs();
        let matches = self.score_pairs(entries, &pairs)?;
        trace!("{} of {} candidate pairs matched", matches.len(), pairs.len());

        let theoretical_max = compute_nb_couples(new.len(), new.len(), true)
            + compute_nb_couples(new.len(), old.len(), false);
        self.notifier.notify(Notification::Comparisons {
            performed: pairs.len(),
            theoretical_max,
        });

        let clusters = self.clusters(entries, matches.iter().copied());
        let mut outcome = assign_ids(entries, &new, clusters, self.max_existing_id)?;

        outcome.report = SimilarityReport {
            nb_new: new.len(),
            nb_old: old.len(),
            estimated_comparisons: candidates.estimated,
            comparisons: pairs.len(),
            theoretical_max,
            nb_matches: matches.len(),
            ..outcome.report
        };

        self.notifier.notify(Notification::GroupsFound {
            nb_groups: outcome.report.nb_groups,
            nb_images: outcome.report.nb_images,
        });

        Ok(outcome)
    }

    fn score_pairs<K: Sync>(
        &self,
        entries: &[SimilarityEntry<K>],
        pairs: &[(usize, usize)],
    ) -> SimResult<Vec<(usize, usize)>> {
        let threshold = self.config.similarity_percent;
        let scorer = &self.scorer;
        let mut matches = vec![];
        let mut done = 0;

        for chunk in pairs.chunks(SCORE_BATCH_SIZE) {
            if self.cancel_check.is_some_and(|check| check()) {
                debug!("Similarity search cancelled after {done} comparisons");
                return Err(Error::Cancelled);
            }

            let scored = chunk
                .par_iter()
                .map(|&(i, j)| {
                    let score = scorer
                        .similarity(&entries[i].miniature, &entries[j].miniature)
                        .map_err(|e| match e {
                            Error::Scorer(_) => e,
                            other => Error::Scorer(other.to_string()),
                        })?;
                    Ok((score >= threshold).then_some((i, j)))
                })
                .collect::<SimResult<Vec<_>>>()?;

            matches.extend(scored.into_iter().flatten());
            done += chunk.len();
            self.notifier.progress("Comparing", done, pairs.len());
        }

        Ok(matches)
    }

    //connected components over the matched pairs, with the members of each existing
    //group chained together so that joining one member joins the whole group.
    fn clusters<K>(
        &self,
        entries: &[SimilarityEntry<K>],
        matches: impl IntoIterator<Item = (usize, usize)>,
    ) -> Vec<Vec<usize>> {
        let mut existing = HashMap::<u32, usize>::new();
        let mut edges = matches.into_iter().collect::<Vec<_>>();
        for (idx, entry) in entries.iter().enumerate() {
            if let Some(id) = entry.state.group_id() {
                if let Some(&first) = existing.get(&id) {
                    edges.push((first, idx));
                } else {
                    existing.insert(id, idx);
                }
            }
        }

        similarity_clusters(edges)
    }
}

/// Join matched pairs into clusters. Returns the connected components of the pairs, in order
/// of their smallest member, each sorted ascending. Images matched to nothing do not appear.
pub fn similarity_clusters(matches: impl IntoIterator<Item = (usize, usize)>) -> Vec<Vec<usize>> {
    let mut graph = Graph::new();
    for (i, j) in matches {
        graph.connect(i, j);
    }
    graph.into_groups()
}

fn assign_ids<K: Ord + Clone>(
    entries: &[SimilarityEntry<K>],
    new: &[usize],
    clusters: Vec<Vec<usize>>,
    max_existing_id: u32,
) -> SimResult<SimilarityOutcome<K>> {
    let max_id = entries
        .iter()
        .filter_map(|entry| entry.state.group_id())
        .fold(max_existing_id, u32::max);

    //clusters made only of already checked videos are left as they are.
    let mut clusters = clusters
        .into_iter()
        .filter(|members| members.iter().any(|&i| entries[i].state.is_unchecked()))
        .map(|mut members| {
            members.sort_by_key(|&i| (entries[i].length, i));
            members
        })
        .collect::<Vec<_>>();
    clusters.sort_by_key(|members| (members.len(), entries[members[0]].length, members[0]));

    let mut assignments = BTreeMap::new();
    let mut groups = Vec::with_capacity(clusters.len());
    let mut nb_images = 0;
    let mut next_id = max_id;

    for members in clusters {
        next_id = next_id.checked_add(1).ok_or(Error::IdsExhausted(max_id))?;
        for &i in &members {
            assignments.insert(entries[i].key.clone(), SimilarityState::Group(next_id));
        }
        nb_images += members.len();

        let keys = members.iter().map(|&i| entries[i].key.clone());
        if let Ok(group) = SimilarityGroup::new(next_id, keys) {
            groups.push(group);
        }
    }

    let mut nb_dismissed = 0;
    for &i in new {
        assignments.entry(entries[i].key.clone()).or_insert_with(|| {
            nb_dismissed += 1;
            SimilarityState::Dismissed
        });
    }

    Ok(SimilarityOutcome {
        assignments,
        report: SimilarityReport {
            nb_groups: groups.len(),
            nb_images,
            nb_dismissed,
            ..SimilarityReport::default()
        },
        groups,
    })
}

/// Search `entries` for similar videos with the default scorer, reporting through `log`.
/// See [`SimilarityFinder::find_similar_videos`].
///
/// # Errors
/// Returns `Err` if `config` is invalid or the search fails.
pub fn find_similar_videos<K>(
    entries: &[SimilarityEntry<K>],
    config: &SimilarityConfig,
) -> SimResult<SimilarityOutcome<K>>
where
    K: Ord + Clone + Sync,
{
    SimilarityFinder::new(*config)?.find_similar_videos(entries)
}
