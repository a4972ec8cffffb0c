use std::cell::Cell;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use itertools::Itertools;
use rand::prelude::*;
use vid_sim_finder_lib::*;

#[derive(Default)]
struct Recorder {
    progress: Mutex<Vec<(String, usize, usize)>>,
    notifications: Mutex<Vec<Notification>>,
}

impl Notifier for Recorder {
    fn progress(&self, job: &str, current: usize, total: usize) {
        self.progress
            .lock()
            .unwrap()
            .push((job.to_string(), current, total));
    }

    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

/// A 1x1 miniature whose red channel carries its index, so a mock scorer can tell entries
/// apart. Every such miniature lands in the same comparison window.
fn tagged(idx: usize) -> Miniature {
    Miniature::from_pixels(1, 1, [[idx as u8, 0, 0]]).unwrap()
}

fn tag(mini: &Miniature) -> usize {
    usize::from(mini.pixel(0)[0])
}

fn grey(level: u8) -> Miniature {
    Miniature::uniform(8, 8, [level; 3])
}

#[test]
fn test_similarity_is_transitive() {
    //A-B and B-C differ by 16 per sample (about 94% agreement), A-C by 32 (about 87%).
    let entries = vec![
        SimilarityEntry::new("a", grey(100)),
        SimilarityEntry::new("b", grey(116)),
        SimilarityEntry::new("c", grey(132)),
    ];

    let scorer = PixelAgreementScorer;
    assert!(scorer.similarity(&entries[0].miniature, &entries[1].miniature).unwrap() >= 0.9);
    assert!(scorer.similarity(&entries[1].miniature, &entries[2].miniature).unwrap() >= 0.9);
    assert!(scorer.similarity(&entries[0].miniature, &entries[2].miniature).unwrap() < 0.9);

    let outcome = find_similar_videos(&entries, &SimilarityConfig::default()).unwrap();

    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.groups[0].len(), 3);
    for key in ["a", "b", "c"] {
        assert_eq!(outcome.assignments[key], SimilarityState::Group(1));
    }
    assert_eq!(outcome.report.nb_matches, 2);
}

#[test]
fn test_transitive_with_mocked_scores() {
    let scores = |a: &Miniature, b: &Miniature| -> Result<f64, Error> {
        let pair = (tag(a).min(tag(b)), tag(a).max(tag(b)));
        Ok(match pair {
            (0, 1) | (1, 2) => 0.95,
            _ => 0.40,
        })
    };

    let entries = (0..3)
        .map(|i| SimilarityEntry::new(i, tagged(i)))
        .collect::<Vec<_>>();
    let finder = SimilarityFinder::new(SimilarityConfig::default())
        .unwrap()
        .with_scorer(scores)
        .with_notifier(&NullNotifier);
    let outcome = finder.find_similar_videos(&entries).unwrap();

    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.groups[0].members().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(outcome.report.comparisons, 3);
}

#[test]
fn test_nothing_to_do() {
    let recorder = Recorder::default();
    let entries = vec![
        SimilarityEntry::new("old", grey(10)).with_state(SimilarityState::Group(2)),
        SimilarityEntry::new("older", grey(10)).with_state(SimilarityState::Dismissed),
    ];

    let finder = SimilarityFinder::new(SimilarityConfig::default())
        .unwrap()
        .with_notifier(&recorder);
    let outcome = finder.find_similar_videos(&entries).unwrap();

    assert!(outcome.assignments.is_empty());
    assert!(outcome.groups.is_empty());
    assert_eq!(outcome.report.comparisons, 0);
    assert_eq!(outcome.report.nb_old, 2);
    assert_eq!(
        *recorder.notifications.lock().unwrap(),
        vec![Notification::NothingToDo]
    );
    assert!(recorder.progress.lock().unwrap().is_empty());

    let nothing: Vec<SimilarityEntry<&str>> = vec![];
    let outcome = finder.find_similar_videos(&nothing).unwrap();
    assert!(outcome.assignments.is_empty());
}

#[test]
fn test_unmatched_new_videos_are_dismissed() {
    let entries = vec![
        SimilarityEntry::new("dark", grey(0)),
        SimilarityEntry::new("mid", grey(128)),
        SimilarityEntry::new("bright", grey(255)),
    ];

    let outcome = find_similar_videos(&entries, &SimilarityConfig::default()).unwrap();
    assert!(outcome.groups.is_empty());
    assert_eq!(outcome.report.nb_dismissed, 3);
    assert!(outcome
        .assignments
        .values()
        .all(|state| *state == SimilarityState::Dismissed));
}

// No pair that an exhaustive scan would call similar may be pruned away.
#[test]
fn test_pruning_never_drops_a_match() {
    let mut rng = StdRng::seed_from_u64(5);
    let config = SimilarityConfig {
        max_group_count_delta: usize::MAX,
        ..SimilarityConfig::default()
    };
    let computer = config.group_computer();
    let scorer = PixelAgreementScorer;

    for _ in 0..5 {
        //clusters of near copies spread over the intensity range, plus unrelated noise.
        let mut minis = vec![];
        for _ in 0..8 {
            let lo = rng.gen_range(0..200);
            let base = Miniature::random_miniature(8, 8, lo, lo + 55, &mut rng);
            for _ in 0..4 {
                let distance = rng.gen_range(0..=8 * 8 * 3 * 30);
                minis.push(base.with_sample_distance(distance, &mut rng));
            }
        }
        for _ in 0..10 {
            minis.push(Miniature::random_miniature(8, 8, 0, 255, &mut rng));
        }
        minis.shuffle(&mut rng);

        let (new, old): (Vec<usize>, Vec<usize>) =
            (0..minis.len()).partition(|_| rng.gen_bool(0.6));
        let signatures = minis
            .iter()
            .map(|mini| computer.signature(mini))
            .collect::<Vec<_>>();

        let candidates = collect_candidates(
            &signatures,
            &new,
            &old,
            config.gray_dec(),
            config.max_group_count_delta,
            &NullNotifier,
        );

        let is_new = new.iter().copied().collect::<HashSet<_>>();
        let mut nb_similar = 0;
        for (i, j) in (0..minis.len()).tuple_combinations() {
            if !is_new.contains(&i) && !is_new.contains(&j) {
                assert!(!candidates.map.contains(i, j));
                continue;
            }

            let score = scorer.similarity(&minis[i], &minis[j]).unwrap();
            if score >= config.similarity_percent {
                nb_similar += 1;
                assert!(candidates.map.contains(i, j), "pair ({i}, {j}) was pruned");
            }
        }
        assert!(nb_similar > 0);
    }
}

fn union_find_components(nb_nodes: usize, edges: &[(usize, usize)]) -> BTreeSet<Vec<usize>> {
    fn find(parent: &mut [usize], x: usize) -> usize {
        let mut root = x;
        while parent[root] != root {
            root = parent[root];
        }
        let mut x = x;
        while parent[x] != root {
            let next = parent[x];
            parent[x] = root;
            x = next;
        }
        root
    }

    let mut parent = (0..nb_nodes).collect::<Vec<_>>();
    for &(a, b) in edges {
        let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
        if ra != rb {
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    (0..nb_nodes)
        .map(|x| (find(&mut parent, x), x))
        .into_group_map()
        .into_values()
        .filter(|members| members.len() > 1)
        .map(|mut members| {
            members.sort_unstable();
            members
        })
        .collect()
}

#[test]
fn test_clusters_match_union_find() {
    let mut rng = StdRng::seed_from_u64(6);
    for _ in 0..20 {
        let nb_nodes = rng.gen_range(2..40);
        let edges = (0..rng.gen_range(0..30))
            .map(|_| (rng.gen_range(0..nb_nodes), rng.gen_range(0..nb_nodes)))
            .filter(|(a, b)| a != b)
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect::<HashSet<_>>();

        let scorer = |a: &Miniature, b: &Miniature| -> Result<f64, Error> {
            let pair = (tag(a).min(tag(b)), tag(a).max(tag(b)));
            Ok(if edges.contains(&pair) { 1.0 } else { 0.0 })
        };

        let entries = (0..nb_nodes)
            .map(|i| SimilarityEntry::new(i, tagged(i)))
            .collect::<Vec<_>>();
        let outcome = SimilarityFinder::new(SimilarityConfig::default())
            .unwrap()
            .with_scorer(scorer)
            .with_notifier(&NullNotifier)
            .find_similar_videos(&entries)
            .unwrap();

        let edge_list = edges.iter().copied().collect::<Vec<_>>();
        let expected = union_find_components(nb_nodes, &edge_list);
        let got = outcome
            .groups
            .iter()
            .map(|g| g.members().copied().sorted().collect::<Vec<_>>())
            .collect::<BTreeSet<_>>();
        assert_eq!(got, expected);

        let clustered = expected.iter().flatten().count();
        assert_eq!(outcome.report.nb_images, clustered);
        assert_eq!(outcome.report.nb_dismissed, nb_nodes - clustered);
        assert_eq!(outcome.assignments.len(), nb_nodes);
    }
}

#[test]
fn test_cancel_between_batches() {
    let nb_scored = AtomicUsize::new(0);
    let scorer = |_: &Miniature, _: &Miniature| -> Result<f64, Error> {
        nb_scored.fetch_add(1, Ordering::Relaxed);
        Ok(1.0)
    };

    let nb_checks = Cell::new(0);
    let cancel = || {
        nb_checks.set(nb_checks.get() + 1);
        nb_checks.get() > 1
    };

    //30 identical videos give 435 candidate pairs, more than one scoring batch.
    let entries = (0..30)
        .map(|i| SimilarityEntry::new(i, grey(50)))
        .collect::<Vec<_>>();

    let res = SimilarityFinder::new(SimilarityConfig::default())
        .unwrap()
        .with_scorer(scorer)
        .with_notifier(&NullNotifier)
        .with_cancel_check(&cancel)
        .find_similar_videos(&entries);

    assert_eq!(res, Err(Error::Cancelled));
    assert_eq!(nb_scored.load(Ordering::Relaxed), SCORE_BATCH_SIZE);
}

#[test]
fn test_scorer_failure_is_reported() {
    let scorer = |_: &Miniature, _: &Miniature| -> Result<f64, Error> {
        Err(Error::Scorer("backend offline".to_string()))
    };
    let entries = vec![
        SimilarityEntry::new("a", grey(1)),
        SimilarityEntry::new("b", grey(1)),
    ];

    let res = SimilarityFinder::new(SimilarityConfig::default())
        .unwrap()
        .with_scorer(scorer)
        .with_notifier(&NullNotifier)
        .find_similar_videos(&entries);
    assert_eq!(res, Err(Error::Scorer("backend offline".to_string())));
}

#[test]
fn test_progress_and_summaries() {
    let recorder = Recorder::default();
    let entries = (0..4)
        .map(|i| SimilarityEntry::new(i, grey(90)).with_length(i as u64))
        .collect::<Vec<_>>();

    let outcome = SimilarityFinder::new(SimilarityConfig::default())
        .unwrap()
        .with_notifier(&recorder)
        .find_similar_videos(&entries)
        .unwrap();
    assert_eq!(outcome.groups.len(), 1);

    let progress = recorder.progress.lock().unwrap();
    assert!(progress
        .iter()
        .any(|(job, current, total)| job == "Comparing" && *current == 6 && *total == 6));

    assert_eq!(
        *recorder.notifications.lock().unwrap(),
        vec![
            Notification::Comparisons {
                performed: 6,
                theoretical_max: 6
            },
            Notification::GroupsFound {
                nb_groups: 1,
                nb_images: 4
            },
        ]
    );
}
