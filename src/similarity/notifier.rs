use std::fmt;

use log::{debug, info};

/// A summary event emitted by the similarity search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// There were no unchecked images, so no work was done.
    NothingToDo,

    /// Candidate collection and scoring finished.
    Comparisons {
        /// Candidate pairs that were actually scored.
        performed: usize,
        /// Pairs an exhaustive search would have scored.
        theoretical_max: usize,
    },

    /// Similarity clusters were assigned ids.
    GroupsFound { nb_groups: usize, nb_images: usize },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingToDo => write!(f, "No unchecked videos, nothing to do"),
            Self::Comparisons {
                performed,
                theoretical_max,
            } => {
                let pct = if *theoretical_max == 0 {
                    0.0
                } else {
                    100.0 * *performed as f64 / *theoretical_max as f64
                };
                write!(
                    f,
                    "Compared {performed} of {theoretical_max} possible pairs ({pct:.2}%)"
                )
            }
            Self::GroupsFound {
                nb_groups,
                nb_images,
            } => write!(f, "Found {nb_groups} similarity groups covering {nb_images} videos"),
        }
    }
}

/// Receives progress and summary events from a similarity search.
pub trait Notifier: Sync {
    fn progress(&self, job: &str, current: usize, total: usize);

    fn notify(&self, notification: Notification);
}

/// Forwards progress to `log` at debug level and summaries at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn progress(&self, job: &str, current: usize, total: usize) {
        debug!(target: "similarity_progress", "{job}: {current}/{total}");
    }

    fn notify(&self, notification: Notification) {
        info!("{notification}");
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn progress(&self, _job: &str, _current: usize, _total: usize) {}

    fn notify(&self, _notification: Notification) {}
}

//Reports progress of a scan loop every `interval` ticks.
pub(crate) struct ProgressTicker<'a> {
    notifier: &'a dyn Notifier,
    job: &'static str,
    total: usize,
    interval: usize,
    current: usize,
}

impl<'a> ProgressTicker<'a> {
    pub(crate) fn new(
        notifier: &'a dyn Notifier,
        job: &'static str,
        total: usize,
        interval: usize,
    ) -> Self {
        Self {
            notifier,
            job,
            total,
            interval: interval.max(1),
            current: 0,
        }
    }

    pub(crate) fn tick(&mut self) {
        self.current += 1;
        if self.current % self.interval == 0 {
            self.notifier.progress(self.job, self.current, self.total);
        }
    }

    pub(crate) fn finish(self) {
        self.notifier.progress(self.job, self.current, self.total);
    }
}
