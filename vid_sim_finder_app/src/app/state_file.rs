use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use vid_sim_finder_lib::SimilarityState;

use crate::app::AppError;

/// What is remembered about one video between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateRecord {
    /// `None`: never checked. `-1`: checked, similar to nothing. Otherwise the similarity group id.
    pub similarity_id: Option<i64>,
    pub length: u64,
}

impl StateRecord {
    pub fn state(&self) -> SimilarityState {
        SimilarityState::from_db(self.similarity_id)
    }
}

/// The persisted similarity state of every video seen so far, keyed by thumbnail path.
///
/// Only one process may update a state file at a time, because fresh similarity ids are
/// allocated from the ids it already holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateFile {
    entries: BTreeMap<PathBuf, StateRecord>,
}

impl StateFile {
    /// Load a state file. A missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let f = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at {}, starting from scratch", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(AppError::StateIoError {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_reader(BufReader::new(f)).map_err(|source| AppError::StateFormatError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the state to `path`, replacing it only once the new contents are fully written.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let io_err = |source| AppError::StateIoError {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let f = File::create(&tmp_path).map_err(io_err)?;
        let mut f = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut f, self).map_err(|source| {
            AppError::StateFormatError {
                path: path.to_path_buf(),
                source,
            }
        })?;
        f.flush().map_err(io_err)?;
        drop(f);

        std::fs::rename(&tmp_path, path).map_err(io_err)
    }

    pub fn get(&self, path: &Path) -> Option<&StateRecord> {
        self.entries.get(path)
    }

    /// Add a video that has never been seen before. Known videos are left untouched.
    pub fn insert_new(&mut self, path: PathBuf, length: u64) {
        self.entries.entry(path).or_insert(StateRecord {
            similarity_id: None,
            length,
        });
    }

    /// Record the outcome of a similarity search.
    pub fn apply<'a>(&mut self, assignments: impl IntoIterator<Item = (&'a PathBuf, &'a SimilarityState)>) {
        for (path, state) in assignments {
            self.entries.entry(path.clone()).or_default().similarity_id = state.to_db();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The largest similarity id recorded for any video, whether or not its thumbnail is
    /// still around. 0 when there is none.
    pub fn max_similarity_id(&self) -> u32 {
        self.entries
            .values()
            .filter_map(|record| record.state().group_id())
            .max()
            .unwrap_or(0)
    }
}
