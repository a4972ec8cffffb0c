use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /////////////////////////////////
    //search engine
    #[error("Similarity search failed: {0}")]
    SearchError(#[from] vid_sim_finder_lib::Error),

    /////////////////////////////////
    //inputs
    #[error("Directories not found: {}", display_paths(.0))]
    MissingDirs(Vec<PathBuf>),

    #[error("Failed to load thumbnail {path}")]
    ThumbnailError {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to read config file {path}")]
    ConfigError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /////////////////////////////////
    //state file
    #[error("Failed to access state file {path}")]
    StateIoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file {path} is corrupt")]
    StateFormatError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
