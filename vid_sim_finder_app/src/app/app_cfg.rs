use std::ffi::OsString;
use std::path::PathBuf;

use vid_sim_finder_lib::Normalizer;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportVerbosity {
    Quiet,
    Default,
    Verbose,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputFormat {
    Normal,
    Json,
}

#[derive(Debug, Clone)]
pub struct DirCfg {
    pub thumb_dirs: Vec<PathBuf>,
    pub exts: Vec<OsString>,
}

/// Similarity options given on the commandline. These take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityOverrides {
    pub pixel_distance_radius: Option<u32>,
    pub group_min_size: Option<usize>,
    pub normalizer: Option<Normalizer>,
    pub similarity_percent: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct OutputCfg {
    pub format: OutputFormat,
    pub verbosity: ReportVerbosity,
}

#[derive(Debug, Clone)]
pub struct AppCfg {
    pub dir_cfg: DirCfg,
    pub state_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub overrides: SimilarityOverrides,
    pub output_cfg: OutputCfg,
}
