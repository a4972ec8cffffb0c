use std::{
    error::Error,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use image::imageops::FilterType;
use itertools::Itertools;
#[cfg(feature = "parallel_loading")]
use rayon::prelude::*;
use vid_sim_finder_lib::*;

use crate::app::*;

// * read cfg
// * load state file
// * load thumbnails
// * perform search
// * save state file
// * output results

pub fn run_app() -> i32 {
    let cfg = arg_parse::parse_args();
    configure_logs(cfg.output_cfg.verbosity);

    let ret = match run_app_inner(&cfg) {
        Ok(()) => 0,
        Err(fatal_error) => {
            print_fatal_err(fatal_error, cfg.output_cfg.verbosity);
            1
        }
    };

    ret
}

fn run_app_inner(cfg: &AppCfg) -> eyre::Result<()> {
    // Check that all thumbnail dirs exist
    let missing = cfg
        .dir_cfg
        .thumb_dirs
        .iter()
        .filter(|d| !d.exists())
        .cloned()
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(AppError::MissingDirs(missing).into());
    }

    let sim_cfg = load_similarity_config(cfg)?;
    info!(
        "radius: {}, min group size: {}, normalizer: {:?}, similarity: {}",
        sim_cfg.pixel_distance_radius,
        sim_cfg.group_min_size,
        sim_cfg.normalizer,
        sim_cfg.similarity_percent
    );

    let mut state = StateFile::load(&cfg.state_path)?;
    info!("Loaded state for {} videos", state.len());

    let thumb_paths = find_thumbnails(&cfg.dir_cfg);
    info!("Found {} thumbnails", thumb_paths.len());

    let entries = load_entries(&thumb_paths, &mut state);
    let outcome = search_and_apply(sim_cfg, &entries, &mut state)?;
    state.save(&cfg.state_path)?;

    let search_output = SearchOutput::new(outcome.groups);
    info!("{} new similarity groups", search_output.len());
    search_output.write(cfg.output_cfg.format, std::io::stdout())?;

    Ok(())
}

// Config file values first, then anything given on the commandline.
fn load_similarity_config(cfg: &AppCfg) -> Result<SimilarityConfig, AppError> {
    let mut sim_cfg = match &cfg.config_path {
        Some(path) => {
            let read_err = |source| AppError::ConfigError {
                path: path.clone(),
                source,
            };
            let f = File::open(path).map_err(|e| read_err(serde_json::Error::io(e)))?;
            serde_json::from_reader(BufReader::new(f)).map_err(read_err)?
        }
        None => SimilarityConfig::default(),
    };

    let overrides = &cfg.overrides;
    if let Some(radius) = overrides.pixel_distance_radius {
        sim_cfg.pixel_distance_radius = radius;
    }
    if let Some(min_size) = overrides.group_min_size {
        sim_cfg.group_min_size = min_size;
    }
    if let Some(normalizer) = overrides.normalizer {
        sim_cfg.normalizer = normalizer;
    }
    if let Some(similarity) = overrides.similarity_percent {
        sim_cfg.similarity_percent = similarity;
    }

    sim_cfg.validate()?;
    Ok(sim_cfg)
}

fn find_thumbnails(dir_cfg: &DirCfg) -> Vec<PathBuf> {
    let has_thumb_ext = |path: &Path| {
        path.extension().is_some_and(|ext| {
            dir_cfg
                .exts
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(ext))
        })
    };

    let paths = dir_cfg
        .thumb_dirs
        .iter()
        .flat_map(|dir| walkdir::WalkDir::new(dir).follow_links(true))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Failed to read directory entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && has_thumb_ext(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .sorted()
        .dedup()
        .collect();
    paths
}

fn load_miniature(path: &Path) -> Result<Miniature, AppError> {
    let img = image::open(path).map_err(|source| AppError::ThumbnailError {
        path: path.to_path_buf(),
        source,
    })?;

    let thumb = img
        .resize_exact(MINIATURE_SIZE, MINIATURE_SIZE, FilterType::Triangle)
        .to_rgb8();
    Ok(Miniature::try_from(thumb)?)
}

// Build the search entries. Unreadable thumbnails are skipped so one bad file does not stop
// the search, and new thumbnails are added to the state.
fn load_entries(paths: &[PathBuf], state: &mut StateFile) -> Vec<SimilarityEntry<PathBuf>> {
    #[cfg(feature = "parallel_loading")]
    let it = paths.par_iter();

    #[cfg(not(feature = "parallel_loading"))]
    let it = paths.iter();

    let loaded = it
        .map(|path| (path, load_miniature(path)))
        .collect::<Vec<_>>();

    let mut entries = Vec::with_capacity(loaded.len());
    for (path, res) in loaded {
        let miniature = match res {
            Ok(miniature) => miniature,
            Err(e) => {
                warn!("{e}: {}", e.source().map(ToString::to_string).unwrap_or_default());
                continue;
            }
        };

        //there is no video to measure, so new entries are ordered by thumbnail size.
        let file_len = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        state.insert_new(path.clone(), file_len);

        let record = state.get(path).copied().unwrap_or_default();
        entries.push(
            SimilarityEntry::new(path.clone(), miniature)
                .with_length(record.length)
                .with_state(record.state()),
        );
    }

    entries
}

// Videos whose thumbnails are gone or unreadable are not searched, but their ids are still in
// the state file and must not be handed out again.
fn search_and_apply(
    sim_cfg: SimilarityConfig,
    entries: &[SimilarityEntry<PathBuf>],
    state: &mut StateFile,
) -> Result<SimilarityOutcome<PathBuf>, AppError> {
    let outcome = SimilarityFinder::new(sim_cfg)?
        .with_max_existing_id(state.max_similarity_id())
        .find_similar_videos(entries)?;

    state.apply(&outcome.assignments);
    Ok(outcome)
}

fn print_fatal_err(fatal_err: eyre::Report, verbosity: ReportVerbosity) {
    error!(target: "app-errorlog", "{}", fatal_err);

    if verbosity == ReportVerbosity::Verbose {
        let mut source: Option<&(dyn Error + 'static)> = fatal_err.source();
        while let Some(e) = source {
            error!(target: "app-errorlog", "    caused by: {}", e);
            source = e.source();
        }
    }
}

pub fn configure_logs(verbosity: ReportVerbosity) {
    use simplelog::*;

    //progress lines are only interesting when debugging a slow search.
    let mut cfg = simplelog::ConfigBuilder::new();
    if verbosity != ReportVerbosity::Verbose {
        cfg.add_filter_ignore("similarity_progress".to_string());
    }

    let min_loglevel = match verbosity {
        ReportVerbosity::Quiet => LevelFilter::Warn,
        ReportVerbosity::Default => LevelFilter::Info,
        ReportVerbosity::Verbose => LevelFilter::Trace,
    };

    if let Err(e) = TermLogger::init(
        min_loglevel,
        cfg.build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        #[allow(clippy::print_stderr)]
        let () = eprintln!("TermLogger failed to initialize: {e}");
    }
}
