use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use clap::{value_parser, ArgAction::*};
use vid_sim_finder_lib::Normalizer;

use crate::app::*;

// file specification
const THUMB_DIRS: &str = "Thumbnail directories";
const THUMB_EXTS: &str = "Thumbnail extensions";
const STATE_FILE: &str = "State file";

// similarity configuration
const CONFIG_FILE: &str = "Config file";
const RADIUS: &str = "Pixel distance radius";
const MIN_GROUP_SIZE: &str = "Minimum group size";
const NORMALIZER: &str = "Normalizer";
const SIMILARITY: &str = "Similarity threshold";

//output settings
const OUTPUT_FORMAT: &str = "Format";

//Verbosity
const VERBOSITY_QUIET: &str = "Quiet";
const VERBOSITY_VERBOSE: &str = "Verbose";

const DISPLAY_ORDERING: [&str; 11] = [
    //
    // file specification
    THUMB_DIRS,
    THUMB_EXTS,
    STATE_FILE,
    //
    //similarity configuration
    CONFIG_FILE,
    RADIUS,
    MIN_GROUP_SIZE,
    NORMALIZER,
    SIMILARITY,
    //
    //outputs
    OUTPUT_FORMAT,
    //
    //verbosity
    VERBOSITY_QUIET,
    VERBOSITY_VERBOSE,
];

fn build_app() -> clap::Command {
    let get_ordering = |arg_name: &str| -> usize {
        match DISPLAY_ORDERING.iter().position(|x| *x == arg_name) {
            Some(idx) => idx,
            None => {
                panic!("argument not assigned a display order: {arg_name:?}");
            }
        }
    };

    //args are not added through method chaining because rustfmt struggles with very long expressions.
    let mut clap_app = clap::Command::new("Video similarity finder")
        .version(clap::crate_version!())
        .about("Find visually similar videos by comparing their thumbnails");

    clap_app = clap_app.arg(
        clap::Arg::new(THUMB_DIRS)
            .long("dir")
            .required(true)
            .num_args(1..)
            .value_parser(value_parser!(PathBuf))
            .action(Append)
            .help("Directories containing one thumbnail image per video. Every image found is treated as a separate video.")
            .display_order(get_ordering(THUMB_DIRS)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(THUMB_EXTS)
            .long("exts")
            .num_args(0..)
            .value_parser(value_parser!(OsString))
            .help("File extensions of thumbnail images. Extensions must be comma separated with no spaces, e.g '--exts ext1,ext2,ext3'")
            .value_delimiter(',')
            .action(Append)
            .default_value("png,jpg,jpeg,bmp,gif,webp")
            .display_order(get_ordering(THUMB_EXTS)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(STATE_FILE)
            .long("state")
            .value_parser(value_parser!(PathBuf))
            .num_args(1)
            .default_value("vid_sim_finder_state.json")
            .help("JSON file recording which videos were already checked and which similarity group they belong to. Read before and rewritten after every search.")
            .display_order(get_ordering(STATE_FILE)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(CONFIG_FILE)
            .long("config")
            .value_parser(value_parser!(PathBuf))
            .num_args(1)
            .help("JSON file with similarity options. Options given on the commandline take precedence.")
            .display_order(get_ordering(CONFIG_FILE)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(RADIUS)
            .long("radius")
            .value_parser(value_parser!(u32))
            .num_args(1)
            .help("Maximum channel distance between two pixels of one pixel group (0-765).")
            .display_order(get_ordering(RADIUS)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(MIN_GROUP_SIZE)
            .long("min-group-size")
            .value_parser(value_parser!(usize))
            .num_args(1)
            .help("Pixel groups with fewer pixels are ignored when counting groups.")
            .display_order(get_ordering(MIN_GROUP_SIZE)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(NORMALIZER)
            .long("normalizer")
            .value_parser(parse_normalizer)
            .num_args(1)
            .help("Pixel pre-processing, by name (none, smooth, gray) or id (0, 1, 2).")
            .display_order(get_ordering(NORMALIZER)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(SIMILARITY)
            .long("similarity")
            .value_parser(value_parser!(f64))
            .num_args(1)
            .help("Fraction of pixel agreement two thumbnails need to be similar (0.0 - 1.0).")
            .display_order(get_ordering(SIMILARITY)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(OUTPUT_FORMAT)
            .long("format")
            .value_parser(value_parser!(OutputFormat))
            .num_args(1)
            .default_value("normal")
            .help("How to print the newly found similarity groups.")
            .display_order(get_ordering(OUTPUT_FORMAT)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(VERBOSITY_QUIET)
            .long("quiet")
            .conflicts_with(VERBOSITY_VERBOSE)
            .num_args(0)
            .action(SetTrue)
            .help("Only print warnings and errors")
            .display_order(get_ordering(VERBOSITY_QUIET)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(VERBOSITY_VERBOSE)
            .long("verbose")
            .num_args(0)
            .action(SetTrue)
            .help("Print progress, and the causes of fatal errors")
            .display_order(get_ordering(VERBOSITY_VERBOSE)),
    );

    clap_app
}

fn parse_normalizer(arg: &str) -> Result<Normalizer, String> {
    if let Ok(id) = arg.parse::<u8>() {
        return Normalizer::try_from(id).map_err(|e| e.to_string());
    }

    //variant names are capitalized, accept them in any case.
    let mut name = arg.to_ascii_lowercase();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }

    name.parse::<Normalizer>()
        .map_err(|()| format!("unknown normalizer: {arg:?}"))
}

pub fn parse_args() -> AppCfg {
    parse_args_from(std::env::args_os())
}

fn parse_args_from<I, T>(args: I) -> AppCfg
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    //capture the cwd once, to minimize the risk of working with two values if it is changed by the OS at runtime.
    let cwd = std::env::current_dir().unwrap_or_default();

    let args = build_app().get_matches_from(args);

    let thumb_dirs = match args.get_many::<PathBuf>(THUMB_DIRS) {
        Some(paths) => paths.map(|p| absolutify_path(&cwd, p)).collect(),
        None => vec![],
    };

    let exts = match args.get_many::<OsString>(THUMB_EXTS) {
        Some(exts) => exts.cloned().collect(),
        None => vec![],
    };

    let state_path = args
        .get_one::<PathBuf>(STATE_FILE)
        .map(|p| absolutify_path(&cwd, p))
        .unwrap_or_default();

    let overrides = SimilarityOverrides {
        pixel_distance_radius: args.get_one::<u32>(RADIUS).copied(),
        group_min_size: args.get_one::<usize>(MIN_GROUP_SIZE).copied(),
        normalizer: args.get_one::<Normalizer>(NORMALIZER).copied(),
        similarity_percent: args.get_one::<f64>(SIMILARITY).copied(),
    };

    let verbosity = if args.get_flag(VERBOSITY_QUIET) {
        ReportVerbosity::Quiet
    } else if args.get_flag(VERBOSITY_VERBOSE) {
        ReportVerbosity::Verbose
    } else {
        ReportVerbosity::Default
    };

    let format = args
        .get_one::<OutputFormat>(OUTPUT_FORMAT)
        .copied()
        .unwrap_or(OutputFormat::Normal);

    AppCfg {
        dir_cfg: DirCfg { thumb_dirs, exts },
        state_path,
        config_path: args
            .get_one::<PathBuf>(CONFIG_FILE)
            .map(|p| absolutify_path(&cwd, p)),
        overrides,
        output_cfg: OutputCfg { format, verbosity },
    }
}

fn absolutify_path(cwd: &Path, path: &Path) -> PathBuf {
    //get the absolute path if it is not absolute, by prepending the cwd.
    let path = if path.is_relative() {
        cwd.join(path)
    } else {
        path.to_path_buf()
    };

    //canonicalizing fails for files that do not exist yet, such as a fresh state file.
    path.canonicalize().unwrap_or(path)
}
