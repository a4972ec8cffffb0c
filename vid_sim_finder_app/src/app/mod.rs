mod app_cfg;
mod app_fns;
mod arg_parse;
mod errors;
mod search_output;
mod state_file;

pub(crate) use app_cfg::*;
pub(crate) use errors::*;

use search_output::SearchOutput;
use state_file::StateFile;

pub use app_fns::run_app;
