use clap::{Parser, ValueEnum};
use smk_log_core::prelude::{Level, LevelClassifier};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct ViewerCli {
    /// Path to the JSON-lines log written by the workflow run
    #[clap(env = "SMK_LOGFILE")]
    pub logfile: PathBuf,

    /// Which part of the run to show
    #[clap(long, value_enum, default_value_t = View::All)]
    pub view: View,

    /// Level to show for records whose level name is not one of debug, info, warning, error or
    /// critical. Defaults to `unknown`.
    #[clap(long, value_parser = parse_level)]
    pub unrecognized_level: Option<Level>,

    /// Level to show for records that have no level name at all. Defaults to `unknown`.
    #[clap(long, value_parser = parse_level)]
    pub missing_level: Option<Level>,

    /// Show every field of the record at this position on the timeline, counting from 0, instead
    /// of the tables.
    #[clap(long, value_name = "INDEX")]
    pub record: Option<usize>,

    /// Stop at the first line that cannot be decoded instead of skipping it.
    #[clap(long, default_value = "false")]
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum View {
    Logs,
    Jobs,
    All,
}

impl View {
    pub fn shows_logs(&self) -> bool {
        matches!(self, View::Logs | View::All)
    }

    pub fn shows_jobs(&self) -> bool {
        matches!(self, View::Jobs | View::All)
    }
}

impl ViewerCli {
    pub fn classifier(&self) -> LevelClassifier {
        LevelClassifier::new(self.unrecognized_level, self.missing_level)
    }
}

fn parse_level(s: &str) -> anyhow::Result<Level> {
    if s.trim().eq_ignore_ascii_case("unknown") {
        return Ok(Level::Unknown);
    }

    Level::from_name(s).ok_or_else(|| anyhow::anyhow!("Unknown level `{s}`"))
}

/// Initialise logging and parse the command line.
pub fn init() -> ViewerCli {
    env_logger::init();

    ViewerCli::parse()
}
