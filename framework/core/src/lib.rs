mod error;
mod format;
mod jobs;
mod level;
mod run;
mod shared;
mod timeline;

pub mod prelude {
    pub use crate::error::RunError;
    pub use crate::format::{format_elapsed, format_elapsed_opt};
    pub use crate::jobs::{Applied, JobEvent, JobInfo, JobRegistry, JobStatus, StatusCounts};
    pub use crate::level::{Level, LevelClassifier};
    pub use crate::run::{Correlation, Ingested, RunState};
    pub use crate::shared::{shared, RunReader, RunSnapshot, RunWriter};
    pub use crate::timeline::Timeline;
}
