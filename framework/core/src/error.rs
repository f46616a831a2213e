use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// A run was requested with no anchor time and no records to take one from.
    #[error("Cannot build a run without an anchor time or any records")]
    InvalidInput,
    /// Relative time was asked for before the timeline had an anchor.
    #[error("The timeline has no anchor yet, ingest a record first")]
    NotAnchored,
    #[error("No record at index {index}")]
    NoSuchRecord { index: usize },
}
