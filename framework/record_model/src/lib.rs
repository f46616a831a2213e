mod payload;
mod reader;
mod record;

pub use payload::{EventKind, Payload};
pub use reader::{open_logfile, RecordReader};
pub use record::{DecodeError, LogRecord, RecordError};

/// Job identifier, assigned by the workflow engine and unique within one run.
pub type JobId = u64;
