use crate::payload::Payload;
use crate::JobId;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a single line could not be turned into a [LogRecord].
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("not a valid record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid `created` timestamp: {0}")]
    InvalidTimestamp(f64),
    #[error("line is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// A [RecordError] located in its source, as produced by [crate::RecordReader].
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: RecordError,
    },
    #[error("line {line}: failed to read: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

impl DecodeError {
    /// The 1-based line number the error occurred on.
    pub fn line(&self) -> usize {
        match self {
            DecodeError::Record { line, .. } | DecodeError::Io { line, .. } => *line,
        }
    }
}

/// One decoded entry of a workflow execution log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// When the record was created. Non-decreasing across a log.
    pub created: DateTime<Utc>,
    /// Severity name as written by the producer, for example `INFO`.
    pub levelname: Option<String>,
    pub message: Option<String>,
    pub payload: Payload,
}

/// The wire shape of a record before its payload is interpreted.
#[derive(Deserialize)]
struct RawRecord {
    created: f64,
    #[serde(default)]
    levelname: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    event: Option<Value>,
    #[serde(default, rename = "levelno")]
    _levelno: Option<Value>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl LogRecord {
    pub fn new(created: DateTime<Utc>, payload: Payload) -> Self {
        Self {
            created,
            levelname: None,
            message: None,
            payload,
        }
    }

    pub fn with_level(mut self, levelname: impl Into<String>) -> Self {
        self.levelname = Some(levelname.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Decode a record from one line of a JSON-lines log.
    ///
    /// Only the common header can make this fail. Anything wrong with the kind-specific fields is
    /// kept on the record as [Payload::Malformed].
    pub fn from_json_line(line: &str) -> Result<Self, RecordError> {
        let raw: RawRecord = serde_json::from_str(line)?;
        let created =
            timestamp_from_secs(raw.created).ok_or(RecordError::InvalidTimestamp(raw.created))?;

        Ok(Self {
            created,
            levelname: raw.levelname.and_then(header_text),
            message: raw.message.and_then(header_text),
            payload: Payload::interpret(raw.event.and_then(header_text), raw.fields),
        })
    }

    /// Sorted, de-duplicated ids of the jobs this record refers to.
    pub fn associated_jobs(&self) -> Vec<JobId> {
        self.payload.job_ids().into_iter().sorted().dedup().collect()
    }
}

/// Header fields are meant to be strings. Anything else is kept as its JSON text, which for a
/// level name never matches a known level.
fn header_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn timestamp_from_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }

    let micros = (secs * 1_000_000.0).round();
    if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
        return None;
    }

    DateTime::from_timestamp_micros(micros as i64)
}
