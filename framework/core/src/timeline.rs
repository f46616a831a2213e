use crate::error::RunError;
use chrono::{DateTime, TimeDelta, Utc};
use smk_log_model::LogRecord;
use std::sync::Arc;

/// Every record of a run in arrival order, with the anchor used for relative times.
///
/// Records are only ever appended. An index into the timeline stays valid for the life of the run.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    started: Option<DateTime<Utc>>,
    records: Vec<Arc<LogRecord>>,
}

impl Timeline {
    /// An empty timeline that takes its anchor from the first appended record.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty timeline with a fixed anchor.
    pub fn anchored(started: DateTime<Utc>) -> Self {
        Self {
            started: Some(started),
            records: Vec::new(),
        }
    }

    /// Append a record, returning its index.
    pub fn append(&mut self, record: Arc<LogRecord>) -> usize {
        if self.started.is_none() {
            self.started = Some(record.created);
        }

        self.records.push(record);
        self.records.len() - 1
    }

    pub fn started(&self) -> Option<DateTime<Utc>> {
        self.started
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<LogRecord>> {
        self.records.get(index)
    }

    /// All records appended so far, in arrival order.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &Arc<LogRecord>> + '_ {
        self.records.iter()
    }

    /// Records from `offset` onwards, for readers that have already seen the earlier ones.
    pub fn entries_from(&self, offset: usize) -> &[Arc<LogRecord>] {
        self.records.get(offset..).unwrap_or_default()
    }

    /// Time of `record` relative to the anchor.
    pub fn relative_time(&self, record: &LogRecord) -> Result<TimeDelta, RunError> {
        self.relative_time_of(record.created)
    }

    /// Time of an arbitrary timestamp relative to the anchor.
    pub fn relative_time_of(&self, at: DateTime<Utc>) -> Result<TimeDelta, RunError> {
        let started = self.started.ok_or(RunError::NotAnchored)?;
        Ok(at - started)
    }
}
