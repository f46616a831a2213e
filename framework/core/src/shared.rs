use crate::jobs::{JobInfo, StatusCounts};
use crate::run::{Ingested, RunState};
use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard};
use smk_log_model::{JobId, LogRecord};
use std::sync::Arc;

/// Split a run into its single writer and a cloneable reader.
///
/// Each [RunWriter::ingest] holds the write lock for the whole record, so a reader sees either
/// none or all of the effects of a record.
pub fn shared(run: RunState) -> (RunWriter, RunReader) {
    let inner = Arc::new(RwLock::new(run));
    (
        RunWriter {
            inner: inner.clone(),
        },
        RunReader { inner },
    )
}

/// The only handle that can mutate a shared run. Not `Clone`.
#[derive(Debug)]
pub struct RunWriter {
    inner: Arc<RwLock<RunState>>,
}

impl RunWriter {
    pub fn ingest(&mut self, record: LogRecord) -> Ingested {
        self.inner.write().ingest(record)
    }

    /// A new reader for the same run.
    pub fn reader(&self) -> RunReader {
        RunReader {
            inner: self.inner.clone(),
        }
    }
}

/// Read-only view of a run that may be ingesting on another thread.
#[derive(Debug, Clone)]
pub struct RunReader {
    inner: Arc<RwLock<RunState>>,
}

/// A copy of a run taken at one point between two ingested records.
#[derive(Debug, Clone)]
pub struct RunSnapshot {
    pub started: Option<DateTime<Utc>>,
    pub records: Vec<Arc<LogRecord>>,
    pub jobs: Vec<JobInfo>,
}

impl RunSnapshot {
    /// Job counts by status, as of when the snapshot was taken.
    pub fn counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.jobs)
    }
}

impl RunReader {
    /// Borrow the run directly. Ingestion is blocked while the guard is held, so keep it short.
    pub fn read(&self) -> RwLockReadGuard<'_, RunState> {
        self.inner.read()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let run = self.inner.read();
        RunSnapshot {
            started: run.started(),
            records: run.timeline().entries().cloned().collect(),
            jobs: run.jobs().all().cloned().collect(),
        }
    }

    /// Records appended since a reader last saw `offset` of them.
    pub fn records_since(&self, offset: usize) -> Vec<Arc<LogRecord>> {
        self.inner.read().timeline().entries_from(offset).to_vec()
    }

    pub fn job(&self, id: JobId) -> Option<JobInfo> {
        self.inner.read().jobs().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().timeline().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
