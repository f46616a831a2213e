use crate::error::RunError;
use crate::jobs::{Applied, JobEvent, JobRegistry};
use crate::timeline::Timeline;
use chrono::{DateTime, TimeDelta, Utc};
use smk_log_model::{LogRecord, Payload};
use std::sync::Arc;

/// How a record was correlated with the job registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// The record does not describe a job lifecycle change.
    Unattributed,
    /// The record claimed to be a known event but its payload could not be read. It is kept on
    /// the timeline as an ordinary log line.
    Malformed,
    /// The record produced `events` job events, `created` of which introduced a new job.
    Jobs { events: usize, created: usize },
}

/// Result of [RunState::ingest].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ingested {
    /// Position of the record in the timeline.
    pub index: usize,
    pub correlation: Correlation,
}

/// The reconstructed state of one run: its timeline and its jobs.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    timeline: Timeline,
    jobs: JobRegistry,
}

impl RunState {
    /// An empty run with relative times measured from `anchor`.
    pub fn new(anchor: DateTime<Utc>) -> Self {
        Self {
            timeline: Timeline::anchored(anchor),
            jobs: JobRegistry::new(),
        }
    }

    /// An empty run that is anchored by the first record ingested.
    pub fn unanchored() -> Self {
        Self::default()
    }

    /// Build a run by ingesting every record of `records`.
    ///
    /// With no `anchor`, the first record anchors the run and an empty input is rejected with
    /// [RunError::InvalidInput].
    pub fn from_records<I>(anchor: Option<DateTime<Utc>>, records: I) -> Result<Self, RunError>
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let mut run = match anchor {
            Some(anchor) => Self::new(anchor),
            None => Self::unanchored(),
        };

        for record in records {
            run.ingest(record);
        }

        if run.started().is_none() {
            return Err(RunError::InvalidInput);
        }

        Ok(run)
    }

    /// Record `record` on the timeline and apply any job events it carries.
    pub fn ingest(&mut self, record: LogRecord) -> Ingested {
        let record = Arc::new(record);
        let events = job_events(&record);
        let index = self.timeline.append(record);

        let correlation = match events {
            JobEvents::None => Correlation::Unattributed,
            JobEvents::Malformed => Correlation::Malformed,
            JobEvents::Some(events) => {
                let count = events.len();
                let created = events
                    .into_iter()
                    .map(|event| self.jobs.apply(event))
                    .filter(|applied| *applied == Applied::Created)
                    .count();

                Correlation::Jobs {
                    events: count,
                    created,
                }
            }
        };

        Ingested { index, correlation }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    pub fn started(&self) -> Option<DateTime<Utc>> {
        self.timeline.started()
    }

    /// Relative time of the record at `index` on the timeline.
    pub fn relative_time(&self, index: usize) -> Result<TimeDelta, RunError> {
        let record = self
            .timeline
            .get(index)
            .ok_or(RunError::NoSuchRecord { index })?;
        self.timeline.relative_time(record)
    }
}

enum JobEvents {
    None,
    Malformed,
    Some(Vec<JobEvent>),
}

fn job_events(record: &LogRecord) -> JobEvents {
    let at = record.created;

    let events = match &record.payload {
        Payload::JobInfo {
            job_id, rule_name, ..
        } => vec![JobEvent::Started {
            id: *job_id,
            rule_name: Some(rule_name.clone()),
            at,
        }],
        Payload::JobStarted { job_ids } => job_ids
            .iter()
            .map(|id| JobEvent::Started {
                id: *id,
                rule_name: None,
                at,
            })
            .collect(),
        Payload::JobFinished { job_ids } => job_ids
            .iter()
            .map(|id| JobEvent::Succeeded { id: *id, at })
            .collect(),
        Payload::JobError { job_ids } | Payload::GroupError { job_ids, .. } => job_ids
            .iter()
            .map(|id| JobEvent::Failed { id: *id, at })
            .collect(),
        Payload::Malformed { event, .. } => {
            log::warn!("Keeping malformed `{event}` record as a plain log line");
            return JobEvents::Malformed;
        }
        _ => return JobEvents::None,
    };

    if events.is_empty() {
        JobEvents::None
    } else {
        JobEvents::Some(events)
    }
}
