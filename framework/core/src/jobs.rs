use chrono::{DateTime, TimeDelta, Utc};
use indexmap::map::Entry;
use indexmap::IndexMap;
use smk_log_model::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum JobStatus {
    #[display("pending")]
    Pending,
    #[display("running")]
    Running,
    #[display("finished")]
    Finished,
    #[display("error")]
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Error)
    }
}

/// Lifecycle state of one job, as far as the log has reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub id: JobId,
    /// The rule that produced the job.
    ///
    /// Taken from the first event that names it. A job first seen through a terminal event has no
    /// rule name until some later event provides one.
    pub rule_name: Option<String>,
    pub status: JobStatus,
    /// Set at most once, by the first start event.
    pub started: Option<DateTime<Utc>>,
    /// Set at most once, by the first terminal event.
    pub finished: Option<DateTime<Utc>>,
}

impl JobInfo {
    fn new(id: JobId) -> Self {
        Self {
            id,
            rule_name: None,
            status: JobStatus::Pending,
            started: None,
            finished: None,
        }
    }

    /// Time between start and finish, when both are known.
    pub fn duration(&self) -> Option<TimeDelta> {
        Some(self.finished? - self.started?)
    }
}

/// A job lifecycle change extracted from a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Started {
        id: JobId,
        rule_name: Option<String>,
        at: DateTime<Utc>,
    },
    Succeeded {
        id: JobId,
        at: DateTime<Utc>,
    },
    Failed {
        id: JobId,
        at: DateTime<Utc>,
    },
}

impl JobEvent {
    pub fn id(&self) -> JobId {
        match self {
            JobEvent::Started { id, .. }
            | JobEvent::Succeeded { id, .. }
            | JobEvent::Failed { id, .. } => *id,
        }
    }
}

/// What applying a [JobEvent] did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The job was not known and has been created.
    Created,
    /// An existing job gained a field or changed status.
    Updated,
    /// The event repeated something already recorded and changed nothing.
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub running: usize,
    pub finished: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn tally<'a>(jobs: impl IntoIterator<Item = &'a JobInfo>) -> Self {
        jobs.into_iter().fold(Self::default(), |mut counts, job| {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Finished => counts.finished += 1,
                JobStatus::Error => counts.error += 1,
            }
            counts
        })
    }
}

/// All jobs seen in a run, keyed by id and kept in the order they were first seen.
///
/// Entries are never removed. Fields that are set exactly once ([JobInfo::started],
/// [JobInfo::finished], [JobInfo::rule_name]) are never overwritten and a terminal status is
/// never left.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: IndexMap<JobId, JobInfo>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: JobId) -> Option<&JobInfo> {
        self.jobs.get(&id)
    }

    /// All jobs in first-seen order.
    pub fn all(&self) -> impl ExactSizeIterator<Item = &JobInfo> + '_ {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts::tally(self.jobs.values())
    }

    pub fn apply(&mut self, event: JobEvent) -> Applied {
        match self.jobs.entry(event.id()) {
            Entry::Vacant(entry) => {
                log::debug!("First sighting of job {} from {:?}", entry.key(), event);
                let mut job = JobInfo::new(*entry.key());
                transition(&mut job, event);
                entry.insert(job);
                Applied::Created
            }
            Entry::Occupied(mut entry) => {
                if transition(entry.get_mut(), event) {
                    Applied::Updated
                } else {
                    log::debug!("Job {} unchanged by repeated event", entry.key());
                    Applied::Ignored
                }
            }
        }
    }
}

/// Apply `event` to `job`, returning whether anything changed.
fn transition(job: &mut JobInfo, event: JobEvent) -> bool {
    match event {
        JobEvent::Started { rule_name, at, .. } => {
            let mut changed = false;
            if job.rule_name.is_none() && rule_name.is_some() {
                job.rule_name = rule_name;
                changed = true;
            }
            // A start that arrives after the job already ended does not reopen it.
            if job.started.is_none() && !job.status.is_terminal() {
                job.started = Some(at);
                job.status = JobStatus::Running;
                changed = true;
            }
            changed
        }
        JobEvent::Succeeded { at, .. } => finish(job, JobStatus::Finished, at),
        JobEvent::Failed { at, .. } => finish(job, JobStatus::Error, at),
    }
}

fn finish(job: &mut JobInfo, status: JobStatus, at: DateTime<Utc>) -> bool {
    if job.status.is_terminal() {
        return false;
    }

    job.finished = Some(at);
    job.status = status;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn start(id: JobId, rule: Option<&str>, secs: i64) -> JobEvent {
        JobEvent::Started {
            id,
            rule_name: rule.map(str::to_string),
            at: ts(secs),
        }
    }

    #[test]
    fn start_then_success() {
        let mut registry = JobRegistry::new();
        assert_eq!(registry.apply(start(1, Some("align"), 10)), Applied::Created);
        assert_eq!(
            registry.apply(JobEvent::Succeeded { id: 1, at: ts(20) }),
            Applied::Updated
        );

        assert_eq!(
            registry.get(1),
            Some(&JobInfo {
                id: 1,
                rule_name: Some("align".to_string()),
                status: JobStatus::Finished,
                started: Some(ts(10)),
                finished: Some(ts(20)),
            })
        );
        assert_eq!(registry.get(1).unwrap().duration(), Some(TimeDelta::seconds(10)));
    }

    #[test]
    fn failure_without_start_creates_job() {
        let mut registry = JobRegistry::new();
        assert_eq!(
            registry.apply(JobEvent::Failed { id: 9, at: ts(5) }),
            Applied::Created
        );

        let job = registry.get(9).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.started, None);
        assert_eq!(job.finished, Some(ts(5)));
        assert_eq!(job.duration(), None);
    }

    #[test]
    fn duplicate_start_is_ignored() {
        let mut registry = JobRegistry::new();
        registry.apply(start(1, Some("align"), 10));
        assert_eq!(registry.apply(start(1, Some("other"), 15)), Applied::Ignored);

        let job = registry.get(1).unwrap();
        assert_eq!(job.started, Some(ts(10)));
        assert_eq!(job.rule_name.as_deref(), Some("align"));
    }

    #[test]
    fn later_start_fills_missing_rule_name() {
        let mut registry = JobRegistry::new();
        registry.apply(start(1, None, 10));
        assert_eq!(registry.apply(start(1, Some("align"), 10)), Applied::Updated);

        let job = registry.get(1).unwrap();
        assert_eq!(job.rule_name.as_deref(), Some("align"));
        assert_eq!(job.started, Some(ts(10)));
    }

    #[test]
    fn terminal_status_never_regresses() {
        let mut registry = JobRegistry::new();
        registry.apply(start(1, Some("align"), 10));
        registry.apply(JobEvent::Succeeded { id: 1, at: ts(20) });

        assert_eq!(
            registry.apply(JobEvent::Failed { id: 1, at: ts(25) }),
            Applied::Ignored
        );
        assert_eq!(registry.apply(start(1, None, 30)), Applied::Ignored);

        let job = registry.get(1).unwrap();
        assert_eq!(job.status, JobStatus::Finished);
        assert_eq!(job.finished, Some(ts(20)));
        assert_eq!(job.started, Some(ts(10)));
    }

    #[test]
    fn start_after_terminal_first_keeps_status() {
        let mut registry = JobRegistry::new();
        registry.apply(JobEvent::Succeeded { id: 2, at: ts(5) });
        assert_eq!(registry.apply(start(2, Some("sort"), 6)), Applied::Updated);

        let job = registry.get(2).unwrap();
        assert_eq!(job.status, JobStatus::Finished);
        assert_eq!(job.started, None);
        assert_eq!(job.rule_name.as_deref(), Some("sort"));
    }

    #[test]
    fn all_keeps_first_seen_order() {
        let mut registry = JobRegistry::new();
        for id in [5, 1, 3] {
            registry.apply(start(id, None, 1));
        }
        registry.apply(JobEvent::Succeeded { id: 1, at: ts(2) });
        registry.apply(JobEvent::Failed { id: 7, at: ts(3) });

        let ids = registry.all().map(|job| job.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![5, 1, 3, 7]);

        assert_eq!(
            registry.counts(),
            StatusCounts {
                pending: 0,
                running: 2,
                finished: 1,
                error: 1,
            }
        );
    }

    #[test]
    fn status_display() {
        assert_eq!(JobStatus::Running.to_string(), "running");
        assert_eq!(JobStatus::Error.to_string(), "error");
    }
}
