use crate::JobId;
use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Keys that carry job ids on the wire. They are shown through [Payload::job_ids] instead of as
/// payload fields.
const JOB_ID_KEYS: [&str; 4] = ["jobid", "job_id", "job_ids", "jobs"];

/// The event tags that the workflow engine writes into the `event` field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    WorkflowStarted,
    RunInfo,
    JobInfo,
    JobStarted,
    ShellCmd,
    JobFinished,
    JobError,
    GroupInfo,
    GroupError,
    Progress,
    Error,
}

impl EventKind {
    /// Look up a wire tag, returning `None` for tags this crate does not know.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::deserialize(StrDeserializer::<ValueError>::new(tag)).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::WorkflowStarted => "workflow_started",
            EventKind::RunInfo => "run_info",
            EventKind::JobInfo => "job_info",
            EventKind::JobStarted => "job_started",
            EventKind::ShellCmd => "shell_cmd",
            EventKind::JobFinished => "job_finished",
            EventKind::JobError => "job_error",
            EventKind::GroupInfo => "group_info",
            EventKind::GroupError => "group_error",
            EventKind::Progress => "progress",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific part of a record.
///
/// The variants that can be decoded from the wire are selected by the `event` field. Records
/// without an `event` field are [Payload::Plain] log lines. [Payload::Unknown] and
/// [Payload::Malformed] are never decoded directly; they are produced by [Payload::interpret] so
/// that a record whose payload cannot be understood is still kept as a log line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Payload {
    #[serde(skip)]
    Plain,
    WorkflowStarted {
        workflow_id: Option<String>,
        snakefile: Option<String>,
    },
    RunInfo {
        #[serde(default, alias = "stats")]
        per_rule_job_counts: BTreeMap<String, u64>,
        #[serde(alias = "total")]
        total_job_count: Option<u64>,
    },
    JobInfo {
        #[serde(alias = "jobid")]
        job_id: JobId,
        rule_name: String,
        threads: Option<u32>,
        reason: Option<String>,
        #[serde(default)]
        wildcards: BTreeMap<String, Value>,
    },
    JobStarted {
        #[serde(
            alias = "jobid",
            alias = "job_id",
            alias = "jobs",
            deserialize_with = "one_or_many"
        )]
        job_ids: Vec<JobId>,
    },
    ShellCmd {
        #[serde(alias = "jobid")]
        job_id: Option<JobId>,
        rule_name: Option<String>,
        shellcmd: Option<String>,
    },
    JobFinished {
        #[serde(
            alias = "jobid",
            alias = "job_id",
            alias = "jobs",
            deserialize_with = "one_or_many"
        )]
        job_ids: Vec<JobId>,
    },
    JobError {
        #[serde(
            alias = "jobid",
            alias = "job_id",
            alias = "jobs",
            deserialize_with = "one_or_many"
        )]
        job_ids: Vec<JobId>,
    },
    GroupInfo {
        #[serde(alias = "groupid")]
        group_id: Option<String>,
        #[serde(default, alias = "jobs", deserialize_with = "one_or_many")]
        job_ids: Vec<JobId>,
    },
    GroupError {
        #[serde(alias = "groupid")]
        group_id: Option<String>,
        #[serde(default, alias = "jobs", deserialize_with = "one_or_many")]
        job_ids: Vec<JobId>,
    },
    Progress {
        done: u64,
        total: u64,
    },
    Error {
        exception: Option<String>,
        location: Option<String>,
        rule: Option<String>,
        traceback: Option<String>,
    },
    #[serde(skip)]
    Unknown {
        event: String,
        fields: Map<String, Value>,
    },
    #[serde(skip)]
    Malformed {
        event: EventKind,
        fields: Map<String, Value>,
        reason: String,
    },
}

impl Payload {
    /// Build the payload for a record from its `event` tag and the fields left over once the
    /// common header has been removed.
    ///
    /// This never fails. Unknown tags become [Payload::Unknown] and known tags whose fields do not
    /// have the expected shape become [Payload::Malformed].
    pub fn interpret(event: Option<String>, fields: Map<String, Value>) -> Self {
        let Some(event) = event else {
            return Payload::Plain;
        };

        let Some(kind) = EventKind::from_tag(&event) else {
            log::debug!("Unknown event tag `{event}`");
            return Payload::Unknown { event, fields };
        };

        let mut object = fields.clone();
        object.insert("event".to_string(), Value::String(event));

        match serde_json::from_value(Value::Object(object)) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Malformed `{kind}` payload: {e}");
                Payload::Malformed {
                    event: kind,
                    fields,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// The known event kind, if this payload came from (or claims to be) one.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Payload::Plain | Payload::Unknown { .. } => None,
            Payload::WorkflowStarted { .. } => Some(EventKind::WorkflowStarted),
            Payload::RunInfo { .. } => Some(EventKind::RunInfo),
            Payload::JobInfo { .. } => Some(EventKind::JobInfo),
            Payload::JobStarted { .. } => Some(EventKind::JobStarted),
            Payload::ShellCmd { .. } => Some(EventKind::ShellCmd),
            Payload::JobFinished { .. } => Some(EventKind::JobFinished),
            Payload::JobError { .. } => Some(EventKind::JobError),
            Payload::GroupInfo { .. } => Some(EventKind::GroupInfo),
            Payload::GroupError { .. } => Some(EventKind::GroupError),
            Payload::Progress { .. } => Some(EventKind::Progress),
            Payload::Error { .. } => Some(EventKind::Error),
            Payload::Malformed { event, .. } => Some(*event),
        }
    }

    /// The event tag to show for this payload, including tags that were not recognised.
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Payload::Unknown { event, .. } => Some(event),
            other => other.kind().map(|kind| kind.as_str()),
        }
    }

    /// Job ids mentioned by this payload, in the order they appear.
    pub fn job_ids(&self) -> Vec<JobId> {
        match self {
            Payload::JobInfo { job_id, .. } => vec![*job_id],
            Payload::ShellCmd { job_id, .. } => job_id.iter().copied().collect(),
            Payload::JobStarted { job_ids }
            | Payload::JobFinished { job_ids }
            | Payload::JobError { job_ids }
            | Payload::GroupInfo { job_ids, .. }
            | Payload::GroupError { job_ids, .. } => job_ids.clone(),
            _ => Vec::new(),
        }
    }

    /// The kind-specific fields of this payload as name/value pairs, for display.
    ///
    /// Job ids are left out. Fields of unrecognised payloads are listed as they were received.
    pub fn fields(&self) -> Vec<(String, Value)> {
        let named = |pairs: &[(&str, Value)]| {
            pairs
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect::<Vec<_>>()
        };

        match self {
            Payload::Plain
            | Payload::JobStarted { .. }
            | Payload::JobFinished { .. }
            | Payload::JobError { .. } => Vec::new(),
            Payload::WorkflowStarted {
                workflow_id,
                snakefile,
            } => named(&[
                ("workflow_id", json!(workflow_id)),
                ("snakefile", json!(snakefile)),
            ]),
            Payload::RunInfo {
                per_rule_job_counts,
                total_job_count,
            } => named(&[
                ("per_rule_job_counts", json!(per_rule_job_counts)),
                ("total_job_count", json!(total_job_count)),
            ]),
            Payload::JobInfo {
                rule_name,
                threads,
                reason,
                wildcards,
                ..
            } => named(&[
                ("rule_name", json!(rule_name)),
                ("threads", json!(threads)),
                ("reason", json!(reason)),
                ("wildcards", json!(wildcards)),
            ]),
            Payload::ShellCmd {
                rule_name,
                shellcmd,
                ..
            } => named(&[
                ("rule_name", json!(rule_name)),
                ("shellcmd", json!(shellcmd)),
            ]),
            Payload::GroupInfo { group_id, .. } | Payload::GroupError { group_id, .. } => {
                named(&[("group_id", json!(group_id))])
            }
            Payload::Progress { done, total } => {
                named(&[("done", json!(done)), ("total", json!(total))])
            }
            Payload::Error {
                exception,
                location,
                rule,
                traceback,
            } => named(&[
                ("exception", json!(exception)),
                ("location", json!(location)),
                ("rule", json!(rule)),
                ("traceback", json!(traceback)),
            ]),
            Payload::Unknown { fields, .. } => received_fields(fields),
            Payload::Malformed { fields, reason, .. } => {
                let mut pairs = received_fields(fields);
                pairs.push(("decode_error".to_string(), Value::String(reason.clone())));
                pairs
            }
        }
    }
}

fn received_fields(fields: &Map<String, Value>) -> Vec<(String, Value)> {
    fields
        .iter()
        .filter(|(name, _)| !JOB_ID_KEYS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<JobId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(JobId),
        Many(Vec<JobId>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(id) => vec![id],
        OneOrMany::Many(ids) => ids,
    })
}
