use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde_json::Value;
use smk_log_core::prelude::{
    format_elapsed, format_elapsed_opt, JobInfo, LevelClassifier, RunError, RunSnapshot,
    StatusCounts,
};
use smk_log_model::LogRecord;
use tabled::settings::Style;
use tabled::{Table, Tabled};

const MESSAGE_WIDTH: usize = 80;

#[derive(Tabled, Debug, PartialEq)]
pub struct LogRow {
    #[tabled(rename = "Time")]
    pub time: String,
    #[tabled(rename = "Lvl")]
    pub level: &'static str,
    #[tabled(rename = "Event")]
    pub event: String,
    #[tabled(rename = "Jobs")]
    pub jobs: String,
    #[tabled(rename = "Message")]
    pub message: String,
}

#[derive(Tabled, Debug, PartialEq)]
pub struct JobRow {
    #[tabled(rename = "Id")]
    pub id: u64,
    #[tabled(rename = "Rule")]
    pub rule: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Started")]
    pub started: String,
    #[tabled(rename = "Duration")]
    pub duration: String,
}

/// One line of the detail view of a single record.
#[derive(Tabled, Debug, PartialEq)]
pub struct DetailRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub fn log_rows(snapshot: &RunSnapshot, classifier: &LevelClassifier) -> Vec<LogRow> {
    snapshot
        .records
        .iter()
        .map(|record| LogRow {
            time: relative(snapshot, record.created),
            level: classifier.classify_record(record).marker(),
            event: record.payload.event_name().unwrap_or_default().to_string(),
            jobs: job_list(record),
            message: short_message(record),
        })
        .collect()
}

pub fn job_rows(snapshot: &RunSnapshot) -> Vec<JobRow> {
    snapshot.jobs.iter().map(|job| job_row(snapshot, job)).collect()
}

/// The common header of the record at `index` followed by its kind-specific fields.
pub fn detail_rows(
    snapshot: &RunSnapshot,
    index: usize,
    classifier: &LevelClassifier,
) -> Result<Vec<DetailRow>, RunError> {
    let record = snapshot
        .records
        .get(index)
        .ok_or(RunError::NoSuchRecord { index })?;

    let header = [
        ("Time", relative(snapshot, record.created)),
        ("Level", classifier.classify_record(record).to_string()),
        (
            "Event",
            record.payload.event_name().unwrap_or_default().to_string(),
        ),
        ("Jobs", job_list(record)),
        ("Message", record.message.clone().unwrap_or_default()),
    ];

    Ok(header
        .into_iter()
        .map(|(field, value)| DetailRow {
            field: field.to_string(),
            value,
        })
        .chain(
            record
                .payload
                .fields()
                .into_iter()
                .map(|(field, value)| DetailRow {
                    field,
                    value: field_text(value),
                }),
        )
        .collect())
}

pub fn log_table(snapshot: &RunSnapshot, classifier: &LevelClassifier) -> Table {
    let mut table = Table::new(log_rows(snapshot, classifier));
    table.with(Style::modern());
    table
}

pub fn job_table(snapshot: &RunSnapshot) -> Table {
    let mut table = Table::new(job_rows(snapshot));
    table.with(Style::modern());
    table
}

pub fn detail_table(
    snapshot: &RunSnapshot,
    index: usize,
    classifier: &LevelClassifier,
) -> Result<Table, RunError> {
    let mut table = Table::new(detail_rows(snapshot, index, classifier)?);
    table.with(Style::modern());
    Ok(table)
}

pub fn status_line(counts: &StatusCounts) -> String {
    format!(
        "{} running, {} finished, {} failed",
        counts.running,
        counts.finished,
        counts.error
    )
}

fn job_row(snapshot: &RunSnapshot, job: &JobInfo) -> JobRow {
    JobRow {
        id: job.id,
        rule: job.rule_name.clone().unwrap_or_default(),
        status: job.status.to_string(),
        started: job
            .started
            .map(|started| relative(snapshot, started))
            .unwrap_or_default(),
        duration: format_elapsed_opt(job.duration(), ""),
    }
}

fn relative(snapshot: &RunSnapshot, at: DateTime<Utc>) -> String {
    snapshot
        .started
        .map(|started| format_elapsed(at - started))
        .unwrap_or_default()
}

fn job_list(record: &LogRecord) -> String {
    record.associated_jobs().iter().join(" ")
}

fn field_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn short_message(record: &LogRecord) -> String {
    let message = record.message.as_deref().unwrap_or_default().trim();
    let first_line = message.lines().next().unwrap_or_default();

    if first_line.chars().count() > MESSAGE_WIDTH || first_line.len() < message.len() {
        let truncated = first_line
            .chars()
            .take(MESSAGE_WIDTH - 1)
            .collect::<String>();
        format!("{truncated}…")
    } else {
        first_line.to_string()
    }
}
