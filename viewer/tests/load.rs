use pretty_assertions::assert_eq;
use smk_log_core::prelude::{shared, JobStatus, LevelClassifier, RunError, RunState, StatusCounts};
use smk_log_model::RecordReader;
use smk_log_viewer::report::{
    detail_rows, job_rows, log_rows, status_line, DetailRow, JobRow, LogRow,
};
use smk_log_viewer::{follow_ingest, ingest_records, load_run, spawn_ingest, LoadStats};
use std::io::{BufReader, Read, Write};
use std::time::Duration;
use tempfile::NamedTempFile;

const RUN_LOG: &str = r#"{"created": 1000.0, "levelname": "INFO", "message": "Building DAG of jobs..."}
{"created": 1001.0, "levelname": "INFO", "event": "run_info", "per_rule_job_counts": {"align": 1, "all": 1}, "total_job_count": 2}
{"created": 1002.0, "levelname": "INFO", "event": "job_info", "jobid": 1, "rule_name": "align", "threads": 4, "message": "rule align:\n    input: a.fq"}
{"created": 1002.0, "levelname": "INFO", "event": "job_started", "job_ids": [1]}
{"created": 1003.5, "levelname": "VERBOSE", "event": "shell_cmd", "jobid": 1, "shellcmd": "bwa mem ref.fa a.fq > a.bam"}
{"created": 1004.0, "levelname": "INFO", "event": "resources_info", "cores": 8}
{oops
{"created": 1010.0, "levelname": "INFO", "event": "job_finished", "job_id": 1}
{"created": 1011.0, "event": "job_error", "jobid": "seven"}
{"created": 3725.0, "levelname": "ERROR", "event": "job_error", "jobid": 2}
"#;

fn write_log(contents: &str) -> anyhow::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    Ok(file)
}

#[test]
fn load_run_from_file() -> anyhow::Result<()> {
    let file = write_log(RUN_LOG)?;
    let (run, stats) = load_run(file.path(), false)?;

    assert_eq!(
        stats,
        LoadStats {
            records: 9,
            skipped: 1,
            malformed: 1,
            jobs_created: 2,
        }
    );
    assert_eq!(run.timeline().len(), 9);

    let align = run.jobs().get(1).unwrap();
    assert_eq!(align.rule_name.as_deref(), Some("align"));
    assert_eq!(align.status, JobStatus::Finished);
    assert_eq!(align.duration(), Some(chrono::TimeDelta::seconds(8)));

    assert_eq!(run.jobs().get(2).unwrap().status, JobStatus::Error);
    assert_eq!(
        run.jobs().counts(),
        StatusCounts {
            pending: 0,
            running: 0,
            finished: 1,
            error: 1,
        }
    );

    Ok(())
}

#[test]
fn strict_load_stops_at_bad_line() -> anyhow::Result<()> {
    let file = write_log(RUN_LOG)?;
    let err = load_run(file.path(), true).unwrap_err();
    assert!(format!("{err:#}").contains("line 7"), "{err:#}");
    Ok(())
}

#[test]
fn empty_log_is_rejected() -> anyhow::Result<()> {
    let file = write_log("\n\n")?;
    let err = load_run(file.path(), false).unwrap_err();
    assert!(err.to_string().contains("No records"));
    Ok(())
}

#[test]
fn background_load_matches_direct_load() -> anyhow::Result<()> {
    let file = write_log(RUN_LOG)?;

    let (reader, handle) = spawn_ingest(file.path(), false)?;
    let stats = handle.join().expect("Ingest thread panicked")?;
    let (run, direct_stats) = load_run(file.path(), false)?;

    assert_eq!(stats, direct_stats);
    let snapshot = reader.snapshot();
    assert_eq!(snapshot.records.len(), run.timeline().len());
    assert_eq!(snapshot.jobs, run.jobs().all().cloned().collect::<Vec<_>>());

    Ok(())
}

#[test]
fn report_rows() -> anyhow::Result<()> {
    let file = write_log(RUN_LOG)?;
    let (reader, handle) = spawn_ingest(file.path(), false)?;
    handle.join().expect("Ingest thread panicked")?;
    let snapshot = reader.snapshot();

    let logs = log_rows(&snapshot, &LevelClassifier::default());
    assert_eq!(
        logs[2],
        LogRow {
            time: "0:00:02".to_string(),
            level: "i",
            event: "job_info".to_string(),
            jobs: "1".to_string(),
            message: "rule align:…".to_string(),
        }
    );
    assert_eq!(logs[4].level, "?", "VERBOSE is not a known level");
    assert_eq!(logs[5].event, "resources_info");
    assert_eq!(logs[7].event, "job_error");
    assert_eq!(logs[7].jobs, "");

    assert_eq!(
        job_rows(&snapshot),
        vec![
            JobRow {
                id: 1,
                rule: "align".to_string(),
                status: "finished".to_string(),
                started: "0:00:02".to_string(),
                duration: "0:00:08".to_string(),
            },
            JobRow {
                id: 2,
                rule: String::new(),
                status: "error".to_string(),
                started: String::new(),
                duration: String::new(),
            },
        ]
    );

    assert_eq!(snapshot.counts(), reader.read().jobs().counts());
    assert_eq!(
        status_line(&snapshot.counts()),
        "0 running, 1 finished, 1 failed"
    );

    Ok(())
}

fn detail(field: &str, value: &str) -> DetailRow {
    DetailRow {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[test]
fn record_details_show_payload_fields() -> anyhow::Result<()> {
    let file = write_log(RUN_LOG)?;
    let (reader, handle) = spawn_ingest(file.path(), false)?;
    handle.join().expect("Ingest thread panicked")?;
    let snapshot = reader.snapshot();
    let classifier = LevelClassifier::default();

    assert_eq!(
        detail_rows(&snapshot, 4, &classifier)?,
        vec![
            detail("Time", "0:00:03"),
            detail("Level", "unknown"),
            detail("Event", "shell_cmd"),
            detail("Jobs", "1"),
            detail("Message", ""),
            detail("rule_name", ""),
            detail("shellcmd", "bwa mem ref.fa a.fq > a.bam"),
        ]
    );

    let unknown = detail_rows(&snapshot, 5, &classifier)?;
    assert_eq!(unknown[2], detail("Event", "resources_info"));
    assert_eq!(&unknown[5..], &[detail("cores", "8")]);

    let malformed = detail_rows(&snapshot, 7, &classifier)?;
    assert_eq!(malformed.len(), 6, "Job id fields are not repeated");
    assert_eq!(malformed[5].field, "decode_error");

    assert_eq!(
        detail_rows(&snapshot, 9, &classifier).unwrap_err(),
        RunError::NoSuchRecord { index: 9 }
    );

    Ok(())
}

#[test]
fn follow_ingest_sees_every_record_once() -> anyhow::Result<()> {
    let file = write_log(RUN_LOG)?;
    let (reader, handle) = spawn_ingest(file.path(), false)?;

    let mut batches = 0;
    let mut followed = Vec::new();
    let stats = follow_ingest(&reader, handle, Duration::from_millis(1), |batch| {
        batches += 1;
        followed.extend(batch.iter().cloned());
    })?;

    assert!(batches >= 1);
    assert_eq!(stats.records, 9);
    assert_eq!(followed, reader.snapshot().records);

    Ok(())
}

#[test]
fn follow_ingest_reports_load_failure() -> anyhow::Result<()> {
    let file = write_log(RUN_LOG)?;
    let (reader, handle) = spawn_ingest(file.path(), true)?;

    let mut followed = 0;
    let err = follow_ingest(&reader, handle, Duration::from_millis(1), |batch| {
        followed += batch.len();
    })
    .unwrap_err();

    assert!(format!("{err:#}").contains("line 7"), "{err:#}");
    assert_eq!(followed, 6, "Records before the bad line are still delivered");

    Ok(())
}

#[test]
fn directory_is_not_a_log() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let err = load_run(dir.path(), false).unwrap_err();
    assert!(err.to_string().contains("not a regular file"), "{err:#}");
    assert!(spawn_ingest(dir.path(), false).is_err());
    Ok(())
}

/// A source whose every read fails.
struct Unreadable;

impl Read for Unreadable {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("input/output error"))
    }
}

#[test]
fn read_failure_ends_lenient_load() {
    let (mut writer, reader) = shared(RunState::unanchored());
    let records = RecordReader::new(BufReader::new(Unreadable));

    let err = ingest_records(records, false, |record| writer.ingest(record)).unwrap_err();

    assert!(err.to_string().contains("Failed to read log"), "{err:#}");
    assert!(format!("{err:#}").contains("input/output error"), "{err:#}");
    assert!(reader.is_empty());
}
