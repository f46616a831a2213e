use anyhow::Context;
use smk_log_core::prelude::{shared, Correlation, Ingested, RunError, RunReader, RunState};
use smk_log_model::{open_logfile, DecodeError, LogRecord};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub mod report;

/// Counters gathered while reading a log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Records added to the timeline.
    pub records: usize,
    /// Lines that could not be decoded and were left out.
    pub skipped: usize,
    /// Records kept as plain lines because their payload could not be read.
    pub malformed: usize,
    /// Jobs first seen while loading.
    pub jobs_created: usize,
}

/// Feed decoded records to `ingest` until the source is exhausted.
///
/// Undecodable lines are logged and skipped, unless `strict` is set in which case the first one
/// ends the load with an error. A failure to read from the source always ends the load.
pub fn ingest_records<I, F>(records: I, strict: bool, mut ingest: F) -> anyhow::Result<LoadStats>
where
    I: IntoIterator<Item = Result<LogRecord, DecodeError>>,
    F: FnMut(LogRecord) -> Ingested,
{
    let mut stats = LoadStats::default();

    for record in records {
        let record = match record {
            Ok(record) => record,
            Err(e @ DecodeError::Io { .. }) => return Err(e).context("Failed to read log"),
            Err(e) if strict => return Err(e).context("Failed to decode log"),
            Err(e) => {
                log::warn!("Skipping undecodable record: {e}");
                stats.skipped += 1;
                continue;
            }
        };

        let ingested = ingest(record);
        stats.records += 1;
        match ingested.correlation {
            Correlation::Malformed => stats.malformed += 1,
            Correlation::Jobs { created, .. } => stats.jobs_created += created,
            Correlation::Unattributed => {}
        }
    }

    Ok(stats)
}

/// Read a whole log file into a run.
pub fn load_run(path: impl AsRef<Path>, strict: bool) -> anyhow::Result<(RunState, LoadStats)> {
    let path = path.as_ref();
    let records = open_logfile(path)?;

    let mut run = RunState::unanchored();
    let stats = ingest_records(records, strict, |record| run.ingest(record))?;

    if run.started().is_none() {
        return Err(RunError::InvalidInput)
            .with_context(|| format!("No records in {}", path.display()));
    }

    log::info!("Loaded {} records from {}", stats.records, path.display());
    Ok((run, stats))
}

/// Read a log file on a background thread.
///
/// The returned reader can be used while the load is still in progress. The handle yields the
/// load statistics once the file has been read to the end.
pub fn spawn_ingest(
    path: impl AsRef<Path>,
    strict: bool,
) -> anyhow::Result<(RunReader, JoinHandle<anyhow::Result<LoadStats>>)> {
    let path = path.as_ref().to_path_buf();
    let records = open_logfile(&path)?;
    let (mut writer, reader) = shared(RunState::unanchored());

    let handle = std::thread::Builder::new()
        .name("ingest".to_string())
        .spawn(move || {
            let stats = ingest_records(records, strict, |record| writer.ingest(record))?;
            log::info!("Loaded {} records from {}", stats.records, path.display());
            Ok(stats)
        })
        .context("Failed to start ingest thread")?;

    Ok((reader, handle))
}

/// Wait for a background load, handing each batch of newly ingested records to `on_records` as
/// it appears.
///
/// Every record reaches `on_records` exactly once and in timeline order, including those ingested
/// between the last poll and the end of the load.
pub fn follow_ingest<F>(
    reader: &RunReader,
    handle: JoinHandle<anyhow::Result<LoadStats>>,
    poll: Duration,
    mut on_records: F,
) -> anyhow::Result<LoadStats>
where
    F: FnMut(&[Arc<LogRecord>]),
{
    let mut seen = 0;
    loop {
        let finished = handle.is_finished();

        let batch = reader.records_since(seen);
        if !batch.is_empty() {
            seen += batch.len();
            on_records(&batch);
        }

        if finished {
            break;
        }
        std::thread::sleep(poll);
    }

    handle
        .join()
        .map_err(|e| anyhow::anyhow!("Ingest thread panicked: {:?}", e))?
}
