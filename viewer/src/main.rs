use anyhow::Context;
use smk_log_core::prelude::RunError;
use smk_log_viewer::report::{detail_table, job_table, log_table, status_line};
use smk_log_viewer::{follow_ingest, spawn_ingest};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> anyhow::Result<()> {
    let cli = smk_log_cli::init();
    let classifier = cli.classifier();

    log::debug!("Loading run from {}", cli.logfile.display());
    let (reader, handle) = spawn_ingest(&cli.logfile, cli.strict)?;

    let mut loaded = 0;
    let stats = follow_ingest(&reader, handle, POLL_INTERVAL, |batch| {
        loaded += batch.len();
        log::info!("{loaded} records loaded");
    })?;

    let snapshot = reader.snapshot();
    if snapshot.started.is_none() {
        return Err(RunError::InvalidInput)
            .with_context(|| format!("No records in {}", cli.logfile.display()));
    }

    if stats.skipped > 0 {
        log::warn!("{} lines could not be decoded and were skipped", stats.skipped);
    }
    if stats.malformed > 0 {
        log::warn!(
            "{} records had unreadable payloads and are shown as plain lines",
            stats.malformed
        );
    }

    if let Some(index) = cli.record {
        println!("{}", detail_table(&snapshot, index, &classifier)?);
        return Ok(());
    }

    if cli.view.shows_logs() {
        println!("{}", log_table(&snapshot, &classifier));
    }

    if cli.view.shows_jobs() {
        println!("{}", job_table(&snapshot));
        println!("{}", status_line(&snapshot.counts()));
    }

    Ok(())
}
