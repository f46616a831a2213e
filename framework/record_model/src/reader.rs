use crate::record::{DecodeError, LogRecord, RecordError};
use anyhow::Context;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Lazily decodes records from a JSON-lines log, one record per line.
///
/// Blank lines are skipped. A line that cannot be decoded, including one that is not valid UTF-8,
/// is returned as an error for that line and the reader moves on, so a caller can decide whether
/// to skip it or stop. A read failure from the underlying reader is returned once and ends the
/// iteration.
pub struct RecordReader<R> {
    reader: R,
    buf: Vec<u8>,
    line: usize,
    done: bool,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line: 0,
            done: false,
        }
    }

    /// The number of lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<LogRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(source) => {
                    self.done = true;
                    return Some(Err(DecodeError::Io {
                        line: self.line + 1,
                        source,
                    }));
                }
            }
            self.line += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    return Some(Err(DecodeError::Record {
                        line: self.line,
                        source: RecordError::Utf8(e),
                    }))
                }
            };

            if line.is_empty() {
                continue;
            }

            return Some(
                LogRecord::from_json_line(line).map_err(|source| DecodeError::Record {
                    line: self.line,
                    source,
                }),
            );
        }

        None
    }
}

/// Open a log file for reading records.
pub fn open_logfile(path: impl AsRef<Path>) -> anyhow::Result<RecordReader<BufReader<File>>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let metadata = file
        .metadata()
        .with_context(|| format!("Failed to read metadata of {}", path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("Log file {} is not a regular file", path.display());
    }

    log::debug!("Reading records from {}", path.display());

    Ok(RecordReader::new(BufReader::new(file)))
}
