//! Merging offline backlog files into the online folder.
//!
//! While the writer is online, the oldest offline `.log` file is merged into
//! the online file with the same name: lines are compared position by
//! position and every offline line that does not match the online line at
//! that position is appended online. A fully merged backlog file is deleted.
//! Any failure leaves the file in place for the next pass.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::error::ReconcileError;
use crate::failover::FailoverWriter;
use crate::state::WriterState;

/// Default delay between merge passes.
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Every offline line was accounted for and the backlog file is gone.
    Merged { appended: usize },
    /// The writer stopped or went offline part way; the file was kept.
    Interrupted { appended: usize },
}

pub struct Reconciler {
    writer: Arc<FailoverWriter>,
    state: Arc<WriterState>,
    interval: Duration,
}

/// Lossy line reader; a stray invalid byte must not wedge a backlog file.
struct Lines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for Lines<R> {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.ends_with(b"\n") {
                    self.buf.pop();
                    if self.buf.ends_with(b"\r") {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

impl Reconciler {
    pub fn new(writer: Arc<FailoverWriter>, state: Arc<WriterState>, interval: Duration) -> Self {
        Self {
            writer,
            state,
            interval,
        }
    }

    /// The oldest offline backlog file, if any.
    pub fn next_pending(&self) -> Option<PathBuf> {
        match self.writer.offline().log_files() {
            Ok(files) => files.into_iter().next(),
            Err(err) => {
                debug!("tandemlog: cannot list offline backlog: {err}");
                None
            }
        }
    }

    fn should_continue(&self) -> bool {
        self.state.is_running() && self.state.is_online()
    }

    /// Merge `offline_file` into its online counterpart and delete it once
    /// every line has been accounted for.
    pub fn migrate_file(&self, offline_file: &Path) -> Result<MigrationOutcome, ReconcileError> {
        let name = offline_file
            .file_name()
            .ok_or_else(|| ReconcileError::InvalidFileName(offline_file.to_path_buf()))?;
        let online = self.writer.online();
        online.ensure_folder()?;
        let online_file = online.file_path_named(name);

        let _routing = self.writer.lock_routing();
        let online_handle = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&online_file)?;
        // Only the content present now is compared; lines appended below
        // must not be read back as if they had been there.
        let online_len = online_handle.metadata()?.len();
        let mut online_lines = Lines::new(BufReader::new(online_handle.take(online_len)));
        let offline_lines = Lines::new(BufReader::new(File::open(offline_file)?));

        let mut appended = 0;
        for offline_line in offline_lines {
            if !self.should_continue() {
                return Ok(MigrationOutcome::Interrupted { appended });
            }
            let offline_line = offline_line?;
            let online_line = online_lines.next().transpose()?;
            if online_line.as_deref() != Some(offline_line.as_str()) {
                self.writer.write_online(&online_file, &offline_line)?;
                appended += 1;
            }
        }

        fs::remove_file(offline_file)?;
        Ok(MigrationOutcome::Merged { appended })
    }

    /// Merge backlog files while online, oldest first. Returns the number of
    /// files merged.
    pub fn reconcile_pending(&self) -> usize {
        let mut merged = 0;
        while self.should_continue() {
            let Some(file) = self.next_pending() else {
                break;
            };
            match self.migrate_file(&file) {
                Ok(MigrationOutcome::Merged { appended }) => {
                    merged += 1;
                    info!(
                        "tandemlog: merged offline backlog {} ({appended} lines appended)",
                        file.display()
                    );
                }
                Ok(MigrationOutcome::Interrupted { appended }) => {
                    debug!(
                        "tandemlog: merge of {} interrupted after {appended} lines",
                        file.display()
                    );
                    break;
                }
                Err(err) => {
                    debug!(
                        "tandemlog: merge of {} failed, will retry: {err}",
                        file.display()
                    );
                    break;
                }
            }
            thread::sleep(self.interval);
        }
        merged
    }

    /// Run merge passes until the writer stops.
    pub fn run(&self) {
        while self.state.is_running() {
            self.reconcile_pending();
            thread::sleep(self.interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn lines_are_split_lossily() {
        let input = b"one\r\ntw\xffo\nthree".to_vec();
        let lines: Vec<String> = Lines::new(Cursor::new(input))
            .collect::<Result<_, _>>()
            .expect("read lines");
        assert_eq!(lines, ["one", "tw\u{fffd}o", "three"]);
    }

    #[test]
    fn empty_input_has_no_lines() {
        assert_eq!(Lines::new(Cursor::new(Vec::new())).count(), 0);
    }
}
