//! Online and offline log destinations.
//!
//! A destination is a folder plus a daily file name derived from the UTC date
//! and the application name (`<yyyyMMdd>_<app>.log`). Files are opened,
//! appended to, flushed and closed within a single call so no handle outlives
//! a write attempt.

use std::ffi::OsStr;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};

pub const LOG_FILE_EXTENSION: &str = "log";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DestinationKind {
    Online,
    Offline,
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Online => "online",
            Self::Offline => "offline",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogDestination {
    kind: DestinationKind,
    folder: PathBuf,
    app_name: String,
}

impl LogDestination {
    pub fn new(kind: DestinationKind, folder: impl Into<PathBuf>, app_name: &str) -> Self {
        Self {
            kind,
            folder: folder.into(),
            app_name: app_name.to_owned(),
        }
    }

    pub fn kind(&self) -> DestinationKind {
        self.kind
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn file_name_for(&self, date: NaiveDate) -> String {
        format!(
            "{}_{}.{LOG_FILE_EXTENSION}",
            date.format("%Y%m%d"),
            self.app_name
        )
    }

    pub fn file_path_for(&self, date: NaiveDate) -> PathBuf {
        self.folder.join(self.file_name_for(date))
    }

    /// Today's file; changes at UTC midnight.
    pub fn current_file_path(&self) -> PathBuf {
        self.file_path_for(Utc::now().date_naive())
    }

    /// The file in this folder carrying `file_name`, whatever its date.
    pub fn file_path_named(&self, file_name: &OsStr) -> PathBuf {
        self.folder.join(file_name)
    }

    /// Create the folder unless it already exists.
    pub fn ensure_folder(&self) -> io::Result<()> {
        if self.folder.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.folder)
    }

    pub fn try_ensure_folder(&self) -> bool {
        self.ensure_folder().is_ok()
    }

    /// Every `.log` file in the folder, oldest name first.
    ///
    /// A missing folder has no files.
    pub fn log_files(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.folder) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_log = path.extension().and_then(OsStr::to_str) == Some(LOG_FILE_EXTENSION);
            if is_log && path.is_file() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }
}

/// Append `text` plus a line terminator to `path`, creating the file if needed.
pub fn append_line(path: &Path, text: &str) -> io::Result<()> {
    #[expect(
        clippy::ineffective_open_options,
        reason = "Be explicit about write intent alongside append"
    )]
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(true)
        .open(path)?;
    let mut buf = String::with_capacity(text.len() + 1);
    buf.push_str(text);
    buf.push('\n');
    file.write_all(buf.as_bytes())?;
    file.flush()
}
