//! Output file names: `<device>_IV-<stamp>_<suffix>.<ext>`.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

use crate::error::{AppResult, BenchError};

/// Characters that cannot appear in a file name component.
const UNSAFE: [char; 3] = ['/', '\\', ':'];

/// Timestamp captured once at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp(String);

impl RunStamp {
    /// Stamp for the current local time.
    pub fn now(format: &str) -> AppResult<Self> {
        Self::at(Local::now(), format)
    }

    /// Stamp for `time`, rejecting formats that produce an empty string.
    pub fn at(time: DateTime<Local>, format: &str) -> AppResult<Self> {
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(BenchError::Parse(format!(
                "invalid timestamp format '{}'",
                format
            )));
        }
        let mut stamp = String::new();
        write!(stamp, "{}", time.format(format))
            .map_err(|_| BenchError::Parse(format!("cannot format timestamp with '{}'", format)))?;
        Ok(Self(sanitize(&stamp)))
    }

    /// The formatted stamp.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Replace path separators (and `:`) with `-`.
pub fn sanitize(component: &str) -> String {
    component.trim().replace(UNSAFE, "-")
}

/// Names every file of one curve tracer run.
#[derive(Debug, Clone)]
pub struct OutputNaming {
    directory: PathBuf,
    device: String,
    stamp: RunStamp,
}

impl OutputNaming {
    /// Names for `device` under `directory`.
    pub fn new(directory: impl Into<PathBuf>, device: &str, stamp: RunStamp) -> Self {
        Self {
            directory: directory.into(),
            device: sanitize(device),
            stamp,
        }
    }

    /// `<directory>/<device>_IV-<stamp>_<suffix>.<extension>`
    pub fn path(&self, suffix: &str, extension: &str) -> PathBuf {
        self.directory.join(format!(
            "{}_IV-{}_{}.{}",
            self.device, self.stamp, suffix, extension
        ))
    }

    /// Directory every file is written to.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Stamp shared by every file of the run.
    pub fn stamp(&self) -> &RunStamp {
        &self.stamp
    }
}
