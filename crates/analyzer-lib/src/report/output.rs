//! Output destinations

use crate::error::{ReportError, ReportResult};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where a rendering is written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputDestination {
    #[default]
    Stdout,
    /// Created, or truncated if it exists
    File(PathBuf),
}

impl OutputDestination {
    /// Stdout when no path is given
    pub fn from_path(path: Option<impl AsRef<Path>>) -> Self {
        match path {
            Some(path) => OutputDestination::File(path.as_ref().to_path_buf()),
            None => OutputDestination::Stdout,
        }
    }

    /// Open the destination for writing
    pub fn open(&self) -> ReportResult<Box<dyn Write>> {
        match self {
            OutputDestination::Stdout => Ok(Box::new(io::stdout().lock())),
            OutputDestination::File(path) => {
                let file = File::create(path).map_err(|source| ReportError::Destination {
                    path: path.clone(),
                    source,
                })?;
                Ok(Box::new(BufWriter::new(file)))
            }
        }
    }
}

impl std::fmt::Display for OutputDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputDestination::Stdout => f.write_str("stdout"),
            OutputDestination::File(path) => write!(f, "{}", path.display()),
        }
    }
}
