use std::path::{Path, PathBuf};
use thiserror::Error;

/// Request-level failures. These are the only errors that leave the searcher.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("keyword is empty or whitespace")]
    InvalidKeyword,

    #[error("directory not found: {}", path.display())]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("search cancelled")]
    Cancelled,
}

/// Failure to probe a single file. Absorbed by the searcher, never returned to callers.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8 text", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

impl ProbeError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Decode { path, .. } => path,
        }
    }
}
