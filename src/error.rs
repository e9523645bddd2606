use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid storage url '{0}', expected scheme://bucket[/prefix]")]
    InvalidUrl(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("unable to parse time '{input}': {source}")]
    TimeParse {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("working directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("download of '{key}' failed: {reason}")]
    Download { key: String, reason: String },

    #[error("local write failed: {0}")]
    LocalWrite(#[from] std::io::Error),

    #[error("encoder failed: {0}")]
    Encode(String),

    #[error("config file {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("run cancelled: {0}")]
    Cancelled(&'static str),
}

impl Error {
    pub fn directory(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Directory {
            path: path.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
