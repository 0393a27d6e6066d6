use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The data root or a tag directory could not be read. Fatal to the run.
#[derive(Error, Debug)]
#[error("Cannot read {}: {source}", path.display())]
pub struct FileSystemError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to start converter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Converter did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Converter exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Converter output is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Converter produced no output")]
    Empty,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DraftError {
    #[error("Post title is empty")]
    EmptyTitle,

    #[error("Post body is empty")]
    EmptyHtml,

    #[error("Post tag is empty")]
    EmptyTag,
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ghost API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response from Ghost API: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AdminKeyError {
    #[error("Admin API key must look like '<id>:<secret>'")]
    Format,

    #[error("Admin API key secret is not valid hex")]
    Secret,
}
