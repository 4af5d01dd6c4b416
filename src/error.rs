use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while capturing and assembling an issue
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A configured regex pattern does not compile
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// WebDriver command failed
    #[error("WebDriver command failed: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),

    /// No WebDriver server accepted a session
    #[error("Could not connect to a WebDriver server at {0}")]
    Connect(String),

    /// A response body could not be retrieved; the page stays eligible for capture
    #[error("Response body unavailable for {url}: {reason}")]
    Body { url: String, reason: String },

    /// Listener task panicked or was cancelled
    #[error("Capture listener stopped unexpectedly: {0}")]
    Listener(#[from] tokio::task::JoinError),

    /// File listed for merging does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// File listed for merging has no pages
    #[error("PDF has no pages: {}", .0.display())]
    EmptyDocument(PathBuf),

    /// Merge called with an empty file list
    #[error("No captured pages to merge")]
    NothingToMerge,
}

impl Error {
    pub(crate) fn body(url: &str, reason: impl ToString) -> Self {
        Error::Body {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
