use std::io;
use std::path::Path;

/// Canonical result type for Slipway code
pub type Result<T> = std::result::Result<T, SlipwayError>;

/// Common error type for Slipway operations
#[derive(Debug, thiserror::Error)]
pub enum SlipwayError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Git error: {0}")]
    Git(String),

    #[error("Build error: {0}")]
    Build(String),

    #[error("Release error: {0}")]
    Release(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),
}

/// A user-facing failure: a one-line summary plus an itemized list of causes.
///
/// Rendered as a multi-line report so the operator sees every problem from a
/// pass at once instead of fixing them one at a time across repeated runs.
#[derive(Debug, Clone, thiserror::Error)]
pub struct ValidationError {
    pub summary: String,
    pub messages: Vec<String>,
}

impl ValidationError {
    pub fn new(summary: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            summary: summary.into(),
            messages,
        }
    }

    /// A validation error whose report is just the summary line.
    pub fn from_summary(summary: impl Into<String>) -> Self {
        let summary = summary.into();
        Self {
            messages: vec![summary.clone()],
            summary,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary)?;
        for message in &self.messages {
            write!(f, "\n{}", message)?;
        }
        Ok(())
    }
}

/// Helper to create an IO error with file path context
pub fn io_error_with_path<P: AsRef<Path>>(error: io::Error, path: P) -> io::Error {
    io::Error::new(
        error.kind(),
        format!("{}: {}", path.as_ref().display(), error),
    )
}
