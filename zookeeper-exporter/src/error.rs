use std::time::Duration;

use thiserror::Error;

/// Failure of a single instance exchange.
///
/// Any of these marks the instance as down for the current cycle.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Connection failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("Failed to send command: {0}")]
    Write(#[source] std::io::Error),

    #[error("Failed to read response: {0}")]
    Read(#[source] std::io::Error),

    #[error("Deadline of {0:?} exceeded")]
    Timeout(Duration),
}

impl ScrapeError {
    /// Short machine-friendly name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Connect(_) => "connect",
            ScrapeError::Write(_) => "write",
            ScrapeError::Read(_) => "read",
            ScrapeError::Timeout(_) => "timeout",
        }
    }
}

/// Result type alias for instance exchanges.
pub type Result<T> = std::result::Result<T, ScrapeError>;
