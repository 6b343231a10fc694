//! Four-letter-word client for the ZooKeeper admin port.
//!
//! Every call opens a fresh TCP connection, writes the command with no
//! terminator and reads until the server closes the stream. A single
//! deadline covers the whole exchange.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::error::{Result, ScrapeError};

/// Default deadline for one exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest accepted response. A real `mntr` reply is a few kilobytes.
pub const MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

/// Send `command` to `address` and return the full response text.
///
/// The returned text holds every received line terminated by `\n`. An empty
/// response is a success. Connect, write and read failures, a response
/// larger than [`MAX_RESPONSE_BYTES`], and exceeding `timeout` are errors;
/// partial data is discarded.
pub async fn send_command(address: &str, command: &str, timeout: Duration) -> Result<String> {
    let deadline = Instant::now() + timeout;

    debug!(address = %address, "Connecting to ZooKeeper");
    let mut stream = timeout_at(deadline, TcpStream::connect(address))
        .await
        .map_err(|_| ScrapeError::Timeout(timeout))?
        .map_err(ScrapeError::Connect)?;

    debug!(address = %address, command = %command, "Sending four letter word");
    timeout_at(deadline, stream.write_all(command.as_bytes()))
        .await
        .map_err(|_| ScrapeError::Timeout(timeout))?
        .map_err(ScrapeError::Write)?;

    let raw = timeout_at(deadline, read_limited(&mut stream, MAX_RESPONSE_BYTES))
        .await
        .map_err(|_| ScrapeError::Timeout(timeout))?
        .map_err(ScrapeError::Read)?;

    debug!(address = %address, bytes = raw.len(), "Successfully retrieved reply");
    Ok(reassemble_lines(&raw))
}

/// Read until end-of-stream, failing once more than `limit` bytes arrive.
async fn read_limited<R>(reader: R, limit: u64) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut raw = Vec::with_capacity(1024);
    reader.take(limit + 1).read_to_end(&mut raw).await?;
    if raw.len() as u64 > limit {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("response exceeds {} bytes", limit),
        ));
    }
    Ok(raw)
}

/// Rebuild the response as `\n`-terminated lines, dropping `\r`.
fn reassemble_lines(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let mut buffer = String::with_capacity(text.len() + 1);
    for line in text.lines() {
        buffer.push_str(line);
        buffer.push('\n');
    }
    buffer
}
