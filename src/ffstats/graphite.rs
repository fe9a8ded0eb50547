// ffstats - Freifunk mesh and DHCP statistics for Graphite
//
// Copyright 2026 The ffstats Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::batch::Datapoint;
use crate::error::{StatsError, StatsErrorKind};
use std::fmt::Display;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Prefix prepended to every metric path written.
pub const DEFAULT_PREFIX: &str = "ffrn";

/// Current UNIX timestamp in seconds.
pub fn unix_timestamp() -> u64 {
    // Clocks set before the epoch report zero
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Format a single record in the Graphite plaintext protocol.
pub fn format_record<V: Display>(prefix: &str, path: &str, value: V, timestamp: u64) -> String {
    format!("{}.{} {} {}\n", prefix, path, value, timestamp)
}

/// Encode a string as ISO-8859-1, one byte per character, or return `None` if
/// any character is outside of that range.
pub fn encode_latin1(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(c).ok()).collect()
}

/// Number of records written and skipped while sending a batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub sent: usize,
    pub skipped: usize,
}

/// Write every datapoint as a Graphite plaintext record using the same timestamp.
///
/// Records that can't be encoded as ISO-8859-1 are skipped. Any error writing a
/// record (or a write taking longer than `send_timeout`) stops the batch.
pub async fn write_batch<W>(
    writer: &mut W,
    prefix: &str,
    datapoints: &[Datapoint],
    timestamp: u64,
    send_timeout: Duration,
) -> Result<Summary, StatsError>
where
    W: AsyncWrite + Unpin,
{
    let mut summary = Summary::default();

    for dp in datapoints {
        let record = format_record(prefix, &dp.path, &dp.value, timestamp);
        let bytes = match encode_latin1(&record) {
            Some(b) => b,
            None => {
                tracing::debug!(message = "skipping record that cannot be encoded", path = %dp.path);
                summary.skipped += 1;
                continue;
            }
        };

        timeout(send_timeout, writer.write_all(&bytes))
            .await
            .map_err(|e| StatsError::KindMsgCause(StatsErrorKind::Send, "timeout writing record", Box::new(e)))?
            .map_err(|e| StatsError::KindMsgCause(StatsErrorKind::Send, "unable to write record", Box::new(e)))?;

        summary.sent += 1;
    }

    Ok(summary)
}

/// Client for a Graphite (carbon) plaintext listener.
///
/// Each call to [`GraphiteClient::send`] opens a new connection, writes the
/// whole batch, and closes the connection again. There are no retries.
#[derive(Debug, Clone)]
pub struct GraphiteClient {
    addr: String,
    prefix: String,
    timeout: Duration,
}

impl GraphiteClient {
    pub fn new<A, P>(addr: A, prefix: P, timeout: Duration) -> Self
    where
        A: Into<String>,
        P: Into<String>,
    {
        Self {
            addr: addr.into(),
            prefix: prefix.into(),
            timeout,
        }
    }

    pub async fn send(&self, datapoints: &[Datapoint]) -> Result<Summary, StatsError> {
        let now = unix_timestamp();
        let mut stream = timeout(self.timeout, TcpStream::connect(self.addr.as_str()))
            .await
            .map_err(|e| {
                StatsError::KindMsgCause(StatsErrorKind::Connect, "timeout connecting to graphite", Box::new(e))
            })?
            .map_err(|e| {
                StatsError::KindMsgCause(StatsErrorKind::Connect, "unable to connect to graphite", Box::new(e))
            })?;

        tracing::debug!(message = "connected to graphite", address = %self.addr, num_records = datapoints.len());

        // The stream is closed when dropped, including when writing fails part way
        let summary = write_batch(&mut stream, &self.prefix, datapoints, now, self.timeout).await?;
        if let Err(e) = stream.shutdown().await {
            tracing::debug!(message = "error shutting down graphite connection", error = %e);
        }

        Ok(summary)
    }
}
