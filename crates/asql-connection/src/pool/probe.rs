//! Liveness probe for idle connections
//!
//! Before an idle connection is handed out again it can be asked to run a
//! trivial query. The probe races a timer; exactly one of the two outcomes
//! is acted on.

use std::time::{Duration, Instant};

use asql_core::Connection;

/// Query sent to check that a connection still answers
pub const PROBE_QUERY: &str = "SELECT 1 AS alive";

/// Why an idle connection failed its probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The connection reported itself disconnected
    ConnectionClosed,
    /// The probe query returned an error
    QueryFailed(String),
    /// No answer before the timeout
    Timeout,
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::ConnectionClosed => write!(f, "Connection is closed"),
            ProbeError::QueryFailed(msg) => write!(f, "Probe query failed: {}", msg),
            ProbeError::Timeout => write!(f, "Probe timed out"),
        }
    }
}

impl std::error::Error for ProbeError {}

/// Probe a connection, giving up after `timeout`.
///
/// The query and the timer are polled by one future, so the first to
/// complete decides the outcome and the other is dropped. A late query
/// answer can never be observed after a timeout has been reported.
///
/// Returns the round-trip time on success.
pub async fn probe_connection(conn: &dyn Connection, timeout: Duration) -> Result<Duration, ProbeError> {
    if !conn.is_connected() {
        return Err(ProbeError::ConnectionClosed);
    }

    let start = Instant::now();
    match tokio::time::timeout(timeout, conn.send_query(PROBE_QUERY)).await {
        Ok(Ok(_)) => Ok(start.elapsed()),
        Ok(Err(e)) => Err(ProbeError::QueryFailed(e.to_string())),
        Err(_) => Err(ProbeError::Timeout),
    }
}
