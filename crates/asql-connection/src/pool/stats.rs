//! Pool statistics types

use serde::{Deserialize, Serialize};

/// Snapshot of a connection pool's bookkeeping
///
/// `total` is the number of occupied pool slots and always equals
/// `idle + connecting + active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Slots in use: open connections plus connections being opened
    total: usize,
    /// Idle connections waiting in the pool
    idle: usize,
    /// Connections whose handshake (or retry) is still in progress
    connecting: usize,
    /// Connections handed out to callers or being probed
    active: usize,
    /// Requests queued until a slot frees up
    waiting: usize,
}

impl PoolStats {
    /// Create new pool statistics
    pub fn new(total: usize, idle: usize, connecting: usize, waiting: usize) -> Self {
        Self {
            total,
            idle,
            connecting,
            active: total.saturating_sub(idle + connecting),
            waiting,
        }
    }

    /// Get the number of occupied slots
    pub fn total(&self) -> usize {
        self.total
    }

    /// Get the number of idle connections
    pub fn idle(&self) -> usize {
        self.idle
    }

    /// Get the number of connections being opened
    pub fn connecting(&self) -> usize {
        self.connecting
    }

    /// Get the number of active (in-use) connections
    pub fn active(&self) -> usize {
        self.active
    }

    /// Get the number of waiting requests
    pub fn waiting(&self) -> usize {
        self.waiting
    }

    /// Calculate pool utilization as a fraction (0.0 to 1.0)
    ///
    /// Returns 0.0 if total is 0 to avoid division by zero.
    pub fn utilization(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.active as f64 / self.total as f64
        }
    }

    /// Check if every open connection is in use
    pub fn is_full(&self) -> bool {
        self.idle == 0 && self.total > 0
    }
}

impl Default for PoolStats {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}
