//! Connection pool implementation

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Arc, Weak};
use std::time::Duration;

use asql_core::{AsqlError, Connection, ConnectionFactory, Result};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use super::config::PoolConfig;
use super::probe::probe_connection;
use super::retry::RetryPolicy;
use super::stats::PoolStats;

/// Pending request for a connection
type Waiter = oneshot::Sender<Result<Arc<dyn Connection>>>;

fn pool_closed() -> AsqlError {
    AsqlError::PoolClosed("connection pool has been closed".into())
}

/// Idle connection with its release timer
struct IdleConnection {
    id: u64,
    connection: Arc<dyn Connection>,
    release_timer: Option<AbortHandle>,
}

impl IdleConnection {
    fn into_connection(self) -> Arc<dyn Connection> {
        if let Some(timer) = self.release_timer {
            timer.abort();
        }
        self.connection
    }
}

/// Everything guarded by the pool lock.
///
/// `pool_size` counts occupied slots: idle connections, connections handed
/// out, and connections still being opened (`connecting`).
#[derive(Default)]
struct PoolState {
    pool_size: usize,
    connecting: usize,
    available: VecDeque<IdleConnection>,
    waiters: VecDeque<Waiter>,
    next_idle_id: u64,
    closed: bool,
}

impl PoolState {
    fn release_slot(&mut self) {
        debug_assert!(self.pool_size > 0, "pool slot released twice");
        self.pool_size = self.pool_size.saturating_sub(1);
    }

    /// Pop the oldest waiter whose caller is still listening
    fn next_waiter(&mut self) -> Option<Waiter> {
        while let Some(waiter) = self.waiters.pop_front() {
            if !waiter.is_closed() {
                return Some(waiter);
            }
        }
        None
    }
}

struct PoolInner {
    config: PoolConfig,
    retry: RetryPolicy,
    factory: Arc<dyn ConnectionFactory>,
    state: Mutex<PoolState>,
}

/// A bounded pool of physical connections
///
/// At most `max_pool_size` connections are open or being opened at any
/// time. Requests beyond that are queued and served first-in, first-out as
/// connections are given back or slots free up.
///
/// The pool spawns Tokio tasks for connection attempts, retries, liveness
/// probes and idle release timers, so it must be used inside a Tokio runtime.
/// Cloning is cheap and yields a handle to the same pool.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Create a new connection pool with the given configuration and factory
    pub fn new<F: ConnectionFactory>(config: PoolConfig, factory: F) -> Self {
        Self::with_factory(config, Arc::new(factory))
    }

    /// Create a new connection pool from a shared factory
    pub fn with_factory(config: PoolConfig, factory: Arc<dyn ConnectionFactory>) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self {
            inner: Arc::new(PoolInner {
                config,
                retry,
                factory,
                state: Mutex::new(PoolState::default()),
            }),
        }
    }

    /// Take a connection from the pool
    ///
    /// This will:
    /// 1. Reuse the oldest idle connection, probing it first when a
    ///    connection test timeout is configured. Dead connections are
    ///    dropped and the request starts over.
    /// 2. Otherwise open a new connection if a slot is free, retrying
    ///    failed attempts per the retry policy.
    /// 3. Otherwise wait in line until a connection is given back.
    ///
    /// The connection must be returned with [`give_back`](Self::give_back).
    /// Fails with the connection error once retries are exhausted, or with
    /// `PoolClosed` if the pool is closed before the request is served.
    pub async fn take(&self) -> Result<Arc<dyn Connection>> {
        let (tx, rx) = oneshot::channel();
        self.inner.dispatch(tx);
        rx.await
            .map_err(|_| AsqlError::PoolClosed("connection request was dropped".into()))?
    }

    /// Take a connection wrapped in a guard that gives it back on drop
    pub async fn get(&self) -> Result<PooledConnection> {
        let connection = self.take().await?;
        Ok(PooledConnection {
            connection,
            pool: self.clone(),
        })
    }

    /// Return a connection to the pool
    ///
    /// Connected connections go back to the idle queue, dead ones free
    /// their slot. Either way the oldest waiter, if any, is served next.
    pub fn give_back(&self, connection: Arc<dyn Connection>) {
        self.inner.give_back(connection);
    }

    /// Close the pool
    ///
    /// Idle connections are disconnected in the background and queued
    /// requests fail with `PoolClosed`. Connections currently handed out
    /// are not reclaimed; they are disconnected when given back.
    pub async fn close(&self) -> Result<()> {
        let (idle, waiters) = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            let idle: Vec<_> = state.available.drain(..).collect();
            state.pool_size = state.pool_size.saturating_sub(idle.len());
            let waiters: Vec<_> = state.waiters.drain(..).collect();
            (idle, waiters)
        };

        tracing::info!(
            idle = idle.len(),
            waiters = waiters.len(),
            "closing connection pool"
        );

        for waiter in waiters {
            let _ = waiter.send(Err(pool_closed()));
        }
        for idle in idle {
            spawn_disconnect(idle.into_connection());
        }
        Ok(())
    }

    /// Check if the pool has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        let waiting = state.waiters.iter().filter(|w| !w.is_closed()).count();
        PoolStats::new(
            state.pool_size,
            state.available.len(),
            state.connecting,
            waiting,
        )
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

/// What to do for a request once the pool lock is released
enum Handoff {
    Deliver(Arc<dyn Connection>, Waiter),
    Test(Arc<dyn Connection>, Duration, Waiter),
    Create(Waiter),
    Fail(Waiter, AsqlError),
}

impl PoolInner {
    /// Serve one new request: idle connection, new connection, or queue
    fn dispatch(self: &Arc<Self>, waiter: Waiter) {
        let handoff = self.route(&mut self.state.lock(), waiter, false);
        if let Some(handoff) = handoff {
            self.run(handoff);
        }
    }

    /// Decide how to serve `waiter` while the pool lock is held.
    ///
    /// Idle connections are claimed and slots reserved here, so nothing can
    /// slip in between a waiter leaving the queue and being served. A
    /// request that was already queued keeps its place at the front.
    fn route(&self, state: &mut PoolState, waiter: Waiter, queued: bool) -> Option<Handoff> {
        if state.closed {
            return Some(Handoff::Fail(waiter, pool_closed()));
        }

        while let Some(idle) = state.available.pop_front() {
            let connection = idle.into_connection();
            if !connection.is_connected() {
                state.release_slot();
                tracing::debug!(
                    pool_size = state.pool_size,
                    "discarding disconnected idle connection"
                );
                continue;
            }
            return Some(match self.config.connection_test_timeout() {
                Some(timeout) => Handoff::Test(connection, timeout, waiter),
                None => Handoff::Deliver(connection, waiter),
            });
        }

        if state.pool_size < self.config.max_pool_size() {
            // Reserve the slot before the handshake so concurrent requests
            // cannot both see room for one more connection.
            state.pool_size += 1;
            state.connecting += 1;
            return Some(Handoff::Create(waiter));
        }

        if queued {
            state.waiters.push_front(waiter);
        } else {
            state.waiters.push_back(waiter);
        }
        tracing::trace!(waiting = state.waiters.len(), "pool exhausted, request queued");
        None
    }

    /// Route the oldest waiter still listening, if any
    fn serve_next(&self, state: &mut PoolState) -> Option<Handoff> {
        let waiter = state.next_waiter()?;
        self.route(state, waiter, true)
    }

    fn run(self: &Arc<Self>, handoff: Handoff) {
        match handoff {
            Handoff::Deliver(connection, waiter) => self.deliver(connection, waiter),
            Handoff::Test(connection, timeout, waiter) => {
                if spawn(self.clone().test_and_deliver(connection, timeout, waiter)).is_none() {
                    self.state.lock().release_slot();
                }
            }
            Handoff::Create(waiter) => {
                if spawn(self.clone().create_connection(waiter)).is_none() {
                    let mut state = self.state.lock();
                    state.connecting -= 1;
                    state.release_slot();
                }
            }
            Handoff::Fail(waiter, error) => {
                let _ = waiter.send(Err(error));
            }
        }
    }

    /// Hand a connection to its requester, or back to the pool if the
    /// requester stopped waiting
    fn deliver(self: &Arc<Self>, connection: Arc<dyn Connection>, waiter: Waiter) {
        if let Err(Ok(connection)) = waiter.send(Ok(connection)) {
            tracing::debug!("connection requester went away, returning connection");
            self.give_back(connection);
        }
    }

    async fn test_and_deliver(
        self: Arc<Self>,
        connection: Arc<dyn Connection>,
        timeout: Duration,
        waiter: Waiter,
    ) {
        match probe_connection(connection.as_ref(), timeout).await {
            Ok(latency) => {
                tracing::trace!(latency_ms = latency.as_millis() as u64, "connection test passed");
                self.deliver(connection, waiter);
            }
            Err(e) => {
                tracing::info!(error = %e, "connection test failed, dropping connection");
                spawn_disconnect(connection);
                let handoff = {
                    let mut state = self.state.lock();
                    state.release_slot();
                    self.route(&mut state, waiter, true)
                };
                if let Some(handoff) = handoff {
                    self.run(handoff);
                }
            }
        }
    }

    /// Open a connection in an already reserved slot.
    ///
    /// Retries keep the same request, so it never goes back into the queue.
    async fn create_connection(self: Arc<Self>, waiter: Waiter) {
        let mut retries = 0u32;
        let outcome = loop {
            let error = match self.connect_once().await {
                Ok(connection) => break Ok(connection),
                Err(e) => e,
            };

            if self.state.lock().closed {
                break Err(pool_closed());
            }
            if !self.retry.allows_retry(retries) {
                tracing::warn!(error = %error, retries, "giving up on creating connection");
                break Err(error);
            }

            retries += 1;
            tracing::debug!(
                retry = retries,
                max_retries = ?self.retry.max_retries(),
                delay_ms = self.retry.delay().as_millis() as u64,
                "error creating connection, waiting before retry"
            );
            tokio::time::sleep(self.retry.delay()).await;
            if self.state.lock().closed {
                break Err(pool_closed());
            }
        };

        let (result, handoff) = {
            let mut state = self.state.lock();
            state.connecting -= 1;
            match outcome {
                Ok(connection) if !state.closed => (Ok(connection), None),
                Ok(connection) => {
                    state.release_slot();
                    spawn_disconnect(connection);
                    (Err(pool_closed()), None)
                }
                Err(e) => {
                    state.release_slot();
                    (Err(e), self.serve_next(&mut state))
                }
            }
        };

        if let Some(handoff) = handoff {
            self.run(handoff);
        }
        match result {
            Ok(connection) => self.deliver(connection, waiter),
            Err(e) => {
                let _ = waiter.send(Err(e));
            }
        }
    }

    async fn connect_once(&self) -> Result<Arc<dyn Connection>> {
        let connection = self.factory.create().inspect_err(|e| {
            tracing::info!(error = %e, "creating a connection went wrong");
        })?;
        connection.connect().await.inspect_err(|e| {
            tracing::info!(error = %e, "failed to create connection");
        })?;
        Ok(connection)
    }

    fn give_back(self: &Arc<Self>, connection: Arc<dyn Connection>) {
        let handoff = {
            let mut state = self.state.lock();
            if state.closed {
                state.release_slot();
                drop(state);
                spawn_disconnect(connection);
                return;
            }

            if connection.is_connected() {
                let id = state.next_idle_id;
                state.next_idle_id += 1;
                let release_timer = self
                    .config
                    .connection_release_delay()
                    .and_then(|delay| self.schedule_release(id, delay));
                state.available.push_back(IdleConnection {
                    id,
                    connection,
                    release_timer,
                });
            } else {
                state.release_slot();
            }
            self.serve_next(&mut state)
        };

        if let Some(handoff) = handoff {
            self.run(handoff);
        }
    }

    fn schedule_release(self: &Arc<Self>, id: u64, delay: Duration) -> Option<AbortHandle> {
        let pool: Weak<PoolInner> = Arc::downgrade(self);
        spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(pool) = pool.upgrade() {
                pool.release_idle(id);
            }
        })
    }

    /// Close an idle connection whose release delay expired.
    ///
    /// Does nothing if the connection was taken in the meantime.
    fn release_idle(self: &Arc<Self>, id: u64) {
        let (connection, handoff) = {
            let mut state = self.state.lock();
            let Some(pos) = state.available.iter().position(|idle| idle.id == id) else {
                return;
            };
            let Some(idle) = state.available.remove(pos) else {
                return;
            };
            state.release_slot();
            (idle.connection, self.serve_next(&mut state))
        };

        tracing::debug!("releasing idle connection");
        spawn_disconnect(connection);
        if let Some(handoff) = handoff {
            self.run(handoff);
        }
    }
}

/// Spawn onto the current Tokio runtime, if there is one
fn spawn<F>(future: F) -> Option<AbortHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::runtime::Handle::try_current().ok()?;
    Some(handle.spawn(future).abort_handle())
}

fn spawn_disconnect(connection: Arc<dyn Connection>) {
    let spawned = spawn(async move {
        if let Err(e) = connection.disconnect().await {
            tracing::debug!(error = %e, "error while disconnecting connection");
        }
    });
    if spawned.is_none() {
        tracing::debug!("no runtime to disconnect on, dropping connection");
    }
}

/// A connection borrowed from the pool
///
/// When dropped, the connection is automatically given back to the pool.
pub struct PooledConnection {
    connection: Arc<dyn Connection>,
    pool: ConnectionPool,
}

impl PooledConnection {
    /// Get the underlying connection as an Arc
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Give the connection back to the pool now
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.pool.give_back(Arc::clone(&self.connection));
    }
}
