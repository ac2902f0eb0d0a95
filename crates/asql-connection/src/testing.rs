//! Mock driver used by the unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use asql_core::{
    AsqlError, Backend, Connection, ConnectionFactory, ConnectionSettings, DatabaseDriver,
    QueryResult, Result, Row, Value,
};
use async_trait::async_trait;
use parking_lot::Mutex;

/// How a mock connection answers the liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeBehavior {
    Answer,
    Fail,
    Hang,
}

/// Counters shared between a factory and the connections it created
#[derive(Default)]
pub struct MockCounters {
    pub attempts: AtomicUsize,
    pub created: AtomicUsize,
    pub open: AtomicUsize,
    pub max_open: AtomicUsize,
}

pub struct MockConnection {
    pub id: usize,
    connected: AtomicBool,
    fail_connect: bool,
    probe: Mutex<ProbeBehavior>,
    queries: AtomicUsize,
    disconnects: AtomicUsize,
    counters: Arc<MockCounters>,
}

impl MockConnection {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_probe(&self, behavior: ProbeBehavior) {
        *self.probe.lock() = behavior;
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn connect(&self) -> Result<()> {
        if self.fail_connect {
            return Err(AsqlError::Connection(format!(
                "connection {} refused",
                self.id
            )));
        }
        self.connected.store(true, Ordering::SeqCst);
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        let open = self.counters.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_open.fetch_max(open, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.connected.swap(false, Ordering::SeqCst) {
            self.counters.open.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn send_query(&self, sql: &str) -> Result<QueryResult> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.probe.lock();
        match behavior {
            ProbeBehavior::Answer => Ok(QueryResult {
                columns: vec!["sql".to_string()],
                rows: vec![Row::new(vec![Value::String(sql.to_string())])],
                rows_affected: 0,
            }),
            ProbeBehavior::Fail => Err(AsqlError::Query("server went away".into())),
            ProbeBehavior::Hang => std::future::pending().await,
        }
    }

    async fn send_prepared_statement(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if sql.starts_with("UPDATE") {
            return Ok(QueryResult::affected(params.len() as u64));
        }
        Ok(QueryResult {
            columns: vec!["param".to_string()],
            rows: params
                .iter()
                .map(|p| Row::new(vec![p.clone()]))
                .collect(),
            rows_affected: 0,
        })
    }
}

/// Factory whose first `fail_first` connection attempts are refused
pub struct MockConnectionFactory {
    counters: Arc<MockCounters>,
    fail_first: usize,
    connections: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockConnectionFactory {
    pub fn new() -> Self {
        Self::failing(0)
    }

    pub fn failing(fail_first: usize) -> Self {
        Self {
            counters: Arc::new(MockCounters::default()),
            fail_first,
            connections: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self::failing(usize::MAX)
    }

    pub fn attempts(&self) -> usize {
        self.counters.attempts.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.counters.created.load(Ordering::SeqCst)
    }

    pub fn max_open(&self) -> usize {
        self.counters.max_open.load(Ordering::SeqCst)
    }

    /// Connection created by the `n`-th attempt (0-based)
    pub fn connection(&self, n: usize) -> Arc<MockConnection> {
        self.connections.lock()[n].clone()
    }

    /// Connections whose handshake succeeded, in creation order
    pub fn connected(&self) -> Vec<Arc<MockConnection>> {
        self.connections
            .lock()
            .iter()
            .filter(|c| !c.fail_connect)
            .cloned()
            .collect()
    }
}

impl ConnectionFactory for MockConnectionFactory {
    fn create(&self) -> Result<Arc<dyn Connection>> {
        let attempt = self.counters.attempts.fetch_add(1, Ordering::SeqCst);
        let connection = Arc::new(MockConnection {
            id: attempt,
            connected: AtomicBool::new(false),
            fail_connect: attempt < self.fail_first,
            probe: Mutex::new(ProbeBehavior::Answer),
            queries: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            counters: self.counters.clone(),
        });
        self.connections.lock().push(connection.clone());
        Ok(connection)
    }
}

/// Driver handing out one shared mock factory per backend
pub struct MockDriver {
    backend: Backend,
    pub factory: Arc<MockConnectionFactory>,
    pub factories_built: AtomicUsize,
}

impl MockDriver {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            factory: Arc::new(MockConnectionFactory::new()),
            factories_built: AtomicUsize::new(0),
        }
    }
}

impl DatabaseDriver for MockDriver {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn connection_factory(&self, _settings: &ConnectionSettings) -> Arc<dyn ConnectionFactory> {
        self.factories_built.fetch_add(1, Ordering::SeqCst);
        self.factory.clone()
    }
}

/// Let spawned pool tasks run to completion
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Send log output to the test harness; filter with `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
