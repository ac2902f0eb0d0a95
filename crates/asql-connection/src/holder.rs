//! Reference-counted owner of one shared client

use std::sync::Arc;

use asql_core::{AsqlError, Backend, DatabaseDriver, Result};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::client::SqlClient;
use crate::config::ClientConfig;
use crate::registry::Registration;

struct HolderState {
    ref_count: usize,
    client: Option<Arc<SqlClient>>,
}

/// Outcome of dropping one reference
pub(crate) enum Release {
    /// Other references remain, or the holder was already torn down
    Kept,
    /// That was the last reference; the client, if built, must be closed
    Last(Option<Arc<SqlClient>>),
}

/// Owns a lazily built [`SqlClient`] shared by every wrapper of one name
///
/// Starts with one reference. The client is torn down when the count drops
/// back to zero. A torn-down holder stays dead: it hands out no more
/// references and no new client.
///
/// A holder created by a registry releases its references inside the
/// registry's lock, so its entry disappears together with the last one.
pub struct ClientHolder {
    id: Uuid,
    backend: Backend,
    config: ClientConfig,
    driver: Arc<dyn DatabaseDriver>,
    registration: Option<Registration>,
    state: Mutex<HolderState>,
}

impl ClientHolder {
    /// Create a holder that belongs to no registry
    pub fn new(backend: Backend, config: ClientConfig, driver: Arc<dyn DatabaseDriver>) -> Self {
        Self::build(backend, config, driver, None)
    }

    pub(crate) fn registered(
        backend: Backend,
        config: ClientConfig,
        driver: Arc<dyn DatabaseDriver>,
        registration: Registration,
    ) -> Self {
        Self::build(backend, config, driver, Some(registration))
    }

    fn build(
        backend: Backend,
        config: ClientConfig,
        driver: Arc<dyn DatabaseDriver>,
        registration: Option<Registration>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            backend,
            config,
            driver,
            registration,
            state: Mutex::new(HolderState {
                ref_count: 1,
                client: None,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// The shared client, built on first use
    pub fn client(&self) -> Result<Arc<SqlClient>> {
        let mut state = self.state.lock();
        if state.ref_count == 0 {
            return Err(AsqlError::PoolClosed(format!(
                "client {} has been closed",
                self.id
            )));
        }
        let client = state.client.get_or_insert_with(|| {
            Arc::new(SqlClient::new(
                self.backend,
                &self.config,
                self.driver.as_ref(),
            ))
        });
        Ok(client.clone())
    }

    /// Add a reference. Returns `false` if the holder was already torn down.
    pub fn inc_ref_count(&self) -> bool {
        let mut state = self.state.lock();
        if state.ref_count == 0 {
            return false;
        }
        state.ref_count += 1;
        tracing::trace!(holder = %self.id, ref_count = state.ref_count, "reference added");
        true
    }

    pub fn ref_count(&self) -> usize {
        self.state.lock().ref_count
    }

    /// Drop one reference under the holder lock
    pub(crate) fn release_ref(&self) -> Release {
        let mut state = self.state.lock();
        if state.ref_count == 0 {
            return Release::Kept;
        }
        state.ref_count -= 1;
        if state.ref_count > 0 {
            tracing::trace!(holder = %self.id, ref_count = state.ref_count, "reference released");
            return Release::Kept;
        }
        Release::Last(state.client.take())
    }

    /// Release one reference, tearing the client down with the last one
    pub async fn close(&self) -> Result<()> {
        let release = match &self.registration {
            Some(registration) => registration.release(self),
            None => self.release_ref(),
        };
        let Release::Last(client) = release else {
            return Ok(());
        };

        tracing::debug!(holder = %self.id, backend = %self.backend, "last reference released");
        match client {
            Some(client) => client.close().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriver;
    use std::sync::atomic::Ordering;

    fn holder() -> (ClientHolder, Arc<MockDriver>) {
        let driver = Arc::new(MockDriver::new(Backend::MySql));
        let holder = ClientHolder::new(Backend::MySql, ClientConfig::default(), driver.clone());
        (holder, driver)
    }

    #[tokio::test]
    async fn test_client_built_once() {
        let (holder, driver) = holder();
        let first = holder.client().expect("client");
        let second = holder.client().expect("client");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(driver.factories_built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_only_last_close_tears_down() {
        let (holder, _) = holder();
        let client = holder.client().expect("client");
        assert_eq!(holder.ref_count(), 1);
        assert!(holder.inc_ref_count());
        assert_eq!(holder.ref_count(), 2);

        holder.close().await.expect("close");
        assert_eq!(holder.ref_count(), 1);
        assert!(!client.pool().is_closed());

        holder.close().await.expect("close");
        assert_eq!(holder.ref_count(), 0);
        assert!(client.pool().is_closed());

        holder.close().await.expect("close");
        assert_eq!(holder.ref_count(), 0);
    }

    #[tokio::test]
    async fn test_torn_down_holder_stays_dead() {
        let (holder, driver) = holder();
        holder.close().await.expect("close");

        assert!(!holder.inc_ref_count());
        assert_eq!(holder.ref_count(), 0);
        assert!(matches!(holder.client(), Err(AsqlError::PoolClosed(_))));
        assert_eq!(driver.factories_built.load(Ordering::SeqCst), 0);
    }
}
