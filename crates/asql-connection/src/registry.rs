//! Registry of named shared clients, one namespace per backend

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use asql_core::{AsqlError, Backend, DatabaseDriver, Result};

use crate::config::ClientConfig;
use crate::holder::{ClientHolder, Release};
use crate::wrapper::ClientWrapper;


type Namespace = HashMap<String, Arc<ClientHolder>>;

struct RegistryInner {
    drivers: RwLock<HashMap<Backend, Arc<dyn DatabaseDriver>>>,
    pools: Mutex<HashMap<Backend, Namespace>>,
}

impl RegistryInner {
    /// Drop one reference of `holder` inside the registry lock.
    ///
    /// The last reference and the entry go away in the same critical
    /// section, so a listed holder always has at least one reference.
    fn release(&self, backend: Backend, name: &str, holder: &ClientHolder) -> Release {
        let mut pools = self.pools.lock();
        let release = holder.release_ref();
        if !matches!(release, Release::Last(_)) {
            return release;
        }

        let Some(namespace) = pools.get_mut(&backend) else {
            return release;
        };
        if namespace
            .get(name)
            .is_some_and(|entry| std::ptr::eq(entry.as_ref(), holder))
        {
            namespace.remove(name);
            tracing::debug!(backend = %backend, name, "shared client removed");
        }
        if namespace.is_empty() {
            pools.remove(&backend);
            tracing::debug!(namespace = backend.namespace(), "namespace disposed");
        }
        release
    }
}

/// Link from a holder back to the registry entry it is listed under
pub(crate) struct Registration {
    registry: Weak<RegistryInner>,
    backend: Backend,
    name: String,
}

impl Registration {
    pub(crate) fn release(&self, holder: &ClientHolder) -> Release {
        match self.registry.upgrade() {
            Some(registry) => registry.release(self.backend, &self.name, holder),
            None => holder.release_ref(),
        }
    }
}

/// Process-wide table of shared clients
///
/// Clients are keyed by backend and name. Every
/// [`get_or_create`](Self::get_or_create) call for an existing name adds a
/// reference to the same client; the client is closed and its entry removed
/// when the last [`ClientWrapper`] is closed. Cloning yields a handle to the
/// same registry, so it can be passed around as part of application state.
#[derive(Clone)]
pub struct ClientRegistry {
    inner: Arc<RegistryInner>,
}

impl ClientRegistry {
    /// Create an empty registry with no drivers
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                drivers: RwLock::new(HashMap::new()),
                pools: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register a driver and return the registry
    pub fn with_driver(self, driver: Arc<dyn DatabaseDriver>) -> Self {
        self.register_driver(driver);
        self
    }

    /// Register the driver used for its backend, replacing any previous one
    pub fn register_driver(&self, driver: Arc<dyn DatabaseDriver>) {
        let backend = driver.backend();
        tracing::debug!(backend = %backend, "registering driver");
        self.inner.drivers.write().insert(backend, driver);
    }

    fn driver(&self, backend: Backend) -> Result<Arc<dyn DatabaseDriver>> {
        self.inner
            .drivers
            .read()
            .get(&backend)
            .cloned()
            .ok_or_else(|| AsqlError::NotSupported(format!("no driver registered for {backend}")))
    }

    /// Get a reference to the client registered as `name`, creating it with
    /// `config` if there is none
    ///
    /// The configuration of an existing client is left untouched.
    #[tracing::instrument(skip(self, config, backend), fields(backend = %backend))]
    pub fn get_or_create(
        &self,
        name: &str,
        config: &ClientConfig,
        backend: Backend,
    ) -> Result<ClientWrapper> {
        let driver = self.driver(backend)?;
        config.validate()?;

        let holder = {
            let mut pools = self.inner.pools.lock();
            let namespace = pools.entry(backend).or_default();
            let existing = namespace
                .get(name)
                .filter(|holder| holder.inc_ref_count())
                .cloned();
            match existing {
                Some(existing) => {
                    tracing::debug!(ref_count = existing.ref_count(), "reusing shared client");
                    existing
                }
                None => {
                    let registration = Registration {
                        registry: Arc::downgrade(&self.inner),
                        backend,
                        name: name.to_string(),
                    };
                    let holder = Arc::new(ClientHolder::registered(
                        backend,
                        config.clone(),
                        driver,
                        registration,
                    ));
                    namespace.insert(name.to_string(), holder.clone());
                    tracing::info!(holder = %holder.id(), "registered shared client");
                    holder
                }
            }
        };

        ClientWrapper::new(holder)
    }

    /// Get or create the client registered as `name`
    pub fn create_shared(
        &self,
        config: &ClientConfig,
        backend: Backend,
        name: &str,
    ) -> Result<ClientWrapper> {
        self.get_or_create(name, config, backend)
    }

    /// Get or create the backend's default shared client
    pub fn create_shared_default(
        &self,
        config: &ClientConfig,
        backend: Backend,
    ) -> Result<ClientWrapper> {
        self.get_or_create(backend.default_pool_name(), config, backend)
    }

    /// Create a client no other caller will share
    pub fn create_non_shared(
        &self,
        config: &ClientConfig,
        backend: Backend,
    ) -> Result<ClientWrapper> {
        self.get_or_create(&Uuid::new_v4().to_string(), config, backend)
    }

    /// Number of clients registered for `backend`
    pub fn len(&self, backend: Backend) -> usize {
        self.inner
            .pools
            .lock()
            .get(&backend)
            .map(|namespace| namespace.len())
            .unwrap_or(0)
    }

    /// Whether no client is registered for any backend
    pub fn is_empty(&self) -> bool {
        self.pool_count() == 0
    }

    /// Number of clients across all backends
    pub fn pool_count(&self) -> usize {
        self.inner
            .pools
            .lock()
            .values()
            .map(|namespace| namespace.len())
            .sum()
    }

    /// Whether the backend's namespace currently exists
    pub fn has_namespace(&self, backend: Backend) -> bool {
        self.inner.pools.lock().contains_key(&backend)
    }

    /// Number of open references to the client registered as `name`
    pub fn ref_count(&self, backend: Backend, name: &str) -> Option<usize> {
        self.inner
            .pools
            .lock()
            .get(&backend)
            .and_then(|namespace| namespace.get(name))
            .map(|holder| holder.ref_count())
    }

    /// Whether a client is registered as `name`
    pub fn contains(&self, backend: Backend, name: &str) -> bool {
        self.ref_count(backend, name).is_some()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
