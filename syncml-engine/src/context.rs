//! Session entry point.
//!
//! A `Context` bundles what one synchronization session needs: the model
//! storage backend, the codec registry, the route-computation strategy,
//! and the user-agent chain. It creates (or restores) the local adapter
//! and drives recalculation for a peer.

use crate::adapter::Adapter;
use crate::agent::UserAgentMultiplexer;
use crate::codec::CodecRegistry;
use crate::error::{SyncError, SyncResult};
use crate::router::Router;
use crate::smart::SmartRouter;
use crate::storage::{MemoryStorage, ModelStorage};
use std::sync::Arc;
use syncml_types::DeviceId;
use tracing::info;

/// A synchronization session's shared machinery.
pub struct Context {
    storage: Arc<dyn ModelStorage>,
    codecs: CodecRegistry,
    router: Arc<dyn Router>,
    agent: UserAgentMultiplexer,
}

impl Context {
    /// Creates a context with the given storage, smart routing, the
    /// standard codecs, and an empty user-agent chain.
    #[must_use]
    pub fn new(storage: Arc<dyn ModelStorage>) -> Self {
        Self {
            storage,
            codecs: CodecRegistry::with_defaults(),
            router: Arc::new(SmartRouter),
            agent: UserAgentMultiplexer::new(Vec::new()),
        }
    }

    /// Creates an in-memory context, mostly useful in tests.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Replaces the route-computation strategy.
    #[must_use]
    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = router;
        self
    }

    /// Replaces the user-agent chain.
    #[must_use]
    pub fn with_agent(mut self, agent: UserAgentMultiplexer) -> Self {
        self.agent = agent;
        self
    }

    /// The codec registry.
    #[must_use]
    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// The codec registry, mutably (to register custom codecs).
    pub fn codecs_mut(&mut self) -> &mut CodecRegistry {
        &mut self.codecs
    }

    /// The user-agent multiplexer.
    #[must_use]
    pub fn agent(&self) -> &UserAgentMultiplexer {
        &self.agent
    }

    /// Creates the local adapter, restoring a persisted model when the
    /// storage backend has one.
    pub fn open_adapter(&self, dev_id: impl Into<DeviceId>) -> SyncResult<Adapter> {
        let dev_id = dev_id.into();
        match self.storage.load()? {
            Some(model) => {
                info!(dev_id = %model.dev_id, "restoring adapter from persisted model");
                Ok(Adapter::from_model(model, self.storage.clone()))
            }
            None => Ok(Adapter::new_local(dev_id, self.storage.clone())),
        }
    }

    /// Recomputes routes and bindings for one of the adapter's peers and
    /// persists the result.
    pub fn recalculate(&self, adapter: &mut Adapter, dev_id: &DeviceId) -> SyncResult<()> {
        let mut peer = adapter
            .take_peer(dev_id)
            .ok_or_else(|| SyncError::Logical(format!("unknown peer: {dev_id}")))?;
        let result = self.router.recalculate(adapter, &mut peer);
        adapter.restore_peer(peer);
        result?;
        adapter.persist()
    }
}
