//! Adapters and peers — the synchronization endpoints.
//!
//! An `Adapter` owns a set of stores keyed by normalized URI. The local
//! adapter additionally owns its known peers and a storage backend, and
//! persists its model after every mutation. A `Peer` is a remote adapter
//! as seen from the local side, carrying the route list that pairs local
//! stores with its own.

use crate::error::{SyncError, SyncResult};
use crate::storage::{AdapterModel, ModelStorage, PeerModel};
use std::collections::HashMap;
use std::sync::Arc;
use syncml_types::{DeviceId, Route, Store, StoreUri};
use tracing::{debug, info};

/// A synchronization endpoint owning a set of stores.
pub struct Adapter {
    dev_id: DeviceId,
    url: Option<String>,
    is_local: bool,
    stores: HashMap<StoreUri, Store>,
    peers: Vec<Peer>,
    storage: Option<Arc<dyn ModelStorage>>,
}

impl Adapter {
    /// Creates the local adapter, backed by the given storage.
    #[must_use]
    pub fn new_local(dev_id: impl Into<DeviceId>, storage: Arc<dyn ModelStorage>) -> Self {
        Self {
            dev_id: dev_id.into(),
            url: None,
            is_local: true,
            stores: HashMap::new(),
            peers: Vec::new(),
            storage: Some(storage),
        }
    }

    /// Creates a remote adapter description (used inside a [`Peer`]).
    #[must_use]
    pub fn new_remote(dev_id: impl Into<DeviceId>) -> Self {
        Self {
            dev_id: dev_id.into(),
            url: None,
            is_local: false,
            stores: HashMap::new(),
            peers: Vec::new(),
            storage: None,
        }
    }

    /// Restores a local adapter from a persisted model snapshot.
    #[must_use]
    pub fn from_model(model: AdapterModel, storage: Arc<dyn ModelStorage>) -> Self {
        let mut adapter = Self::new_local(model.dev_id, storage);
        adapter.url = model.url;
        for store in model.stores {
            adapter.stores.insert(store.uri.clone(), store);
        }
        for peer_model in model.peers {
            let mut peer = Peer::new(peer_model.dev_id);
            peer.adapter.url = peer_model.url;
            for store in peer_model.stores {
                peer.adapter.stores.insert(store.uri.clone(), store);
            }
            peer.routes = peer_model.routes;
            adapter.peers.push(peer);
        }
        adapter
    }

    /// Sets the adapter URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Whether this is the local endpoint.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.is_local
    }

    /// The adapter's device ID.
    #[must_use]
    pub fn dev_id(&self) -> &DeviceId {
        &self.dev_id
    }

    /// The adapter URL, if configured.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Normalizes a raw URI string. The single point of URI comparison.
    #[must_use]
    pub fn norm_uri(uri: &str) -> StoreUri {
        StoreUri::new(uri)
    }

    // ── Store management ─────────────────────────────────────────

    /// Registers a store.
    ///
    /// The store's URI is normalized first. Fails with a logical error if a
    /// store with that URI already exists, and with an internal error if
    /// the updated model cannot be persisted (local adapters only).
    pub fn add_store(&mut self, mut store: Store) -> SyncResult<&Store> {
        store.uri = Self::norm_uri(store.uri.as_str());
        let uri = store.uri.clone();
        if self.stores.contains_key(&uri) {
            return Err(SyncError::Logical(format!(
                "store already exists: {uri}"
            )));
        }
        info!(dev_id = %self.dev_id, store = %uri, "adding store");
        self.stores.insert(uri.clone(), store);
        self.persist()?;
        Ok(&self.stores[&uri])
    }

    /// Removes a local store.
    ///
    /// Removal of a remote store is the remote peer's responsibility, so
    /// calling this on a non-local adapter is a logical error; removing a
    /// store that does not exist is an internal error. On success every
    /// known peer has dangling routes and bindings that pointed at the
    /// removed store cleared.
    pub fn remove_store(&mut self, uri: impl Into<StoreUri>) -> SyncResult<()> {
        if !self.is_local {
            return Err(SyncError::Logical(
                "cannot remove a store from a remote adapter".into(),
            ));
        }
        let uri = uri.into();
        if self.stores.remove(&uri).is_none() {
            return Err(SyncError::Internal(format!("no such store: {uri}")));
        }
        info!(dev_id = %self.dev_id, store = %uri, "removing store");

        for peer in &mut self.peers {
            let before = peer.routes.len();
            peer.routes.retain(|r| r.local_uri != uri);
            if peer.routes.len() != before {
                debug!(peer = %peer.dev_id(), store = %uri, "pruned dangling routes");
            }
            for store in peer.adapter.stores.values_mut() {
                if store
                    .binding
                    .as_ref()
                    .is_some_and(|b| b.local_uri == uri)
                {
                    store.binding = None;
                }
            }
        }

        self.persist()
    }

    /// Looks up a store by URI. Returns `None` for an unknown URI.
    #[must_use]
    pub fn get_store(&self, uri: impl Into<StoreUri>) -> Option<&Store> {
        self.stores.get(&uri.into())
    }

    /// Looks up a store mutably.
    pub fn get_store_mut(&mut self, uri: impl Into<StoreUri>) -> Option<&mut Store> {
        self.stores.get_mut(&uri.into())
    }

    /// All stores, in no particular order.
    pub fn get_stores(&self) -> impl Iterator<Item = &Store> {
        self.stores.values()
    }

    /// All store URIs, sorted for deterministic iteration.
    #[must_use]
    pub fn store_uris(&self) -> Vec<StoreUri> {
        let mut uris: Vec<StoreUri> = self.stores.keys().cloned().collect();
        uris.sort();
        uris
    }

    // ── Peer management (local adapters) ─────────────────────────

    /// Registers a peer. Fails if a peer with the same device ID exists or
    /// if called on a non-local adapter.
    pub fn add_peer(&mut self, peer: Peer) -> SyncResult<()> {
        if !self.is_local {
            return Err(SyncError::Logical(
                "only the local adapter tracks peers".into(),
            ));
        }
        if self.peers.iter().any(|p| p.dev_id() == peer.dev_id()) {
            return Err(SyncError::Logical(format!(
                "peer already exists: {}",
                peer.dev_id()
            )));
        }
        self.peers.push(peer);
        self.persist()
    }

    /// Looks up a peer by device ID.
    #[must_use]
    pub fn get_peer(&self, dev_id: &DeviceId) -> Option<&Peer> {
        self.peers.iter().find(|p| p.dev_id() == dev_id)
    }

    /// Looks up a peer mutably.
    pub fn get_peer_mut(&mut self, dev_id: &DeviceId) -> Option<&mut Peer> {
        self.peers.iter_mut().find(|p| p.dev_id() == dev_id)
    }

    /// All known peers.
    #[must_use]
    pub fn all_peers(&self) -> &[Peer] {
        &self.peers
    }

    /// Detaches a peer so it can be mutated alongside a borrow of the
    /// adapter (routers take `&Adapter` and `&mut Peer`). Reattach with
    /// [`Adapter::restore_peer`].
    pub fn take_peer(&mut self, dev_id: &DeviceId) -> Option<Peer> {
        let idx = self.peers.iter().position(|p| p.dev_id() == dev_id)?;
        Some(self.peers.remove(idx))
    }

    /// Reattaches a peer taken with [`Adapter::take_peer`].
    pub fn restore_peer(&mut self, peer: Peer) {
        self.peers.push(peer);
    }

    // ── Persistence ──────────────────────────────────────────────

    /// Builds a serializable snapshot of this adapter.
    #[must_use]
    pub fn snapshot(&self) -> AdapterModel {
        let mut stores: Vec<Store> = self.stores.values().cloned().collect();
        stores.sort_by(|a, b| a.uri.cmp(&b.uri));
        AdapterModel {
            dev_id: self.dev_id.clone(),
            url: self.url.clone(),
            stores,
            peers: self.peers.iter().map(Peer::snapshot).collect(),
        }
    }

    /// Persists the current model. A no-op for remote adapters.
    pub(crate) fn persist(&self) -> SyncResult<()> {
        if !self.is_local {
            return Ok(());
        }
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        storage.save(&self.snapshot()).map_err(|e| {
            SyncError::Internal(format!("failed to persist adapter model: {e}"))
        })
    }
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("dev_id", &self.dev_id)
            .field("url", &self.url)
            .field("is_local", &self.is_local)
            .field("stores", &self.stores)
            .field("peers", &self.peers)
            .finish_non_exhaustive()
    }
}

/// A remote adapter as observed by the local side, plus its route list.
#[derive(Debug)]
pub struct Peer {
    adapter: Adapter,
    routes: Vec<Route>,
}

impl Peer {
    /// Creates a peer description with no stores or routes.
    #[must_use]
    pub fn new(dev_id: impl Into<DeviceId>) -> Self {
        Self {
            adapter: Adapter::new_remote(dev_id),
            routes: Vec::new(),
        }
    }

    /// Sets the peer URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.adapter.url = Some(url.into());
        self
    }

    /// The peer's device ID.
    #[must_use]
    pub fn dev_id(&self) -> &DeviceId {
        self.adapter.dev_id()
    }

    /// The underlying remote adapter.
    #[must_use]
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// The underlying remote adapter, mutably.
    pub fn adapter_mut(&mut self) -> &mut Adapter {
        &mut self.adapter
    }

    /// Registers a store on the peer side. Peers carry no storage backend,
    /// so this never persists.
    pub fn add_store(&mut self, store: Store) -> SyncResult<&Store> {
        self.adapter.add_store(store)
    }

    /// The active route list.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Only the manually configured routes.
    #[must_use]
    pub fn manual_routes(&self) -> Vec<Route> {
        self.routes
            .iter()
            .filter(|r| !r.auto_mapped)
            .cloned()
            .collect()
    }

    /// Pins a manual route.
    ///
    /// Fails if the remote URI is already the target of an active route
    /// (remote URIs are unique in the route list).
    pub fn set_route(&mut self, local_uri: impl Into<StoreUri>, remote_uri: impl Into<StoreUri>) -> SyncResult<()> {
        let route = Route::manual(local_uri, remote_uri);
        if self.routes.iter().any(|r| r.remote_uri == route.remote_uri) {
            return Err(SyncError::Logical(format!(
                "remote store {} is already routed",
                route.remote_uri
            )));
        }
        debug!(peer = %self.dev_id(), local = %route.local_uri, remote = %route.remote_uri, "pinning manual route");
        self.routes.push(route);
        Ok(())
    }

    /// Replaces the entire route list. Used by the routers after
    /// validation; callers should prefer [`Peer::set_route`].
    pub(crate) fn replace_routes(&mut self, routes: Vec<Route>) {
        self.routes = routes;
    }

    /// Builds a serializable snapshot of this peer.
    #[must_use]
    pub fn snapshot(&self) -> PeerModel {
        let mut stores: Vec<Store> = self.adapter.stores.values().cloned().collect();
        stores.sort_by(|a, b| a.uri.cmp(&b.uri));
        PeerModel {
            dev_id: self.dev_id().clone(),
            url: self.adapter.url.clone(),
            stores,
            routes: self.routes.clone(),
        }
    }
}
