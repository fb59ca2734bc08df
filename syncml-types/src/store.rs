//! The store / route / binding data model.
//!
//! A `Store` describes one syncable collection on an adapter. Routes live
//! on a peer's route list and pair a local store with a remote one;
//! bindings are the resolved form of a route, held on the remote-side
//! store. Automatic routes and their bindings are derived state and are
//! recomputed wholesale by the routers.

use crate::ctype::ContentTypeInfo;
use crate::uri::StoreUri;
use serde::{Deserialize, Serialize};

/// One syncable data collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    /// Normalized path, unique within the owning adapter.
    pub uri: StoreUri,
    /// Human-readable name shown at decision points.
    pub display_name: String,
    /// Formats this store can handle.
    pub content_types: Vec<ContentTypeInfo>,
    /// Largest GUID the store accepts, if it advertises a limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_guid_size: Option<u32>,
    /// Resolved pairing, set only on peer-side stores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<Binding>,
}

impl Store {
    /// Creates a store with no declared content types.
    #[must_use]
    pub fn new(uri: impl Into<StoreUri>, display_name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            display_name: display_name.into(),
            content_types: Vec::new(),
            max_guid_size: None,
            binding: None,
        }
    }

    /// Adds a content-type capability.
    #[must_use]
    pub fn with_content_type(mut self, info: ContentTypeInfo) -> Self {
        self.content_types.push(info);
        self
    }

    /// Sets the advertised GUID size limit.
    #[must_use]
    pub fn with_max_guid_size(mut self, size: u32) -> Self {
        self.max_guid_size = Some(size);
        self
    }
}

/// A (local store, remote store) pairing on a peer's route list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// URI of the local-adapter store.
    pub local_uri: StoreUri,
    /// URI of the peer store.
    pub remote_uri: StoreUri,
    /// True when the route was produced by automatic matching rather than
    /// manual configuration. Automatic routes are disposable derived state.
    pub auto_mapped: bool,
}

impl Route {
    /// Creates a manual route.
    #[must_use]
    pub fn manual(local_uri: impl Into<StoreUri>, remote_uri: impl Into<StoreUri>) -> Self {
        Self {
            local_uri: local_uri.into(),
            remote_uri: remote_uri.into(),
            auto_mapped: false,
        }
    }

    /// Creates an automatically matched route.
    #[must_use]
    pub fn auto(local_uri: impl Into<StoreUri>, remote_uri: impl Into<StoreUri>) -> Self {
        Self {
            local_uri: local_uri.into(),
            remote_uri: remote_uri.into(),
            auto_mapped: true,
        }
    }
}

/// The resolved pairing held on a peer-side store.
///
/// Anchors are opaque sync-state tokens carried unchanged by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// URI of the local store this peer store is bound to.
    pub local_uri: StoreUri,
    /// Whether the originating route was auto-mapped.
    pub auto_mapped: bool,
    /// Local sync anchor, if a sync has been recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_anchor: Option<String>,
    /// Remote sync anchor, if a sync has been recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_anchor: Option<String>,
}

impl Binding {
    /// Creates a fresh binding with no recorded anchors.
    #[must_use]
    pub fn new(local_uri: impl Into<StoreUri>, auto_mapped: bool) -> Self {
        Self {
            local_uri: local_uri.into(),
            auto_mapped,
            local_anchor: None,
            remote_anchor: None,
        }
    }
}
