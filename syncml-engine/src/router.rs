//! Route computation and validation.
//!
//! A router decides which local store is paired with which peer store.
//! `ManualRouter` only honors routes pinned by configuration;
//! `SmartRouter` (in `smart.rs`) additionally fills the gaps with stable
//! matching. Both funnel through [`setup_routes`], which validates the
//! full candidate list and commits it all-or-nothing.

use crate::adapter::{Adapter, Peer};
use crate::error::{SyncError, SyncResult};
use crate::matcher;
use std::collections::HashSet;
use syncml_types::{Binding, ContentTypeInfo, Route, StoreUri};
use tracing::{debug, info};

/// A route-computation strategy.
pub trait Router: Send + Sync {
    /// Recomputes the peer's route list and bindings.
    fn recalculate(&self, adapter: &Adapter, peer: &mut Peer) -> SyncResult<()>;
}

/// Router that never invents pairings: only manually pinned routes
/// survive recalculation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualRouter;

impl Router for ManualRouter {
    fn recalculate(&self, adapter: &Adapter, peer: &mut Peer) -> SyncResult<()> {
        let manual = peer.manual_routes();
        setup_routes(adapter, peer, manual)
    }
}

/// Resolves the remote store a local store is routed to.
///
/// The route list is consulted first, then the peer stores' bindings.
/// Routes are written by configuration and bindings by recalculation;
/// the two code paths must agree, so both are checked.
#[must_use]
pub fn get_target_uri(_adapter: &Adapter, peer: &Peer, source_uri: &StoreUri) -> Option<StoreUri> {
    if let Some(route) = peer.routes().iter().find(|r| r.local_uri == *source_uri) {
        return Some(route.remote_uri.clone());
    }
    peer.adapter()
        .get_stores()
        .find(|s| {
            s.binding
                .as_ref()
                .is_some_and(|b| b.local_uri == *source_uri)
        })
        .map(|s| s.uri.clone())
}

/// Picks the content type to transmit from a routed local store.
///
/// Fails with a logical error if the local store is unknown; returns
/// `Ok(None)` when the store is unrouted or the pairing shares no usable
/// content type.
pub fn get_best_transmit_content_type(
    adapter: &Adapter,
    peer: &Peer,
    uri: &StoreUri,
) -> SyncResult<Option<ContentTypeInfo>> {
    let local = adapter
        .get_store(uri.clone())
        .ok_or_else(|| SyncError::Logical(format!("no such local store: {uri}")))?;
    let Some(target) = get_target_uri(adapter, peer, uri) else {
        return Ok(None);
    };
    let Some(remote) = peer.adapter().get_store(target) else {
        return Ok(None);
    };
    Ok(matcher::pick_transmit_content_type(local, remote))
}

/// Validates and commits a candidate route list.
///
/// Every candidate is re-normalized and checked: both referenced stores
/// must exist and neither endpoint may already be consumed by an earlier
/// route in the same pass (first match wins). Any invalid route fails the
/// whole call with a logical error naming the offending pair, and no
/// route is committed. On success the peer's route list is replaced and a
/// binding is written to each routed peer store; anchors survive when the
/// store stays bound to the same local store.
///
/// Bindings of peer stores not covered by any candidate route are cleared
/// *before* validation, so a failed call still leaves those cleared.
pub fn setup_routes(adapter: &Adapter, peer: &mut Peer, routes: Vec<Route>) -> SyncResult<()> {
    // Re-normalize candidate endpoints.
    let candidates: Vec<Route> = routes
        .into_iter()
        .map(|r| Route {
            local_uri: Adapter::norm_uri(r.local_uri.as_str()),
            remote_uri: Adapter::norm_uri(r.remote_uri.as_str()),
            auto_mapped: r.auto_mapped,
        })
        .collect();

    // Clear bindings on peer stores no route references anymore.
    let covered: HashSet<&StoreUri> = candidates.iter().map(|r| &r.remote_uri).collect();
    let stale: Vec<StoreUri> = peer
        .adapter()
        .get_stores()
        .filter(|s| s.binding.is_some() && !covered.contains(&s.uri))
        .map(|s| s.uri.clone())
        .collect();
    for uri in stale {
        debug!(peer = %peer.dev_id(), store = %uri, "clearing stale binding");
        if let Some(store) = peer.adapter_mut().get_store_mut(uri) {
            store.binding = None;
        }
    }

    // Validate the full list before touching routes or bindings.
    let mut used_local: HashSet<&StoreUri> = HashSet::new();
    let mut used_remote: HashSet<&StoreUri> = HashSet::new();
    for route in &candidates {
        if adapter.get_store(route.local_uri.clone()).is_none() {
            return Err(route_error(route, "local store does not exist"));
        }
        if peer.adapter().get_store(route.remote_uri.clone()).is_none() {
            return Err(route_error(route, "remote store does not exist"));
        }
        if !used_local.insert(&route.local_uri) {
            return Err(route_error(route, "local store already routed"));
        }
        if !used_remote.insert(&route.remote_uri) {
            return Err(route_error(route, "remote store already routed"));
        }
    }

    // Commit: replace the route list and rewrite bindings.
    for route in &candidates {
        let store = peer
            .adapter_mut()
            .get_store_mut(route.remote_uri.clone())
            .ok_or_else(|| SyncError::Internal(format!(
                "validated remote store vanished: {}",
                route.remote_uri
            )))?;
        let mut binding = Binding::new(route.local_uri.clone(), route.auto_mapped);
        if let Some(prev) = store.binding.take() {
            // Anchors are opaque sync state; a re-route to a different
            // local store starts from scratch.
            if prev.local_uri == route.local_uri {
                binding.local_anchor = prev.local_anchor;
                binding.remote_anchor = prev.remote_anchor;
            }
        }
        store.binding = Some(binding);
    }

    info!(
        peer = %peer.dev_id(),
        routes = candidates.len(),
        "route list committed"
    );
    peer.replace_routes(candidates);
    Ok(())
}

fn route_error(route: &Route, why: &str) -> SyncError {
    SyncError::Logical(format!(
        "invalid route {} -> {}: {why}",
        route.local_uri, route.remote_uri
    ))
}
