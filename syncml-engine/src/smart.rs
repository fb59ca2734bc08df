//! Automatic route computation via stable matching.

use crate::adapter::{Adapter, Peer};
use crate::error::SyncResult;
use crate::matcher;
use crate::matching::match_stable;
use crate::router::{setup_routes, Router};
use std::collections::HashSet;
use syncml_types::{Route, Store, StoreUri};
use tracing::debug;

/// Router that honors manual routes first and pairs the remaining stores
/// automatically, ranked by content-type compatibility.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmartRouter;

impl Router for SmartRouter {
    fn recalculate(&self, adapter: &Adapter, peer: &mut Peer) -> SyncResult<()> {
        let manual = peer.manual_routes();

        // Manual routes consume their endpoints; matching only sees the rest.
        let pinned_local: HashSet<&StoreUri> = manual.iter().map(|r| &r.local_uri).collect();
        let pinned_remote: HashSet<&StoreUri> = manual.iter().map(|r| &r.remote_uri).collect();

        let avail_local: Vec<StoreUri> = adapter
            .store_uris()
            .into_iter()
            .filter(|u| !pinned_local.contains(u))
            .collect();
        let avail_remote: Vec<StoreUri> = peer
            .adapter()
            .store_uris()
            .into_iter()
            .filter(|u| !pinned_remote.contains(u))
            .collect();

        let remote_stores: Vec<&Store> = avail_remote
            .iter()
            .filter_map(|u| peer.adapter().get_store(u.clone()))
            .collect();
        let local_stores: Vec<&Store> = avail_local
            .iter()
            .filter_map(|u| adapter.get_store(u.clone()))
            .collect();

        let rank_local = |uri: &StoreUri| -> Vec<StoreUri> {
            match adapter.get_store(uri.clone()) {
                Some(store) => matcher::rank_by_compatibility(store, &remote_stores),
                None => Vec::new(),
            }
        };
        let rank_remote = |uri: &StoreUri| -> Vec<StoreUri> {
            match peer.adapter().get_store(uri.clone()) {
                Some(store) => matcher::rank_by_compatibility(store, &local_stores),
                None => Vec::new(),
            }
        };

        let pairs = match_stable(&avail_local, &avail_remote, rank_local, rank_remote);
        debug!(
            peer = %peer.dev_id(),
            manual = manual.len(),
            auto = pairs.len(),
            "smart recalculation"
        );

        let mut routes = manual;
        routes.extend(
            pairs
                .into_iter()
                .map(|(local, remote)| Route::auto(local, remote)),
        );
        setup_routes(adapter, peer, routes)
    }
}
