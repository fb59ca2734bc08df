use std::sync::Arc;
use syncml_engine::{Adapter, MemoryStorage, Peer, Router, SmartRouter};
use syncml_types::{ContentTypeInfo, Store, StoreUri, CTYPE_ICALENDAR, CTYPE_PLAIN_TEXT, CTYPE_VCARD};

fn local_adapter() -> Adapter {
    Adapter::new_local("local-dev", Arc::new(MemoryStorage::new()))
}

fn store(uri: &str, info: ContentTypeInfo) -> Store {
    Store::new(uri, uri).with_content_type(info)
}

fn route_set(peer: &Peer) -> Vec<(String, String, bool)> {
    let mut routes: Vec<(String, String, bool)> = peer
        .routes()
        .iter()
        .map(|r| (r.local_uri.to_string(), r.remote_uri.to_string(), r.auto_mapped))
        .collect();
    routes.sort();
    routes
}

// ── Automatic pairing ─────────────────────────────────────────────

#[test]
fn pairs_by_content_type_compatibility() {
    let mut adapter = local_adapter();
    adapter.add_store(store("/contacts", ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))).unwrap();
    adapter.add_store(store("/calendar", ContentTypeInfo::new(CTYPE_ICALENDAR, &["2.0"]))).unwrap();
    adapter.add_store(store("/notes", ContentTypeInfo::new(CTYPE_PLAIN_TEXT, &["1.0"]))).unwrap();

    let mut peer = Peer::new("remote-dev");
    peer.add_store(store("/memo", ContentTypeInfo::new(CTYPE_PLAIN_TEXT, &["1.0"]))).unwrap();
    peer.add_store(store("/card", ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))).unwrap();
    peer.add_store(store("/cal", ContentTypeInfo::new(CTYPE_ICALENDAR, &["2.0"]))).unwrap();

    SmartRouter.recalculate(&adapter, &mut peer).unwrap();

    assert_eq!(
        route_set(&peer),
        vec![
            ("/calendar".to_string(), "/cal".to_string(), true),
            ("/contacts".to_string(), "/card".to_string(), true),
            ("/notes".to_string(), "/memo".to_string(), true),
        ]
    );
    for uri in ["/memo", "/card", "/cal"] {
        assert!(peer.adapter().get_store(uri).unwrap().binding.is_some());
    }
}

#[test]
fn manual_route_is_honored_and_rest_is_matched() {
    // Adapter has /a, /b; peer has /x, /y; manual route /a -> /x pinned.
    let mut adapter = local_adapter();
    adapter.add_store(store("/a", ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))).unwrap();
    adapter.add_store(store("/b", ContentTypeInfo::new(CTYPE_PLAIN_TEXT, &["1.0"]))).unwrap();

    let mut peer = Peer::new("remote-dev");
    peer.add_store(store("/x", ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))).unwrap();
    peer.add_store(store("/y", ContentTypeInfo::new(CTYPE_PLAIN_TEXT, &["1.0"]))).unwrap();
    peer.set_route("/a", "/x").unwrap();

    SmartRouter.recalculate(&adapter, &mut peer).unwrap();

    assert_eq!(
        route_set(&peer),
        vec![
            ("/a".to_string(), "/x".to_string(), false),
            ("/b".to_string(), "/y".to_string(), true),
        ]
    );
}

#[test]
fn manual_route_endpoints_are_excluded_from_matching() {
    // The manual pin takes the best vCard pairing off the table; matching
    // must still pair the remaining stores rather than steal /x.
    let mut adapter = local_adapter();
    adapter.add_store(store("/a", ContentTypeInfo::new(CTYPE_PLAIN_TEXT, &["1.0"]))).unwrap();
    adapter.add_store(store("/b", ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))).unwrap();

    let mut peer = Peer::new("remote-dev");
    peer.add_store(store("/x", ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))).unwrap();
    peer.add_store(store("/y", ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))).unwrap();
    peer.set_route("/a", "/x").unwrap();

    SmartRouter.recalculate(&adapter, &mut peer).unwrap();

    assert_eq!(
        route_set(&peer),
        vec![
            ("/a".to_string(), "/x".to_string(), false),
            ("/b".to_string(), "/y".to_string(), true),
        ]
    );
}

#[test]
fn recalculation_replaces_stale_auto_routes() {
    let mut adapter = local_adapter();
    adapter.add_store(store("/a", ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))).unwrap();

    let mut peer = Peer::new("remote-dev");
    peer.add_store(store("/x", ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))).unwrap();
    SmartRouter.recalculate(&adapter, &mut peer).unwrap();
    assert_eq!(peer.routes().len(), 1);

    // A better-sorting remote store arrives; auto routes are recomputed
    // from scratch, not accumulated.
    peer.add_store(store("/m", ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))).unwrap();
    SmartRouter.recalculate(&adapter, &mut peer).unwrap();

    assert_eq!(peer.routes().len(), 1);
    assert!(peer.routes()[0].auto_mapped);
    assert_eq!(peer.routes()[0].remote_uri, StoreUri::new("/m"));
    assert!(peer.adapter().get_store("/x").unwrap().binding.is_none());
}

#[test]
fn extra_stores_stay_unrouted() {
    let mut adapter = local_adapter();
    adapter.add_store(store("/a", ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))).unwrap();
    adapter.add_store(store("/b", ContentTypeInfo::new(CTYPE_ICALENDAR, &["2.0"]))).unwrap();

    let mut peer = Peer::new("remote-dev");
    peer.add_store(store("/x", ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))).unwrap();

    SmartRouter.recalculate(&adapter, &mut peer).unwrap();
    assert_eq!(peer.routes().len(), 1);
    assert_eq!(peer.routes()[0].local_uri, StoreUri::new("/a"));
}

#[test]
fn empty_peer_clears_auto_routes() {
    let mut adapter = local_adapter();
    adapter.add_store(store("/a", ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))).unwrap();

    let mut peer = Peer::new("remote-dev");
    SmartRouter.recalculate(&adapter, &mut peer).unwrap();
    assert!(peer.routes().is_empty());
}
