use std::sync::Arc;
use syncml_engine::{Adapter, MemoryStorage, Peer, Router, SmartRouter, SyncError};
use syncml_types::{ContentTypeInfo, DeviceId, Store, StoreUri, CTYPE_VCARD};

fn make_adapter() -> (Adapter, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let adapter = Adapter::new_local("local-dev", storage.clone());
    (adapter, storage)
}

fn vcard_store(uri: &str, name: &str) -> Store {
    Store::new(uri, name).with_content_type(ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]))
}

// ── Store management ──────────────────────────────────────────────

#[test]
fn add_store_registers_and_persists() {
    let (mut adapter, storage) = make_adapter();
    adapter.add_store(vcard_store("/contacts", "Contacts")).unwrap();

    assert!(adapter.get_store("/contacts").is_some());
    let model = storage.stored().expect("model persisted");
    assert_eq!(model.stores.len(), 1);
    assert_eq!(model.stores[0].uri, StoreUri::new("/contacts"));
}

#[test]
fn add_store_normalizes_uri() {
    let (mut adapter, _) = make_adapter();
    adapter.add_store(vcard_store("contacts//work/", "Work")).unwrap();
    assert!(adapter.get_store("contacts/work").is_some());
}

#[test]
fn add_store_rejects_duplicate_uri() {
    let (mut adapter, _) = make_adapter();
    adapter.add_store(vcard_store("/contacts", "Contacts")).unwrap();

    let err = adapter
        .add_store(vcard_store(".//contacts", "Duplicate spelled differently"))
        .unwrap_err();
    assert!(matches!(err, SyncError::Logical(_)));
}

#[test]
fn add_store_fails_internal_when_persistence_fails() {
    let (mut adapter, storage) = make_adapter();
    storage.set_failing(true);

    let err = adapter.add_store(vcard_store("/contacts", "Contacts")).unwrap_err();
    assert!(matches!(err, SyncError::Internal(_)));
}

#[test]
fn get_store_returns_none_for_unknown_uri() {
    let (adapter, _) = make_adapter();
    assert!(adapter.get_store("/nope").is_none());
}

#[test]
fn remove_store_is_internal_error_when_missing() {
    let (mut adapter, _) = make_adapter();
    let err = adapter.remove_store("/ghost").unwrap_err();
    assert!(matches!(err, SyncError::Internal(_)));
}

#[test]
fn remove_store_on_remote_adapter_is_logical_error() {
    let mut peer = Peer::new("remote-dev");
    peer.add_store(vcard_store("/x", "X")).unwrap();

    let err = peer.adapter_mut().remove_store("/x").unwrap_err();
    assert!(matches!(err, SyncError::Logical(_)));
    assert!(peer.adapter().get_store("/x").is_some());
}

#[test]
fn remove_store_prunes_peer_routes_and_bindings() {
    let (mut adapter, _) = make_adapter();
    adapter.add_store(vcard_store("/a", "A")).unwrap();
    adapter.add_store(vcard_store("/b", "B")).unwrap();

    let mut peer = Peer::new("remote-dev");
    peer.add_store(vcard_store("/x", "X")).unwrap();
    peer.add_store(vcard_store("/y", "Y")).unwrap();
    peer.set_route("/a", "/x").unwrap();
    peer.set_route("/b", "/y").unwrap();
    SmartRouter.recalculate(&adapter, &mut peer).unwrap();
    adapter.add_peer(peer).unwrap();

    adapter.remove_store("/a").unwrap();

    let dev_id = DeviceId::new("remote-dev");
    let peer = adapter.get_peer(&dev_id).unwrap();
    assert_eq!(peer.routes().len(), 1);
    assert_eq!(peer.routes()[0].local_uri, StoreUri::new("/b"));
    assert!(peer.adapter().get_store("/x").unwrap().binding.is_none());
    assert!(peer.adapter().get_store("/y").unwrap().binding.is_some());
}

// ── Peer management ───────────────────────────────────────────────

#[test]
fn add_peer_rejects_duplicate_dev_id() {
    let (mut adapter, _) = make_adapter();
    adapter.add_peer(Peer::new("remote-dev")).unwrap();

    let err = adapter.add_peer(Peer::new("remote-dev")).unwrap_err();
    assert!(matches!(err, SyncError::Logical(_)));
}

#[test]
fn add_peer_rejected_on_remote_adapter() {
    let mut remote = Adapter::new_remote("other");
    let err = remote.add_peer(Peer::new("x")).unwrap_err();
    assert!(matches!(err, SyncError::Logical(_)));
}

#[test]
fn take_and_restore_peer() {
    let (mut adapter, _) = make_adapter();
    adapter.add_peer(Peer::new("remote-dev")).unwrap();

    let dev_id = DeviceId::new("remote-dev");
    let peer = adapter.take_peer(&dev_id).unwrap();
    assert!(adapter.get_peer(&dev_id).is_none());
    adapter.restore_peer(peer);
    assert!(adapter.get_peer(&dev_id).is_some());
}

// ── Route pinning ─────────────────────────────────────────────────

#[test]
fn set_route_rejects_duplicate_remote_target() {
    let mut peer = Peer::new("remote-dev");
    peer.set_route("/a", "/x").unwrap();

    let err = peer.set_route("/b", "/x").unwrap_err();
    assert!(matches!(err, SyncError::Logical(_)));
}

// ── Persistence roundtrip ─────────────────────────────────────────

#[test]
fn snapshot_restores_full_model() {
    let (mut adapter, storage) = make_adapter();
    adapter.add_store(vcard_store("/a", "A")).unwrap();

    let mut peer = Peer::new("remote-dev").with_url("http://example.com/sync");
    peer.add_store(vcard_store("/x", "X")).unwrap();
    peer.set_route("/a", "/x").unwrap();
    SmartRouter.recalculate(&adapter, &mut peer).unwrap();
    adapter.add_peer(peer).unwrap();

    let restored = Adapter::from_model(storage.stored().unwrap(), storage.clone());
    assert!(restored.is_local());
    assert_eq!(restored.dev_id(), &DeviceId::new("local-dev"));
    assert!(restored.get_store("/a").is_some());

    let peer = restored.get_peer(&DeviceId::new("remote-dev")).unwrap();
    assert_eq!(peer.adapter().url(), Some("http://example.com/sync"));
    assert_eq!(peer.routes().len(), 1);
    assert!(peer.adapter().get_store("/x").unwrap().binding.is_some());
}
