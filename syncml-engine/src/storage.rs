//! Persistent storage for the local adapter model.
//!
//! Local adapters persist a snapshot of their model (stores, peers,
//! routes) after every mutation. The snapshot format is deliberately kept
//! behind the `ModelStorage` trait so the engine never commits to a wire
//! or file layout; the JSON backend here is one implementation.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use syncml_types::{DeviceId, Route, Store};

/// Serializable snapshot of a local adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterModel {
    /// Local device identifier.
    pub dev_id: DeviceId,
    /// Local adapter URL, if configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Local stores.
    pub stores: Vec<Store>,
    /// Known peers with their stores and route lists.
    #[serde(default)]
    pub peers: Vec<PeerModel>,
}

/// Serializable snapshot of one peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerModel {
    /// Peer device identifier.
    pub dev_id: DeviceId,
    /// Peer URL, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Peer stores, including any resolved bindings.
    pub stores: Vec<Store>,
    /// Active route list.
    #[serde(default)]
    pub routes: Vec<Route>,
}

/// A backend that can save and load an adapter model snapshot.
pub trait ModelStorage: Send + Sync {
    /// Saves the model, replacing any previous snapshot.
    fn save(&self, model: &AdapterModel) -> SyncResult<()>;

    /// Loads the last saved model, or `None` if nothing has been saved.
    fn load(&self) -> SyncResult<Option<AdapterModel>>;
}

/// In-memory storage. The default backend, and the test double: `set_failing`
/// makes every subsequent save fail so persistence errors can be exercised.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<Option<AdapterModel>>,
    failing: Mutex<bool>,
}

impl MemoryStorage {
    /// Creates empty in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `save` fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Returns a copy of the stored model, if any.
    #[must_use]
    pub fn stored(&self) -> Option<AdapterModel> {
        self.inner.lock().unwrap().clone()
    }
}

impl ModelStorage for MemoryStorage {
    fn save(&self, model: &AdapterModel) -> SyncResult<()> {
        if *self.failing.lock().unwrap() {
            return Err(SyncError::Storage("memory storage set to fail".into()));
        }
        *self.inner.lock().unwrap() = Some(model.clone());
        Ok(())
    }

    fn load(&self) -> SyncResult<Option<AdapterModel>> {
        Ok(self.inner.lock().unwrap().clone())
    }
}

/// File-backed storage holding the model as one JSON document.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Creates storage backed by the given file path. The file is created
    /// on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ModelStorage for JsonFileStorage {
    fn save(&self, model: &AdapterModel) -> SyncResult<()> {
        let json = serde_json::to_vec_pretty(model)?;
        fs::write(&self.path, json).map_err(|e| {
            SyncError::Storage(format!("failed to write {}: {e}", self.path.display()))
        })
    }

    fn load(&self) -> SyncResult<Option<AdapterModel>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SyncError::Storage(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };
        let model = serde_json::from_slice(&bytes)?;
        Ok(Some(model))
    }
}
