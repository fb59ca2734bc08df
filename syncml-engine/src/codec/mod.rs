//! Wire codecs for protocol message trees.
//!
//! A codec renders an [`Element`] tree to wire bytes and back, keyed by an
//! on-the-wire content type of the form `application/vnd.syncml+<codec>`.
//! Codecs are resolved by name through [`CodecRegistry`]; `auto_decode`
//! extracts the codec name from a MIME content-type header and dispatches.

mod xml;

pub use xml::XmlCodec;

use crate::error::{SyncError, SyncResult};
use std::collections::HashMap;
use std::sync::Arc;
use syncml_types::Element;
use tracing::debug;

/// Content-type prefix shared by all SyncML payloads.
pub const SYNCML_CTYPE_PREFIX: &str = "application/vnd.syncml+";

/// Maximum payload size accepted for decoding (16 MB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// A message-tree codec.
pub trait Codec: Send + Sync + std::fmt::Debug {
    /// The codec's registry name (the `<codec>` in the content type).
    fn name(&self) -> &'static str;

    /// Encodes a tree, returning the full content-type string and bytes.
    fn encode(&self, tree: &Element) -> SyncResult<(String, Vec<u8>)>;

    /// Decodes wire bytes back into a tree.
    fn decode(&self, content_type: &str, data: &[u8]) -> SyncResult<Element>;
}

/// Resolves codec implementations by name.
pub struct CodecRegistry {
    codecs: HashMap<&'static str, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Creates a registry with the standard codecs: XML, and the WBXML
    /// stub.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(XmlCodec::new()));
        registry.register(Arc::new(WbxmlCodec));
        registry
    }

    /// Registers a codec under its own name, replacing any previous
    /// registration.
    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        self.codecs.insert(codec.name(), codec);
    }

    /// Resolves a codec by name.
    pub fn factory(&self, name: &str) -> SyncResult<Arc<dyn Codec>> {
        self.codecs
            .get(name)
            .cloned()
            .ok_or_else(|| SyncError::UnknownCodec(name.to_string()))
    }

    /// Decodes a payload by dispatching on its content-type header.
    pub fn auto_decode(&self, content_type: &str, data: &[u8]) -> SyncResult<Element> {
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(SyncError::Protocol(format!(
                "payload too large: {} bytes",
                data.len()
            )));
        }
        let name = codec_name(content_type)?;
        debug!(codec = %name, bytes = data.len(), "auto-decoding payload");
        let codec = self.factory(&name)?;
        codec.decode(content_type, data)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Extracts the codec name from a SyncML content-type header, e.g.
/// `application/vnd.syncml+xml; charset=UTF-8` yields `xml`.
pub fn codec_name(content_type: &str) -> SyncResult<String> {
    let base = content_type.split(';').next().unwrap_or("").trim();
    base.strip_prefix(SYNCML_CTYPE_PREFIX)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            SyncError::Protocol(format!("unexpected content type: {content_type}"))
        })
}

/// WBXML codec placeholder. The binary tokenizer is not implemented;
/// both operations report so rather than guessing at the format.
#[derive(Debug, Clone, Copy, Default)]
pub struct WbxmlCodec;

impl Codec for WbxmlCodec {
    fn name(&self) -> &'static str {
        "wbxml"
    }

    fn encode(&self, _tree: &Element) -> SyncResult<(String, Vec<u8>)> {
        Err(SyncError::NotImplemented("wbxml encoding".into()))
    }

    fn decode(&self, _content_type: &str, _data: &[u8]) -> SyncResult<Element> {
        Err(SyncError::NotImplemented("wbxml decoding".into()))
    }
}
