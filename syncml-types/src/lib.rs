//! Core type definitions for the SyncML engine.
//!
//! This crate defines the fundamental, engine-agnostic types used throughout
//! the synchronization core:
//! - Device identifiers and normalized store URIs
//! - The protocol message tree (`Element`)
//! - Content-type capability records (`ContentTypeInfo`)
//! - The store/route/binding data model
//!
//! Routing, matching, codecs, and session mechanics belong in
//! `syncml-engine`, not here.

mod ctype;
mod element;
mod ids;
mod store;
mod uri;

pub use ctype::{
    merge_content_types, ContentTypeInfo, CTYPE_ICALENDAR, CTYPE_OMADS_FOLDER, CTYPE_PLAIN_TEXT,
    CTYPE_VCALENDAR, CTYPE_VCARD,
};
pub use element::Element;
pub use ids::DeviceId;
pub use store::{Binding, Route, Store};
pub use uri::StoreUri;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid content-type capability: {0}")]
    InvalidContentType(String),

    #[error("invalid capability flags for {0}: transmit and receive both unset")]
    NoDirection(String),
}
