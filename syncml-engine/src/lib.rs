//! SyncML peer-synchronization engine.
//!
//! Maintains a local adapter and a set of peer descriptions, each exposing
//! named data stores, and provides the machinery a synchronization session
//! needs around them:
//!
//! - **Routing**: decide which local store is paired with which peer
//!   store, either from pinned configuration (`ManualRouter`) or
//!   automatically via stable matching over content-type compatibility
//!   (`SmartRouter`).
//! - **Negotiation**: pick a mutually acceptable transmit content type
//!   for each pairing.
//! - **Codecs**: encode/decode protocol message trees to and from wire
//!   bytes, dispatched by content type.
//! - **Decision mediation**: consult an ordered chain of user-agent
//!   handlers at the protocol's human-in-the-loop decision points, with
//!   well-defined fallback defaults.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use syncml_engine::{Adapter, Peer, Router, SmartRouter, MemoryStorage};
//! use syncml_types::{ContentTypeInfo, Store, CTYPE_VCARD};
//!
//! let mut adapter = Adapter::new_local("local-dev", Arc::new(MemoryStorage::new()));
//! adapter
//!     .add_store(
//!         Store::new("/contacts", "Contacts")
//!             .with_content_type(ContentTypeInfo::new(CTYPE_VCARD, &["2.1"]).preferred()),
//!     )
//!     .unwrap();
//!
//! let mut peer = Peer::new("remote-dev");
//! peer.add_store(
//!     Store::new("./card", "Address Book")
//!         .with_content_type(ContentTypeInfo::new(CTYPE_VCARD, &["2.1"])),
//! )
//! .unwrap();
//!
//! SmartRouter.recalculate(&adapter, &mut peer).unwrap();
//! assert_eq!(peer.routes().len(), 1);
//! ```

mod adapter;
pub mod agent;
pub mod codec;
mod context;
mod error;
pub mod matcher;
pub mod matching;
mod router;
mod smart;
pub mod storage;

pub use adapter::{Adapter, Peer};
pub use agent::{
    Action, Answer, Choice, Credentials, DecisionEvent, FetchValue, UserAgent,
    UserAgentMultiplexer, DECISION_AUTH_CHALLENGE, DECISION_DEV_INFO_SWAP,
    DECISION_REFRESH_REQUIRED, DECISION_SYNC_MODE_SWITCH,
};
pub use codec::{Codec, CodecRegistry, WbxmlCodec, XmlCodec, MAX_MESSAGE_SIZE};
pub use context::Context;
pub use error::{SyncError, SyncResult};
pub use matching::match_stable;
pub use router::{get_best_transmit_content_type, get_target_uri, setup_routes, ManualRouter, Router};
pub use smart::SmartRouter;
pub use storage::{AdapterModel, JsonFileStorage, MemoryStorage, ModelStorage, PeerModel};
