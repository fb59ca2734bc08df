//! Content-type capability records.
//!
//! A `ContentTypeInfo` declares one format a store can handle: the MIME
//! content type, the versions supported, whether the store can transmit
//! and/or receive it, and whether it is the store's preferred format. On
//! the wire these appear in DevInfo as `Tx-Pref`/`Tx`/`Rx-Pref`/`Rx`
//! elements, each carrying a `CTType` and one `VerCT` per version.

use crate::element::Element;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// vCard 2.1 content type.
pub const CTYPE_VCARD: &str = "text/x-vcard";
/// vCalendar 1.0 content type.
pub const CTYPE_VCALENDAR: &str = "text/x-vcalendar";
/// iCalendar 2.0 content type.
pub const CTYPE_ICALENDAR: &str = "text/calendar";
/// Plain-text notes.
pub const CTYPE_PLAIN_TEXT: &str = "text/plain";
/// OMA DS folder objects.
pub const CTYPE_OMADS_FOLDER: &str = "application/vnd.omads-folder+xml";

/// One (content-type, versions) capability with direction flags.
///
/// Invariant: at least one of `transmit`/`receive` is set. The provided
/// constructors maintain it; `validate` re-checks records that arrived
/// through deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeInfo {
    /// MIME content type, e.g. `text/x-vcard`.
    pub ctype: String,
    /// Supported versions, most specific first.
    pub versions: Vec<String>,
    /// Whether this is the store's preferred format.
    pub preferred: bool,
    /// Whether the store can send items in this format.
    pub transmit: bool,
    /// Whether the store can accept items in this format.
    pub receive: bool,
}

impl ContentTypeInfo {
    /// Creates a bidirectional, non-preferred capability.
    #[must_use]
    pub fn new(ctype: impl Into<String>, versions: &[&str]) -> Self {
        Self {
            ctype: ctype.into(),
            versions: versions.iter().map(|v| (*v).to_string()).collect(),
            preferred: false,
            transmit: true,
            receive: true,
        }
    }

    /// Creates a capability with explicit flags.
    ///
    /// Fails with [`Error::NoDirection`] if both direction flags are unset.
    pub fn with_flags(
        ctype: impl Into<String>,
        versions: &[&str],
        preferred: bool,
        transmit: bool,
        receive: bool,
    ) -> Result<Self> {
        let ctype = ctype.into();
        if !transmit && !receive {
            return Err(Error::NoDirection(ctype));
        }
        Ok(Self {
            ctype,
            versions: versions.iter().map(|v| (*v).to_string()).collect(),
            preferred,
            transmit,
            receive,
        })
    }

    /// Marks this capability as the store's preferred format.
    #[must_use]
    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }

    /// Restricts this capability to transmit only.
    #[must_use]
    pub fn transmit_only(mut self) -> Self {
        self.transmit = true;
        self.receive = false;
        self
    }

    /// Restricts this capability to receive only.
    #[must_use]
    pub fn receive_only(mut self) -> Self {
        self.transmit = false;
        self.receive = true;
        self
    }

    /// Re-checks the direction invariant on a deserialized record.
    pub fn validate(&self) -> Result<()> {
        if !self.transmit && !self.receive {
            return Err(Error::NoDirection(self.ctype.clone()));
        }
        Ok(())
    }

    /// Merges another capability into this one.
    ///
    /// Two records are mergeable only when `ctype`, `versions`, and
    /// `preferred` are all equal; the merge ORs the direction flags.
    /// Returns false and mutates nothing when the records differ.
    pub fn merge(&mut self, other: &Self) -> bool {
        if self.ctype != other.ctype
            || self.versions != other.versions
            || self.preferred != other.preferred
        {
            return false;
        }
        self.transmit = self.transmit || other.transmit;
        self.receive = self.receive || other.receive;
        true
    }

    /// Renders this capability as DevInfo elements.
    ///
    /// A bidirectional record yields one Tx-side and one Rx-side element.
    #[must_use]
    pub fn to_elements(&self) -> Vec<Element> {
        let mut out = Vec::new();
        if self.transmit {
            out.push(self.direction_element(true));
        }
        if self.receive {
            out.push(self.direction_element(false));
        }
        out
    }

    fn direction_element(&self, transmit: bool) -> Element {
        let name = match (transmit, self.preferred) {
            (true, true) => "Tx-Pref",
            (true, false) => "Tx",
            (false, true) => "Rx-Pref",
            (false, false) => "Rx",
        };
        let mut el = Element::new(name).with_child(Element::new("CTType").with_text(&self.ctype));
        for version in &self.versions {
            el = el.with_child(Element::new("VerCT").with_text(version));
        }
        el
    }

    /// Parses a single DevInfo capability element (`Tx-Pref`, `Tx`,
    /// `Rx-Pref`, or `Rx`).
    pub fn from_element(el: &Element) -> Result<Self> {
        let (transmit, preferred) = match el.name.as_str() {
            "Tx-Pref" => (true, true),
            "Tx" => (true, false),
            "Rx-Pref" => (false, true),
            "Rx" => (false, false),
            other => {
                return Err(Error::InvalidContentType(format!(
                    "unexpected capability element <{other}>"
                )));
            }
        };

        let ctype = el
            .child_text("CTType")
            .ok_or_else(|| Error::InvalidContentType(format!("<{}> without CTType", el.name)))?
            .to_string();

        let versions: Vec<String> = el
            .children_named("VerCT")
            .filter_map(|v| v.text.clone())
            .collect();

        Ok(Self {
            ctype,
            versions,
            preferred,
            transmit,
            receive: !transmit,
        })
    }
}

/// Folds a capability into a list, merging with an existing mergeable
/// record when possible and appending otherwise.
///
/// Used when collecting DevInfo elements: a `Tx` and an `Rx` for the same
/// content type collapse back into one bidirectional record.
pub fn merge_content_types(list: &mut Vec<ContentTypeInfo>, item: ContentTypeInfo) {
    for existing in list.iter_mut() {
        if existing.merge(&item) {
            return;
        }
    }
    list.push(item);
}
