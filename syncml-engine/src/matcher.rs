//! Content-type compatibility between stores.
//!
//! Ranks candidate store pairs by how well their capability sets overlap
//! (feeding the smart router's stable matching) and picks the transmit
//! content type for an established pairing.

use syncml_types::{ContentTypeInfo, Store, StoreUri};

/// Scores how well two stores' capability sets match.
///
/// Each shared (content type, version) pair usable in at least one
/// direction contributes one point; a preferred flag on the sending side
/// of a usable direction contributes one more. Scores map into `usize`,
/// so the induced ordering is a total preorder and the stable matching
/// terminates.
#[must_use]
pub fn compatibility(local: &Store, remote: &Store) -> usize {
    let mut score = 0;
    for lct in &local.content_types {
        for rct in &remote.content_types {
            if lct.ctype != rct.ctype {
                continue;
            }
            let shared = shared_version_count(lct, rct);
            if shared == 0 {
                continue;
            }
            if lct.transmit && rct.receive {
                score += shared;
                if lct.preferred {
                    score += 1;
                }
            }
            if lct.receive && rct.transmit {
                score += shared;
                if rct.preferred {
                    score += 1;
                }
            }
        }
    }
    score
}

/// Orders candidate stores by descending compatibility with `store`,
/// breaking ties by URI so the ordering is deterministic.
#[must_use]
pub fn rank_by_compatibility(store: &Store, candidates: &[&Store]) -> Vec<StoreUri> {
    let mut scored: Vec<(usize, &StoreUri)> = candidates
        .iter()
        .map(|c| (compatibility(store, c), &c.uri))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.into_iter().map(|(_, uri)| uri.clone()).collect()
}

/// Picks the content type the sender should transmit to the receiver.
///
/// Among capabilities the sender can transmit and the receiver can
/// receive, the sender's preferred one wins if it overlaps; otherwise the
/// first overlap in the sender's declared order. Returns `None` when
/// there is no overlap — the pairing cannot synchronize this store, which
/// is not a routing error.
#[must_use]
pub fn pick_transmit_content_type(sender: &Store, receiver: &Store) -> Option<ContentTypeInfo> {
    let mut first: Option<ContentTypeInfo> = None;
    for sct in &sender.content_types {
        if !sct.transmit {
            continue;
        }
        for rct in &receiver.content_types {
            if !rct.receive || sct.ctype != rct.ctype {
                continue;
            }
            let version_agnostic = sct.versions.is_empty() && rct.versions.is_empty();
            let versions = shared_versions(sct, rct);
            if versions.is_empty() && !version_agnostic {
                continue;
            }
            let negotiated = ContentTypeInfo {
                ctype: sct.ctype.clone(),
                versions,
                preferred: sct.preferred,
                transmit: true,
                receive: false,
            };
            if sct.preferred {
                return Some(negotiated);
            }
            if first.is_none() {
                first = Some(negotiated);
            }
        }
    }
    first
}

/// Shared versions in the sender's declared order.
fn shared_versions(a: &ContentTypeInfo, b: &ContentTypeInfo) -> Vec<String> {
    a.versions
        .iter()
        .filter(|v| b.versions.contains(v))
        .cloned()
        .collect()
}

fn shared_version_count(a: &ContentTypeInfo, b: &ContentTypeInfo) -> usize {
    if a.versions.is_empty() && b.versions.is_empty() {
        return 1;
    }
    a.versions.iter().filter(|v| b.versions.contains(v)).count()
}
