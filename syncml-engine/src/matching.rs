//! Deferred-acceptance stable matching.
//!
//! The classical Gale–Shapley procedure, proposer-optimal for the left
//! set. Unequal sets are padded with sentinel entries so the core loop
//! always runs on equal sizes; pairs containing a sentinel are discarded
//! from the result. Given identical ranking functions the result is
//! reproducible: the proposer-optimal matching is unique regardless of
//! proposal order.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use tracing::debug;

/// Computes a stable matching between two sets.
///
/// `rank_left(a)` returns the elements of `right` in `a`'s descending
/// order of preference; `rank_right(b)` is the mirror. Elements a ranking
/// omits are preferred after the ranked ones, in input order; rankings
/// must be consistent across calls (a strict total preorder) or the fixed
/// point is not guaranteed.
///
/// Returns `min(left.len(), right.len())` pairs when both sets are
/// non-empty, and an empty result when either set is empty.
pub fn match_stable<T, RL, RR>(
    left: &[T],
    right: &[T],
    rank_left: RL,
    rank_right: RR,
) -> Vec<(T, T)>
where
    T: Clone + Eq + Hash,
    RL: Fn(&T) -> Vec<T>,
    RR: Fn(&T) -> Vec<T>,
{
    if left.is_empty() || right.is_empty() {
        return Vec::new();
    }

    // Pad both sides to the same size; indices >= the real length are
    // sentinels that rank (and are ranked) after every real element.
    let n = left.len().max(right.len());

    let right_index: HashMap<&T, usize> =
        right.iter().enumerate().map(|(i, t)| (t, i)).collect();
    let left_index: HashMap<&T, usize> =
        left.iter().enumerate().map(|(i, t)| (t, i)).collect();

    // left_prefs[i] = right indices in i's descending preference.
    let left_prefs: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            if i < left.len() {
                padded_prefs(&rank_left(&left[i]), &right_index, right.len(), n)
            } else {
                (0..n).collect()
            }
        })
        .collect();

    // right_rank[j][i] = position of left i in j's preference order.
    let right_rank: Vec<Vec<usize>> = (0..n)
        .map(|j| {
            let prefs = if j < right.len() {
                padded_prefs(&rank_right(&right[j]), &left_index, left.len(), n)
            } else {
                (0..n).collect()
            };
            let mut rank = vec![0usize; n];
            for (pos, &i) in prefs.iter().enumerate() {
                rank[i] = pos;
            }
            rank
        })
        .collect();

    // Deferred acceptance: each free left proposes down its list; a right
    // holds the best proposal seen so far and displaces weaker ones.
    let mut next_proposal = vec![0usize; n];
    let mut held: Vec<Option<usize>> = vec![None; n];
    let mut free: VecDeque<usize> = (0..n).collect();

    while let Some(i) = free.pop_front() {
        let j = left_prefs[i][next_proposal[i]];
        next_proposal[i] += 1;
        match held[j] {
            None => held[j] = Some(i),
            Some(current) => {
                if right_rank[j][i] < right_rank[j][current] {
                    held[j] = Some(i);
                    free.push_back(current);
                } else {
                    free.push_back(i);
                }
            }
        }
    }

    let pairs: Vec<(T, T)> = held
        .iter()
        .enumerate()
        .filter_map(|(j, &i)| {
            let i = i?;
            if i < left.len() && j < right.len() {
                Some((left[i].clone(), right[j].clone()))
            } else {
                None
            }
        })
        .collect();

    debug!(
        left = left.len(),
        right = right.len(),
        matched = pairs.len(),
        "stable matching complete"
    );
    pairs
}

/// Maps a ranking to indices, appends unranked real elements in input
/// order, then sentinel indices.
fn padded_prefs<T: Eq + Hash>(
    ranked: &[T],
    index: &HashMap<&T, usize>,
    real_len: usize,
    n: usize,
) -> Vec<usize> {
    let mut prefs: Vec<usize> = Vec::with_capacity(n);
    let mut seen = vec![false; real_len];
    for item in ranked {
        if let Some(&i) = index.get(item) {
            if !seen[i] {
                seen[i] = true;
                prefs.push(i);
            }
        }
    }
    for (i, was_seen) in seen.iter().enumerate() {
        if !was_seen {
            prefs.push(i);
        }
    }
    prefs.extend(real_len..n);
    prefs
}
