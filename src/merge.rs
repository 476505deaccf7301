//! Duplicate-free list merging.
//!
//! When an accepted suggestion targets an *existing* entity, its list fields
//! are folded into the entity's current canonical lists here, before the
//! write goes to the store. Existing items always win on both order and
//! casing; only genuinely new items are appended.

use std::collections::HashSet;

use crate::canonical::dedup_key;

/// Merge `incoming` into `existing`, case-insensitively.
///
/// The result is `existing` in its original order, followed by incoming items
/// whose [`dedup_key`] has not been seen, in their original relative order.
/// Idempotent (`merge(x, x) == x`). Never removes or re-cases existing items;
/// pre-existing duplicates inside `existing` are left untouched — this only
/// prevents *new* duplicates from entering.
pub fn merge_lists(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = existing.iter().map(|i| dedup_key(i)).collect();
    let mut merged: Vec<String> = existing.to_vec();

    for item in incoming {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = dedup_key(trimmed);
        if seen.insert(key) {
            merged.push(trimmed.to_string());
        }
    }

    merged
}
