//! Canonical list decoding.
//!
//! Insight lists (interests, milestones, coping strategies, …) round-trip
//! through a storage layer that sometimes re-encodes arrays as strings —
//! occasionally more than once — and has been observed splitting a serialized
//! array into its individual characters. This module owns the one blessed
//! repair path: `canonicalize` turns *any* stored representation into an
//! ordered `Vec<String>` of trimmed, non-empty items, and never fails.
//!
//! Accepted shapes:
//! - a real JSON array of strings (fast path)
//! - an array of single-character strings (character-exploded serialization)
//! - a one-element array wrapping an encoded list string
//! - a bracket-encoded string, escaped up to three levels deep
//! - a plain comma-separated string
//! - a single bare string
//! - null / empty

use serde_json::Value;

/// Maximum number of unwrap attempts for nested string encodings.
/// Observed corruption never exceeds two levels; three is the hard stop.
const MAX_DECODE_PASSES: usize = 3;

/// Normalization key for case-insensitive list membership.
///
/// The single place the comparison rule lives — merging, dedup, and any
/// future Unicode normalization all go through here.
pub fn dedup_key(item: &str) -> String {
    item.trim().to_lowercase()
}

/// Decode any stored representation of a list-of-strings field into its
/// canonical form.
///
/// Total: malformed input degrades to a best-effort single-item list (the
/// trimmed literal) or an empty list. Items are preserved as extracted —
/// duplicate suppression is the merger's job, not the decoder's.
pub fn canonicalize(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => canonicalize_array(items),
        Value::String(s) => canonicalize_string(s),
        // Bare scalar (number, bool) — a single literal item
        other => vec![other.to_string()],
    }
}

/// Convenience for optional stored fields.
pub fn canonicalize_opt(value: Option<&Value>) -> Vec<String> {
    value.map(canonicalize).unwrap_or_default()
}

fn canonicalize_array(items: &[Value]) -> Vec<String> {
    let texts: Vec<String> = items.iter().map(element_text).collect();

    // Character-exploded serialization: every element is a one-char string.
    // Rejoin and decode the reassembled string. Non-string elements never
    // count — [1, 2] is a list of two literal items, not "12".
    if texts.len() > 1
        && items.iter().all(Value::is_string)
        && texts.iter().all(|t| t.chars().count() == 1)
    {
        let joined: String = texts.concat();
        log::debug!("canonicalize: repairing character-exploded array ({} chars)", texts.len());
        return canonicalize_string(&joined);
    }

    // Singleton wrapping an encoded list: ["[\"a\",\"b\"]"]
    if texts.len() == 1 {
        let inner = texts[0].trim();
        if looks_like_encoded_list(inner) {
            return canonicalize_string(inner);
        }
    }

    texts
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn element_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Bounded decode loop over a string-typed stored field.
fn canonicalize_string(input: &str) -> Vec<String> {
    let mut current = input.trim().to_string();

    for _ in 0..MAX_DECODE_PASSES {
        if !looks_like_encoded_list(&current) {
            break;
        }
        match serde_json::from_str::<Value>(&current) {
            Ok(Value::Array(items)) => return canonicalize_array(&items),
            Ok(Value::String(inner)) => {
                // One encoding layer peeled — keep going on the inner string
                current = inner.trim().to_string();
            }
            Ok(_) => break,
            Err(_) => {
                // Not valid JSON as-is — try one escape-unwrapping pass
                let unescaped = unescape_once(&current);
                if unescaped == current {
                    break;
                }
                current = unescaped;
            }
        }
    }

    // Structured parsing exhausted — fall back to lexical splitting.
    let remaining = current.trim();
    if remaining.starts_with('[') && remaining.ends_with(']') && remaining.len() >= 2 {
        return split_items(&remaining[1..remaining.len() - 1]);
    }
    if remaining.contains(',') {
        return split_items(remaining);
    }

    let single = dequote(remaining);
    if single.is_empty() {
        Vec::new()
    } else {
        vec![single]
    }
}

/// A string that plausibly carries a (possibly re-quoted) encoded list.
/// Leading quotes and backslashes are skipped so multiply-escaped encodings
/// (`"[…`, `"\"[…`) are still recognized.
fn looks_like_encoded_list(s: &str) -> bool {
    s.trim_start()
        .trim_start_matches(['"', '\\'])
        .starts_with('[')
}

/// Undo one level of backslash escaping: `\"` → `"`, `\\` → `\`.
fn unescape_once(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('"') => {
                    out.push('"');
                    chars.next();
                }
                Some('\\') => {
                    out.push('\\');
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn split_items(s: &str) -> Vec<String> {
    s.split(',')
        .map(dequote)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Trim an item and strip one layer of matching quotes.
fn dequote(s: &str) -> String {
    let t = s.trim();
    let stripped = t
        .strip_prefix('"')
        .and_then(|x| x.strip_suffix('"'))
        .or_else(|| t.strip_prefix('\'').and_then(|x| x.strip_suffix('\'')))
        .unwrap_or(t);
    stripped.trim().to_string()
}
