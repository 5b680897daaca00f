use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

static QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""[^"]*"|'[^']*'|`[^`]*`"#).expect("valid quoted-literal regex")
});
static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"0x[0-9a-f]+|\d+(?:\.\d+)?").expect("valid numeric-literal regex")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const SIGNATURE_HEX_LEN: usize = 16;

/// Lowercased message with quoted and numeric literals replaced by placeholders.
///
/// ```
/// use solution_store::normalize_error;
/// assert_eq!(
///     normalize_error("Timeout 3000ms waiting for '#buy-42'"),
///     "timeout <num>ms waiting for <str>"
/// );
/// ```
pub fn normalize_error(message: &str) -> String {
    let lower = message.to_lowercase();
    let without_quotes = QUOTED.replace_all(&lower, "<str>");
    let without_numbers = NUMERIC.replace_all(&without_quotes, "<num>");
    WHITESPACE
        .replace_all(without_numbers.trim(), " ")
        .into_owned()
}

/// Stable hash of the normalized message.
pub fn error_signature(message: &str) -> String {
    let digest = Sha256::digest(normalize_error(message).as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(SIGNATURE_HEX_LEN);
    encoded
}

pub(crate) fn tokens<'a>(normalized: &str, tags: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
    normalized
        .split(|c: char| !(c.is_alphanumeric() || c == '<' || c == '>' || c == '_'))
        .filter(|token| token.len() > 1)
        .map(str::to_string)
        .chain(tags.into_iter().map(|tag| tag.to_lowercase()))
        .collect()
}

/// Jaccard similarity of two token sets.
pub fn similarity(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    if left.is_empty() && right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(right).count();
    let union = left.union(right).count();
    shared as f64 / union as f64
}
