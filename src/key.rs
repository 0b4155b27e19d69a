//! Conversion between DNS names and storage key paths
//!
//! Zone data is stored in a hierarchy that mirrors the DNS tree, with the
//! most significant label first. `bar.disco.net.` lives under `/net/disco/bar`,
//! and the values for a record type live below a type marker segment, e.g.
//! `/net/disco/bar/.A`.

/// The key segment which stands in for any single label.
pub const WILDCARD_SEGMENT: &str = "*";

/// Separator between key segments.
pub const SEPARATOR: char = '/';

/// Convert a textual DNS name into a storage key path.
///
/// A single trailing `.` is ignored, so fully qualified and relative forms
/// of a name produce the same key. The labels are reversed and joined with
/// `/`, and `suffix` is appended verbatim. The empty name (and the root
/// name `.`) map to `/`.
///
/// ```
/// use hazel_dns::key::name_to_key;
///
/// assert_eq!(name_to_key("foo.net.", ""), "/net/foo");
/// assert_eq!(name_to_key("foo.net", ""), "/net/foo");
/// assert_eq!(name_to_key("foo.net.", "/.A"), "/net/foo/.A");
/// ```
pub fn name_to_key(name: &str, suffix: &str) -> String {
    let name = name.strip_suffix('.').unwrap_or(name);
    labels_to_key(name.split('.').filter(|label| !label.is_empty()), suffix)
}

/// Build a storage key path from labels given leftmost first.
///
/// Labels are used as they are, without any escaping, so the caller must
/// ensure none of them contains a `/`.
///
/// ```
/// use hazel_dns::key::labels_to_key;
///
/// assert_eq!(labels_to_key(["a b", "disco", "net"], "/.A"), "/net/disco/a b/.A");
/// ```
pub fn labels_to_key<'a, I>(labels: I, suffix: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut key = String::with_capacity(suffix.len() + 1);
    for label in labels.into_iter().rev() {
        key.push(SEPARATOR);
        key.push_str(label);
    }
    key.push_str(suffix);

    if key.is_empty() {
        key.push(SEPARATOR);
    }
    key
}

/// Normalize a key into its canonical form.
///
/// Empty segments are dropped, so repeated and trailing separators collapse,
/// and the result always starts with `/`.
pub fn normalize_key(key: &str) -> String {
    let mut normalized = String::with_capacity(key.len() + 1);
    for segment in segments(key) {
        normalized.push(SEPARATOR);
        normalized.push_str(segment);
    }

    if normalized.is_empty() {
        normalized.push(SEPARATOR);
    }
    normalized
}

/// Join a namespace prefix onto a key, producing a normalized key.
pub fn join_key(prefix: &str, key: &str) -> String {
    normalize_key(&format!("{prefix}{SEPARATOR}{key}"))
}

/// Iterate over the non-empty segments of a key.
pub fn segments(key: &str) -> impl Iterator<Item = &str> {
    key.split(SEPARATOR).filter(|segment| !segment.is_empty())
}
