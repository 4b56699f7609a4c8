//! Glob matching for cache keys.
//!
//! Only `*` is special: it matches any run of characters, including none.

/// Checks if a cache key matches a glob pattern.
///
/// # Examples
///
/// ```
/// use propdesk_core::cache::pattern_matches;
///
/// assert!(pattern_matches("user:123", "user:123"));
/// assert!(pattern_matches("property:42:floor_plans:*", "property:42:floor_plans:status=any"));
/// assert!(pattern_matches("property:*:leases:*", "property:7:leases:limit=50"));
/// assert!(!pattern_matches("property:42:*", "tenant:42:leases:q"));
/// ```
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    let mut segments = pattern.split('*');

    // Text before the first `*` anchors at the start of the key.
    let Some(head) = segments.next() else {
        return key.is_empty();
    };
    let Some(mut rest) = key.strip_prefix(head) else {
        return false;
    };

    let tail: Vec<&str> = segments.collect();
    let Some((last, middle)) = tail.split_last() else {
        // No wildcard at all: the whole key must equal the pattern.
        return rest.is_empty();
    };

    for segment in middle.iter().filter(|s| !s.is_empty()) {
        match rest.find(segment) {
            Some(pos) => rest = &rest[pos + segment.len()..],
            None => return false,
        }
    }

    // Text after the last `*` anchors at the end of what remains.
    rest.ends_with(last)
}
