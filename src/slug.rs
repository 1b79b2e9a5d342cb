//! Title-to-slug derivation and workflow ID generation.

use std::time::{SystemTime, UNIX_EPOCH};

const MAX_SLUG_LEN: usize = 50;
const MAX_COLLISION_ATTEMPTS: u32 = 100;

/// Derive a URL-safe slug from a title: lowercase, collapse runs of
/// non-`[a-z0-9]` characters into a single `-`, trim leading/trailing `-`,
/// and cap at [`MAX_SLUG_LEN`] characters without ever cutting mid-token.
///
/// Empty input (or input that slugifies to nothing) returns `"workflow"`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && !slug.is_empty() {
            slug.push('-');
            last_was_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        if let Some(last_dash) = slug.rfind('-') {
            slug.truncate(last_dash);
        }
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        "workflow".to_string()
    } else {
        slug
    }
}

/// Produce a slug for `title` that is not present in `existing`.
///
/// Tries the bare slug first, then `-1`, `-2`, … up to
/// [`MAX_COLLISION_ATTEMPTS`]; if every numbered variant is also taken,
/// falls back to appending a nanosecond timestamp so the call always
/// terminates with a fresh slug.
pub fn generate_unique_slug(title: &str, existing: &[String]) -> String {
    let base = slugify(title);
    if !existing.iter().any(|s| s == &base) {
        return base;
    }

    for n in 1..=MAX_COLLISION_ATTEMPTS {
        let candidate = format!("{base}-{n}");
        if !existing.iter().any(|s| s == &candidate) {
            return candidate;
        }
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{base}-{nanos}")
}

const CROCKFORD_ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Mint a 16-character Crockford-base32, ULID-shaped workflow id prefixed
/// with `wf_`. Not a real ULID (no monotonic random component beyond the
/// timestamp) — just a sortable, collision-resistant opaque string.
pub fn id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let mut value = nanos;
    let mut chars = [0u8; 16];
    for slot in chars.iter_mut().rev() {
        *slot = CROCKFORD_ALPHABET[(value % 32) as usize];
        value /= 32;
    }

    format!("wf_{}", String::from_utf8_lossy(&chars))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_collapses_separators() {
        assert_eq!(slugify("Deploy!"), "deploy");
        assert_eq!(slugify("Restart Service Safely"), "restart-service-safely");
        assert_eq!(slugify("  -- weird ___ title --  "), "weird-title");
    }

    #[test]
    fn empty_input_falls_back_to_workflow() {
        assert_eq!(slugify(""), "workflow");
        assert_eq!(slugify("!!!"), "workflow");
    }

    #[test]
    fn caps_at_fifty_without_cutting_mid_token() {
        let title = "a".repeat(50);
        assert_eq!(slugify(&title).len(), 50);

        let title = format!("{} {}", "a".repeat(48), "bbbbb");
        let slug = slugify(&title);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
        assert_eq!(slug, "a".repeat(48));
    }

    #[test]
    fn slugify_is_idempotent() {
        let title = "Some Mixed_CASE--title!!";
        assert_eq!(slugify(&slugify(title)), slugify(title));
    }

    #[test]
    fn collision_resolution_appends_numeric_suffix() {
        let existing = vec!["deploy".to_string(), "deploy-1".to_string()];
        assert_eq!(generate_unique_slug("Deploy!", &existing), "deploy-2");
    }

    #[test]
    fn collision_resolution_is_noop_without_collision() {
        let existing = vec!["other".to_string()];
        assert_eq!(generate_unique_slug("Deploy!", &existing), "deploy");
    }

    #[test]
    fn id_has_wf_prefix_and_sixteen_body_chars() {
        let a = id();
        assert!(a.starts_with("wf_"));
        assert_eq!(a.len(), 3 + 16);
    }
}
