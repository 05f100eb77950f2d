//! Email canonicalization.
//!
//! The canonical form is a lookup key only: it joins roster rows to group
//! members and is never written back or shown to anyone.

use crate::types::CanonicalEmail;

/// Domain whose mail service ignores dots in the local part.
pub const DOTLESS_DOMAIN: &str = "gmail.com";

/// Canonicalize a raw address into its comparison key.
///
/// Lower-cases the whole address. For addresses ending in `@gmail.com` every
/// `.` in the local part is dropped. Anything else (other domains, strings
/// without an `@`) is only lower-cased.
pub fn canonicalize(raw: &str) -> CanonicalEmail {
    let lowered = raw.to_lowercase();
    let suffix = format!("@{DOTLESS_DOMAIN}");

    let key = match lowered.strip_suffix(&suffix) {
        Some(local) => {
            let mut out: String = local.chars().filter(|c| *c != '.').collect();
            out.push_str(&suffix);
            out
        }
        None => lowered,
    };
    CanonicalEmail(key)
}
