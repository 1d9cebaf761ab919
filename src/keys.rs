//! Helpers for building cache keys.
//!
//! Keys routinely end up in logs and in the key space of a long-lived map, so
//! raw credentials are hashed before use.

use sha1::{Digest as _, Sha1};

/// Hash a raw credential into a key: the lowercase hex SHA-1 digest.
///
/// ```
/// use coalescing_cache::keys::hash_token;
///
/// let key = hash_token("xoxp-secret");
/// assert_eq!(key.len(), 40);
/// assert_ne!(key, "xoxp-secret");
/// ```
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha1::digest(token.as_bytes()))
}

/// Join already-safe parts into one key, separated by `:`.
///
/// Typically a credential hash followed by what is being looked up:
///
/// ```
/// use coalescing_cache::keys::{composite_key, hash_token};
///
/// let key = composite_key([hash_token("xoxp-secret").as_str(), "destinations"]);
/// assert!(key.ends_with(":destinations"));
/// ```
pub fn composite_key<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    parts.into_iter().collect::<Vec<_>>().join(":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            hash_token("abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_composite_key() {
        assert_eq!(composite_key(["abc", "team"]), "abc:team");
        assert_eq!(composite_key(["single"]), "single");
    }

    proptest! {
        #[test]
        fn hash_is_stable_hex(token in ".*") {
            let key = hash_token(&token);
            prop_assert_eq!(key.len(), 40);
            prop_assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            prop_assert_eq!(key, hash_token(&token));
        }

        #[test]
        fn distinct_tokens_get_distinct_keys(a in "[a-z0-9-]{1,32}", b in "[a-z0-9-]{1,32}") {
            prop_assume!(a != b);
            prop_assert_ne!(hash_token(&a), hash_token(&b));
        }
    }
}
