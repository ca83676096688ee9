// API keys for event ingestion
// Decision: API keys are prefixed with "pp_" for identification
// Decision: Full key is shown only once at creation, stored hashed in DB

use rand::RngCore;
use sha2::{Digest, Sha256};

/// API key prefix for identification
pub const API_KEY_PREFIX: &str = "pp_";
/// Random bytes per key, hex encoded in the key body.
const SECRET_BYTES: usize = 32;
/// Hex characters of the secret kept in the display prefix.
const DISPLAY_CHARS: usize = 8;

/// Freshly minted API key. `key` is the only plaintext copy.
#[derive(Debug)]
pub struct GeneratedApiKey {
    /// Full API key, `pp_` followed by 64 hex characters
    pub key: String,
    /// Hex SHA-256 of the full key, used for lookup
    pub key_hash: String,
    /// Shown in listings, e.g. "pp_3f9a0c1d..."
    pub key_prefix: String,
}

/// Mint a new random API key.
pub fn generate_api_key() -> GeneratedApiKey {
    let mut secret = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut secret);

    let key = format!("{}{}", API_KEY_PREFIX, hex::encode(secret));
    GeneratedApiKey {
        key_hash: hash_api_key(&key),
        key_prefix: display_prefix(&key),
        key,
    }
}

/// Hex SHA-256 of a key; the value stored in `accounts.api_key_hash`.
pub fn hash_api_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

fn display_prefix(key: &str) -> String {
    let end = (API_KEY_PREFIX.len() + DISPLAY_CHARS).min(key.len());
    format!("{}...", &key[..end])
}

/// Cheap shape check run before any storage lookup.
pub fn is_valid_api_key_format(key: &str) -> bool {
    key.strip_prefix(API_KEY_PREFIX).is_some_and(|secret| {
        secret.len() == SECRET_BYTES * 2 && secret.bytes().all(|b| b.is_ascii_hexdigit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_api_key() {
        let key = generate_api_key();

        assert!(key.key.starts_with(API_KEY_PREFIX));
        assert!(is_valid_api_key_format(&key.key));
        assert_eq!(key.key_hash, hash_api_key(&key.key));
        assert!(key.key_prefix.starts_with(API_KEY_PREFIX));
        assert!(key.key_prefix.ends_with("..."));
        assert!(key.key.starts_with(key.key_prefix.trim_end_matches("...")));
        assert_eq!(key.key_prefix.len(), API_KEY_PREFIX.len() + DISPLAY_CHARS + 3);
    }

    #[test]
    fn test_different_keys() {
        let key1 = generate_api_key();
        let key2 = generate_api_key();

        assert_ne!(key1.key, key2.key);
        assert_ne!(key1.key_hash, key2.key_hash);
    }

    #[test]
    fn test_is_valid_api_key_format() {
        let key = generate_api_key();
        assert!(is_valid_api_key_format(&key.key));

        // Wrong prefix
        assert!(!is_valid_api_key_format(
            "sk_1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef"
        ));

        // Too short
        assert!(!is_valid_api_key_format("pp_1234"));

        // Non-hex characters
        assert!(!is_valid_api_key_format(
            "pp_gggggggggggggggggggggggggggggggggggggggggggggggggggggggggggggggg"
        ));

        // No prefix
        assert!(!is_valid_api_key_format(
            "1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef"
        ));
    }

    #[test]
    fn test_hash_consistency() {
        let key = "pp_1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";
        assert_eq!(hash_api_key(key), hash_api_key(key));
        assert_eq!(hash_api_key(key).len(), 64);
    }
}
