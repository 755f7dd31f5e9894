//! Bearer token scopes and shape checks
//!
//! Two kinds of bearer value are accepted: opaque tokens (26 characters of the
//! base32 alphabet, looked up by hash) and JWTs (three dot-separated segments,
//! verified by signature). The shape decides which path a credential takes.

/// Alphabet of opaque token plaintexts (RFC 4648 base32, no padding)
pub const OPAQUE_TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Length of an opaque token plaintext
pub const OPAQUE_TOKEN_LEN: usize = 26;

/// What a stored token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    Authentication,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Authentication => "authentication",
        }
    }
}

/// True if `value` has the shape of an opaque token
pub fn looks_like_opaque_token(value: &str) -> bool {
    value.len() == OPAQUE_TOKEN_LEN && value.bytes().all(|b| OPAQUE_TOKEN_ALPHABET.contains(&b))
}

/// True if `value` has the shape of a compact JWT
pub fn looks_like_jwt(value: &str) -> bool {
    let segments: Vec<&str> = value.split('.').collect();

    segments.len() == 3
        && segments.iter().all(|s| {
            !s.is_empty()
                && s.bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'=')
        })
}
