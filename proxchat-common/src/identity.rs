//! Participant identities and their fixed-width wire field
//!
//! Every audio frame carries its sender in a 20-byte field: longer names are
//! truncated, shorter ones are padded with null bytes, and decoding strips the
//! trailing nulls again. Two names that only differ after the 20th byte are
//! indistinguishable once they have been on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Width of the identity field in audio frames
pub const IDENTITY_FIELD_LEN: usize = 20;

/// A participant identity in its wire-normalized form
///
/// Constructing an `Identity` always runs the name through the 20-byte field,
/// so an identity taken from a handshake compares equal to the sender decoded
/// from that participant's audio frames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Create an identity, normalizing it to what survives the wire field
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(decode_identity(&encode_identity(name.as_ref())))
    }

    /// Decode an identity from a wire field
    pub fn from_field(field: &[u8]) -> Self {
        Self(decode_identity(field))
    }

    /// Encode this identity into its wire field
    pub fn to_field(&self) -> [u8; IDENTITY_FIELD_LEN] {
        encode_identity(&self.0)
    }

    /// The identity as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identity is empty after normalization
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Identity {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

/// Encode a name into the fixed 20-byte identity field
///
/// Names longer than the field are cut at the last UTF-8 character boundary
/// that fits; the remainder of the field is null-padded.
pub fn encode_identity(name: &str) -> [u8; IDENTITY_FIELD_LEN] {
    let mut field = [0u8; IDENTITY_FIELD_LEN];
    let mut end = name.len().min(IDENTITY_FIELD_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    field[..end].copy_from_slice(&name.as_bytes()[..end]);
    field
}

/// Decode an identity field, stripping trailing null bytes
///
/// Only the first 20 bytes are considered. Invalid UTF-8 is replaced rather
/// than rejected so a malformed sender field never tears down a connection.
pub fn decode_identity(field: &[u8]) -> String {
    let field = &field[..field.len().min(IDENTITY_FIELD_LEN)];
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(name: &str) -> String {
        decode_identity(&encode_identity(name))
    }

    #[test]
    fn test_identity_19_bytes_unchanged() {
        let name = "a".repeat(19);
        assert_eq!(roundtrip(&name), name);
    }

    #[test]
    fn test_identity_20_bytes_unchanged() {
        let name = "b".repeat(20);
        assert_eq!(roundtrip(&name), name);
    }

    #[test]
    fn test_identity_21_bytes_truncated() {
        let name = format!("{}z", "c".repeat(20));
        assert_eq!(roundtrip(&name), "c".repeat(20));
    }

    #[test]
    fn test_identity_short_is_null_padded() {
        let field = encode_identity("Alice");
        assert_eq!(&field[..5], b"Alice");
        assert!(field[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_identity_trailing_null_stripped() {
        assert_eq!(roundtrip("Bob\0"), "Bob");
    }

    #[test]
    fn test_identity_empty() {
        assert_eq!(encode_identity(""), [0u8; IDENTITY_FIELD_LEN]);
        assert_eq!(roundtrip(""), "");
    }

    #[test]
    fn test_identity_truncates_on_char_boundary() {
        // 19 ASCII bytes followed by a 2-byte character: only the ASCII part fits
        let name = format!("{}é", "x".repeat(19));
        assert_eq!(roundtrip(&name), "x".repeat(19));
    }

    #[test]
    fn test_decode_ignores_bytes_past_field() {
        let mut body = encode_identity("Carol").to_vec();
        body.extend_from_slice(&[1, 2, 3, 4]);
        assert_eq!(decode_identity(&body), "Carol");
    }

    #[test]
    fn test_identity_new_normalizes() {
        let long = Identity::new("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(long.as_str(), "abcdefghijklmnopqrst");
        assert_eq!(Identity::from_field(&long.to_field()), long);
    }

    #[test]
    fn test_identity_colliding_after_truncation() {
        let a = Identity::new(format!("{}-one", "p".repeat(20)));
        let b = Identity::new(format!("{}-two", "p".repeat(20)));
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_serde_is_plain_string() {
        let id = Identity::new("Dave");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"Dave\"");
        let back: Identity = serde_json::from_str("\"Dave\"").unwrap();
        assert_eq!(back, id);
    }
}
