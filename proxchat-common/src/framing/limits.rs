//! Per-type body limits
//!
//! Limits are checked against the header before the body is allocated, so an
//! oversized length is rejected without reading it.

use super::MessageType;
use crate::CHUNK_BYTES;
use crate::identity::IDENTITY_FIELD_LEN;

/// Most PCM chunks a single audio frame may carry
pub const MAX_AUDIO_CHUNKS_PER_FRAME: usize = 16;

/// Maximum audio body: identity field plus [`MAX_AUDIO_CHUNKS_PER_FRAME`] chunks
pub const MAX_AUDIO_BODY: u32 = (IDENTITY_FIELD_LEN + MAX_AUDIO_CHUNKS_PER_FRAME * CHUNK_BYTES) as u32;

/// Maximum control body
pub const MAX_CONTROL_BODY: u32 = 64 * 1024;

/// Maximum identity-list body
pub const MAX_IDENTITY_LIST_BODY: u32 = 64 * 1024;

/// Maximum identity length accepted in the handshake
pub const MAX_HANDSHAKE_LEN: u32 = 256;

/// Maximum body length for a message type
pub const fn max_body_for_type(message_type: MessageType) -> u32 {
    match message_type {
        MessageType::Audio => MAX_AUDIO_BODY,
        MessageType::Control => MAX_CONTROL_BODY,
        MessageType::IdentityList => MAX_IDENTITY_LIST_BODY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_limit_fits_one_chunk() {
        assert!(max_body_for_type(MessageType::Audio) as usize >= IDENTITY_FIELD_LEN + CHUNK_BYTES);
        assert_eq!(MAX_AUDIO_BODY, 20 + 16 * 2048);
    }

    #[test]
    fn test_identity_list_limit_fits_large_room() {
        // 1000 participants with full-width identities
        let users: Vec<String> = (0..1000).map(|i| format!("{:0>20}", i)).collect();
        let body = serde_json::to_vec(&serde_json::json!({ "users": users })).unwrap();
        assert!(body.len() <= max_body_for_type(MessageType::IdentityList) as usize);
    }

    #[test]
    fn test_control_limit() {
        assert_eq!(max_body_for_type(MessageType::Control), 65536);
    }
}
