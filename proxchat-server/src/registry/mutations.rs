//! Mutation methods for ConnectionRegistry

use std::net::SocketAddr;

use proxchat_common::Identity;
use thiserror::Error;
use tracing::warn;

use super::{ConnectionId, ConnectionRegistry, OutgoingSender, RegisteredConnection};
use crate::constants::ERR_LIST_TOO_LARGE;

/// Error returned when registering a connection fails
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// Another live connection already uses this identity
    #[error("identity '{0}' is already connected")]
    IdentityInUse(Identity),

    /// The identity list including this identity would not fit in one frame
    #[error("relay is full ({members} participants)")]
    ListTooLarge { members: usize },
}

impl ConnectionRegistry {
    /// Register a connection and broadcast the new identity list to everyone
    ///
    /// The newcomer receives the list too. The uniqueness check, insert, and
    /// broadcast all happen under one write lock.
    ///
    /// # Errors
    ///
    /// Returns `RegisterError::IdentityInUse` if the (normalized) identity is
    /// already registered, or `RegisterError::ListTooLarge` if the identity
    /// list with the newcomer could no longer be sent to anyone.
    pub async fn register(
        &self,
        identity: Identity,
        peer_addr: SocketAddr,
        tx: OutgoingSender,
    ) -> Result<ConnectionId, RegisterError> {
        let mut connections = self.connections.write().await;

        if connections.values().any(|c| c.identity == identity) {
            return Err(RegisterError::IdentityInUse(identity));
        }

        let connection_id = self.next_connection_id();
        connections.insert(
            connection_id,
            RegisteredConnection {
                identity,
                peer_addr,
                tx,
            },
        );

        match Self::identity_list_frame(&connections) {
            Ok(frame) => {
                Self::send_to_all(&connections, &frame);
                Ok(connection_id)
            }
            Err(e) => {
                connections.remove(&connection_id);
                warn!(%peer_addr, error = %e, "{}", ERR_LIST_TOO_LARGE);
                Err(RegisterError::ListTooLarge {
                    members: connections.len(),
                })
            }
        }
    }

    /// Remove a connection and broadcast the new identity list to the rest
    ///
    /// Removing the entry drops the registry's sender, which lets the
    /// connection's writer task drain and finish. Returns the removed identity,
    /// or `None` if it was already gone.
    pub async fn unregister(&self, connection_id: ConnectionId) -> Option<Identity> {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(&connection_id)?;
        Self::broadcast_identity_list(&connections);
        Some(removed.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OutgoingFrame;
    use proxchat_common::framing::{FrameReader, MessageType};
    use proxchat_common::io::read_message;
    use proxchat_common::protocol::Message;
    use tokio::sync::mpsc;

    fn addr() -> SocketAddr {
        "127.0.0.1:5000".parse().unwrap()
    }

    async fn decode_list(bytes: OutgoingFrame) -> Vec<String> {
        let data: &[u8] = &bytes;
        let mut reader = FrameReader::new(data);
        match read_message(&mut reader).await.unwrap() {
            Some(Message::IdentityList { identities }) => {
                identities.into_iter().map(String::from).collect()
            }
            other => panic!("expected identity list, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_broadcasts_to_newcomer() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(16);

        registry.register(Identity::new("A"), addr(), tx).await.unwrap();

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame[0], MessageType::IdentityList.as_byte());
        assert_eq!(decode_list(frame).await, vec!["A"]);
    }

    #[tokio::test]
    async fn test_register_assigns_increasing_ids() {
        let registry = ConnectionRegistry::new();
        let (tx_a, _rx_a) = mpsc::channel(16);
        let (tx_b, _rx_b) = mpsc::channel(16);

        let a = registry.register(Identity::new("A"), addr(), tx_a).await.unwrap();
        let b = registry.register(Identity::new("B"), addr(), tx_b).await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_identity() {
        let registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(16);
        let (tx_dup, mut rx_dup) = mpsc::channel(16);

        registry.register(Identity::new("A"), addr(), tx_a).await.unwrap();
        let _ = rx_a.recv().await;

        let err = registry
            .register(Identity::new("A"), addr(), tx_dup)
            .await
            .unwrap_err();
        assert_eq!(err, RegisterError::IdentityInUse(Identity::new("A")));

        // The rejected sender was dropped without receiving anything, and the
        // existing member saw no membership change
        assert!(rx_dup.recv().await.is_none());
        assert!(rx_a.try_recv().is_err());
        assert_eq!(registry.identities().await, vec![Identity::new("A")]);
    }

    #[tokio::test]
    async fn test_unregister_broadcasts_to_remaining() {
        let registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(16);
        let (tx_b, mut rx_b) = mpsc::channel(16);

        registry.register(Identity::new("A"), addr(), tx_a).await.unwrap();
        let b = registry.register(Identity::new("B"), addr(), tx_b).await.unwrap();
        let _ = rx_a.recv().await;
        let _ = rx_a.recv().await;
        let _ = rx_b.recv().await;

        assert_eq!(registry.unregister(b).await, Some(Identity::new("B")));

        assert_eq!(decode_list(rx_a.recv().await.unwrap()).await, vec!["A"]);
        // B's queue is closed and got no final list
        assert!(rx_b.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_register_refuses_when_list_would_not_fit() {
        let registry = ConnectionRegistry::new();
        // Control characters are escaped as \u00XX, so each entry encodes to
        // about a hundred bytes and the list limit is reached quickly
        let name = |i: usize| format!("{}{i:05}", "\u{7}".repeat(15));

        let mut ids = Vec::new();
        let mut refused = None;
        for i in 0..2000 {
            let (tx, _rx) = mpsc::channel(1);
            match registry.register(Identity::new(name(i)), addr(), tx).await {
                Ok(id) => ids.push(id),
                Err(e) => {
                    refused = Some((i, e));
                    break;
                }
            }
        }

        let (index, err) = refused.expect("registrations never hit the list limit");
        assert_eq!(err, RegisterError::ListTooLarge { members: ids.len() });
        assert_eq!(registry.len().await, ids.len());
        assert!(!registry.identities().await.contains(&Identity::new(name(index))));

        // Every member already in got a list that still fits
        let (tx, mut rx) = mpsc::channel(1);
        registry.unregister(ids[0]).await;
        registry.register(Identity::new(name(index)), addr(), tx).await.unwrap();
        let list = decode_list(rx.recv().await.unwrap()).await;
        assert_eq!(list.len(), ids.len());
        assert_eq!(list.last().unwrap(), &name(index));
    }

    #[tokio::test]
    async fn test_unregister_twice() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(16);

        let id = registry.register(Identity::new("A"), addr(), tx).await.unwrap();
        assert!(registry.unregister(id).await.is_some());
        assert!(registry.unregister(id).await.is_none());
        assert!(registry.is_empty().await);
    }
}
