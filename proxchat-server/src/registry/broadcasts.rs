//! Broadcast methods for ConnectionRegistry

use std::collections::BTreeMap;

use proxchat_common::framing::FrameError;
use proxchat_common::protocol::Message;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

use super::{ConnectionId, ConnectionRegistry, OutgoingFrame, RegisteredConnection};
use crate::constants::{ERR_RELAY_FULL, ERR_RELAY_SEND};

impl ConnectionRegistry {
    /// Queue an already-encoded frame for every connection except `from`
    ///
    /// Never waits on a recipient. A departed recipient or one whose queue is
    /// full is skipped and the rest still receive the frame.
    pub async fn relay(&self, from: ConnectionId, frame: OutgoingFrame) {
        let connections = self.connections.read().await;
        for (id, connection) in connections.iter() {
            if *id == from {
                continue;
            }
            Self::offer(*id, connection, frame.clone());
        }
    }

    /// Encode the identity list for the current table
    ///
    /// # Errors
    ///
    /// Returns an error if the list no longer fits in an identity-list frame.
    pub(super) fn identity_list_frame(
        connections: &BTreeMap<ConnectionId, RegisteredConnection>,
    ) -> Result<OutgoingFrame, FrameError> {
        let message = Message::IdentityList {
            identities: connections.values().map(|c| c.identity.clone()).collect(),
        };
        Ok(message.to_frame()?.into_bytes().into())
    }

    /// Queue the current identity list for every registered connection
    ///
    /// Callers hold the write lock so the list always matches the table.
    pub(super) fn broadcast_identity_list(
        connections: &BTreeMap<ConnectionId, RegisteredConnection>,
    ) {
        match Self::identity_list_frame(connections) {
            Ok(frame) => Self::send_to_all(connections, &frame),
            Err(e) => warn!(error = %e, "Failed to encode identity list"),
        }
    }

    pub(super) fn send_to_all(
        connections: &BTreeMap<ConnectionId, RegisteredConnection>,
        frame: &OutgoingFrame,
    ) {
        for (id, connection) in connections.iter() {
            Self::offer(*id, connection, frame.clone());
        }
    }

    fn offer(id: ConnectionId, connection: &RegisteredConnection, frame: OutgoingFrame) {
        match connection.tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!(
                    connection_id = id,
                    identity = %connection.identity,
                    peer_addr = %connection.peer_addr,
                    "{}",
                    ERR_RELAY_FULL
                );
            }
            Err(TrySendError::Closed(_)) => {
                trace!(connection_id = id, identity = %connection.identity, "{}", ERR_RELAY_SEND);
            }
        }
    }
}
