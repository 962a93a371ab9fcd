//! Registry of live, identified connections
//!
//! Every registered connection owns a bounded outgoing queue drained by its
//! writer task. A full queue drops new frames for that connection only. The registry is the only place that sends into those queues, and every
//! mutation broadcasts the new identity list while still holding the write
//! lock, so members observe membership changes in the order they happened.

mod broadcasts;
mod mutations;
mod queries;

pub use mutations::RegisterError;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use proxchat_common::Identity;
use tokio::sync::{RwLock, mpsc};

/// Identifier assigned at registration, increasing in join order
pub type ConnectionId = u32;

/// Encoded frame bytes shared between every recipient's queue
pub type OutgoingFrame = Arc<[u8]>;

/// Sending half of a connection's outgoing queue
pub type OutgoingSender = mpsc::Sender<OutgoingFrame>;

/// A registered connection
#[derive(Debug)]
pub struct RegisteredConnection {
    pub identity: Identity,
    pub(super) peer_addr: SocketAddr,
    pub(super) tx: OutgoingSender,
}

/// Shared table of registered connections
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    pub(super) connections: Arc<RwLock<BTreeMap<ConnectionId, RegisteredConnection>>>,
    pub(super) next_id: Arc<AtomicU32>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Generate the next connection ID
    pub(super) fn next_connection_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
