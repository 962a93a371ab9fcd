//! Position board
//!
//! Headless stand-in for the scene participants move around in. It holds the
//! latest position of every member, hands out snapshots, and notifies
//! subscribers on every change. It also tracks membership: identity lists from
//! the relay add newcomers at a random spot and drop whoever left.

use proxchat_common::Identity;
use tokio::sync::watch;
use tracing::debug;

use super::mixer::{Arena, Position, Positions};
use crate::constants::{PLACEMENT_MARGIN_MAX, PLACEMENT_MARGIN_MIN};

/// Receives the full identity list on every membership change
///
/// Called from the receive loop, so implementations must return quickly.
pub trait MembershipObserver: Send + Sync {
    fn on_identity_list(&self, identities: &[Identity]);
}

/// Shared, observable participant positions
#[derive(Debug)]
pub struct PositionBoard {
    arena: Arena,
    positions: watch::Sender<Positions>,
}

impl PositionBoard {
    /// Create an empty board for `arena`
    pub fn new(arena: Arena) -> Self {
        let (positions, _) = watch::channel(Positions::new());
        Self { arena, positions }
    }

    pub fn arena(&self) -> Arena {
        self.arena
    }

    /// Subscribe to position changes
    ///
    /// The receiver starts with the current snapshot marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<Positions> {
        self.positions.subscribe()
    }

    /// Copy of every known position
    pub fn snapshot(&self) -> Positions {
        self.positions.borrow().clone()
    }

    /// Position of one participant, if known
    pub fn position_of(&self, identity: &Identity) -> Option<Position> {
        self.positions.borrow().get(identity).copied()
    }

    /// Move a participant, clamped to the arena
    ///
    /// Unknown identities are added. Returns the stored position.
    pub fn set_position(&self, identity: &Identity, position: Position) -> Position {
        let clamped = self.arena.clamp(position);
        self.positions.send_modify(|positions| {
            positions.insert(identity.clone(), clamped);
        });
        clamped
    }

    /// Reconcile the board with the relay's membership list
    ///
    /// Newcomers are placed at random; departed identities are removed.
    /// Subscribers are only notified if something changed.
    pub fn sync_members(&self, identities: &[Identity]) {
        let arena = self.arena;
        self.positions.send_if_modified(|positions| {
            let before = positions.len();
            positions.retain(|identity, _| identities.contains(identity));
            let mut changed = positions.len() != before;

            for identity in identities {
                if !positions.contains_key(identity) {
                    let position = random_position(arena);
                    debug!(%identity, x = position.x, y = position.y, "Placed participant");
                    positions.insert(identity.clone(), position);
                    changed = true;
                }
            }
            changed
        });
    }
}

impl MembershipObserver for PositionBoard {
    fn on_identity_list(&self, identities: &[Identity]) {
        self.sync_members(identities);
    }
}

/// Random spot inside the placement margins
///
/// Arenas too small for the margins place everyone in the centre.
fn random_position(arena: Arena) -> Position {
    let span_x = arena.width - PLACEMENT_MARGIN_MIN - PLACEMENT_MARGIN_MAX;
    let span_y = arena.height - PLACEMENT_MARGIN_MIN - PLACEMENT_MARGIN_MAX;
    if span_x <= 0.0 || span_y <= 0.0 {
        return Position::new(arena.width / 2.0, arena.height / 2.0);
    }

    Position::new(
        PLACEMENT_MARGIN_MIN + rand::random::<f32>() * span_x,
        PLACEMENT_MARGIN_MIN + rand::random::<f32>() * span_y,
    )
}
