//! Spatial model: arena positions and the distance-to-volume mapping

mod mixer;
mod positions;

pub use mixer::{Arena, Falloff, Position, Positions, apply_banding, compute_volumes, proximity};
pub use positions::{MembershipObserver, PositionBoard};
