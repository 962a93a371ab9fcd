//! Spatial mixer
//!
//! Maps a snapshot of participant positions to a playback volume for each
//! other participant, as heard from one local identity.

use std::collections::{BTreeMap, HashMap};

use proxchat_common::Identity;
use serde::{Deserialize, Serialize};

/// A point in the arena
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Position) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Every known participant's position
pub type Positions = BTreeMap<Identity, Position>;

/// The rectangular space participants move in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Arena {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Length of the diagonal, the largest possible separation
    pub fn diagonal(&self) -> f32 {
        self.width.hypot(self.height)
    }

    /// Clamp a position into the arena
    pub fn clamp(&self, position: Position) -> Position {
        Position {
            x: position.x.clamp(0.0, self.width.max(0.0)),
            y: position.y.clamp(0.0, self.height.max(0.0)),
        }
    }
}

/// Shape of the distance-to-volume curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Falloff {
    /// Volume falls linearly with distance
    Linear,
    /// Linear, then compressed in bands and cut off when far away
    #[default]
    Banded,
}

/// Linear proximity: 1 at zero distance, 0 at `max_distance` and beyond
pub fn proximity(distance: f32, max_distance: f32) -> f32 {
    if max_distance <= 0.0 {
        return if distance <= 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - distance / max_distance).clamp(0.0, 1.0)
}

/// Compress a linear volume in bands
///
/// | volume      | result       |
/// |-------------|--------------|
/// | < 0.3       | 0            |
/// | 0.3 .. 0.5  | volume / 2   |
/// | 0.5 .. 0.7  | volume / 1.5 |
/// | >= 0.7      | volume       |
///
/// The result never decreases as the input increases.
pub fn apply_banding(volume: f32) -> f32 {
    if volume < 0.3 {
        0.0
    } else if volume < 0.5 {
        volume / 2.0
    } else if volume < 0.7 {
        volume / 1.5
    } else {
        volume
    }
}

/// Volume of every other participant as heard by `me`
///
/// Returns an empty map if `me` has no position. `me` never appears in the
/// result.
pub fn compute_volumes(
    positions: &Positions,
    me: &Identity,
    arena: Arena,
    falloff: Falloff,
) -> HashMap<Identity, f32> {
    let Some(my_position) = positions.get(me) else {
        return HashMap::new();
    };
    let max_distance = arena.diagonal();

    positions
        .iter()
        .filter(|(identity, _)| *identity != me)
        .map(|(identity, position)| {
            let linear = proximity(my_position.distance_to(position), max_distance);
            let volume = match falloff {
                Falloff::Linear => linear,
                Falloff::Banded => apply_banding(linear),
            };
            (identity.clone(), volume)
        })
        .collect()
}
