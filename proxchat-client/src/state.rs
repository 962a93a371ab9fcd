//! Local state shared between the loops and the controls
//!
//! One mutex guards the mute/deafen flags and the volume map. Readers copy
//! what they need out and never hold the lock across I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use proxchat_common::Identity;

#[derive(Debug, Default)]
struct Inner {
    muted: bool,
    deafened: bool,
    volumes: HashMap<Identity, f32>,
}

/// Mute/deafen flags and per-sender volumes
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<Inner>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding this lock cannot leave the fields inconsistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_muted(&self) -> bool {
        self.lock().muted
    }

    pub fn set_muted(&self, muted: bool) {
        self.lock().muted = muted;
    }

    pub fn is_deafened(&self) -> bool {
        self.lock().deafened
    }

    pub fn set_deafened(&self, deafened: bool) {
        self.lock().deafened = deafened;
    }

    /// Current volume for a sender; unknown senders are silent
    pub fn volume_for(&self, sender: &Identity) -> f32 {
        self.lock().volumes.get(sender).copied().unwrap_or(0.0)
    }

    /// Replace the whole volume map
    pub fn replace_volumes(&self, volumes: HashMap<Identity, f32>) {
        self.lock().volumes = volumes;
    }

    /// Copy of the volume map
    pub fn volumes(&self) -> HashMap<Identity, f32> {
        self.lock().volumes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_default_off() {
        let state = SharedState::new();
        assert!(!state.is_muted());
        assert!(!state.is_deafened());
    }

    #[test]
    fn test_flags_shared_between_clones() {
        let state = SharedState::new();
        let other = state.clone();
        other.set_muted(true);
        other.set_deafened(true);
        assert!(state.is_muted());
        assert!(state.is_deafened());
    }

    #[test]
    fn test_unknown_sender_is_silent() {
        let state = SharedState::new();
        assert_eq!(state.volume_for(&Identity::new("ghost")), 0.0);
    }

    #[test]
    fn test_replace_volumes_is_wholesale() {
        let state = SharedState::new();
        state.replace_volumes(HashMap::from([
            (Identity::new("A"), 0.5),
            (Identity::new("B"), 0.9),
        ]));
        state.replace_volumes(HashMap::from([(Identity::new("C"), 0.2)]));

        assert_eq!(state.volume_for(&Identity::new("A")), 0.0);
        assert_eq!(state.volume_for(&Identity::new("C")), 0.2);
        assert_eq!(state.volumes().len(), 1);
    }
}
