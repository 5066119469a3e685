//! Single-slot transport gate.
//!
//! Transport operations are serialized through one permit. A call that finds
//! the permit taken is dropped, never queued: a rapid double tap loses its
//! second tap, but two operations never observe the same resource mid-change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Clone)]
pub struct TransportGate {
    slot: Arc<Semaphore>,
    rejected: Arc<AtomicU64>,
}

/// Held for the whole duration of a transport operation; releasing it on drop
/// is what clears the gate on every exit path, including errors.
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    operation: &'static str,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        tracing::trace!(operation = self.operation, "transport released");
    }
}

impl TransportGate {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
            rejected: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn try_enter(&self, operation: &'static str) -> Option<GatePermit> {
        match Arc::clone(&self.slot).try_acquire_owned() {
            Ok(permit) => Some(GatePermit {
                _permit: permit,
                operation,
            }),
            Err(_) => {
                let rejected = self.rejected.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(operation, rejected, "transport busy, dropping call");
                None
            }
        }
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }

    /// Number of calls dropped since the gate was created.
    #[cfg(test)]
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

impl Default for TransportGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_entry_is_dropped_while_first_is_held() {
        let gate = TransportGate::new();
        let first = gate.try_enter("play_episode");
        assert!(first.is_some());
        assert!(gate.is_busy());
        assert!(gate.try_enter("toggle").is_none());
        assert_eq!(gate.rejected(), 1);
    }

    #[test]
    fn dropping_the_permit_reopens_the_gate() {
        let gate = TransportGate::new();
        {
            let _permit = gate.try_enter("seek").expect("permit");
        }
        assert!(!gate.is_busy());
        let permit = gate.try_enter("close").expect("reopened");
        assert_eq!(permit.operation, "close");
    }

    #[test]
    fn clones_share_the_same_slot() {
        let gate = TransportGate::new();
        let other = gate.clone();
        let _permit = gate.try_enter("play_episode").expect("permit");
        assert!(other.try_enter("play_next").is_none());
        assert_eq!(gate.rejected(), 1);
    }
}
