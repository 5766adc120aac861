//! Delayed story steps.
//!
//! Steps are plain values queued against a millisecond clock that only moves
//! when the owner calls [`StepScheduler::advance`]. Each queued step carries
//! the epoch it was scheduled in; [`StepScheduler::invalidate`] starts a new
//! epoch and anything older is dropped when it comes due.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Handle for cancelling a scheduled step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Scheduled<S> {
    id: TimerId,
    due_ms: u64,
    epoch: u64,
    step: S,
}

/// A queue of steps keyed by due time.
#[derive(Debug, Clone)]
pub struct StepScheduler<S> {
    now_ms: u64,
    epoch: u64,
    next_id: u64,
    pending: Vec<Scheduled<S>>,
}

impl<S> Default for StepScheduler<S> {
    fn default() -> Self {
        Self {
            now_ms: 0,
            epoch: 0,
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<S: std::fmt::Debug> StepScheduler<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock reading.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Queue `step` to run `delay_ms` from now.
    pub fn schedule(&mut self, delay_ms: u64, step: S) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let due_ms = self.now_ms.saturating_add(delay_ms);
        debug!(?step, due_ms, "step scheduled");
        self.pending.push(Scheduled {
            id,
            due_ms,
            epoch: self.epoch,
            step,
        });
        id
    }

    /// Drop a pending step. Returns `false` if it already ran or never existed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|s| s.id != id);
        before != self.pending.len()
    }

    /// Start a new epoch. Steps queued before this call will never be returned.
    pub fn invalidate(&mut self) {
        self.epoch += 1;
        debug!(epoch = self.epoch, "scheduler invalidated");
    }

    /// Move the clock forward and return every step now due.
    ///
    /// Steps come back in due order; steps due at the same time keep the
    /// order they were scheduled in.
    pub fn advance(&mut self, elapsed_ms: u64) -> Vec<S> {
        self.now_ms = self.now_ms.saturating_add(elapsed_ms);

        let now = self.now_ms;
        let (mut due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|s| s.due_ms <= now);
        self.pending = waiting;
        due.sort_by_key(|s| (s.due_ms, s.id));

        let epoch = self.epoch;
        due.into_iter()
            .filter_map(|s| {
                if s.epoch == epoch {
                    Some(s.step)
                } else {
                    debug!(step = ?s.step, stale_epoch = s.epoch, "discarding stale step");
                    None
                }
            })
            .collect()
    }

    /// Number of queued steps, stale ones included.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Forget everything queued and reset the clock.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.now_ms = 0;
    }
}
