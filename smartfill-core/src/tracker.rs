//! In-flight analysis bookkeeping.
//!
//! The tracker owns the set of dispatched-but-unfinished request ids, so the
//! pending count and progress are derived rather than counted by hand. Each
//! request is tagged with the batch that dispatched it. Overlapping batches
//! still share one progress figure: it reaches Idle only when every batch has
//! drained.
//!
//! Cancellation advances the generation. Completions carrying an older
//! generation are reported as [`Completion::Stale`] and must be discarded.

use std::collections::HashMap;

use serde::Serialize;

/// Snapshot of analysis progress across all live batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisProgress {
    pub pending: usize,
    pub completed: usize,
    pub total: usize,
}

impl AnalysisProgress {
    pub fn is_idle(&self) -> bool {
        self.pending == 0
    }

    /// Completed share in `[0, 1]`; 1 when idle.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Identifies one `analyze_library` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchToken {
    pub id: u64,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    pub photo_id: String,
    pub batch: u64,
    pub detect_faces: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Current-generation completion; the entry has been retired.
    Accepted(InFlight),
    /// Dispatched before the last cancel.
    Stale,
    /// Not (or no longer) tracked.
    Unknown,
}

#[derive(Debug, Default)]
pub struct BatchTracker {
    generation: u64,
    next_batch: u64,
    next_request: u64,
    in_flight: HashMap<u64, InFlight>,
    completed: usize,
    total: usize,
}

impl BatchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn begin_batch(&mut self) -> BatchToken {
        self.next_batch += 1;
        BatchToken {
            id: self.next_batch,
            generation: self.generation,
        }
    }

    /// Record a dispatched request and return its id.
    pub fn register(&mut self, batch: &BatchToken, photo_id: &str, detect_faces: bool) -> u64 {
        self.next_request += 1;
        let id = self.next_request;
        self.in_flight.insert(
            id,
            InFlight {
                photo_id: photo_id.to_string(),
                batch: batch.id,
                detect_faces,
            },
        );
        self.total += 1;
        id
    }

    /// Register a request unless one already in flight covers it.
    ///
    /// The check and the insert happen under one borrow, so callers holding
    /// the tracker lock cannot dispatch the same photo twice.
    pub fn register_unless_covered(
        &mut self,
        batch: &BatchToken,
        photo_id: &str,
        detect_faces: bool,
    ) -> Option<u64> {
        if self.covers(photo_id, detect_faces) {
            return None;
        }
        Some(self.register(batch, photo_id, detect_faces))
    }

    /// Forget a request that could not be sent.
    pub fn unregister(&mut self, request_id: u64) {
        if self.in_flight.remove(&request_id).is_some() {
            self.total = self.total.saturating_sub(1);
            self.reset_if_idle();
        }
    }

    /// Whether a request already in flight will produce analysis at least as
    /// deep as `detect_faces` asks for.
    pub fn covers(&self, photo_id: &str, detect_faces: bool) -> bool {
        self.in_flight
            .values()
            .any(|f| f.photo_id == photo_id && (f.detect_faces || !detect_faces))
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn complete(&mut self, request_id: u64, generation: u64) -> Completion {
        if !self.is_current(generation) {
            return Completion::Stale;
        }
        match self.in_flight.remove(&request_id) {
            Some(entry) => {
                self.completed += 1;
                self.reset_if_idle();
                Completion::Accepted(entry)
            }
            None => Completion::Unknown,
        }
    }

    /// Abandon everything in flight. Returns how many requests were dropped.
    pub fn cancel(&mut self) -> usize {
        self.generation += 1;
        let dropped = self.in_flight.len();
        self.in_flight.clear();
        self.completed = 0;
        self.total = 0;
        dropped
    }

    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    pub fn pending_in_batch(&self, batch: &BatchToken) -> usize {
        self.in_flight.values().filter(|f| f.batch == batch.id).count()
    }

    pub fn progress(&self) -> AnalysisProgress {
        AnalysisProgress {
            pending: self.in_flight.len(),
            completed: self.completed,
            total: self.total,
        }
    }

    fn reset_if_idle(&mut self) {
        if self.in_flight.is_empty() {
            self.completed = 0;
            self.total = 0;
        }
    }
}
