//! Per-class vote storage.

use crate::error::VotingError;
use crate::types::Vote;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Owns the votes of one detection pass, grouped by class id.
///
/// Appends go through a critical section so parallel feature-matching
/// workers can cast votes concurrently; no ordering is guaranteed between
/// concurrent callers beyond atomicity of each append.
#[derive(Debug, Default)]
pub struct VoteStore {
    votes: Mutex<BTreeMap<u32, Vec<Vote>>>,
}

impl VoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a vote to its class's list.
    pub fn push(&self, vote: Vote) {
        let mut votes = self.votes.lock().unwrap_or_else(|e| e.into_inner());
        votes.entry(vote.class_id).or_default().push(vote);
    }

    /// Snapshot of all votes grouped by class.
    pub fn all(&self) -> BTreeMap<u32, Vec<Vote>> {
        self.votes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Votes of one class; unknown class ids are a lookup error.
    pub fn for_class(&self, class_id: u32) -> Result<Vec<Vote>, VotingError> {
        self.votes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&class_id)
            .cloned()
            .ok_or(VotingError::UnknownClass(class_id))
    }

    pub fn is_empty(&self) -> bool {
        self.votes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    /// Empties all vote lists. Call between independent detection runs to
    /// avoid cross-scene contamination.
    pub fn clear(&self) {
        self.votes.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
