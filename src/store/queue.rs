//! FIFO search queue

use std::collections::VecDeque;
use uuid::Uuid;

/// Users awaiting a match, in insertion order
#[derive(Debug, Default)]
pub struct SearchQueue {
    queue: VecDeque<Uuid>,
}

impl SearchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user at the back. Already queued users keep their place.
    pub fn enqueue(&mut self, user_id: Uuid) -> bool {
        if self.contains(&user_id) {
            return false;
        }
        self.queue.push_back(user_id);
        true
    }

    /// Remove a user from the queue
    pub fn dequeue(&mut self, user_id: &Uuid) -> bool {
        match self.queue.iter().position(|id| id == user_id) {
            Some(pos) => self.queue.remove(pos).is_some(),
            None => false,
        }
    }

    /// Remove both users, or neither if either is missing
    pub fn take_pair(&mut self, first: &Uuid, second: &Uuid) -> bool {
        if first == second || !self.contains(first) || !self.contains(second) {
            return false;
        }
        self.queue.retain(|id| id != first && id != second);
        true
    }

    /// Check if a user is in the queue
    pub fn contains(&self, user_id: &Uuid) -> bool {
        self.queue.contains(user_id)
    }

    /// Ids in insertion order
    pub fn ids(&self) -> Vec<Uuid> {
        self.queue.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
