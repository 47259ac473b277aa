use std::collections::VecDeque;

use crate::activity::Activity;

/// Default number of records a feed client keeps
pub const DEFAULT_FEED_CAPACITY: usize = 50;

/// Newest-first list of received activities, capped at `capacity`
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    items: VecDeque<Activity>,
    capacity: usize,
}

impl ActivityFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend a record, dropping the oldest once full
    pub fn push(&mut self, activity: Activity) {
        self.items.push_front(activity);
        self.items.truncate(self.capacity);
    }

    pub fn latest(&self) -> Option<&Activity> {
        self.items.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<Activity> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}
