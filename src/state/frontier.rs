use std::collections::{HashSet, VecDeque};

/// Per-domain work queue plus the set of URLs already dequeued
///
/// Invariants held between batches:
/// - `visited` contains every URL ever handed out by [`Frontier::next_batch`]
/// - no URL is both queued and visited
/// - no URL is queued twice
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    queue: VecDeque<String>,
    queued: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a frontier from persisted parts
    ///
    /// Queue entries that are already visited or duplicated are dropped, so
    /// a hand-edited or partially written shard still satisfies the
    /// invariants.
    pub fn from_parts(queue: Vec<String>, visited: Vec<String>) -> Self {
        let mut frontier = Self {
            queue: VecDeque::with_capacity(queue.len()),
            queued: HashSet::with_capacity(queue.len()),
            visited: visited.into_iter().collect(),
        };

        for url in queue {
            frontier.enqueue(url);
        }

        frontier
    }

    /// Appends a URL to the back of the queue
    ///
    /// Returns false (and does nothing) if the URL was already visited or
    /// is already waiting in the queue.
    pub fn enqueue(&mut self, url: String) -> bool {
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }
        self.queued.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    /// Dequeues up to `max` URLs in FIFO order and marks them visited
    ///
    /// Visiting happens here, before any fetch is dispatched, so a URL can
    /// never be submitted twice even if its result is lost.
    pub fn next_batch(&mut self, max: usize) -> Vec<String> {
        let mut batch = Vec::with_capacity(max.min(self.queue.len()));

        while batch.len() < max {
            let Some(url) = self.queue.pop_front() else {
                break;
            };
            self.queued.remove(&url);
            if self.visited.insert(url.clone()) {
                batch.push(url);
            }
        }

        batch
    }

    /// Clears the visited set at the start of a new traversal epoch
    pub fn reset_visited(&mut self) {
        self.visited.clear();
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn is_queued(&self, url: &str) -> bool {
        self.queued.contains(url)
    }

    /// Returns true when nothing is waiting to be fetched
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    /// Queued URLs in FIFO order
    pub fn queue(&self) -> Vec<String> {
        self.queue.iter().cloned().collect()
    }

    /// Visited URLs, sorted for stable output
    pub fn visited(&self) -> Vec<String> {
        let mut visited: Vec<String> = self.visited.iter().cloned().collect();
        visited.sort();
        visited
    }
}
