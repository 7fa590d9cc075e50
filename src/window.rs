use std::collections::VecDeque;

use crate::formats::ChapterRecord;

pub const DEFAULT_WINDOW_CAPACITY: usize = 3;

/// Oldest-first run of rendered chapters. Never empty, never above capacity.
#[derive(Debug, Clone)]
pub struct ChapterWindow {
    records: VecDeque<ChapterRecord>,
    capacity: usize,
    generation: u64,
}

impl ChapterWindow {
    pub fn new(seed: ChapterRecord, capacity: usize) -> Self {
        let capacity = capacity.max(2);
        let mut records = VecDeque::with_capacity(capacity);
        records.push_back(seed);
        Self {
            records,
            capacity,
            generation: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bumped on every mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The next push evicts the oldest record.
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    /// The record that becomes first once the oldest is evicted.
    pub fn successor_of_oldest(&self) -> Option<&ChapterRecord> {
        self.records.get(1)
    }

    pub fn records(&self) -> impl Iterator<Item = &ChapterRecord> {
        self.records.iter()
    }

    pub fn to_vec(&self) -> Vec<ChapterRecord> {
        self.records.iter().cloned().collect()
    }

    /// Appends `record`, dropping and returning the oldest when already full.
    pub fn push(&mut self, record: ChapterRecord) -> Option<ChapterRecord> {
        let evicted = if self.is_full() {
            self.records.pop_front()
        } else {
            None
        };
        self.records.push_back(record);
        self.generation += 1;
        evicted
    }
}
