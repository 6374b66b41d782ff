use std::collections::VecDeque;

use crate::domain::Reading;

/// most readings a dashboard keeps in memory
pub const DEFAULT_CAPACITY: usize = 200;

/// insertion-ordered reading buffer that evicts its oldest entries
#[derive(Clone, Debug)]
pub struct ReadingBuffer {
    max: usize,
    buf: VecDeque<Reading>,
}

impl ReadingBuffer {
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            max,
            buf: VecDeque::with_capacity(max),
        }
    }

    /// buffer seeded with `readings`, keeping only the newest `max`
    pub fn from_readings(max: usize, readings: Vec<Reading>) -> Self {
        let mut out = Self::new(max);
        out.extend(readings);
        out
    }

    pub fn push(&mut self, item: Reading) {
        while self.buf.len() >= self.max {
            self.buf.pop_front();
        }
        self.buf.push_back(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = Reading>) {
        for item in items {
            self.push(item);
        }
    }

    pub fn last(&self) -> Option<&Reading> {
        self.buf.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.buf.iter()
    }

    pub fn to_vec(&self) -> Vec<Reading> {
        self.buf.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for ReadingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
