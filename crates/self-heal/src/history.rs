use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::taxonomy::{ErrorType, Severity};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub step_name: String,
    pub error_type: ErrorType,
    pub severity: Severity,
    pub message: String,
    pub retry_count: u32,
}

/// Ring buffer of recent failures; the oldest entry is evicted first.
#[derive(Debug)]
pub struct ErrorHistory {
    capacity: usize,
    records: Mutex<VecDeque<ErrorRecord>>,
}

impl Default for ErrorHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ErrorHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, record: ErrorRecord) {
        let mut guard = self.records.lock();
        while guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(record);
    }

    /// Oldest first.
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn count_by_type(&self) -> BTreeMap<ErrorType, usize> {
        let guard = self.records.lock();
        let mut counts = BTreeMap::new();
        for record in guard.iter() {
            *counts.entry(record.error_type).or_insert(0) += 1;
        }
        counts
    }

    /// Most recent records for `step_name`, newest first.
    pub fn recent_for_step(&self, step_name: &str, limit: usize) -> Vec<ErrorRecord> {
        self.records
            .lock()
            .iter()
            .rev()
            .filter(|record| record.step_name == step_name)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}
