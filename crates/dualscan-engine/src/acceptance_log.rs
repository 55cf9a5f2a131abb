//! In-memory log of accepted records since the last flush or reset.

use serde::{Deserialize, Serialize};

/// A validated item: one primary code plus its distinct auxiliary codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedRecord {
    pub primary_code: String,
    /// Distinct, in first-seen order.
    pub aux_codes: Vec<String>,
}

impl AcceptedRecord {
    /// `primary|aux_1|...|aux_k`
    pub fn serialized(&self) -> String {
        let mut out = self.primary_code.clone();
        for code in &self.aux_codes {
            out.push('|');
            out.push_str(code);
        }
        out
    }
}

/// Ordered, primary-code-unique collection of accepted records.
#[derive(Debug, Default)]
pub struct AcceptanceLog {
    records: Vec<AcceptedRecord>,
}

impl AcceptanceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Linear scan for an entry with this primary code.
    pub fn contains(&self, primary_code: &str) -> bool {
        self.records.iter().any(|r| r.primary_code == primary_code)
    }

    /// Append to the end. Callers check [`contains`](Self::contains) first
    /// while holding the same lock.
    pub fn append(&mut self, record: AcceptedRecord) {
        debug_assert!(!self.contains(&record.primary_code));
        self.records.push(record);
    }

    /// Serialize every record in order and empty the log.
    pub fn drain_all(&mut self) -> Vec<String> {
        self.records.drain(..).map(|r| r.serialized()).collect()
    }

    /// Drop all records without handing them off. Returns how many were dropped.
    pub fn reset(&mut self) -> usize {
        let dropped = self.records.len();
        self.records.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialized records in order, leaving the log untouched.
    pub fn serialized(&self) -> Vec<String> {
        self.records.iter().map(AcceptedRecord::serialized).collect()
    }
}
