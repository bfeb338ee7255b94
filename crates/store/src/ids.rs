//! Message id assignment
//!
//! Ids look like millisecond timestamps (what existing clients expect) but
//! are strictly increasing: two appends in the same millisecond get
//! consecutive ids instead of colliding.

use chrono::{DateTime, Utc};

/// Monotonic id generator seeded from the highest id already in the log
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume after the highest id seen so far
    pub fn starting_after(last: u64) -> Self {
        Self { last }
    }

    /// Next id for a message created at `now`
    pub fn next(&mut self, now: DateTime<Utc>) -> u64 {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = millis.max(self.last.saturating_add(1));
        self.last = id;
        id
    }

    pub fn last(&self) -> u64 {
        self.last
    }
}
