use std::collections::VecDeque;

use serde::Serialize;

use crate::types::Millis;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventLogEntry {
    pub at: Millis,
    pub message: String,
}

/// Operator-facing log, newest entry first. Once full, the oldest entry is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventLog {
    entries: VecDeque<EventLogEntry>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        EventLog {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, at: Millis, message: impl Into<String>) {
        self.entries.push_front(EventLogEntry {
            at,
            message: message.into(),
        });
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&EventLogEntry> {
        self.entries.front()
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &EventLogEntry> {
        self.entries.iter()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.entries.iter().filter(|e| e.message.contains(needle)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first() {
        let mut log = EventLog::new(10);
        log.push(0, "first");
        log.push(5, "second");
        let messages: Vec<&str> = log.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["second", "first"]);
        assert_eq!(log.latest().unwrap().at, 5);
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut log = EventLog::new(100);
        for i in 0..150u64 {
            log.push(i, format!("event {}", i));
            assert!(log.len() <= 100);
        }
        assert_eq!(log.len(), 100);
        assert_eq!(log.latest().unwrap().message, "event 149");
        assert_eq!(log.iter().last().unwrap().message, "event 50");
    }
}
