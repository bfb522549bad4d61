//! Transient user-facing notifications
//!
//! The session reports refresh results, mutation outcomes, and service
//! errors as short notices rather than failing the caller. Notices queue in
//! a bounded FIFO; whoever fronts the session (the CLI here) drains and
//! displays them after each operation.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DEFAULT_CAPACITY: usize = 32;

/// Severity of a notice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Info => write!(f, "info"),
            NoticeLevel::Success => write!(f, "success"),
            NoticeLevel::Warning => write!(f, "warning"),
            NoticeLevel::Error => write!(f, "error"),
        }
    }
}

/// One transient message for the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Bounded FIFO of pending notices; the oldest notice drops on overflow
#[derive(Debug)]
pub struct NotificationCenter {
    notices: VecDeque<Notice>,
    capacity: usize,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl NotificationCenter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            notices: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        if self.notices.len() == self.capacity {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice::new(level, message));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message);
    }

    /// Take all pending notices, oldest first
    pub fn drain(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Peek at the most recent notice without consuming it
    pub fn latest(&self) -> Option<&Notice> {
        self.notices.back()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_notices_oldest_first() {
        let mut center = NotificationCenter::default();
        center.success("catalog refreshed");
        center.error("service unreachable");

        let drained = center.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].level, NoticeLevel::Success);
        assert_eq!(drained[1].level, NoticeLevel::Error);
        assert!(center.is_empty());
    }

    #[test]
    fn test_overflow_drops_the_oldest_notice() {
        let mut center = NotificationCenter::with_capacity(2);
        center.info("first");
        center.info("second");
        center.info("third");

        let drained = center.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "second");
        assert_eq!(drained[1].message, "third");
    }

    #[test]
    fn test_latest_peeks_without_consuming() {
        let mut center = NotificationCenter::default();
        center.warning("2 malformed records skipped");

        assert_eq!(
            center.latest().map(|notice| notice.level),
            Some(NoticeLevel::Warning)
        );
        assert_eq!(center.len(), 1);
    }

    #[test]
    fn test_notice_display_carries_level_prefix() {
        let notice = Notice::new(NoticeLevel::Error, "group 5 not found");
        assert_eq!(notice.to_string(), "[error] group 5 not found");
    }
}
