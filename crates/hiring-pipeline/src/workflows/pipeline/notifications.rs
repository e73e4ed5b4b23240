use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Dismissible message surfaced next to the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Bounded queue; the oldest entry is dropped once capacity is reached.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    capacity: usize,
    next_id: u64,
    items: VecDeque<Notification>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::with_capacity(50)
    }
}

impl NotificationCenter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: 1,
            items: VecDeque::new(),
        }
    }

    pub fn push(&mut self, level: NotificationLevel, message: impl Into<String>) -> u64 {
        let message = message.into();
        match level {
            NotificationLevel::Info => info!(notification = %message),
            NotificationLevel::Warning => warn!(notification = %message),
            NotificationLevel::Error => error!(notification = %message),
        }

        let id = self.next_id;
        self.next_id += 1;
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(Notification {
            id,
            level,
            message,
            created_at: Utc::now(),
        });
        id
    }

    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Info, message)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Warning, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Error, message)
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        match self.items.iter().position(|item| item.id == id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn list(&self) -> Vec<Notification> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_entries_fall_off_at_capacity() {
        let mut center = NotificationCenter::with_capacity(2);
        center.info("first");
        let second = center.warning("second");
        let third = center.error("third");

        let ids: Vec<u64> = center.list().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![second, third]);
    }

    #[test]
    fn dismiss_removes_only_known_ids() {
        let mut center = NotificationCenter::default();
        let id = center.error("Could not move card");

        assert!(center.dismiss(id));
        assert!(!center.dismiss(id));
        assert!(center.is_empty());
    }
}
