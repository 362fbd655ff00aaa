// Transient notices shown to the user; they expire on their own
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NoticeBoard {
    ttl: Duration,
    next_id: AtomicU64,
    notices: Mutex<VecDeque<Notice>>,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: AtomicU64::new(1),
            notices: Mutex::new(VecDeque::new()),
        }
    }

    pub fn raise(&self, level: NoticeLevel, message: impl Into<String>) -> Notice {
        let notice = Notice {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            level,
            message: message.into(),
            raised_at: Utc::now(),
        };

        match level {
            NoticeLevel::Error => tracing::warn!(notice = %notice.message, "error notice raised"),
            NoticeLevel::Info => tracing::info!(notice = %notice.message, "notice raised"),
        }

        let mut notices = self.notices.lock().unwrap_or_else(|e| e.into_inner());
        notices.push_back(notice.clone());
        notice
    }

    pub fn error(&self, message: impl Into<String>) -> Notice {
        self.raise(NoticeLevel::Error, message)
    }

    /// Notices still on screen at `now`. Expired ones are dropped.
    pub fn active_at(&self, now: DateTime<Utc>) -> Vec<Notice> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let mut notices = self.notices.lock().unwrap_or_else(|e| e.into_inner());
        notices.retain(|n| now.signed_duration_since(n.raised_at) < ttl);
        notices.iter().cloned().collect()
    }

    pub fn active(&self) -> Vec<Notice> {
        self.active_at(Utc::now())
    }
}
