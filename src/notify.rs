use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

const MAX_PENDING: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

impl NoticeLevel {
    pub fn css_class(self) -> &'static str {
        match self {
            NoticeLevel::Success => "ok",
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub text: String,
}

/// Pending operator notices, shown once on the next rendered page.
#[derive(Clone, Default)]
pub struct NoticeQueue {
    pending: Arc<Mutex<VecDeque<Notice>>>,
    next_id: Arc<AtomicU64>,
}

impl NoticeQueue {
    pub fn push(&self, level: NoticeLevel, text: impl Into<String>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.len() == MAX_PENDING {
            pending.pop_front();
        }
        pending.push_back(Notice {
            id,
            level,
            text: text.into(),
        });
        id
    }

    pub fn success(&self, text: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Success, text)
    }

    pub fn info(&self, text: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Info, text)
    }

    pub fn error(&self, text: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Error, text)
    }

    pub fn drain(&self) -> Vec<Notice> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
