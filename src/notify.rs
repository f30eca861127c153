use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    shown_at: Instant,
}

/// Transient notifications shown in the corner of the screen. Each toast
/// disappears once `ttl` has elapsed.
#[derive(Debug, Clone)]
pub struct Toasts {
    queue: VecDeque<Toast>,
    ttl: Duration,
    capacity: usize,
}

impl Toasts {
    pub fn new(ttl: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            ttl,
            capacity: 4,
        }
    }

    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            ToastKind::Error => tracing::warn!(%message, "error toast"),
            _ => tracing::debug!(%message, ?kind, "toast"),
        }
        self.queue.push_back(Toast {
            kind,
            message,
            shown_at: Instant::now(),
        });
        while self.queue.len() > self.capacity {
            self.queue.pop_front();
        }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Error, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Info, message);
    }

    pub fn expire(&mut self) {
        self.expire_at(Instant::now());
    }

    fn expire_at(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.queue
            .retain(|toast| now.saturating_duration_since(toast.shown_at) < ttl);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.queue.iter()
    }

    pub fn latest(&self) -> Option<&Toast> {
        self.queue.back()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
