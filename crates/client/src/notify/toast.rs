//! Self-expiring toast notifications.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Visual flavour of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

/// A notification as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub kind: ToastKind,
    pub duration: Duration,
}

#[derive(Debug)]
struct Entry {
    toast: Toast,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Queue {
    next_id: u64,
    entries: VecDeque<Entry>,
}

impl Queue {
    fn prune(&mut self, now: Instant) {
        self.entries.retain(|e| e.expires_at > now);
    }
}

/// FIFO queue of toasts. Each toast disappears once its duration has elapsed.
#[derive(Debug, Clone)]
pub struct Toasts {
    inner: Arc<Mutex<Queue>>,
    default_duration: Duration,
}

impl Toasts {
    /// Create a queue whose toasts last `default_duration` unless told otherwise.
    #[must_use]
    pub fn new(default_duration: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Queue::default())),
            default_duration,
        }
    }

    /// Duration used by [`Toasts::show`].
    #[must_use]
    pub const fn default_duration(&self) -> Duration {
        self.default_duration
    }

    /// Show an informational toast for the default duration.
    pub fn show(&self, message: impl Into<String>) -> u64 {
        self.show_for(message, ToastKind::Info, self.default_duration)
    }

    /// Show a success toast.
    pub fn success(&self, message: impl Into<String>, duration: Duration) -> u64 {
        self.show_for(message, ToastKind::Success, duration)
    }

    /// Show an error toast.
    pub fn error(&self, message: impl Into<String>, duration: Duration) -> u64 {
        self.show_for(message, ToastKind::Error, duration)
    }

    /// Show a toast with an explicit kind and duration. Returns its ID.
    pub fn show_for(&self, message: impl Into<String>, kind: ToastKind, duration: Duration) -> u64 {
        let message = message.into();
        let now = Instant::now();
        let mut queue = self.lock();
        queue.prune(now);

        let id = queue.next_id;
        queue.next_id += 1;
        tracing::debug!(id, ?kind, %message, "toast");
        queue.entries.push_back(Entry {
            toast: Toast {
                id,
                message,
                kind,
                duration,
            },
            expires_at: now + duration,
        });
        id
    }

    /// Toasts still on screen, oldest first.
    #[must_use]
    pub fn active(&self) -> Vec<Toast> {
        let mut queue = self.lock();
        queue.prune(Instant::now());
        queue.entries.iter().map(|e| e.toast.clone()).collect()
    }

    /// Remove and return every toast still on screen.
    #[must_use]
    pub fn drain(&self) -> Vec<Toast> {
        let mut queue = self.lock();
        queue.prune(Instant::now());
        queue.entries.drain(..).map(|e| e.toast).collect()
    }

    /// Dismiss a toast before it expires.
    pub fn dismiss(&self, id: u64) {
        self.lock().entries.retain(|e| e.toast.id != id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queue> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_toasts_expire_after_their_duration() {
        let toasts = Toasts::new(Duration::from_millis(1500));
        toasts.show("Added to cart");
        toasts.error("Server error. Please try again later", Duration::from_secs(4));

        assert_eq!(toasts.active().len(), 2);

        tokio::time::advance(Duration::from_millis(1600)).await;
        let active = toasts.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, ToastKind::Error);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(toasts.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_order_and_unique_ids() {
        let toasts = Toasts::new(Duration::from_secs(1));
        let a = toasts.show("first");
        let b = toasts.show("second");
        assert_ne!(a, b);

        let messages: Vec<_> = toasts.active().into_iter().map(|t| t.message).collect();
        assert_eq!(messages, ["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_and_drain() {
        let toasts = Toasts::new(Duration::from_secs(1));
        let a = toasts.show("first");
        toasts.show("second");
        toasts.dismiss(a);

        let drained = toasts.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].message, "second");
        assert!(toasts.active().is_empty());
    }
}
