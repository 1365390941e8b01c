//! Confirmation dialogs awaiting a single user decision.
//!
//! Requests queue up in arrival order and only the oldest is presented.
//! Confirming or cancelling resolves exactly the request with that ID.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

/// What to ask the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub confirm_text: String,
    pub cancel_text: String,
    /// Destructive action (delete/remove); rendered with a warning style.
    pub dangerous: bool,
}

impl ConfirmRequest {
    /// A request with the default "Confirm"/"Cancel" buttons.
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            confirm_text: "Confirm".to_string(),
            cancel_text: "Cancel".to_string(),
            dangerous: false,
        }
    }

    /// Override the button labels.
    #[must_use]
    pub fn buttons(mut self, confirm: impl Into<String>, cancel: impl Into<String>) -> Self {
        self.confirm_text = confirm.into();
        self.cancel_text = cancel.into();
        self
    }

    /// Mark the action as destructive.
    #[must_use]
    pub const fn dangerous(mut self) -> Self {
        self.dangerous = true;
        self
    }
}

/// A queued dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDialog {
    pub id: u64,
    pub request: ConfirmRequest,
}

/// Handle to a dialog's eventual answer.
#[derive(Debug)]
pub struct PendingConfirm {
    id: u64,
    rx: oneshot::Receiver<bool>,
}

impl PendingConfirm {
    /// ID of the dialog this handle waits on.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the user. A dialog removed without an answer counts as cancelled.
    pub async fn decision(self) -> bool {
        self.rx.await.unwrap_or(false)
    }
}

#[derive(Debug, Default)]
struct Queue {
    next_id: u64,
    pending: VecDeque<(ConfirmDialog, oneshot::Sender<bool>)>,
}

/// Queue of confirmation dialogs.
#[derive(Debug, Clone, Default)]
pub struct ConfirmDialogs {
    inner: Arc<Mutex<Queue>>,
}

impl ConfirmDialogs {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a dialog and return a handle to its answer.
    pub fn show(&self, request: ConfirmRequest) -> PendingConfirm {
        let (tx, rx) = oneshot::channel();
        let mut queue = self.lock();
        let id = queue.next_id;
        queue.next_id += 1;
        queue.pending.push_back((ConfirmDialog { id, request }, tx));
        PendingConfirm { id, rx }
    }

    /// The dialog currently presented (the oldest pending one).
    #[must_use]
    pub fn current(&self) -> Option<ConfirmDialog> {
        self.lock().pending.front().map(|(dialog, _)| dialog.clone())
    }

    /// Every pending dialog, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<ConfirmDialog> {
        self.lock()
            .pending
            .iter()
            .map(|(dialog, _)| dialog.clone())
            .collect()
    }

    /// Answer "yes" to dialog `id`. Returns false if no such dialog is pending.
    pub fn confirm(&self, id: u64) -> bool {
        self.resolve(id, true)
    }

    /// Answer "no" to dialog `id`. Returns false if no such dialog is pending.
    pub fn cancel(&self, id: u64) -> bool {
        self.resolve(id, false)
    }

    /// Drop dialog `id` without an answer; its waiter sees a cancellation.
    pub fn remove(&self, id: u64) {
        self.lock().pending.retain(|(dialog, _)| dialog.id != id);
    }

    fn resolve(&self, id: u64, confirmed: bool) -> bool {
        let entry = {
            let mut queue = self.lock();
            let position = queue.pending.iter().position(|(d, _)| d.id == id);
            position.and_then(|i| queue.pending.remove(i))
        };

        match entry {
            Some((_, tx)) => {
                // The waiter may have given up; that is not an error.
                let _ = tx.send(confirmed);
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queue> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
