//! User notification state: transient toasts and confirmation dialogs.

mod confirm;
mod toast;

pub use confirm::{ConfirmDialog, ConfirmDialogs, ConfirmRequest, PendingConfirm};
pub use toast::{Toast, ToastKind, Toasts};
