//! User-visible notifications for failed API calls.
//!
//! The gateway hands every failure it surfaces to a `Notifier`. Front ends
//! choose where notices go: the log, or a channel drained by their UI loop.

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::api::ApiError;

const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";
const PERMISSION_MESSAGE: &str = "You do not have permission to perform this action.";
const NOT_FOUND_MESSAGE: &str = "Resource not found.";

/// A message for the user, with the status that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub status: Option<u16>,
}

impl Notice {
    pub fn new(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    /// Classify an API failure into the notice shown to the user.
    ///
    /// Returns `None` for a lost session: the caller is sent back to the
    /// login view instead of being shown a message.
    pub fn for_error(err: &ApiError) -> Option<Self> {
        let status = err.status();
        let message = match err {
            ApiError::SessionExpired(_) | ApiError::NoRefreshToken => return None,
            ApiError::ServerError { .. } => SERVER_ERROR_MESSAGE.to_string(),
            ApiError::AccessDenied(_) => PERMISSION_MESSAGE.to_string(),
            ApiError::NotFound(_) => NOT_FOUND_MESSAGE.to_string(),
            ApiError::NetworkError(message) => message.clone(),
            other => match other.message() {
                Some(message) => message.to_string(),
                None => other.to_string(),
            },
        };
        Some(Self::new(message, status))
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        error!(status = ?notice.status, "{}", notice.message);
    }
}

/// Forwards notices to a receiver owned by the UI loop.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        if let Err(e) = self.tx.send(notice) {
            debug!(message = %e.0.message, "Notice dropped, receiver closed");
        }
    }
}
