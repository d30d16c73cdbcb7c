//! Transient operator notifications.
//!
//! Components report outcomes through the [`Notifier`] port. Over HTTP the
//! notifications raised while handling a request are buffered in a
//! [`NotificationQueue`] and delivered in the `HX-Trigger` response header,
//! where `static/admin.js` turns them into timed toasts.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::http::HeaderValue;
use serde::Serialize;

/// How long success notifications stay on screen.
pub const SUCCESS_DURATION: Duration = Duration::from_millis(2000);

/// How long error notifications stay on screen.
pub const ERROR_DURATION: Duration = Duration::from_millis(6000);

/// Name of the client-side event carrying notifications.
pub const NOTIFY_EVENT: &str = "notify";

/// Fire-and-forget sink for operator notifications.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str, duration: Duration);
    fn error(&self, message: &str, duration: Duration);
}

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
}

/// A single toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub duration_ms: u64,
}

impl Notification {
    fn new(kind: NotificationKind, message: &str, duration: Duration) -> Self {
        Self {
            kind,
            message: message.to_string(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Per-request buffer of notifications.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    pending: Mutex<Vec<Notification>>,
}

impl NotificationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, notification: Notification) {
        self.pending().push(notification);
    }

    /// Notifications raised so far, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.pending().clone()
    }

    /// Take every buffered notification.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.pending())
    }

    /// Drain the queue into an `HX-Trigger` header value.
    ///
    /// Returns `None` when nothing was raised. Non-ASCII characters are
    /// escaped because header values must be visible ASCII.
    pub fn take_hx_trigger(&self) -> Option<HeaderValue> {
        let notifications = self.drain();
        if notifications.is_empty() {
            return None;
        }

        let mut payload = serde_json::Map::new();
        payload.insert(NOTIFY_EVENT.to_string(), serde_json::json!(notifications));
        let json = match serde_json::to_string(&payload) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize notifications");
                return None;
            }
        };

        HeaderValue::from_str(&escape_non_ascii(&json))
            .map_err(|e| tracing::error!(error = %e, "Notification header rejected"))
            .ok()
    }
}

impl Notifier for NotificationQueue {
    fn success(&self, message: &str, duration: Duration) {
        tracing::debug!(message, "Success notification");
        self.push(Notification::new(NotificationKind::Success, message, duration));
    }

    fn error(&self, message: &str, duration: Duration) {
        tracing::debug!(message, "Error notification");
        self.push(Notification::new(NotificationKind::Error, message, duration));
    }
}

/// Replace every non-ASCII character of a JSON document with `\uXXXX` escapes.
fn escape_non_ascii(json: &str) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{unit:04x}");
            }
        }
    }
    out
}
