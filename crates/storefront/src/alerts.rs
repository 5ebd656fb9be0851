//! Toast-style alerts.
//!
//! [`AlertCenter`] keeps the visible alerts and publishes the list on every
//! change. Expiry is driven by [`AlertCenter::prune_expired`] instead of
//! timers, so the caller decides when time passes.
//!
//! [`ResponseAlerts`] turns API outcomes into alerts: mutating requests
//! report success or failure, reads stay silent, and an identical message
//! repeated within the debounce window is dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Method;
use tokio::sync::watch;

use crate::api::ApiError;
use crate::clock::Clock;

/// Default lifetime of an alert.
pub const DEFAULT_DURATION: TimeDelta = TimeDelta::milliseconds(5000);

/// Default window for suppressing repeated messages.
pub const DEFAULT_DEBOUNCE: TimeDelta = TimeDelta::milliseconds(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Error,
    Info,
    Warning,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub id: String,
    pub kind: AlertKind,
    pub message: String,
    /// `None` for alerts that stay until removed.
    pub expires_at: Option<DateTime<Utc>>,
}

/// The list of visible alerts.
#[derive(Clone)]
pub struct AlertCenter {
    inner: Arc<AlertCenterInner>,
}

struct AlertCenterInner {
    clock: Arc<dyn Clock>,
    default_duration: TimeDelta,
    sequence: AtomicU64,
    alerts: watch::Sender<Vec<Alert>>,
}

impl fmt::Debug for AlertCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertCenter")
            .field("alerts", &*self.inner.alerts.borrow())
            .finish_non_exhaustive()
    }
}

impl AlertCenter {
    /// Create an empty center. A zero `default_duration` makes alerts sticky.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, default_duration: TimeDelta) -> Self {
        let (alerts, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(AlertCenterInner {
                clock,
                default_duration,
                sequence: AtomicU64::new(0),
                alerts,
            }),
        }
    }

    /// Current alerts, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Alert> {
        self.inner.alerts.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Alert>> {
        self.inner.alerts.subscribe()
    }

    /// Show an alert and return its id.
    ///
    /// `duration` overrides the default lifetime; zero (or negative) keeps
    /// the alert until it is removed.
    pub fn show(
        &self,
        kind: AlertKind,
        message: impl Into<String>,
        duration: Option<TimeDelta>,
    ) -> String {
        let now = self.inner.clock.now();
        let duration = duration.unwrap_or(self.inner.default_duration);
        let seq = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
        let alert = Alert {
            id: format!("{}-{seq}", now.timestamp_millis()),
            kind,
            message: message.into(),
            expires_at: (duration > TimeDelta::zero()).then(|| now + duration),
        };
        let id = alert.id.clone();
        self.inner.alerts.send_modify(|alerts| alerts.push(alert));
        id
    }

    pub fn success(&self, message: impl Into<String>) -> String {
        self.show(AlertKind::Success, message, None)
    }

    pub fn error(&self, message: impl Into<String>) -> String {
        self.show(AlertKind::Error, message, None)
    }

    pub fn info(&self, message: impl Into<String>) -> String {
        self.show(AlertKind::Info, message, None)
    }

    pub fn warning(&self, message: impl Into<String>) -> String {
        self.show(AlertKind::Warning, message, None)
    }

    /// Remove one alert. Unknown ids are ignored.
    pub fn remove(&self, id: &str) {
        self.inner.alerts.send_if_modified(|alerts| {
            let before = alerts.len();
            alerts.retain(|a| a.id != id);
            alerts.len() != before
        });
    }

    pub fn clear(&self) {
        self.inner.alerts.send_if_modified(|alerts| {
            let changed = !alerts.is_empty();
            alerts.clear();
            changed
        });
    }

    /// Drop every alert whose lifetime has run out; returns how many went.
    pub fn prune_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let mut removed = 0;
        self.inner.alerts.send_if_modified(|alerts| {
            let before = alerts.len();
            alerts.retain(|a| a.expires_at.is_none_or(|at| at > now));
            removed = before - alerts.len();
            removed > 0
        });
        removed
    }
}

/// Suppresses a message identical to the previous one when it arrives within
/// the window.
pub struct AlertDebouncer {
    clock: Arc<dyn Clock>,
    window: TimeDelta,
    last: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl AlertDebouncer {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, window: TimeDelta) -> Self {
        Self {
            clock,
            window,
            last: Mutex::new(None),
        }
    }

    /// Whether `message` should be shown. Admitted messages become the new
    /// reference point.
    pub fn admit(&self, message: &str) -> bool {
        let now = self.clock.now();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((previous, at)) = last.as_ref()
            && previous == message
            && now - *at <= self.window
        {
            return false;
        }
        *last = Some((message.to_owned(), now));
        true
    }

    /// Forget the previous message.
    pub fn reset(&self) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Pick the alert for a completed API request, if it deserves one.
///
/// Only `POST`, `PATCH` and `PUT` produce alerts, and never requests to the
/// login endpoint.
#[must_use]
pub fn alert_for_response(
    method: &Method,
    path: &str,
    outcome: Result<(), &ApiError>,
) -> Option<(AlertKind, String)> {
    let mutating = *method == Method::POST || *method == Method::PATCH || *method == Method::PUT;
    if !mutating || path.contains("/login") {
        return None;
    }

    let alert = match outcome {
        Ok(()) if *method == Method::POST => (AlertKind::Success, "Created successfully".to_owned()),
        Ok(()) => (AlertKind::Success, "Updated successfully".to_owned()),
        Err(e) => (AlertKind::Error, failure_message(e)),
    };
    Some(alert)
}

fn failure_message(error: &ApiError) -> String {
    if let Some(message) = error.backend_message() {
        return message.to_owned();
    }
    if let Some(message) = error.transport_message() {
        return message;
    }
    match error.status() {
        0 => "Network error. Please check your connection.",
        400..=499 => "Request failed. Please check your input.",
        500.. => "Server error. Please try again later.",
        _ => "Operation failed",
    }
    .to_owned()
}

/// Routes API outcomes into an [`AlertCenter`] through a debouncer.
pub struct ResponseAlerts {
    center: AlertCenter,
    debouncer: AlertDebouncer,
}

impl ResponseAlerts {
    #[must_use]
    pub const fn new(center: AlertCenter, debouncer: AlertDebouncer) -> Self {
        Self { center, debouncer }
    }

    #[must_use]
    pub const fn center(&self) -> &AlertCenter {
        &self.center
    }

    /// Record the outcome of a request.
    pub fn notify(&self, method: &Method, path: &str, outcome: Result<(), &ApiError>) {
        if let Some((kind, message)) = alert_for_response(method, path, outcome)
            && self.debouncer.admit(&message)
        {
            self.center.show(kind, message, None);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::ErrorResponse;
    use crate::clock::ManualClock;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::at_timestamp(1_700_000_000))
    }

    #[test]
    fn test_alerts_expire_after_duration() {
        let clock = clock();
        let center = AlertCenter::new(clock.clone(), DEFAULT_DURATION);
        center.success("saved");
        let sticky = center.show(AlertKind::Warning, "read me", Some(TimeDelta::zero()));

        clock.advance(TimeDelta::milliseconds(4999));
        assert_eq!(center.prune_expired(), 0);

        clock.advance(TimeDelta::milliseconds(1));
        assert_eq!(center.prune_expired(), 1);

        let remaining = center.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, sticky);
        assert_eq!(remaining[0].expires_at, None);
    }

    #[test]
    fn test_remove_and_clear() {
        let center = AlertCenter::new(clock(), DEFAULT_DURATION);
        let first = center.info("one");
        let second = center.error("two");
        assert_ne!(first, second);

        center.remove(&first);
        center.remove("unknown");
        assert_eq!(center.snapshot().len(), 1);

        let mut rx = center.subscribe();
        rx.borrow_and_update();
        center.clear();
        assert!(rx.has_changed().unwrap());
        assert!(center.snapshot().is_empty());
    }

    #[test]
    fn test_debouncer_suppresses_repeats_within_window() {
        let clock = clock();
        let debouncer = AlertDebouncer::new(clock.clone(), DEFAULT_DEBOUNCE);

        assert!(debouncer.admit("Created successfully"));
        clock.advance(TimeDelta::milliseconds(50));
        assert!(!debouncer.admit("Created successfully"));
        assert!(debouncer.admit("Updated successfully"));

        clock.advance(TimeDelta::milliseconds(101));
        assert!(debouncer.admit("Updated successfully"));

        debouncer.reset();
        assert!(debouncer.admit("Updated successfully"));
    }

    #[test]
    fn test_only_mutations_alert() {
        assert_eq!(alert_for_response(&Method::GET, "/api/product/page", Ok(())), None);
        assert_eq!(alert_for_response(&Method::DELETE, "/api/product/1", Ok(())), None);
        assert_eq!(alert_for_response(&Method::POST, "/api/login", Ok(())), None);
        assert_eq!(
            alert_for_response(&Method::POST, "/api/product", Ok(())),
            Some((AlertKind::Success, "Created successfully".into()))
        );
        assert_eq!(
            alert_for_response(&Method::PATCH, "/api/purchase-order/1", Ok(())),
            Some((AlertKind::Success, "Updated successfully".into()))
        );
    }

    #[test]
    fn test_failure_message_priority() {
        let message = |err: ApiError| alert_for_response(&Method::PUT, "/api/x", Err(&err)).unwrap().1;

        assert_eq!(
            message(ApiError::Status(ErrorResponse::with_message(400, "Name taken"))),
            "Name taken"
        );
        assert_eq!(
            message(ApiError::Status(ErrorResponse::parse(422, ""))),
            "Request failed. Please check your input."
        );
        assert_eq!(
            message(ApiError::Status(ErrorResponse::parse(503, ""))),
            "Server error. Please try again later."
        );
        assert_eq!(
            message(ApiError::Status(ErrorResponse::parse(0, ""))),
            "Network error. Please check your connection."
        );
        assert_eq!(
            message(ApiError::Status(ErrorResponse::parse(302, ""))),
            "Operation failed"
        );
    }

    #[test]
    fn test_response_alerts_debounce_duplicates() {
        let clock = clock();
        let alerts = ResponseAlerts::new(
            AlertCenter::new(clock.clone(), DEFAULT_DURATION),
            AlertDebouncer::new(clock, DEFAULT_DEBOUNCE),
        );
        alerts.notify(&Method::POST, "/api/category", Ok(()));
        alerts.notify(&Method::POST, "/api/category", Ok(()));
        assert_eq!(alerts.center().snapshot().len(), 1);
    }
}
