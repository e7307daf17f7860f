//! Event vocabulary and dispatch
//!
//! The host runtime delivers lifecycle events (install, activate, fetch,
//! sync, periodicsync, push, notificationclick, error, unhandledrejection).
//! Instead of ambient global registration, the handler set is an explicit
//! dispatch table: `Dispatcher` is constructed once over an `OfflineProxy`
//! and maps each `EventKind` to its handler. Handlers never panic outward;
//! error events are logged and swallowed so future events keep flowing.
//!
//! `Host` is the seam for host-runtime side effects the proxy cannot perform
//! itself: skipping the install deferral, claiming page clients, opening
//! windows and showing notifications.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::fetch::WorkerRequest;
use crate::proxy::{FetchDecision, OfflineProxy};

/// Events consumed from the host runtime.
#[derive(Debug, Clone)]
pub enum EventKind {
    Install,
    Activate,
    Fetch(WorkerRequest),
    Sync { tag: String },
    PeriodicSync { tag: String },
    Push { payload: Option<String> },
    NotificationClick { action: String },
    Error { message: String },
    UnhandledRejection { message: String },
}

/// What handling an event produced. A handler future completing is the
/// lifetime-extension contract: the host must not reclaim the proxy while a
/// dispatch is in flight.
#[derive(Debug)]
pub enum EventOutcome {
    /// Handler ran to completion
    Completed,
    /// Handler ran and failed (already logged)
    Failed,
    /// Event carried a tag or action this proxy does not recognize
    Ignored,
    /// Fetch event resolution
    Response(FetchDecision),
}

/// A notification to display for a push event.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// Host-runtime side effects.
pub trait Host: Send + Sync {
    /// Skip the "wait for old pages to close" install deferral.
    fn skip_waiting(&self);
    /// Take over all currently open page clients without a reload.
    fn claim_clients(&self);
    /// Open or focus a window at the given URL.
    fn open_window(&self, url: &str);
    /// Display a notification.
    fn show_notification(&self, notification: &Notification);
}

/// No-op host, used where no page clients exist (e.g. the warm-up CLI).
pub struct NullHost;

impl Host for NullHost {
    fn skip_waiting(&self) {}
    fn claim_clients(&self) {}
    fn open_window(&self, _url: &str) {}
    fn show_notification(&self, _notification: &Notification) {}
}

/// Recorded host call, for assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    SkipWaiting,
    ClaimClients,
    OpenWindow(String),
    ShowNotification(Notification),
}

/// Host that records every call; the test double for `Host`.
#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    pub fn contains(&self, call: &HostCall) -> bool {
        self.calls.lock().iter().any(|c| c == call)
    }
}

impl Host for RecordingHost {
    fn skip_waiting(&self) {
        self.calls.lock().push(HostCall::SkipWaiting);
    }

    fn claim_clients(&self) {
        self.calls.lock().push(HostCall::ClaimClients);
    }

    fn open_window(&self, url: &str) {
        self.calls.lock().push(HostCall::OpenWindow(url.to_string()));
    }

    fn show_notification(&self, notification: &Notification) {
        self.calls
            .lock()
            .push(HostCall::ShowNotification(notification.clone()));
    }
}

/// The dispatch table, constructed once at startup.
pub struct Dispatcher {
    proxy: Arc<OfflineProxy>,
}

impl Dispatcher {
    pub fn new(proxy: Arc<OfflineProxy>) -> Self {
        Self { proxy }
    }

    pub fn proxy(&self) -> &Arc<OfflineProxy> {
        &self.proxy
    }

    /// Route one event to its handler.
    pub async fn dispatch(&self, event: EventKind) -> EventOutcome {
        match event {
            EventKind::Install => match self.proxy.lifecycle().install().await {
                Ok(()) => EventOutcome::Completed,
                Err(err) => {
                    tracing::error!(error = %err, "install failed");
                    EventOutcome::Failed
                }
            },
            EventKind::Activate => match self.proxy.lifecycle().activate().await {
                Ok(()) => EventOutcome::Completed,
                Err(err) => {
                    tracing::error!(error = %err, "activation failed");
                    EventOutcome::Failed
                }
            },
            EventKind::Fetch(request) => {
                EventOutcome::Response(self.proxy.handle_fetch(&request).await)
            }
            EventKind::Sync { tag } => match self.proxy.handle_sync(&tag).await {
                Some(_report) => EventOutcome::Completed,
                None => EventOutcome::Ignored,
            },
            EventKind::PeriodicSync { tag } => {
                if self.proxy.handle_periodic_sync(&tag).await {
                    EventOutcome::Completed
                } else {
                    EventOutcome::Ignored
                }
            }
            EventKind::Push { payload } => {
                self.proxy.handle_push(payload.as_deref());
                EventOutcome::Completed
            }
            EventKind::NotificationClick { action } => {
                self.proxy.handle_notification_click(&action);
                EventOutcome::Completed
            }
            EventKind::Error { message } => {
                tracing::error!(message = %message, "uncaught proxy error");
                EventOutcome::Completed
            }
            EventKind::UnhandledRejection { message } => {
                tracing::error!(message = %message, "unhandled rejection");
                EventOutcome::Completed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_host_records_in_order() {
        let host = RecordingHost::new();
        host.skip_waiting();
        host.claim_clients();
        host.open_window("https://site.example/");
        assert_eq!(
            host.calls(),
            vec![
                HostCall::SkipWaiting,
                HostCall::ClaimClients,
                HostCall::OpenWindow("https://site.example/".to_string()),
            ]
        );
    }

    #[test]
    fn test_null_host_is_silent() {
        let host = NullHost;
        host.skip_waiting();
        host.claim_clients();
        host.open_window("/");
    }
}
