// FallGuard — Notification Dispatcher
//
// The alarm machine only ever *submits* a notification; it never waits for
// delivery. On the device the submission goes into a bounded queue drained
// by a worker thread that owns the network link, so a slow or dead uplink
// costs the polling loop nothing.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use crate::config::NOTIFY_QUEUE_DEPTH;
use crate::error::TransportError;
use crate::events::Trigger;

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Alarm just started (only with `NotifyPolicy::notify_on_onset`).
    Onset,
    /// Grace period lapsed without a cancel.
    FallAlert,
    /// The user cancelled during the grace period.
    Cancelled,
}

impl NotificationKind {
    /// Value of the ntfy `Priority` header.
    pub fn priority(&self) -> &'static str {
        match self {
            Self::Onset => "high",
            Self::FallAlert => "urgent",
            Self::Cancelled => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn onset(cause: &Trigger) -> Self {
        let body = match cause {
            Trigger::Fall(sample) => format!(
                "Possible fall ({:.2} g, {:.1} deg/s). Waiting for the user to respond.",
                sample.accel_g, sample.rotation_dps
            ),
            Trigger::Sos => "SOS button pressed. Waiting for the user to respond.".to_string(),
        };
        Self { kind: NotificationKind::Onset, title: "Fall detected".to_string(), body }
    }

    pub fn fall_alert(cause: &Trigger, countdown_ms: u32) -> Self {
        let seconds = countdown_ms / 1000;
        let (title, body) = match cause {
            Trigger::Fall(sample) => (
                "FALL ALERT",
                format!(
                    "Fall detected ({:.2} g, {:.1} deg/s) and not cancelled within {} s.",
                    sample.accel_g, sample.rotation_dps, seconds
                ),
            ),
            Trigger::Sos => (
                "SOS ALERT",
                format!("SOS button pressed and not cancelled within {} s.", seconds),
            ),
        };
        Self { kind: NotificationKind::FallAlert, title: title.to_string(), body }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: NotificationKind::Cancelled,
            title: "Alarm cancelled".to_string(),
            body: "User confirmed they are OK".to_string(),
        }
    }
}

/// Which optional notifications to send besides the escalation alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyPolicy {
    pub notify_on_onset: bool,
    pub notify_on_cancel: bool,
}

impl Default for NotifyPolicy {
    fn default() -> Self {
        Self { notify_on_onset: false, notify_on_cancel: true }
    }
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Non-blocking hand-off used by the alarm machine.
pub trait Notifier {
    fn submit(&mut self, notification: Notification) -> Result<(), TransportError>;
}

/// Blocking, timeout-bounded delivery used by the worker.
pub trait Transport {
    fn post_alert(&mut self, notification: &Notification) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// Queue between the loop and the worker
// ---------------------------------------------------------------------------
pub struct QueuedNotifier {
    tx: SyncSender<Notification>,
}

impl QueuedNotifier {
    pub fn new(tx: SyncSender<Notification>) -> Self {
        Self { tx }
    }
}

impl Notifier for QueuedNotifier {
    fn submit(&mut self, notification: Notification) -> Result<(), TransportError> {
        self.tx.try_send(notification).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::QueueFull,
            TrySendError::Disconnected(_) => TransportError::WorkerStopped,
        })
    }
}

/// Bounded dispatch queue with the default depth.
pub fn queue() -> (QueuedNotifier, Receiver<Notification>) {
    queue_with_depth(NOTIFY_QUEUE_DEPTH)
}

pub fn queue_with_depth(depth: usize) -> (QueuedNotifier, Receiver<Notification>) {
    let (tx, rx) = mpsc::sync_channel(depth);
    (QueuedNotifier::new(tx), rx)
}

/// Deliver every queued notification until all senders are dropped.
/// Failures are logged and the worker moves on to the next message.
pub fn run_worker<T: Transport>(rx: Receiver<Notification>, mut transport: T) {
    for notification in rx {
        match transport.post_alert(&notification) {
            Ok(()) => log::info!("Notification sent: {}", notification.title),
            Err(e) => log::warn!("Notification {:?} not delivered: {}", notification.kind, e),
        }
    }
    log::warn!("Notification queue closed — exiting notify worker");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::MotionSample;

    struct FlakyTransport {
        sent: Vec<Notification>,
        fail_first: usize,
    }

    impl Transport for FlakyTransport {
        fn post_alert(&mut self, notification: &Notification) -> Result<(), TransportError> {
            if self.fail_first > 0 {
                self.fail_first -= 1;
                return Err(TransportError::NotConnected);
            }
            self.sent.push(notification.clone());
            Ok(())
        }
    }

    impl Transport for &mut FlakyTransport {
        fn post_alert(&mut self, notification: &Notification) -> Result<(), TransportError> {
            (**self).post_alert(notification)
        }
    }

    #[test]
    fn fall_alert_carries_the_measurement() {
        let alert = Notification::fall_alert(&Trigger::Fall(MotionSample::new(5.2, 260.0)), 10_000);
        assert_eq!(alert.kind, NotificationKind::FallAlert);
        assert_eq!(alert.title, "FALL ALERT");
        assert!(alert.body.contains("5.20 g"));
        assert!(alert.body.contains("260.0 deg/s"));
        assert!(alert.body.contains("10 s"));
        assert_eq!(alert.kind.priority(), "urgent");
    }

    #[test]
    fn sos_alert_has_its_own_title() {
        let alert = Notification::fall_alert(&Trigger::Sos, 5_000);
        assert_eq!(alert.title, "SOS ALERT");
    }

    #[test]
    fn full_queue_reports_queue_full() {
        let (mut notifier, _rx) = queue_with_depth(1);
        assert!(notifier.submit(Notification::cancelled()).is_ok());
        assert_eq!(
            notifier.submit(Notification::cancelled()),
            Err(TransportError::QueueFull)
        );
    }

    #[test]
    fn dropped_worker_reports_stopped() {
        let (mut notifier, rx) = queue_with_depth(1);
        drop(rx);
        assert_eq!(
            notifier.submit(Notification::cancelled()),
            Err(TransportError::WorkerStopped)
        );
    }

    #[test]
    fn worker_keeps_going_after_a_failed_post() {
        let (mut notifier, rx) = queue_with_depth(4);
        notifier.submit(Notification::cancelled()).unwrap();
        notifier.submit(Notification::fall_alert(&Trigger::Sos, 10_000)).unwrap();
        drop(notifier);

        let mut transport = FlakyTransport { sent: Vec::new(), fail_first: 1 };
        run_worker(rx, &mut transport);

        assert_eq!(transport.sent.len(), 1);
        assert_eq!(transport.sent[0].kind, NotificationKind::FallAlert);
    }
}
