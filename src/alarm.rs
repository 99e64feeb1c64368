// FallGuard — Alarm State Machine
//
//            trigger, cool-down over
//   Idle ─────────────────────────────► Alarming
//    ▲                                    │   │
//    │          cancel edge               │   │  countdown expired
//    ├──────────── Cancelled ◄────────────┘   │
//    │                                        │
//    └──────────── Notified  ◄────────────────┘
//
// Cancelled and Notified are pass-through states: their side effects run and
// the machine lands back in Idle within the same tick. Every deadline is a
// plain time comparison redone on each tick, so this never blocks.

use crate::clock::{Deadline, Timestamp};
use crate::config::{check_period, ALARM_LED_PERIOD_MS, BUZZER_PERIOD_MS, COUNTDOWN_MS, REARM_COOLDOWN_MS};
use crate::error::ConfigError;
use crate::events::{Transition, Trigger};
use crate::notify::{Notification, Notifier, NotifyPolicy};
use crate::pulse::PulsePhase;
use crate::signal::CancelSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Idle,
    Alarming,
    Cancelled,
    Notified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmTiming {
    /// Grace period between onset and escalation.
    pub countdown_ms: u32,
    /// Quiet time after a resolved alarm before a new one can start.
    pub rearm_cooldown_ms: u32,
    pub alarm_led_period_ms: u32,
    pub buzzer_period_ms: u32,
}

impl Default for AlarmTiming {
    fn default() -> Self {
        Self {
            countdown_ms: COUNTDOWN_MS,
            rearm_cooldown_ms: REARM_COOLDOWN_MS,
            alarm_led_period_ms: ALARM_LED_PERIOD_MS,
            buzzer_period_ms: BUZZER_PERIOD_MS,
        }
    }
}

impl AlarmTiming {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.countdown_ms == 0 {
            return Err(ConfigError::InvalidDuration { name: "countdown_ms", value: 0 });
        }
        check_period("alarm_led_period_ms", self.alarm_led_period_ms)?;
        check_period("buzzer_period_ms", self.buzzer_period_ms)
    }
}

/// Result of one `AlarmMachine::tick`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub transition: Option<Transition>,
    pub alarm_led: bool,
    pub buzzer: bool,
}

#[derive(Debug)]
pub struct AlarmMachine {
    timing: AlarmTiming,
    policy: NotifyPolicy,
    state: AlarmState,
    countdown: Option<Deadline>,
    cooldown: Option<Deadline>,
    cause: Option<Trigger>,
    alarm_led: PulsePhase,
    buzzer: PulsePhase,
}

impl AlarmMachine {
    pub fn new(timing: AlarmTiming, policy: NotifyPolicy, now: Timestamp) -> Self {
        Self {
            timing,
            policy,
            state: AlarmState::Idle,
            countdown: None,
            cooldown: None,
            cause: None,
            alarm_led: PulsePhase::new(timing.alarm_led_period_ms, now),
            buzzer: PulsePhase::new(timing.buzzer_period_ms, now),
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    /// Instant the current alarm started, if one is running.
    pub fn alarm_started_at(&self) -> Option<Timestamp> {
        self.countdown.map(|d| d.started_at)
    }

    pub fn cause(&self) -> Option<Trigger> {
        self.cause
    }

    /// True while a cool-down from the previous alarm is still running.
    pub fn is_cooling_down(&self, now: Timestamp) -> bool {
        self.cooldown.is_some_and(|d| !d.is_expired(now))
    }

    /// Advance the machine by one loop pass.
    ///
    /// `cancel` is consumed exactly once per call. An edge that arrives
    /// while no alarm is running is discarded so it cannot cancel a later
    /// one. A cancel and an expired countdown on the same tick resolve as a
    /// cancel.
    pub fn tick<N: Notifier>(
        &mut self,
        now: Timestamp,
        trigger: Option<Trigger>,
        cancel: &CancelSignal,
        notifier: &mut N,
    ) -> Tick {
        let cancelled = cancel.take();
        let mut transition = None;

        match self.state {
            AlarmState::Idle => {
                if cancelled {
                    log::debug!("Cancel edge while idle — ignored");
                }
                if self.cooldown.is_some_and(|d| d.is_expired(now)) {
                    self.cooldown = None;
                }
                if let Some(trigger) = trigger {
                    if self.is_cooling_down(now) {
                        log::debug!("{} trigger suppressed during rearm cool-down", trigger.label());
                    } else {
                        self.arm(now, trigger, notifier);
                        transition = Some(Transition::Armed(trigger));
                    }
                }
            }
            AlarmState::Alarming => {
                let expired = self.countdown.is_some_and(|d| d.is_expired(now));
                if cancelled {
                    self.resolve_cancelled(now, notifier);
                    transition = Some(Transition::Cancelled);
                } else if expired {
                    let submitted = self.resolve_notified(now, notifier);
                    transition = Some(Transition::Notified { submitted });
                } else if let Some(trigger) = trigger {
                    log::debug!("{} trigger absorbed, alarm already running", trigger.label());
                }
            }
            // Pass-through states never persist across ticks.
            AlarmState::Cancelled | AlarmState::Notified => self.state = AlarmState::Idle,
        }

        let (alarm_led, buzzer) = if self.state == AlarmState::Alarming {
            (self.alarm_led.tick(now), self.buzzer.tick(now))
        } else {
            (false, false)
        };

        Tick { transition, alarm_led, buzzer }
    }

    fn arm<N: Notifier>(&mut self, now: Timestamp, trigger: Trigger, notifier: &mut N) {
        match trigger {
            Trigger::Fall(sample) => log::info!(
                "ALARM: fall detected (g={:.2}, rot={:.1}) — {} ms to cancel",
                sample.accel_g,
                sample.rotation_dps,
                self.timing.countdown_ms
            ),
            Trigger::Sos => log::info!(
                "ALARM: SOS pressed — {} ms to cancel",
                self.timing.countdown_ms
            ),
        }

        self.state = AlarmState::Alarming;
        self.cause = Some(trigger);
        self.countdown = Some(Deadline::new(now, self.timing.countdown_ms));
        self.alarm_led.restart(now);
        self.buzzer.restart(now);

        if self.policy.notify_on_onset {
            submit(notifier, Notification::onset(&trigger));
        }
    }

    fn resolve_cancelled<N: Notifier>(&mut self, now: Timestamp, notifier: &mut N) {
        self.state = AlarmState::Cancelled;
        log::info!("Alarm cancelled by user");
        self.silence(now);
        if self.policy.notify_on_cancel {
            submit(notifier, Notification::cancelled());
        }
        self.finish(now);
    }

    fn resolve_notified<N: Notifier>(&mut self, now: Timestamp, notifier: &mut N) -> bool {
        self.state = AlarmState::Notified;
        let cause = self.cause.unwrap_or(Trigger::Sos);
        log::info!("Countdown expired — escalating {} alarm", cause.label());
        let submitted = submit(notifier, Notification::fall_alert(&cause, self.timing.countdown_ms));
        self.silence(now);
        self.finish(now);
        submitted
    }

    fn silence(&mut self, now: Timestamp) {
        self.alarm_led.stop(now);
        self.buzzer.stop(now);
    }

    fn finish(&mut self, now: Timestamp) {
        self.countdown = None;
        self.cause = None;
        self.cooldown = Some(Deadline::new(now, self.timing.rearm_cooldown_ms));
        self.state = AlarmState::Idle;
    }
}

/// Best effort: a failed hand-off is logged, never propagated.
fn submit<N: Notifier>(notifier: &mut N, notification: Notification) -> bool {
    let kind = notification.kind;
    match notifier.submit(notification) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Could not dispatch {:?} notification: {}", kind, e);
            false
        }
    }
}
