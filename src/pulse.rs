// FallGuard — Non-blocking Pulse Driver
//
// Square-wave toggling for LEDs and the buzzer. Each output owns its own
// `PulsePhase`, so several patterns can share the millisecond clock without
// disturbing each other. Nothing here sleeps: call `tick` every loop pass.

use crate::clock::{elapsed, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulsePhase {
    pub last_toggle: Timestamp,
    pub on: bool,
    pub period_ms: u32,
}

impl PulsePhase {
    /// A phase that starts in the off half at `now`.
    pub fn new(period_ms: u32, now: Timestamp) -> Self {
        Self { last_toggle: now, on: false, period_ms }
    }

    /// Begin a fresh pattern at `now`, starting in the on half.
    pub fn restart(&mut self, now: Timestamp) {
        self.last_toggle = now;
        self.on = true;
    }

    /// Force the output off; the next `restart` begins a new pattern.
    pub fn stop(&mut self, now: Timestamp) {
        self.last_toggle = now;
        self.on = false;
    }

    pub fn half_period(&self) -> u32 {
        self.period_ms / 2
    }

    pub fn tick(&mut self, now: Timestamp) -> bool {
        tick(self, now)
    }
}

/// Toggle `phase.on` once at least half a period has passed since the last
/// toggle. Returns the level after any toggle. The toggle instant becomes
/// `now`, so a coarse caller never sees two toggles inside one half-period.
pub fn tick(phase: &mut PulsePhase, now: Timestamp) -> bool {
    if elapsed(now, phase.last_toggle) >= phase.half_period() {
        phase.on = !phase.on;
        phase.last_toggle = now;
    }
    phase.on
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_on_the_half_period_boundary() {
        let mut phase = PulsePhase::new(1000, 0);
        let mut toggles = Vec::new();
        let mut level = phase.on;
        for step in 1..=20u32 {
            let now = step * 100;
            let next = phase.tick(now);
            if next != level {
                toggles.push(now);
            }
            level = next;
        }
        assert_eq!(toggles, vec![500, 1000, 1500, 2000]);
    }

    #[test]
    fn coarse_ticks_toggle_at_most_once_per_call() {
        let mut phase = PulsePhase::new(200, 0);
        // 350 ms late: still only a single toggle.
        assert!(phase.tick(450));
        assert_eq!(phase.last_toggle, 450);
        assert!(phase.tick(500));
        assert!(!phase.tick(550));
    }

    #[test]
    fn independent_phases_do_not_interfere() {
        let mut led = PulsePhase::new(1000, 0);
        let mut buzzer = PulsePhase::new(400, 0);
        led.restart(0);
        buzzer.restart(0);

        assert_eq!((led.tick(200), buzzer.tick(200)), (true, false));
        assert_eq!((led.tick(400), buzzer.tick(400)), (true, true));
        assert_eq!((led.tick(500), buzzer.tick(500)), (false, true));
        assert_eq!((led.tick(600), buzzer.tick(600)), (false, false));
    }

    #[test]
    fn stop_forces_off_and_restart_begins_on() {
        let mut phase = PulsePhase::new(1000, 0);
        phase.restart(100);
        assert!(phase.tick(300));
        phase.stop(300);
        assert!(!phase.on);
        phase.restart(5_000);
        assert!(phase.tick(5_499));
        assert!(!phase.tick(5_500));
    }

    #[test]
    fn wraps_with_the_clock() {
        let mut phase = PulsePhase::new(1000, u32::MAX - 200);
        assert!(!phase.tick(100));
        assert!(phase.tick(299));
    }
}
