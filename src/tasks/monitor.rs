// FallGuard — Monitor Task
//
// Fixed-period polling loop: one `Monitor::tick` every POLL_PERIOD_MS, then
// sleep for the rest of the period.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fallguard::clock::period_remaining;
use fallguard::events::Transition;
use fallguard::notify::QueuedNotifier;
use fallguard::{CancelSignal, Clock, Monitor};

use crate::drivers::battery::AdcBattery;
use crate::drivers::imu::Mpu6050;
use crate::drivers::outputs::BoardOutputs;
use crate::input::{CancelButton, SosButton};
use crate::EspClock;

pub type BoardMonitor = Monitor<Mpu6050, AdcBattery, BoardOutputs, QueuedNotifier>;

pub fn monitor_task(
    mut monitor: BoardMonitor,
    mut cancel_button: CancelButton,
    mut sos_button: SosButton,
    cancel: Arc<CancelSignal>,
    poll_period_ms: u32,
) {
    log::info!("Monitor task started ({} ms period)", poll_period_ms);
    let clock = EspClock;

    loop {
        let tick_start = clock.now_ms();

        let sos = sos_button.is_pressed();
        let tick = monitor.tick(tick_start, sos, &cancel);
        cancel_button.rearm();

        if let Some(Transition::Notified { submitted: false }) = tick.transition {
            log::error!("Fall alert could not be queued — alarm resolved locally only");
        }

        // Sleep for the remainder of the period to keep a steady cadence.
        let remaining = period_remaining(tick_start, clock.now_ms(), poll_period_ms);
        if remaining > 0 {
            thread::sleep(Duration::from_millis(remaining as u64));
        }
    }
}
