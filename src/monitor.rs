// FallGuard — Main Loop Orchestration
//
// One `Monitor::tick` is one pass of the fixed-period loop:
//   1. read a motion sample and classify it (skipped on a failed read),
//   2. feed the trigger and the cancel edge to the alarm machine,
//   3. refresh the battery reading when due,
//   4. drive alarm and status outputs.
// The caller sleeps for whatever is left of the period.

use crate::alarm::{AlarmMachine, Tick};
use crate::battery::{BatteryProvider, BatteryReading, BatteryThresholds, StatusIndicator};
use crate::classifier::{classify, Thresholds};
use crate::clock::{Deadline, Timestamp};
use crate::config::Settings;
use crate::error::SensorError;
use crate::events::{OutputId, Trigger};
use crate::motion::MotionSample;
use crate::notify::Notifier;
use crate::pulse::PulsePhase;
use crate::signal::CancelSignal;

/// Calibrated motion source.
pub trait MotionSensor {
    fn read_motion(&mut self) -> Result<MotionSample, SensorError>;
}

/// GPIO / PWM sink. Implementations log their own driver errors.
pub trait OutputPort {
    fn set_output(&mut self, id: OutputId, on: bool);
}

pub struct Monitor<S, B, O, N> {
    sensor: S,
    battery: B,
    outputs: O,
    notifier: N,
    machine: AlarmMachine,
    thresholds: Thresholds,
    battery_thresholds: BatteryThresholds,
    battery_check_interval_ms: u32,
    battery_due: Option<Deadline>,
    last_battery: Option<BatteryReading>,
    status: StatusIndicator,
    status_phase: PulsePhase,
    written: [Option<bool>; 4],
}

impl<S, B, O, N> Monitor<S, B, O, N>
where
    S: MotionSensor,
    B: BatteryProvider,
    O: OutputPort,
    N: Notifier,
{
    pub fn new(settings: &Settings, sensor: S, battery: B, outputs: O, notifier: N, now: Timestamp) -> Self {
        Self {
            sensor,
            battery,
            outputs,
            notifier,
            machine: AlarmMachine::new(settings.alarm, settings.notify, now),
            thresholds: settings.thresholds,
            battery_thresholds: settings.battery,
            battery_check_interval_ms: settings.battery_check_interval_ms,
            battery_due: None,
            last_battery: None,
            status: StatusIndicator::Normal,
            status_phase: PulsePhase::new(settings.status_blink_period_ms, now),
            written: [None; 4],
        }
    }

    pub fn machine(&self) -> &AlarmMachine {
        &self.machine
    }

    pub fn status(&self) -> StatusIndicator {
        self.status
    }

    pub fn tick(&mut self, now: Timestamp, sos_pressed: bool, cancel: &CancelSignal) -> Tick {
        let trigger = self.poll_trigger(sos_pressed);
        let tick = self.machine.tick(now, trigger, cancel, &mut self.notifier);

        self.refresh_battery(now);
        let (green, red) = self.status_levels(now);

        self.write(OutputId::AlarmLed, tick.alarm_led);
        self.write(OutputId::Buzzer, tick.buzzer);
        self.write(OutputId::StatusGreen, green);
        self.write(OutputId::StatusRed, red);

        tick
    }

    fn poll_trigger(&mut self, sos_pressed: bool) -> Option<Trigger> {
        let fall = match self.sensor.read_motion() {
            Ok(sample) => {
                log::debug!("g_force={:.2} g | rotation={:.1} dps", sample.accel_g, sample.rotation_dps);
                classify(&sample, &self.thresholds).then_some(Trigger::Fall(sample))
            }
            Err(e) => {
                log::warn!("IMU read error, skipping classification: {}", e);
                None
            }
        };
        fall.or(sos_pressed.then_some(Trigger::Sos))
    }

    fn refresh_battery(&mut self, now: Timestamp) {
        if self.battery_due.is_some_and(|d| !d.is_expired(now)) {
            return;
        }
        self.battery_due = Some(Deadline::new(now, self.battery_check_interval_ms));

        match self.battery.read_battery() {
            Ok(reading) => {
                if self.last_battery != Some(reading) {
                    log::info!("Battery {}%{}", reading.level_pct, if reading.charging { " (charging)" } else { "" });
                }
                self.last_battery = Some(reading);
            }
            Err(e) => log::warn!("Battery read failed, keeping last reading: {}", e),
        }

        let status = StatusIndicator::for_reading(self.last_battery, &self.battery_thresholds);
        if status != self.status {
            log::debug!("Status indicator {:?} -> {:?}", self.status, status);
            if status.blinks() {
                self.status_phase.restart(now);
            } else {
                self.status_phase.stop(now);
            }
            self.status = status;
        }
    }

    /// (green, red) for the current battery status.
    fn status_levels(&mut self, now: Timestamp) -> (bool, bool) {
        match self.status {
            StatusIndicator::Low => (false, true),
            StatusIndicator::Charging | StatusIndicator::Full => (true, false),
            StatusIndicator::Normal => (self.status_phase.tick(now), false),
        }
    }

    fn write(&mut self, id: OutputId, on: bool) {
        let slot = &mut self.written[id.index()];
        if *slot != Some(on) {
            *slot = Some(on);
            self.outputs.set_output(id, on);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmState;
    use crate::error::TransportError;
    use crate::events::Transition;
    use crate::notify::{Notification, NotificationKind};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    struct ScriptedSensor {
        script: VecDeque<Result<MotionSample, SensorError>>,
    }

    impl ScriptedSensor {
        fn resting() -> Self {
            Self { script: VecDeque::new() }
        }

        fn then(mut self, reading: Result<MotionSample, SensorError>) -> Self {
            self.script.push_back(reading);
            self
        }
    }

    impl MotionSensor for ScriptedSensor {
        fn read_motion(&mut self) -> Result<MotionSample, SensorError> {
            self.script.pop_front().unwrap_or(Ok(MotionSample::new(1.0, 2.0)))
        }
    }

    struct FixedBattery {
        reading: Result<BatteryReading, SensorError>,
        reads: Rc<RefCell<u32>>,
    }

    impl BatteryProvider for FixedBattery {
        fn read_battery(&mut self) -> Result<BatteryReading, SensorError> {
            *self.reads.borrow_mut() += 1;
            self.reading.clone()
        }
    }

    #[derive(Clone, Default)]
    struct Pins {
        writes: Rc<RefCell<Vec<(OutputId, bool)>>>,
    }

    impl Pins {
        fn last(&self, id: OutputId) -> Option<bool> {
            self.writes.borrow().iter().rev().find(|(i, _)| *i == id).map(|(_, on)| *on)
        }

        fn count(&self, id: OutputId) -> usize {
            self.writes.borrow().iter().filter(|(i, _)| *i == id).count()
        }
    }

    impl OutputPort for Pins {
        fn set_output(&mut self, id: OutputId, on: bool) {
            self.writes.borrow_mut().push((id, on));
        }
    }

    #[derive(Clone, Default)]
    struct Outbox {
        sent: Rc<RefCell<Vec<Notification>>>,
    }

    impl Notifier for Outbox {
        fn submit(&mut self, notification: Notification) -> Result<(), TransportError> {
            self.sent.borrow_mut().push(notification);
            Ok(())
        }
    }

    fn battery(level_pct: u8, charging: bool) -> FixedBattery {
        FixedBattery {
            reading: Ok(BatteryReading { level_pct, charging }),
            reads: Rc::default(),
        }
    }

    const FALL: MotionSample = MotionSample { accel_g: 5.2, rotation_dps: 260.0 };

    #[test]
    fn fall_scenario_escalates_once_then_idles() {
        let pins = Pins::default();
        let outbox = Outbox::default();
        let sensor = ScriptedSensor::resting().then(Ok(FALL));
        let mut monitor =
            Monitor::new(&Settings::default(), sensor, battery(50, false), pins.clone(), outbox.clone(), 0);
        let cancel = CancelSignal::new();

        let tick = monitor.tick(100, false, &cancel);
        assert!(matches!(tick.transition, Some(Transition::Armed(Trigger::Fall(_)))));
        assert_eq!(pins.last(OutputId::AlarmLed), Some(true));
        assert_eq!(pins.last(OutputId::Buzzer), Some(true));

        let mut escalations = 0;
        for now in (200..=12_000).step_by(100) {
            if let Some(Transition::Notified { .. }) = monitor.tick(now, false, &cancel).transition {
                escalations += 1;
                assert_eq!(now, 10_100);
            }
        }
        assert_eq!(escalations, 1);
        let sent = outbox.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::FallAlert);
        assert_eq!(monitor.machine().state(), AlarmState::Idle);
        assert_eq!(pins.last(OutputId::AlarmLed), Some(false));
        assert_eq!(pins.last(OutputId::Buzzer), Some(false));
    }

    #[test]
    fn cancel_at_three_seconds_sends_only_the_cancel_notice() {
        let outbox = Outbox::default();
        let sensor = ScriptedSensor::resting().then(Ok(FALL));
        let mut monitor =
            Monitor::new(&Settings::default(), sensor, battery(50, false), Pins::default(), outbox.clone(), 0);
        let cancel = CancelSignal::new();

        monitor.tick(0, false, &cancel);
        for now in (100..3_000).step_by(100) {
            monitor.tick(now, false, &cancel);
        }
        cancel.raise();
        assert_eq!(monitor.tick(3_000, false, &cancel).transition, Some(Transition::Cancelled));
        for now in (3_100..=15_000).step_by(100) {
            monitor.tick(now, false, &cancel);
        }

        let kinds: Vec<_> = outbox.sent.borrow().iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Cancelled]);
        assert_eq!(monitor.machine().state(), AlarmState::Idle);
    }

    #[test]
    fn sensor_error_skips_classification_but_sos_still_arms() {
        let sensor = ScriptedSensor::resting()
            .then(Err(SensorError::Bus("nack".into())))
            .then(Err(SensorError::Stale));
        let mut monitor =
            Monitor::new(&Settings::default(), sensor, battery(50, false), Pins::default(), Outbox::default(), 0);
        let cancel = CancelSignal::new();

        assert_eq!(monitor.tick(0, false, &cancel).transition, None);
        let tick = monitor.tick(100, true, &cancel);
        assert_eq!(tick.transition, Some(Transition::Armed(Trigger::Sos)));
    }

    #[test]
    fn countdown_keeps_running_through_sensor_errors() {
        let mut sensor = ScriptedSensor::resting().then(Ok(FALL));
        for _ in 0..200 {
            sensor = sensor.then(Err(SensorError::Stale));
        }
        let outbox = Outbox::default();
        let mut monitor =
            Monitor::new(&Settings::default(), sensor, battery(50, false), Pins::default(), outbox.clone(), 0);
        let cancel = CancelSignal::new();

        monitor.tick(0, false, &cancel);
        for now in (100..=10_000).step_by(100) {
            monitor.tick(now, false, &cancel);
        }
        assert_eq!(outbox.sent.borrow().len(), 1);
    }

    #[test]
    fn fall_takes_precedence_over_sos_as_cause() {
        let sensor = ScriptedSensor::resting().then(Ok(FALL));
        let mut monitor =
            Monitor::new(&Settings::default(), sensor, battery(50, false), Pins::default(), Outbox::default(), 0);
        let tick = monitor.tick(0, true, &CancelSignal::new());
        assert!(matches!(tick.transition, Some(Transition::Armed(Trigger::Fall(_)))));
    }

    #[test]
    fn outputs_are_only_written_on_change() {
        let pins = Pins::default();
        let mut monitor =
            Monitor::new(&Settings::default(), ScriptedSensor::resting(), battery(95, false), pins.clone(), Outbox::default(), 0);
        let cancel = CancelSignal::new();
        for now in (0..5_000).step_by(100) {
            monitor.tick(now, false, &cancel);
        }
        assert_eq!(monitor.status(), StatusIndicator::Full);
        assert_eq!(pins.count(OutputId::StatusGreen), 1);
        assert_eq!(pins.count(OutputId::AlarmLed), 1);
        assert_eq!(pins.last(OutputId::StatusGreen), Some(true));
        assert_eq!(pins.last(OutputId::StatusRed), Some(false));
    }

    #[test]
    fn normal_battery_blinks_green_at_the_status_period() {
        let pins = Pins::default();
        let mut monitor =
            Monitor::new(&Settings::default(), ScriptedSensor::resting(), battery(50, false), pins.clone(), Outbox::default(), 0);
        let cancel = CancelSignal::new();
        for now in (0..=4_000).step_by(100) {
            monitor.tick(now, false, &cancel);
        }
        let green: Vec<bool> = pins
            .writes
            .borrow()
            .iter()
            .filter(|(id, _)| *id == OutputId::StatusGreen)
            .map(|(_, on)| *on)
            .collect();
        // Starts off, then toggles every 1 s across 4 s.
        assert_eq!(green, vec![false, true, false, true, false]);
    }

    #[test]
    fn low_battery_lights_red_and_status_is_independent_of_alarm() {
        let pins = Pins::default();
        let sensor = ScriptedSensor::resting().then(Ok(FALL));
        let mut monitor =
            Monitor::new(&Settings::default(), sensor, battery(10, true), pins.clone(), Outbox::default(), 0);
        monitor.tick(0, false, &CancelSignal::new());
        assert_eq!(monitor.status(), StatusIndicator::Low);
        assert_eq!(pins.last(OutputId::StatusRed), Some(true));
        assert_eq!(pins.last(OutputId::StatusGreen), Some(false));
        assert_eq!(monitor.machine().state(), AlarmState::Alarming);
    }

    #[test]
    fn battery_is_sampled_on_its_own_interval() {
        let provider = battery(50, false);
        let reads = Rc::clone(&provider.reads);
        let mut monitor =
            Monitor::new(&Settings::default(), ScriptedSensor::resting(), provider, Pins::default(), Outbox::default(), 0);
        let cancel = CancelSignal::new();
        for now in (0..25_000).step_by(100) {
            monitor.tick(now, false, &cancel);
        }
        assert_eq!(*reads.borrow(), 3); // t = 0, 10 s, 20 s
    }

    #[test]
    fn failed_battery_read_keeps_previous_status() {
        let provider = FixedBattery {
            reading: Err(SensorError::Bus("adc".into())),
            reads: Rc::default(),
        };
        let mut monitor =
            Monitor::new(&Settings::default(), ScriptedSensor::resting(), provider, Pins::default(), Outbox::default(), 0);
        monitor.tick(0, false, &CancelSignal::new());
        assert_eq!(monitor.status(), StatusIndicator::Normal);
    }
}
