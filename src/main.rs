// FallGuard — Firmware Entry Point
//
// Boot sequence:
//   1. Load and validate settings (abort on a config error).
//   2. Bring up the IMU, battery ADC, LEDs, buzzer and buttons.
//   3. Spawn the notify task (owns Wi-Fi and the ntfy transport).
//   4. Spawn the monitor task (fixed-period sensor/alarm loop).
//
// All fall/alarm logic lives in the `fallguard` library; this binary only
// wires ESP-IDF drivers to its traits.

#[cfg(target_os = "espidf")]
mod drivers;
#[cfg(target_os = "espidf")]
mod input;
#[cfg(target_os = "espidf")]
mod tasks;

#[cfg(target_os = "espidf")]
pub use firmware::EspClock;

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("fallguard is ESP-IDF firmware; on the host run `cargo test --lib` instead")
}

#[cfg(target_os = "espidf")]
mod firmware {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use esp_idf_hal::gpio::{IOPin, OutputPin, PinDriver};
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver};
    use esp_idf_hal::prelude::*;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    use fallguard::config::*;
    use fallguard::{notify, CancelSignal, Clock, Monitor, Timestamp};

    use crate::drivers::battery::AdcBattery;
    use crate::drivers::imu::Mpu6050;
    use crate::drivers::ntfy::NtfyTransport;
    use crate::drivers::outputs::BoardOutputs;
    use crate::drivers::wifi::WifiLink;
    use crate::input::{CancelButton, SosButton};
    use crate::tasks;

    /// Milliseconds since boot from the ESP high-resolution timer
    /// (wraps at ~49 days — every comparison is wraparound safe).
    #[derive(Debug, Clone, Copy)]
    pub struct EspClock;

    impl Clock for EspClock {
        fn now_ms(&self) -> Timestamp {
            // SAFETY: esp_timer_get_time has no preconditions once the
            // scheduler is running.
            unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u32 }
        }
    }

    pub fn run() -> anyhow::Result<()> {
        // Link esp-idf-sys runtime patches and initialise logging.
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
        log::info!("FallGuard firmware starting…");

        // ---- Settings (fatal on error, before anything runs) ----------------
        let settings = Settings::from_build_env()?;
        log::info!(
            "Thresholds: {} g / {} dps, countdown {} ms, rearm {} ms",
            settings.thresholds.accel_threshold_g,
            settings.thresholds.rotation_threshold_dps,
            settings.alarm.countdown_ms,
            settings.alarm.rearm_cooldown_ms
        );
        if settings.network.wifi_ssid.is_empty() {
            log::warn!("FALLGUARD_WIFI_SSID not set — notifications will fail until it is");
        }

        // ---- Peripherals ----------------------------------------------------
        let peripherals = Peripherals::take()?;
        let sys_loop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        // I2C bus for the MPU6050.
        let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
        let i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio6, // SDA
            peripherals.pins.gpio7, // SCL
            &i2c_config,
        )?;
        let mut imu = Mpu6050::new(i2c);
        if !imu.is_connected() {
            log::error!("MPU6050 not responding at 0x{:02X}", I2C_ADDR_MPU6050);
        }
        imu.init()?;

        let battery = AdcBattery::new()?;

        // LEDs and buzzer.
        let alarm_led = PinDriver::output(peripherals.pins.gpio20.downgrade_output())?;
        let green_led = PinDriver::output(peripherals.pins.gpio8.downgrade_output())?;
        let red_led = PinDriver::output(peripherals.pins.gpio9.downgrade_output())?;
        let buzzer_timer = LedcTimerDriver::new(
            peripherals.ledc.timer0,
            &TimerConfig::new().frequency(2.kHz().into()),
        )?;
        let buzzer = LedcDriver::new(peripherals.ledc.channel0, buzzer_timer, peripherals.pins.gpio21)?;
        let mut outputs = BoardOutputs::new(alarm_led, green_led, red_led, buzzer);
        outputs.all_off();

        // Buttons. The cancel signal is shared between the ISR and the loop.
        let cancel = Arc::new(CancelSignal::new());
        let cancel_button = CancelButton::new(
            PinDriver::input(peripherals.pins.gpio4.downgrade())?,
            Arc::clone(&cancel),
        )?;
        let sos_button = SosButton::new(PinDriver::input(peripherals.pins.gpio5.downgrade())?)?;

        // ---- Notification queue + worker ------------------------------------
        let (notifier, notify_rx) = notify::queue();
        let network = settings.network.clone();
        let modem = peripherals.modem;
        thread::Builder::new()
            .name("notify".into())
            .stack_size(STACK_NOTIFY)
            .spawn(move || match WifiLink::new(modem, sys_loop, nvs, &network) {
                Ok(link) => tasks::notify::notify_task(notify_rx, NtfyTransport::new(link, &network)),
                // Dropping the receiver makes every submit fail fast with
                // WorkerStopped; the alarm keeps working locally.
                Err(e) => log::error!("Wi-Fi init failed, notifications disabled: {}", e),
            })?;

        // ---- Monitor loop ---------------------------------------------------
        let poll_period_ms = settings.poll_period_ms;
        let monitor = Monitor::new(&settings, imu, battery, outputs, notifier, EspClock.now_ms());
        thread::Builder::new()
            .name("monitor".into())
            .stack_size(STACK_MONITOR)
            .spawn(move || {
                tasks::monitor::monitor_task(monitor, cancel_button, sos_button, cancel, poll_period_ms);
            })?;

        log::info!("Boot complete — monitoring");

        // Main thread has nothing left to do — park it forever.
        // (All work happens in the spawned FreeRTOS tasks.)
        loop {
            thread::sleep(Duration::from_secs(60));
        }
    }
}
