// FallGuard — Hardware & System Configuration
// Target: Seeed Studio Xiao ESP32-C3 (RISC-V)

use crate::alarm::AlarmTiming;
use crate::battery::BatteryThresholds;
use crate::classifier::Thresholds;
use crate::error::ConfigError;
use crate::notify::NotifyPolicy;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (Xiao ESP32-C3 pinout)
// ---------------------------------------------------------------------------
pub const PIN_BATTERY_ADC: i32 = 2;  // D0/A0 — Battery voltage (ADC1 ch2)
pub const PIN_CHARGE_ADC: i32 = 3;   // D1/A1 — Charger sense (ADC1 ch3)
pub const PIN_BTN_CANCEL: i32 = 4;   // D2    — Cancel button (pull-up, active LOW, IRQ)
pub const PIN_BTN_SOS: i32 = 5;      // D3    — SOS button (pull-up, active LOW, polled)
pub const PIN_I2C_SDA: i32 = 6;      // D4    — I2C data line
pub const PIN_I2C_SCL: i32 = 7;      // D5    — I2C clock line
pub const PIN_LED_GREEN: i32 = 8;    // D8    — Status OK / charging
pub const PIN_LED_RED: i32 = 9;      // D9    — Battery low
pub const PIN_LED_ALARM: i32 = 20;   // D7    — Alarm LED (blue)
pub const PIN_BUZZER: i32 = 21;      // D6    — Buzzer (LEDC PWM)

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_MPU6050: u8 = 0x68;
pub const I2C_BAUDRATE_KHZ: u32 = 400;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_MONITOR: usize = 8192;
pub const STACK_NOTIFY: usize = 12288; // TLS handshake lives here

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const POLL_PERIOD_MS: u32 = 100;                 // 10 Hz main loop
pub const COUNTDOWN_MS: u32 = 10_000;                // grace period before escalation
pub const REARM_COOLDOWN_MS: u32 = 5_000;            // quiet time after an alarm resolves
pub const ALARM_LED_PERIOD_MS: u32 = 1_000;
pub const BUZZER_PERIOD_MS: u32 = 1_000;
pub const STATUS_BLINK_PERIOD_MS: u32 = 2_000;       // idle-and-not-charging blink
pub const BATTERY_CHECK_INTERVAL_MS: u32 = 10_000;
pub const WIFI_CONNECT_TIMEOUT_MS: u32 = 10_000;
pub const HTTP_TIMEOUT_MS: u32 = 5_000;

// ---------------------------------------------------------------------------
// Fall detection
// ---------------------------------------------------------------------------
pub const FALL_ACCEL_THRESHOLD_G: f64 = 5.0;
pub const FALL_ROTATION_THRESHOLD_DPS: f64 = 250.0;

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------
pub const BATTERY_LOW_PCT: u8 = 25;
pub const BATTERY_HIGH_PCT: u8 = 85;
pub const BATTERY_EMPTY_V: f32 = 3.3;
pub const BATTERY_FULL_V: f32 = 4.2;
pub const BATTERY_DIVIDER: f32 = 2.0;                // 1:2 resistor divider
pub const CHARGE_SENSE_RAW_THRESHOLD: i32 = 1000;    // raw 12-bit ADC counts

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------
pub const NTFY_URL: &str = "https://ntfy.sh/fallguard";
pub const NOTIFY_QUEUE_DEPTH: usize = 4;

// ---------------------------------------------------------------------------
// MPU6050 Sensor Scale Factors
// ---------------------------------------------------------------------------
pub const ACCEL_SCALE_16G: f32 = 2048.0;  // LSB/g  at ±16 g
pub const GYRO_SCALE_500: f32 = 65.5;     // LSB/°/s at ±500 °/s

// ---------------------------------------------------------------------------
// Runtime settings (defaults above, overridable at build time)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub ntfy_url: String,
    pub connect_timeout_ms: u32,
    pub request_timeout_ms: u32,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            ntfy_url: NTFY_URL.to_string(),
            connect_timeout_ms: WIFI_CONNECT_TIMEOUT_MS,
            request_timeout_ms: HTTP_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub thresholds: Thresholds,
    pub alarm: AlarmTiming,
    pub notify: NotifyPolicy,
    pub battery: BatteryThresholds,
    pub poll_period_ms: u32,
    pub status_blink_period_ms: u32,
    pub battery_check_interval_ms: u32,
    pub network: NetworkSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds {
                accel_threshold_g: FALL_ACCEL_THRESHOLD_G,
                rotation_threshold_dps: FALL_ROTATION_THRESHOLD_DPS,
            },
            alarm: AlarmTiming::default(),
            notify: NotifyPolicy::default(),
            battery: BatteryThresholds {
                low_pct: BATTERY_LOW_PCT,
                high_pct: BATTERY_HIGH_PCT,
            },
            poll_period_ms: POLL_PERIOD_MS,
            status_blink_period_ms: STATUS_BLINK_PERIOD_MS,
            battery_check_interval_ms: BATTERY_CHECK_INTERVAL_MS,
            network: NetworkSettings::default(),
        }
    }
}

impl Settings {
    /// Defaults overlaid with whatever `FALLGUARD_*` variables were set when
    /// the firmware was compiled, then validated.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        let overrides = [
            ("FALLGUARD_ACCEL_THRESHOLD_G", option_env!("FALLGUARD_ACCEL_THRESHOLD_G")),
            ("FALLGUARD_ROTATION_THRESHOLD_DPS", option_env!("FALLGUARD_ROTATION_THRESHOLD_DPS")),
            ("FALLGUARD_COUNTDOWN_MS", option_env!("FALLGUARD_COUNTDOWN_MS")),
            ("FALLGUARD_REARM_COOLDOWN_MS", option_env!("FALLGUARD_REARM_COOLDOWN_MS")),
            ("FALLGUARD_BATTERY_LOW_PCT", option_env!("FALLGUARD_BATTERY_LOW_PCT")),
            ("FALLGUARD_BATTERY_HIGH_PCT", option_env!("FALLGUARD_BATTERY_HIGH_PCT")),
            ("FALLGUARD_NOTIFY_ON_ONSET", option_env!("FALLGUARD_NOTIFY_ON_ONSET")),
            ("FALLGUARD_NOTIFY_ON_CANCEL", option_env!("FALLGUARD_NOTIFY_ON_CANCEL")),
            ("FALLGUARD_NTFY_URL", option_env!("FALLGUARD_NTFY_URL")),
            ("FALLGUARD_WIFI_SSID", option_env!("FALLGUARD_WIFI_SSID")),
            ("FALLGUARD_WIFI_PASSWORD", option_env!("FALLGUARD_WIFI_PASSWORD")),
        ];
        let settings = Self::with_overrides(
            overrides.into_iter().filter_map(|(key, value)| value.map(|v| (key, v))),
        )?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `(key, value)` overrides on top of the defaults. Does not validate.
    pub fn with_overrides<'a, I>(overrides: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut settings = Self::default();
        for (key, value) in overrides {
            settings.apply(key, value)?;
        }
        Ok(settings)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "FALLGUARD_ACCEL_THRESHOLD_G" => self.thresholds.accel_threshold_g = parse(key, value)?,
            "FALLGUARD_ROTATION_THRESHOLD_DPS" => {
                self.thresholds.rotation_threshold_dps = parse(key, value)?
            }
            "FALLGUARD_COUNTDOWN_MS" => self.alarm.countdown_ms = parse(key, value)?,
            "FALLGUARD_REARM_COOLDOWN_MS" => self.alarm.rearm_cooldown_ms = parse(key, value)?,
            "FALLGUARD_BATTERY_LOW_PCT" => self.battery.low_pct = parse(key, value)?,
            "FALLGUARD_BATTERY_HIGH_PCT" => self.battery.high_pct = parse(key, value)?,
            "FALLGUARD_NOTIFY_ON_ONSET" => self.notify.notify_on_onset = parse_flag(key, value)?,
            "FALLGUARD_NOTIFY_ON_CANCEL" => self.notify.notify_on_cancel = parse_flag(key, value)?,
            "FALLGUARD_NTFY_URL" => self.network.ntfy_url = value.trim().to_string(),
            "FALLGUARD_WIFI_SSID" => self.network.wifi_ssid = value.to_string(),
            "FALLGUARD_WIFI_PASSWORD" => self.network.wifi_password = value.to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;
        self.alarm.validate()?;
        self.battery.validate()?;

        check_period("status_blink_period_ms", self.status_blink_period_ms)?;
        if self.poll_period_ms == 0 {
            return Err(ConfigError::InvalidDuration { name: "poll_period_ms", value: 0 });
        }

        let url = &self.network.ntfy_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(url.clone()));
        }
        Ok(())
    }
}

/// Pulse periods need a non-zero half period.
pub(crate) fn check_period(name: &'static str, value: u32) -> Result<(), ConfigError> {
    if value < 2 {
        Err(ConfigError::InvalidDuration { name, value })
    } else {
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Parse {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Parse { key: key.to_string(), value: value.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.alarm.countdown_ms, 10_000);
        assert_eq!(settings.alarm.rearm_cooldown_ms, 5_000);
        assert!(settings.notify.notify_on_cancel);
        assert!(!settings.notify.notify_on_onset);
    }

    #[test]
    fn overrides_replace_defaults() {
        let settings = Settings::with_overrides([
            ("FALLGUARD_ACCEL_THRESHOLD_G", "2.5"),
            ("FALLGUARD_COUNTDOWN_MS", " 5000 "),
            ("FALLGUARD_NOTIFY_ON_ONSET", "yes"),
            ("FALLGUARD_NTFY_URL", "https://ntfy.sh/grandma"),
        ])
        .unwrap();
        assert_eq!(settings.thresholds.accel_threshold_g, 2.5);
        assert_eq!(settings.alarm.countdown_ms, 5_000);
        assert!(settings.notify.notify_on_onset);
        assert_eq!(settings.network.ntfy_url, "https://ntfy.sh/grandma");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn unparseable_value_is_a_config_error() {
        let err = Settings::with_overrides([("FALLGUARD_COUNTDOWN_MS", "ten")]).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref key, .. } if key == "FALLGUARD_COUNTDOWN_MS"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert_eq!(
            Settings::with_overrides([("FALLGUARD_VOLUME", "11")]).unwrap_err(),
            ConfigError::UnknownKey("FALLGUARD_VOLUME".to_string())
        );
    }

    #[test]
    fn inverted_battery_band_fails_validation() {
        let settings = Settings::with_overrides([
            ("FALLGUARD_BATTERY_LOW_PCT", "90"),
            ("FALLGUARD_BATTERY_HIGH_PCT", "80"),
        ])
        .unwrap();
        assert_eq!(
            settings.validate(),
            Err(ConfigError::InvalidBatteryBand { low: 90, high: 80 })
        );
    }

    #[test]
    fn zero_countdown_fails_validation() {
        let settings = Settings::with_overrides([("FALLGUARD_COUNTDOWN_MS", "0")]).unwrap();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidDuration { name: "countdown_ms", .. })
        ));
    }

    #[test]
    fn endpoint_must_be_http() {
        let settings = Settings::with_overrides([("FALLGUARD_NTFY_URL", "ntfy.sh/x")]).unwrap();
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidEndpoint(_))));
    }
}
