// FallGuard — Battery & Charge Indicator
//
// Maps a battery reading onto the red/green status LEDs. The level itself
// comes from an external provider whose accuracy is whatever the ADC
// front-end gives us.

use crate::error::{ConfigError, SensorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReading {
    /// 0–100 %.
    pub level_pct: u8,
    pub charging: bool,
}

pub trait BatteryProvider {
    fn read_battery(&mut self) -> Result<BatteryReading, SensorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryThresholds {
    pub low_pct: u8,
    pub high_pct: u8,
}

impl BatteryThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.low_pct < self.high_pct && self.high_pct <= 100 {
            Ok(())
        } else {
            Err(ConfigError::InvalidBatteryBand { low: self.low_pct, high: self.high_pct })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIndicator {
    /// Red solid, green off.
    Low,
    /// Green solid.
    Charging,
    /// Green solid.
    Full,
    /// Green blinking.
    Normal,
}

impl StatusIndicator {
    pub fn for_reading(reading: Option<BatteryReading>, thresholds: &BatteryThresholds) -> Self {
        let Some(reading) = reading else {
            return Self::Normal;
        };
        if reading.level_pct < thresholds.low_pct {
            Self::Low
        } else if reading.charging {
            Self::Charging
        } else if reading.level_pct > thresholds.high_pct {
            Self::Full
        } else {
            Self::Normal
        }
    }

    pub fn blinks(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// LiPo voltage to a 0–100 % estimate (linear between empty and full).
pub fn level_from_voltage(voltage: f32, empty_v: f32, full_v: f32) -> u8 {
    let pct = ((voltage - empty_v) / (full_v - empty_v) * 100.0).clamp(0.0, 100.0);
    pct.round() as u8
}
