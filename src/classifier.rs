// FallGuard — Fall Classifier
//
// Single-threshold heuristic: a fall is a hard impact *and* a fast rotation
// in the same sample. Sitting down hard spikes acceleration without the
// tumble, so it must not trigger on its own.

use crate::error::ConfigError;
use crate::motion::MotionSample;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub accel_threshold_g: f64,
    pub rotation_threshold_dps: f64,
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("accel_threshold_g", self.accel_threshold_g)?;
        check_positive("rotation_threshold_dps", self.rotation_threshold_dps)
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}

/// True iff both readings are strictly above their thresholds.
/// NaN readings never trigger.
pub fn classify(sample: &MotionSample, thresholds: &Thresholds) -> bool {
    sample.accel_g > thresholds.accel_threshold_g
        && sample.rotation_dps > thresholds.rotation_threshold_dps
}
