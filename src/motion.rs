// FallGuard — Motion Samples
//
// The IMU driver produces a calibrated 6-axis `ImuFrame`; the classifier only
// ever sees the fused `MotionSample` built from it. Nothing is kept between
// polls.

// ---------------------------------------------------------------------------
// Raw calibrated reading (accelerometer in g, gyroscope in °/s)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImuFrame {
    pub accel_g: [f32; 3],
    pub gyro_dps: [f32; 3],
}

// ---------------------------------------------------------------------------
// Fused sample
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionSample {
    /// Magnitude of the acceleration vector, in g.
    pub accel_g: f64,
    /// Largest absolute rotation rate across the three gyro axes, in °/s.
    pub rotation_dps: f64,
}

impl MotionSample {
    pub fn new(accel_g: f64, rotation_dps: f64) -> Self {
        Self { accel_g, rotation_dps }
    }
}

impl From<ImuFrame> for MotionSample {
    fn from(frame: ImuFrame) -> Self {
        let [ax, ay, az] = frame.accel_g.map(f64::from);
        let rotation_dps = frame
            .gyro_dps
            .iter()
            .map(|g| f64::from(g.abs()))
            .fold(0.0, f64::max);

        Self {
            accel_g: (ax * ax + ay * ay + az * az).sqrt(),
            rotation_dps,
        }
    }
}
