// FallGuard — MPU6050 IMU Driver
//
// Register-level driver over I2C. Configured for ±16 g so a hard impact does
// not clip below the fall threshold, and ±500 °/s for the tumble.

use esp_idf_hal::i2c::I2cDriver;

use fallguard::config::*;
use fallguard::monitor::MotionSensor;
use fallguard::{ImuFrame, MotionSample, SensorError};

// MPU6050 register addresses
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_CONFIG: u8 = 0x1A;
const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B; // Start of 14-byte sensor burst
const REG_WHO_AM_I: u8 = 0x75;
const WHO_AM_I_EXPECTED: u8 = 0x68;

pub struct Mpu6050 {
    bus: I2cDriver<'static>,
    last_raw: Option<[u8; 14]>,
}

impl Mpu6050 {
    pub fn new(bus: I2cDriver<'static>) -> Self {
        Self { bus, last_raw: None }
    }

    /// Verify the device is reachable on the I2C bus.
    pub fn is_connected(&mut self) -> bool {
        let mut buf = [0u8; 1];
        match self.bus.write_read(I2C_ADDR_MPU6050, &[REG_WHO_AM_I], &mut buf, I2C_TIMEOUT_TICKS) {
            Ok(()) => buf[0] == WHO_AM_I_EXPECTED,
            Err(_) => false,
        }
    }

    /// Wake the sensor and configure accel (±16 g), gyro (±500 °/s), DLPF 21 Hz.
    pub fn init(&mut self) -> anyhow::Result<()> {
        // Wake up (clear SLEEP bit)
        self.bus.write(I2C_ADDR_MPU6050, &[REG_PWR_MGMT_1, 0x00], I2C_TIMEOUT_TICKS)?;

        // DLPF bandwidth 21 Hz
        self.bus.write(I2C_ADDR_MPU6050, &[REG_CONFIG, 0x04], I2C_TIMEOUT_TICKS)?;

        // Gyroscope: ±500 °/s
        self.bus.write(I2C_ADDR_MPU6050, &[REG_GYRO_CONFIG, 0x08], I2C_TIMEOUT_TICKS)?;

        // Accelerometer: ±16 g
        self.bus.write(I2C_ADDR_MPU6050, &[REG_ACCEL_CONFIG, 0x18], I2C_TIMEOUT_TICKS)?;

        log::info!("MPU6050 initialised (±16g, ±500°/s, DLPF 21Hz)");
        Ok(())
    }

    /// Burst-read all 6 axes and convert to physical units.
    pub fn read_frame(&mut self) -> Result<ImuFrame, SensorError> {
        let mut raw = [0u8; 14];
        self.bus
            .write_read(I2C_ADDR_MPU6050, &[REG_ACCEL_XOUT_H], &mut raw, I2C_TIMEOUT_TICKS)
            .map_err(|e| SensorError::Bus(e.to_string()))?;

        // A live sensor never repeats all 14 bytes; a frozen one does.
        if self.last_raw == Some(raw) {
            return Err(SensorError::Stale);
        }
        self.last_raw = Some(raw);

        let axis = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]) as f32;
        Ok(ImuFrame {
            accel_g: [axis(0), axis(2), axis(4)].map(|v| v / ACCEL_SCALE_16G),
            // raw[6..8] = temperature — skipped
            gyro_dps: [axis(8), axis(10), axis(12)].map(|v| v / GYRO_SCALE_500),
        })
    }
}

impl MotionSensor for Mpu6050 {
    fn read_motion(&mut self) -> Result<MotionSample, SensorError> {
        self.read_frame().map(MotionSample::from)
    }
}
