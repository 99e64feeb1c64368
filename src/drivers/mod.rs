pub mod battery;
pub mod imu;
pub mod ntfy;
pub mod outputs;
pub mod wifi;
