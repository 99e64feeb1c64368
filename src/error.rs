// FallGuard — Error Types
//
// Three families, matching how far each one is allowed to reach:
//   * SensorError    — transient, the tick skips classification.
//   * TransportError — notification delivery failed, logged and forgotten.
//   * ConfigError    — fatal, only ever returned before the loop starts.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    /// Bus transaction failed (I2C NACK, timeout, ADC driver error).
    #[error("sensor bus read failed: {0}")]
    Bus(String),
    /// The driver handed back the same frame as last time.
    #[error("sensor returned a stale frame")]
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network link is down")]
    NotConnected,
    #[error("endpoint answered with HTTP {status}")]
    Http { status: u16 },
    #[error("request failed: {0}")]
    Request(String),
    /// The dispatch queue is full; the worker is still busy with an earlier send.
    #[error("notification queue is full")]
    QueueFull,
    #[error("notification worker has stopped")]
    WorkerStopped,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("threshold `{name}` must be a positive finite number, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
    #[error("duration `{name}` is out of range: {value} ms")]
    InvalidDuration { name: &'static str, value: u32 },
    #[error("battery band must satisfy low < high <= 100, got low={low} high={high}")]
    InvalidBatteryBand { low: u8, high: u8 },
    #[error("cannot parse `{key}` from {value:?}")]
    Parse { key: String, value: String },
    #[error("unknown configuration key `{0}`")]
    UnknownKey(String),
    #[error("notification endpoint must be an http(s) URL, got {0:?}")]
    InvalidEndpoint(String),
}
