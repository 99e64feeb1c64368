// FallGuard — Fall-Detection Alarm Core
//
// Everything that decides *what* the wearable does lives here and builds on
// the host: motion fusion, the fall heuristic, non-blocking pulse patterns,
// the alarm state machine and the loop that ties them together. The ESP-IDF
// binary only supplies the drivers behind the traits.

pub mod alarm;
pub mod battery;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod monitor;
pub mod motion;
pub mod notify;
pub mod pulse;
pub mod signal;

pub use alarm::{AlarmMachine, AlarmState, AlarmTiming, Tick};
pub use classifier::{classify, Thresholds};
pub use clock::{Clock, Deadline, Timestamp};
pub use config::Settings;
pub use error::{ConfigError, SensorError, TransportError};
pub use monitor::{Monitor, MotionSensor, OutputPort};
pub use motion::{ImuFrame, MotionSample};
pub use signal::CancelSignal;
