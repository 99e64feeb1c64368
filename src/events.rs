// FallGuard — Alarm Events & Output Identifiers

use crate::motion::MotionSample;

// ---------------------------------------------------------------------------
// Trigger — why an alarm is being raised
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// The classifier accepted this sample as a fall.
    Fall(MotionSample),
    /// The user pressed the SOS button.
    Sos,
}

impl Trigger {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fall(_) => "fall",
            Self::Sos => "sos",
        }
    }
}

// ---------------------------------------------------------------------------
// Transition — what a single alarm tick did
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// Idle → Alarming.
    Armed(Trigger),
    /// Alarming → Cancelled → Idle.
    Cancelled,
    /// Alarming → Notified → Idle. `submitted` is false when the fall alert
    /// could not be handed to the dispatcher.
    Notified { submitted: bool },
}

// ---------------------------------------------------------------------------
// Binary outputs driven by the monitor
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputId {
    AlarmLed,
    Buzzer,
    StatusGreen,
    StatusRed,
}

impl OutputId {
    pub const ALL: [OutputId; 4] = [
        OutputId::AlarmLed,
        OutputId::Buzzer,
        OutputId::StatusGreen,
        OutputId::StatusRed,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::AlarmLed => 0,
            Self::Buzzer => 1,
            Self::StatusGreen => 2,
            Self::StatusRed => 3,
        }
    }
}
