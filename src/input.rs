// FallGuard — Button Inputs
//
// Cancel: falling-edge interrupt. The ISR does nothing but raise the shared
// `CancelSignal`; the alarm machine consumes it on its next tick. ESP-IDF
// disarms a GPIO interrupt after it fires, so `rearm` runs every loop pass.
//
// SOS: polled, active LOW, with a debounce so a single bounce can never
// count as a press.

use std::sync::Arc;
use std::time::{Duration, Instant};

use esp_idf_hal::gpio::{AnyIOPin, Input, InterruptType, PinDriver, Pull};

use fallguard::config::*;
use fallguard::CancelSignal;

const SOS_DEBOUNCE: Duration = Duration::from_millis(50);

type Button = PinDriver<'static, AnyIOPin, Input>;

pub struct CancelButton {
    pin: Button,
}

impl CancelButton {
    pub fn new(mut pin: Button, signal: Arc<CancelSignal>) -> anyhow::Result<Self> {
        pin.set_pull(Pull::Up)?;
        pin.set_interrupt_type(InterruptType::NegEdge)?;
        // SAFETY: the callback runs in ISR context. It captures an `Arc` and
        // performs one atomic store: no allocation, no locking, no I/O.
        unsafe {
            pin.subscribe(move || signal.raise())?;
        }
        pin.enable_interrupt()?;
        log::info!("Cancel button armed on GPIO{} (falling edge)", PIN_BTN_CANCEL);
        Ok(Self { pin })
    }

    /// Re-enable the edge interrupt after it has fired.
    pub fn rearm(&mut self) {
        if let Err(e) = self.pin.enable_interrupt() {
            log::warn!("Cancel IRQ re-enable failed: {}", e);
        }
    }
}

pub struct SosButton {
    pin: Button,
    last_raw: bool,
    last_change: Instant,
    pressed: bool,
}

impl SosButton {
    pub fn new(mut pin: Button) -> anyhow::Result<Self> {
        pin.set_pull(Pull::Up)?;
        Ok(Self {
            pin,
            last_raw: false,
            last_change: Instant::now(),
            pressed: false,
        })
    }

    /// Debounced pressed state; call once per loop pass.
    pub fn is_pressed(&mut self) -> bool {
        let raw = self.pin.is_low(); // active LOW
        let now = Instant::now();

        if raw != self.last_raw {
            self.last_raw = raw;
            self.last_change = now;
        } else if now.duration_since(self.last_change) >= SOS_DEBOUNCE && self.pressed != raw {
            self.pressed = raw;
            if raw {
                log::info!("SOS button pressed");
            }
        }
        self.pressed
    }
}
