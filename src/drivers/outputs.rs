// FallGuard — LED & Buzzer Outputs
//
// Three plain GPIO LEDs plus a passive buzzer on an LEDC PWM channel. The
// monitor decides the levels; this only puts them on the pins.

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_hal::ledc::LedcDriver;

use fallguard::events::OutputId;
use fallguard::monitor::OutputPort;

type Led = PinDriver<'static, AnyOutputPin, Output>;

pub struct BoardOutputs {
    alarm_led: Led,
    green_led: Led,
    red_led: Led,
    buzzer: LedcDriver<'static>,
    buzzer_on_duty: u32,
}

impl BoardOutputs {
    pub fn new(alarm_led: Led, green_led: Led, red_led: Led, mut buzzer: LedcDriver<'static>) -> Self {
        // 50 % duty gives the loudest square wave from a passive buzzer.
        let buzzer_on_duty = buzzer.get_max_duty() / 2;
        if let Err(e) = buzzer.set_duty(0) {
            log::error!("Buzzer init failed: {}", e);
        }
        Self { alarm_led, green_led, red_led, buzzer, buzzer_on_duty }
    }

    /// Drive everything low (used on boot and before parking on a fault).
    pub fn all_off(&mut self) {
        for id in OutputId::ALL {
            self.set_output(id, false);
        }
    }

    fn set_pwm_duty(&mut self, duty: u32) {
        if let Err(e) = self.buzzer.set_duty(duty) {
            log::warn!("Buzzer duty update failed: {}", e);
        }
    }
}

impl OutputPort for BoardOutputs {
    fn set_output(&mut self, id: OutputId, on: bool) {
        let led = match id {
            OutputId::Buzzer => {
                let duty = if on { self.buzzer_on_duty } else { 0 };
                self.set_pwm_duty(duty);
                return;
            }
            OutputId::AlarmLed => &mut self.alarm_led,
            OutputId::StatusGreen => &mut self.green_led,
            OutputId::StatusRed => &mut self.red_led,
        };
        let result = if on { led.set_high() } else { led.set_low() };
        if let Err(e) = result {
            log::warn!("GPIO write for {:?} failed: {}", id, e);
        }
    }
}
