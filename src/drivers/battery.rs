// FallGuard — Battery ADC
//
// One-shot ADC reads via raw ESP-IDF calls: GPIO2 carries the battery
// voltage behind a 1:2 divider, GPIO3 the charger sense line.

use fallguard::battery::{level_from_voltage, BatteryProvider, BatteryReading};
use fallguard::config::*;
use fallguard::SensorError;

use esp_idf_sys as sys;

const CHANNEL_BATTERY: sys::adc_channel_t = sys::adc_channel_t_ADC_CHANNEL_2; // GPIO2
const CHANNEL_CHARGE: sys::adc_channel_t = sys::adc_channel_t_ADC_CHANNEL_3;  // GPIO3

pub struct AdcBattery {
    handle: sys::adc_oneshot_unit_handle_t,
}

// SAFETY: the oneshot handle is only ever used from the thread that owns
// this struct; ESP-IDF allows moving it between tasks.
unsafe impl Send for AdcBattery {}

impl AdcBattery {
    /// ADC1 with 11 dB attenuation (0–3.3 V range) on both channels.
    pub fn new() -> anyhow::Result<Self> {
        let mut handle: sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
        // SAFETY: plain FFI calls with stack-owned config structs; `handle`
        // is written by the driver before we read it.
        unsafe {
            let unit_cfg = sys::adc_oneshot_unit_init_cfg_t {
                unit_id: sys::adc_unit_t_ADC_UNIT_1,
                ulp_mode: sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..core::mem::zeroed()
            };
            sys::esp!(sys::adc_oneshot_new_unit(&unit_cfg, &mut handle))?;

            let chan_cfg = sys::adc_oneshot_chan_cfg_t {
                atten: sys::adc_atten_t_ADC_ATTEN_DB_11,
                bitwidth: sys::adc_bitwidth_t_ADC_BITWIDTH_12,
            };
            sys::esp!(sys::adc_oneshot_config_channel(handle, CHANNEL_BATTERY, &chan_cfg))?;
            sys::esp!(sys::adc_oneshot_config_channel(handle, CHANNEL_CHARGE, &chan_cfg))?;
        }
        log::info!(
            "Battery ADC ready (GPIO{} level, GPIO{} charge sense)",
            PIN_BATTERY_ADC,
            PIN_CHARGE_ADC
        );
        Ok(Self { handle })
    }

    fn read_raw(&mut self, channel: sys::adc_channel_t) -> Result<i32, SensorError> {
        let mut raw: i32 = 0;
        // SAFETY: `handle` was initialised in `new` and `raw` outlives the call.
        let ret = unsafe { sys::adc_oneshot_read(self.handle, channel, &mut raw) };
        if ret == sys::ESP_OK {
            Ok(raw)
        } else {
            Err(SensorError::Bus(format!("adc_oneshot_read({}) = {}", channel, ret)))
        }
    }
}

impl BatteryProvider for AdcBattery {
    fn read_battery(&mut self) -> Result<BatteryReading, SensorError> {
        let raw = self.read_raw(CHANNEL_BATTERY)?;
        let voltage = (raw as f32 / 4095.0) * 3.3 * BATTERY_DIVIDER;
        let charging = self.read_raw(CHANNEL_CHARGE)? > CHARGE_SENSE_RAW_THRESHOLD;

        Ok(BatteryReading {
            level_pct: level_from_voltage(voltage, BATTERY_EMPTY_V, BATTERY_FULL_V),
            charging,
        })
    }
}
