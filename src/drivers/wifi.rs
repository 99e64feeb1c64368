// FallGuard — Wi-Fi Station Link
//
// Owned by the notify worker. Bring-up may block (bounded by the connect
// timeout); the polling loop never touches it.

use std::thread;
use std::time::{Duration, Instant};

use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use fallguard::config::NetworkSettings;
use fallguard::TransportError;

pub struct WifiLink {
    wifi: BlockingWifi<EspWifi<'static>>,
    connect_timeout: Duration,
}

impl WifiLink {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        network: &NetworkSettings,
    ) -> anyhow::Result<Self> {
        let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sys_loop.clone(), Some(nvs))?, sys_loop)?;

        let auth_method = if network.wifi_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: network
                .wifi_ssid
                .as_str()
                .try_into()
                .map_err(|_| anyhow::anyhow!("Wi-Fi SSID longer than 32 bytes"))?,
            password: network
                .wifi_password
                .as_str()
                .try_into()
                .map_err(|_| anyhow::anyhow!("Wi-Fi password longer than 64 bytes"))?,
            auth_method,
            ..Default::default()
        }))?;
        wifi.start()?;

        Ok(Self {
            wifi,
            connect_timeout: Duration::from_millis(network.connect_timeout_ms as u64),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    /// Connect if needed, retrying until the connect timeout runs out.
    pub fn ensure_connected(&mut self) -> Result<(), TransportError> {
        if self.is_connected() {
            return Ok(());
        }
        log::info!("Connecting to Wi-Fi…");

        let started = Instant::now();
        loop {
            match self.wifi.connect().and_then(|_| self.wifi.wait_netif_up()) {
                Ok(()) => {
                    if let Ok(info) = self.wifi.wifi().sta_netif().get_ip_info() {
                        log::info!("Wi-Fi OK: {:?}", info.ip);
                    }
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("Wi-Fi connect attempt failed: {}", e);
                    let _ = self.wifi.disconnect();
                }
            }
            if started.elapsed() >= self.connect_timeout {
                log::warn!("Wi-Fi timeout after {:?}", self.connect_timeout);
                return Err(TransportError::NotConnected);
            }
            thread::sleep(Duration::from_millis(500));
        }
    }
}
