// FallGuard — ntfy HTTP Transport
//
// Plain-text POST to an ntfy topic URL. The title and priority travel as
// headers, the message as the body.

use std::time::Duration;

use embedded_svc::http::client::Client;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::io::Write;

use fallguard::config::NetworkSettings;
use fallguard::notify::{Notification, Transport};
use fallguard::TransportError;

use crate::drivers::wifi::WifiLink;

pub struct NtfyTransport {
    link: WifiLink,
    url: String,
    timeout: Duration,
}

impl NtfyTransport {
    pub fn new(link: WifiLink, network: &NetworkSettings) -> Self {
        Self {
            link,
            url: network.ntfy_url.clone(),
            timeout: Duration::from_millis(network.request_timeout_ms as u64),
        }
    }

    /// Blocking link bring-up, done once when the worker starts.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        self.link.ensure_connected()
    }

    fn post(&mut self, notification: &Notification) -> anyhow::Result<u16> {
        let connection = EspHttpConnection::new(&Configuration {
            timeout: Some(self.timeout),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })?;
        let mut client = Client::wrap(connection);

        let body = notification.body.as_bytes();
        let content_length = body.len().to_string();
        let headers = [
            ("Title", notification.title.as_str()),
            ("Priority", notification.kind.priority()),
            ("Content-Type", "text/plain; charset=utf-8"),
            ("Content-Length", content_length.as_str()),
        ];

        let mut request = client.post(&self.url, &headers)?;
        request.write_all(body)?;
        request.flush()?;
        let response = request.submit()?;
        Ok(response.status())
    }
}

impl Transport for NtfyTransport {
    fn post_alert(&mut self, notification: &Notification) -> Result<(), TransportError> {
        self.link.ensure_connected()?;
        match self.post(notification) {
            Ok(status) if (200..300).contains(&status) => Ok(()),
            Ok(status) => Err(TransportError::Http { status }),
            Err(e) => Err(TransportError::Request(e.to_string())),
        }
    }
}
