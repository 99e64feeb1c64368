// FallGuard — Notify Task
//
// Owns the network. Brings Wi-Fi up (blocking here is fine, nobody waits on
// this thread), then drains the notification queue.

use std::sync::mpsc::Receiver;

use fallguard::notify::{self, Notification};

use crate::drivers::ntfy::NtfyTransport;

pub fn notify_task(rx: Receiver<Notification>, mut transport: NtfyTransport) {
    log::info!("Notify task started");

    if let Err(e) = transport.connect() {
        // Not fatal: every post retries the link first.
        log::warn!("Initial Wi-Fi bring-up failed: {}", e);
    }

    notify::run_worker(rx, transport);
}
