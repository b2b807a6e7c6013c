//! Prologix GPIB controller.
//!
//! The controller speaks a line protocol of its own: lines starting with `++`
//! configure the controller, everything else is forwarded to the addressed
//! GPIB device. The controller runs in `++auto 0` mode, so every read is an
//! explicit `++read eoi`.
//!
//! Bytes `CR`, `LF`, `ESC` and `+` inside device data must be prefixed with
//! `ESC`, otherwise the controller treats them as framing.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::Transport;
use crate::error::{AppResult, BenchError};

const ESC: char = '\u{1b}';
/// Controller limit for `++read_tmo_ms`.
const MAX_READ_TIMEOUT_MS: u128 = 3000;

/// Escape device data for transmission through the controller.
pub fn escape(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    for ch in data.chars() {
        if matches!(ch, '\r' | '\n' | ESC | '+') {
            out.push(ESC);
        }
        out.push(ch);
    }
    out
}

/// A GPIB device reached through a Prologix controller on `link`.
pub struct PrologixController<T> {
    link: T,
    address: u8,
    timeout: Duration,
}

impl<T: Transport> PrologixController<T> {
    /// Put the controller in controller mode and address `address`.
    pub async fn connect(link: T, address: u8, timeout: Duration) -> AppResult<Self> {
        if address > 30 {
            return Err(BenchError::Transport(format!(
                "GPIB address {} out of range (0-30)",
                address
            )));
        }
        let mut controller = Self {
            link,
            address,
            timeout,
        };
        for command in controller.init_sequence() {
            controller.link.write(&command).await?;
        }
        info!(
            link = %controller.link.describe(),
            address,
            "Prologix controller configured"
        );
        Ok(controller)
    }

    fn init_sequence(&self) -> Vec<String> {
        let read_tmo = self.timeout.as_millis().clamp(1, MAX_READ_TIMEOUT_MS);
        vec![
            "++mode 1".to_string(),
            "++auto 0".to_string(),
            "++eoi 1".to_string(),
            "++eos 2".to_string(),
            format!("++addr {}", self.address),
            format!("++read_tmo_ms {}", read_tmo),
        ]
    }

    /// GPIB primary address of the instrument.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// The underlying link, e.g. to inspect a mock in tests.
    pub fn link(&self) -> &T {
        &self.link
    }
}

#[async_trait]
impl<T: Transport> Transport for PrologixController<T> {
    async fn write(&mut self, command: &str) -> AppResult<()> {
        self.link.write(&escape(command)).await
    }

    async fn read_response(&mut self) -> AppResult<String> {
        self.link.write("++read eoi").await?;
        self.link.read_response().await
    }

    async fn serial_poll(&mut self) -> AppResult<u8> {
        let reply = self.link.query("++spoll").await?;
        let status = reply
            .trim()
            .parse::<u8>()
            .map_err(|e| BenchError::Parse(format!("status byte '{}': {}", reply.trim(), e)))?;
        debug!(address = self.address, status, "Serial poll");
        Ok(status)
    }

    async fn clear(&mut self) -> AppResult<()> {
        self.link.write("++clr").await
    }

    async fn close(&mut self) -> AppResult<()> {
        self.link.write("++loc").await?;
        self.link.close().await
    }

    fn describe(&self) -> String {
        format!("{} gpib {}", self.link.describe(), self.address)
    }
}
