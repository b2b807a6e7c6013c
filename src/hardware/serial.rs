//! Serial link for the Prologix GPIB-USB controller.
//!
//! The `serialport` crate is blocking, so every operation runs on Tokio's
//! blocking pool and is bounded by the instrument timeout.

use crate::config::InstrumentConfig;
use crate::error::AppResult;
#[cfg(not(feature = "instrument_serial"))]
use crate::error::BenchError;

use super::Transport;

/// Open a Prologix GPIB-USB controller described by `config`.
#[cfg(feature = "instrument_serial")]
pub async fn open_prologix(config: &InstrumentConfig) -> AppResult<Box<dyn Transport>> {
    use super::{gpib_address, PrologixController};

    let link = imp::SerialLink::open(&config.resource, config.baud_rate, config.timeout()).await?;
    let controller =
        PrologixController::connect(link, gpib_address(config)?, config.timeout()).await?;
    Ok(Box::new(controller))
}

/// Built without `instrument_serial`: always `FeatureNotEnabled`.
#[cfg(not(feature = "instrument_serial"))]
pub async fn open_prologix(config: &InstrumentConfig) -> AppResult<Box<dyn Transport>> {
    let _ = config;
    Err(BenchError::FeatureNotEnabled("instrument_serial".to_string()))
}

#[cfg(feature = "instrument_serial")]
pub use imp::SerialLink;

#[cfg(feature = "instrument_serial")]
mod imp {
    use std::io::{ErrorKind, Read, Write};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serialport::SerialPort;
    use tracing::{debug, info};

    use crate::error::{AppResult, BenchError};
    use crate::hardware::Transport;

    /// Poll interval of the blocking reader.
    const PORT_READ_SLICE: Duration = Duration::from_millis(100);

    /// Blocking serial port shared with `spawn_blocking` workers.
    pub struct SerialLink {
        port_name: String,
        port: Option<Arc<Mutex<Box<dyn SerialPort>>>>,
        timeout: Duration,
    }

    impl SerialLink {
        /// Open `port_name` with a read timeout of `timeout`.
        pub async fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> AppResult<Self> {
            let name = port_name.to_string();
            let port = tokio::task::spawn_blocking(move || {
                serialport::new(&name, baud_rate)
                    .timeout(PORT_READ_SLICE)
                    .open()
                    .map_err(|e| {
                        BenchError::Transport(format!(
                            "Failed to open serial port '{}' at {} baud: {}",
                            name, baud_rate, e
                        ))
                    })
            })
            .await
            .map_err(|e| BenchError::Transport(format!("Serial open task failed: {}", e)))??;

            info!(port = port_name, baud_rate, "Serial port opened");
            Ok(Self {
                port_name: port_name.to_string(),
                port: Some(Arc::new(Mutex::new(port))),
                timeout,
            })
        }

        fn port(&self) -> AppResult<Arc<Mutex<Box<dyn SerialPort>>>> {
            self.port.clone().ok_or(BenchError::NotConnected)
        }
    }

    #[async_trait]
    impl Transport for SerialLink {
        async fn write(&mut self, command: &str) -> AppResult<()> {
            let port = self.port()?;
            let frame = format!("{}\n", command);
            tokio::task::spawn_blocking(move || -> AppResult<()> {
                let mut guard = port.lock();
                guard.write_all(frame.as_bytes())?;
                guard.flush()?;
                Ok(())
            })
            .await
            .map_err(|e| BenchError::Transport(format!("Serial I/O task failed: {}", e)))??;
            debug!(port = %self.port_name, command = %command.escape_debug(), "Sent");
            Ok(())
        }

        async fn read_response(&mut self) -> AppResult<String> {
            let port = self.port()?;
            let timeout = self.timeout;
            let operation = format!("read from {}", self.port_name);
            let reply = tokio::task::spawn_blocking(move || -> AppResult<String> {
                let mut guard = port.lock();
                let mut line = Vec::new();
                let mut byte = [0u8; 1];
                let start = Instant::now();
                loop {
                    if start.elapsed() > timeout {
                        return Err(BenchError::timeout(operation, timeout));
                    }
                    match guard.read(&mut byte) {
                        Ok(0) => {
                            return Err(BenchError::Transport("Unexpected EOF".to_string()))
                        }
                        Ok(_) => {
                            if byte[0] == b'\n' {
                                break;
                            }
                            line.push(byte[0]);
                        }
                        Err(e) if e.kind() == ErrorKind::TimedOut => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
                Ok(String::from_utf8_lossy(&line).trim_end_matches('\r').to_string())
            })
            .await
            .map_err(|e| BenchError::Transport(format!("Serial I/O task failed: {}", e)))??;
            debug!(port = %self.port_name, bytes = reply.len(), "Received");
            Ok(reply)
        }

        async fn clear(&mut self) -> AppResult<()> {
            let port = self.port()?;
            tokio::task::spawn_blocking(move || {
                port.lock()
                    .clear(serialport::ClearBuffer::Input)
                    .map_err(|e| BenchError::Transport(format!("Serial clear failed: {}", e)))
            })
            .await
            .map_err(|e| BenchError::Transport(format!("Serial I/O task failed: {}", e)))?
        }

        async fn close(&mut self) -> AppResult<()> {
            if self.port.take().is_some() {
                info!(port = %self.port_name, "Serial port closed");
            }
            Ok(())
        }

        fn describe(&self) -> String {
            self.port_name.clone()
        }
    }
}

#[cfg(all(test, not(feature = "instrument_serial")))]
mod tests {
    use super::*;
    use crate::config::TransportKind;

    #[tokio::test]
    async fn test_serial_feature_disabled() {
        let config = InstrumentConfig {
            transport: TransportKind::PrologixSerial,
            resource: "/dev/ttyUSB0".to_string(),
            gpib_address: Some(17),
            timeout_ms: 1000,
            write_terminator: "\n".to_string(),
            read_terminator: "\n".to_string(),
            baud_rate: 9600,
        };
        let err = open_prologix(&config).await.err().unwrap();
        assert!(matches!(err, BenchError::FeatureNotEnabled(_)));
    }
}
