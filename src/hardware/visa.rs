//! VISA session transport (GPIB, USB-TMC, LXI through an installed VISA runtime).
//!
//! visa-rs is blocking; I/O runs on Tokio's blocking pool and the whole call
//! is bounded by the instrument timeout.

use crate::config::InstrumentConfig;
use crate::error::AppResult;
#[cfg(not(feature = "instrument_visa"))]
use crate::error::BenchError;

use super::Transport;

/// Open the VISA resource named in `config.resource`, e.g. `GPIB0::17::INSTR`.
#[cfg(feature = "instrument_visa")]
pub async fn open(config: &InstrumentConfig) -> AppResult<Box<dyn Transport>> {
    let session = imp::VisaTransport::open(
        &config.resource,
        config.timeout(),
        &config.write_terminator,
        config.read_delimiter(),
    )
    .await?;
    Ok(Box::new(session))
}

/// Built without `instrument_visa`: always `FeatureNotEnabled`.
#[cfg(not(feature = "instrument_visa"))]
pub async fn open(config: &InstrumentConfig) -> AppResult<Box<dyn Transport>> {
    let _ = config;
    Err(BenchError::FeatureNotEnabled("instrument_visa".to_string()))
}

#[cfg(feature = "instrument_visa")]
pub use imp::VisaTransport;

#[cfg(feature = "instrument_visa")]
mod imp {
    use std::ffi::CString;
    use std::io::{Read, Write};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tracing::{debug, info};
    use visa_rs::prelude::*;

    use crate::error::{AppResult, BenchError};
    use crate::hardware::Transport;

    /// VISA session driven on the blocking pool.
    pub struct VisaTransport {
        resource: String,
        session: Option<Arc<Mutex<Instrument>>>,
        timeout: Duration,
        write_terminator: String,
        read_delimiter: u8,
    }

    fn visa_error(context: &str, e: impl std::fmt::Display) -> BenchError {
        BenchError::Transport(format!("{}: {}", context, e))
    }

    impl VisaTransport {
        /// Open `resource` through the default resource manager.
        pub async fn open(
            resource: &str,
            timeout: Duration,
            write_terminator: &str,
            read_delimiter: u8,
        ) -> AppResult<Self> {
            let name = resource.to_string();
            let session = tokio::time::timeout(
                timeout,
                tokio::task::spawn_blocking(move || -> AppResult<Instrument> {
                    let rm = DefaultRM::new()
                        .map_err(|e| visa_error("Failed to create VISA resource manager", e))?;
                    let c_string = CString::new(name.clone())
                        .map_err(|e| visa_error("Invalid VISA resource string", e))?;
                    let visa_string = visa_rs::VisaString::from(c_string);
                    rm.open(&visa_string, AccessMode::NO_LOCK, TIMEOUT_IMMEDIATE)
                        .map_err(|e| visa_error(&format!("Failed to open '{}'", name), e))
                }),
            )
            .await
            .map_err(|_| BenchError::timeout(format!("open {}", resource), timeout))?
            .map_err(|e| visa_error("VISA open task failed", e))??;

            info!(resource, "VISA session opened");
            Ok(Self {
                resource: resource.to_string(),
                session: Some(Arc::new(Mutex::new(session))),
                timeout,
                write_terminator: write_terminator.to_string(),
                read_delimiter,
            })
        }

        fn session(&self) -> AppResult<Arc<Mutex<Instrument>>> {
            self.session.clone().ok_or(BenchError::NotConnected)
        }

        /// Run `op` on the blocking pool under the instrument timeout.
        async fn blocking<R, F>(&self, operation: &str, op: F) -> AppResult<R>
        where
            R: Send + 'static,
            F: FnOnce(&mut Instrument) -> AppResult<R> + Send + 'static,
        {
            let session = self.session()?;
            tokio::time::timeout(
                self.timeout,
                tokio::task::spawn_blocking(move || op(&mut session.lock())),
            )
            .await
            .map_err(|_| BenchError::timeout(format!("{} {}", operation, self.resource), self.timeout))?
            .map_err(|e| visa_error("VISA I/O task failed", e))?
        }
    }

    #[async_trait]
    impl Transport for VisaTransport {
        async fn write(&mut self, command: &str) -> AppResult<()> {
            let frame = format!("{}{}", command, self.write_terminator);
            self.blocking("write to", move |instr| {
                instr.write_all(frame.as_bytes())?;
                Ok(())
            })
            .await?;
            debug!(resource = %self.resource, command = %command.escape_debug(), "Sent");
            Ok(())
        }

        async fn read_response(&mut self) -> AppResult<String> {
            let delimiter = self.read_delimiter;
            let reply = self
                .blocking("read from", move |instr| {
                    let mut reply = Vec::new();
                    let mut chunk = [0u8; 1024];
                    loop {
                        let n = instr.read(&mut chunk)?;
                        if n == 0 {
                            break;
                        }
                        reply.extend_from_slice(&chunk[..n]);
                        if reply.last() == Some(&delimiter) {
                            break;
                        }
                    }
                    Ok(String::from_utf8_lossy(&reply)
                        .trim_end_matches(['\r', '\n'])
                        .to_string())
                })
                .await?;
            debug!(resource = %self.resource, bytes = reply.len(), "Received");
            Ok(reply)
        }

        async fn serial_poll(&mut self) -> AppResult<u8> {
            self.blocking("serial poll", |instr| {
                let stb = instr
                    .read_stb()
                    .map_err(|e| visa_error("VISA read STB failed", e))?;
                Ok((stb & 0xff) as u8)
            })
            .await
        }

        async fn clear(&mut self) -> AppResult<()> {
            self.blocking("clear", |instr| {
                instr.clear().map_err(|e| visa_error("VISA clear failed", e))
            })
            .await
        }

        async fn close(&mut self) -> AppResult<()> {
            if self.session.take().is_some() {
                info!(resource = %self.resource, "VISA session closed");
            }
            Ok(())
        }

        fn describe(&self) -> String {
            self.resource.clone()
        }
    }
}
