//! Instrument transports.
//!
//! Every instrument driver talks to its device through a boxed [`Transport`].
//! The trait covers what a GPIB session needs (commands, line replies, serial
//! poll, device clear and return to local) and nothing more. All waiting is
//! bounded by the per-instrument timeout from the configuration.

pub mod mock;
pub mod prologix;
pub mod serial;
pub mod settle;
pub mod stream;
pub mod visa;

use async_trait::async_trait;
use tracing::info;

use crate::config::{InstrumentConfig, TransportKind};
use crate::error::{AppResult, BenchError};

pub use mock::MockTransport;
pub use prologix::PrologixController;
pub use settle::SettleStrategy;
pub use stream::StreamTransport;

/// Default port of the Prologix GPIB-ETHERNET controller.
pub const PROLOGIX_PORT: u16 = 1234;

/// Line-oriented link to one instrument.
#[async_trait]
pub trait Transport: Send {
    /// Send one command; the transport appends its terminator.
    async fn write(&mut self, command: &str) -> AppResult<()>;

    /// Read one reply with the terminator stripped.
    async fn read_response(&mut self) -> AppResult<String>;

    /// `write` followed by `read_response`.
    async fn query(&mut self, command: &str) -> AppResult<String> {
        self.write(command).await?;
        self.read_response().await
    }

    /// Read the device's GPIB status byte.
    async fn serial_poll(&mut self) -> AppResult<u8> {
        Err(BenchError::Unsupported(format!(
            "serial poll over {}",
            self.describe()
        )))
    }

    /// Selected device clear.
    async fn clear(&mut self) -> AppResult<()>;

    /// Release the device and the link.
    async fn close(&mut self) -> AppResult<()>;

    /// Human-readable endpoint, used in logs and errors.
    fn describe(&self) -> String;
}

/// Open the transport described by `config`.
pub async fn open_transport(config: &InstrumentConfig) -> AppResult<Box<dyn Transport>> {
    info!(
        transport = ?config.transport,
        resource = %config.resource,
        gpib_address = ?config.gpib_address,
        "Opening instrument transport"
    );

    match config.transport {
        TransportKind::Tcp => {
            let link = StreamTransport::connect_tcp(
                &config.resource,
                config.timeout(),
                &config.write_terminator,
                config.read_delimiter(),
            )
            .await?;
            Ok(Box::new(link))
        }
        TransportKind::PrologixTcp => {
            let address = with_default_port(&config.resource, PROLOGIX_PORT);
            let link =
                StreamTransport::connect_tcp(&address, config.timeout(), "\n", b'\n').await?;
            let controller =
                PrologixController::connect(link, gpib_address(config)?, config.timeout()).await?;
            Ok(Box::new(controller))
        }
        TransportKind::PrologixSerial => serial::open_prologix(config).await,
        TransportKind::Visa => visa::open(config).await,
    }
}

pub(crate) fn gpib_address(config: &InstrumentConfig) -> AppResult<u8> {
    config.gpib_address.ok_or_else(|| {
        BenchError::Transport(format!(
            "{:?} transport to '{}' needs a GPIB address",
            config.transport, config.resource
        ))
    })
}

/// Append `:port` when `resource` names only a host.
fn with_default_port(resource: &str, port: u16) -> String {
    if resource.contains(':') {
        resource.to_string()
    } else {
        format!("{}:{}", resource, port)
    }
}
