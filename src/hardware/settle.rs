//! Waiting for a triggered measurement to finish.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use super::Transport;
use crate::error::{AppResult, BenchError};

/// How to wait between trigger and data fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SettleStrategy {
    /// Sleep for a fixed time long enough for the slowest sweep.
    FixedDelay {
        /// Wait after the trigger, in milliseconds
        #[serde(default = "default_delay_ms")]
        delay_ms: u64,
    },
    /// Poll the status byte until a bit in `ready_mask` is set.
    SerialPoll {
        /// Pause between polls, in milliseconds
        #[serde(default = "default_poll_interval_ms")]
        poll_interval_ms: u64,
        /// Give up after this many milliseconds
        #[serde(default = "default_poll_timeout_ms")]
        timeout_ms: u64,
        /// 4145B status byte bit 0 is "data ready"
        #[serde(default = "default_ready_mask")]
        ready_mask: u8,
    },
}

impl Default for SettleStrategy {
    fn default() -> Self {
        Self::FixedDelay {
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_delay_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_poll_timeout_ms() -> u64 {
    60_000
}

fn default_ready_mask() -> u8 {
    0x01
}

impl SettleStrategy {
    /// Reject zero intervals and timeouts.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Self::FixedDelay { .. } => Ok(()),
            Self::SerialPoll {
                poll_interval_ms,
                timeout_ms,
                ready_mask,
            } => {
                if poll_interval_ms == 0 {
                    return Err("'poll_interval_ms' must be > 0".to_string());
                }
                if timeout_ms == 0 {
                    return Err("'timeout_ms' must be > 0".to_string());
                }
                if ready_mask == 0 {
                    return Err("'ready_mask' must select at least one bit".to_string());
                }
                Ok(())
            }
        }
    }

    /// Block until the instrument should have data.
    pub async fn wait_for_data(&self, transport: &mut dyn Transport) -> AppResult<()> {
        match *self {
            Self::FixedDelay { delay_ms } => {
                info!(delay_ms, "Waiting for measurement to finish");
                sleep(Duration::from_millis(delay_ms)).await;
                Ok(())
            }
            Self::SerialPoll {
                poll_interval_ms,
                timeout_ms,
                ready_mask,
            } => {
                let limit = Duration::from_millis(timeout_ms);
                let deadline = Instant::now() + limit;
                info!(timeout_ms, ready_mask, "Polling status byte for data ready");
                loop {
                    let status = transport.serial_poll().await?;
                    if status & ready_mask != 0 {
                        debug!(status, "Data ready");
                        return Ok(());
                    }
                    if Instant::now() >= deadline {
                        return Err(BenchError::timeout(
                            format!("data ready (status byte {:#04x})", status),
                            limit,
                        ));
                    }
                    sleep(Duration::from_millis(poll_interval_ms)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::{MockTransport, LOG_SERIAL_POLL};

    #[tokio::test]
    async fn test_serial_poll_returns_when_ready() {
        let mock = MockTransport::new().with_status_bytes(&[0x00, 0x40, 0x41]);
        let mut link = mock.clone();
        let strategy = SettleStrategy::SerialPoll {
            poll_interval_ms: 1,
            timeout_ms: 5_000,
            ready_mask: 0x01,
        };
        strategy.wait_for_data(&mut link).await.unwrap();
        assert_eq!(mock.call_log(), vec![LOG_SERIAL_POLL; 3]);
    }

    #[tokio::test]
    async fn test_serial_poll_times_out() {
        let mut link = MockTransport::new().with_status_bytes(&[0x40]);
        let strategy = SettleStrategy::SerialPoll {
            poll_interval_ms: 5,
            timeout_ms: 30,
            ready_mask: 0x01,
        };
        let err = strategy.wait_for_data(&mut link).await.unwrap_err();
        assert!(matches!(err, BenchError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_fixed_delay_does_not_touch_link() {
        let mock = MockTransport::new();
        let mut link = mock.clone();
        SettleStrategy::FixedDelay { delay_ms: 1 }
            .wait_for_data(&mut link)
            .await
            .unwrap();
        assert!(mock.call_log().is_empty());
    }

    #[test]
    fn test_deserialize_tagged() {
        let strategy: SettleStrategy =
            toml::from_str("strategy = \"serial_poll\"\ntimeout_ms = 20000").unwrap();
        assert_eq!(
            strategy,
            SettleStrategy::SerialPoll {
                poll_interval_ms: 50,
                timeout_ms: 20_000,
                ready_mask: 1
            }
        );
        assert!(SettleStrategy::SerialPoll {
            poll_interval_ms: 50,
            timeout_ms: 20_000,
            ready_mask: 0
        }
        .validate()
        .is_err());
    }
}
