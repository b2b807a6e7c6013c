//! Mock transport for testing
//!
//! Scripted instrument replies without hardware. It provides:
//! - Per-command reply queues (the last reply repeats)
//! - A scripted GPIB status byte sequence for serial polls
//! - Controllable failure injection
//! - Call logging for test verification
//!
//! Clones share state, so a test can keep one handle while a driver owns the
//! boxed other.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use super::Transport;
use crate::error::{AppResult, BenchError};

/// Call log entry for a device clear.
pub const LOG_CLEAR: &str = "<clear>";
/// Call log entry for a serial poll.
pub const LOG_SERIAL_POLL: &str = "<spoll>";
/// Call log entry for close.
pub const LOG_CLOSE: &str = "<close>";

#[derive(Default)]
struct MockState {
    replies: HashMap<String, VecDeque<String>>,
    pending: VecDeque<String>,
    status_bytes: VecDeque<u8>,
    call_log: Vec<String>,
    fail_next: bool,
    closed: bool,
}

/// Mock instrument link
///
/// # Example
///
/// ```
/// use bench_daq::hardware::{MockTransport, Transport};
///
/// # tokio_test();
/// # fn tokio_test() {
/// # let rt = tokio::runtime::Runtime::new().unwrap();
/// # rt.block_on(async {
/// let mock = MockTransport::new().with_reply("*IDN?", "Agilent,N8975A");
/// let mut link: Box<dyn Transport> = Box::new(mock.clone());
/// assert_eq!(link.query("*IDN?").await.unwrap(), "Agilent,N8975A");
/// assert_eq!(mock.commands(), vec!["*IDN?"]);
/// # });
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Mock with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `reply` for `command`.
    pub fn with_reply(self, command: &str, reply: &str) -> Self {
        self.push_reply(command, reply);
        self
    }

    /// Queue `reply` for `command` on a shared handle.
    pub fn push_reply(&self, command: &str, reply: &str) {
        self.state
            .lock()
            .replies
            .entry(command.to_string())
            .or_default()
            .push_back(reply.to_string());
    }

    /// Status bytes returned by successive serial polls; the last repeats.
    pub fn with_status_bytes(self, bytes: &[u8]) -> Self {
        self.state.lock().status_bytes.extend(bytes.iter().copied());
        self
    }

    /// Make the next operation fail with a transport error.
    pub fn inject_next_failure(&self) {
        self.state.lock().fail_next = true;
    }

    /// Every operation so far, commands verbatim and control operations as
    /// [`LOG_CLEAR`], [`LOG_SERIAL_POLL`] and [`LOG_CLOSE`].
    pub fn call_log(&self) -> Vec<String> {
        self.state.lock().call_log.clone()
    }

    /// Only the commands written, in order.
    pub fn commands(&self) -> Vec<String> {
        self.call_log()
            .into_iter()
            .filter(|c| ![LOG_CLEAR, LOG_SERIAL_POLL, LOG_CLOSE].contains(&c.as_str()))
            .collect()
    }

    /// Forget every logged call.
    pub fn clear_log(&self) {
        self.state.lock().call_log.clear();
    }

    /// True once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn begin(&self, entry: &str) -> AppResult<parking_lot::MutexGuard<'_, MockState>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(BenchError::NotConnected);
        }
        state.call_log.push(entry.to_string());
        if std::mem::take(&mut state.fail_next) {
            return Err(BenchError::Transport(format!(
                "injected failure on '{}'",
                entry
            )));
        }
        Ok(state)
    }
}

fn next_sticky<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&mut self, command: &str) -> AppResult<()> {
        let mut state = self.begin(command)?;
        let reply = state.replies.get_mut(command).and_then(next_sticky);
        if let Some(reply) = reply {
            state.pending.push_back(reply);
        }
        Ok(())
    }

    async fn read_response(&mut self) -> AppResult<String> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(BenchError::NotConnected);
        }
        state.pending.pop_front().ok_or_else(|| {
            let last = state.call_log.last().cloned().unwrap_or_default();
            BenchError::timeout(format!("read after '{}'", last), Duration::ZERO)
        })
    }

    async fn serial_poll(&mut self) -> AppResult<u8> {
        let mut state = self.begin(LOG_SERIAL_POLL)?;
        Ok(next_sticky(&mut state.status_bytes).unwrap_or(0))
    }

    async fn clear(&mut self) -> AppResult<()> {
        drop(self.begin(LOG_CLEAR)?);
        Ok(())
    }

    async fn close(&mut self) -> AppResult<()> {
        let mut state = self.begin(LOG_CLOSE)?;
        state.closed = true;
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_are_queued_and_last_repeats() {
        let mut mock = MockTransport::new()
            .with_reply("SENS:SWE:POIN?", "11")
            .with_reply("SENS:SWE:POIN?", "21");
        assert_eq!(mock.query("SENS:SWE:POIN?").await.unwrap(), "11");
        assert_eq!(mock.query("SENS:SWE:POIN?").await.unwrap(), "21");
        assert_eq!(mock.query("SENS:SWE:POIN?").await.unwrap(), "21");
    }

    #[tokio::test]
    async fn test_clear_is_logged_and_link_stays_usable() {
        let mut mock = MockTransport::new().with_reply("*IDN?", "N8975A");
        mock.clear().await.unwrap();
        assert_eq!(mock.query("*IDN?").await.unwrap(), "N8975A");
        assert_eq!(mock.call_log(), vec![LOG_CLEAR, "*IDN?"]);
        assert_eq!(mock.commands(), vec!["*IDN?"]);
    }

    #[tokio::test]
    async fn test_unscripted_read_times_out() {
        let mut mock = MockTransport::new();
        mock.write("BC;").await.unwrap();
        let err = mock.read_response().await.unwrap_err();
        assert!(matches!(err, BenchError::Timeout { .. }));
        assert!(err.to_string().contains("BC;"));
    }

    #[tokio::test]
    async fn test_call_log_and_close() {
        let handle = MockTransport::new().with_status_bytes(&[0, 1]);
        let mut link: Box<dyn Transport> = Box::new(handle.clone());
        link.clear().await.unwrap();
        link.write("*RST").await.unwrap();
        assert_eq!(link.serial_poll().await.unwrap(), 0);
        assert_eq!(link.serial_poll().await.unwrap(), 1);
        assert_eq!(link.serial_poll().await.unwrap(), 1);
        link.close().await.unwrap();

        assert_eq!(
            handle.call_log(),
            vec![
                LOG_CLEAR,
                "*RST",
                LOG_SERIAL_POLL,
                LOG_SERIAL_POLL,
                LOG_SERIAL_POLL,
                LOG_CLOSE
            ]
        );
        assert_eq!(handle.commands(), vec!["*RST"]);
        assert!(handle.is_closed());
        assert!(matches!(
            link.write("*CLS").await,
            Err(BenchError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mut mock = MockTransport::new();
        mock.inject_next_failure();
        assert!(mock.write("ID").await.is_err());
        assert!(mock.write("ID").await.is_ok());
    }
}
