//! Outbound event channel.
//! - RetryPolicy: bounded connect attempts with a fixed pause
//! - Dialer/TcpDialer: how a connection is opened
//! - EventChannel: shared line writer with its connection state

#![allow(missing_docs)]

use std::fmt;
use std::io::{self, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::ReportError;

/// Lifecycle of a connection. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Connected,
    Closed,
}

/// Connection attempts before the channel is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Pause between two attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 4,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Opens the outbound stream.
pub trait Dialer: Send {
    fn dial(&mut self, host: &str, port: u16) -> io::Result<Box<dyn Write + Send>>;
}

/// Plain TCP dialer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    fn dial(&mut self, host: &str, port: u16) -> io::Result<Box<dyn Write + Send>> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

struct ChannelInner {
    state: ConnectionState,
    writer: Option<Box<dyn Write + Send>>,
}

/// Newline-delimited outbound channel.
///
/// Cloning yields another handle to the same connection, so a control thread
/// can close the channel the build thread writes to.
#[derive(Clone)]
pub struct EventChannel {
    inner: Arc<Mutex<ChannelInner>>,
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventChannel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChannelInner {
                state: ConnectionState::Unconnected,
                writer: None,
            })),
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Connect under `policy`. Only an `Unconnected` channel dials; on
    /// failure the channel is closed for good.
    pub fn connect(
        &self,
        dialer: &mut dyn Dialer,
        host: &str,
        port: u16,
        policy: RetryPolicy,
    ) -> Result<(), ReportError> {
        {
            let mut inner = self.inner.lock();
            match inner.state {
                ConnectionState::Unconnected => inner.state = ConnectionState::Connecting,
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting | ConnectionState::Closed => {
                    return Err(ReportError::ChannelClosed);
                }
            }
        }

        let mut last_error = None;
        for attempt in 1..=policy.attempts {
            match dialer.dial(host, port) {
                Ok(writer) => {
                    let mut inner = self.inner.lock();
                    if inner.state != ConnectionState::Connecting {
                        return Err(ReportError::ChannelClosed);
                    }
                    inner.state = ConnectionState::Connected;
                    inner.writer = Some(writer);
                    debug!(host, port, attempt, "event channel connected");
                    return Ok(());
                }
                Err(err) => {
                    debug!(host, port, attempt, error = %err, "event channel connect failed");
                    last_error = Some(err);
                }
            }
            if attempt < policy.attempts {
                thread::sleep(policy.backoff);
            }
        }

        self.close();
        let source = last_error.unwrap_or_else(|| io::Error::other("no connection attempts"));
        Err(ReportError::ConnectFailed {
            addr: format!("{host}:{port}"),
            attempts: policy.attempts,
            source,
        })
    }

    /// Write one line. Returns false when the line was dropped.
    pub fn send_line(&self, line: &str) -> bool {
        let mut inner = self.inner.lock();
        let Some(writer) = inner.writer.as_mut() else {
            return false;
        };
        let written = writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush());
        match written {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "event channel write failed; closing");
                inner.writer = None;
                inner.state = ConnectionState::Closed;
                false
            }
        }
    }

    /// Close the channel. Later sends and connects are no-ops.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if let Some(mut writer) = inner.writer.take() {
            let _ = writer.flush();
        }
        inner.state = ConnectionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Refusing {
        calls: u32,
    }

    impl Dialer for Refusing {
        fn dial(&mut self, _host: &str, _port: u16) -> io::Result<Box<dyn Write + Send>> {
            self.calls += 1;
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
        }
    }

    struct SinkDialer;

    impl Dialer for SinkDialer {
        fn dial(&mut self, _host: &str, _port: u16) -> io::Result<Box<dyn Write + Send>> {
            Ok(Box::new(io::sink()))
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            attempts: 4,
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn failed_connect_closes_channel_for_good() {
        let channel = EventChannel::new();
        let mut dialer = Refusing { calls: 0 };
        let err = channel.connect(&mut dialer, "127.0.0.1", 1, fast()).unwrap_err();
        assert!(matches!(err, ReportError::ConnectFailed { attempts: 4, .. }));
        assert_eq!(dialer.calls, 4);
        assert_eq!(channel.state(), ConnectionState::Closed);

        assert!(channel.connect(&mut SinkDialer, "127.0.0.1", 1, fast()).is_err());
        assert!(!channel.send_line("dropped"));
    }

    #[test]
    fn close_drops_later_writes() {
        let channel = EventChannel::new();
        channel.connect(&mut SinkDialer, "127.0.0.1", 1, fast()).unwrap();
        assert!(channel.send_line("hello"));
        channel.clone().close();
        assert!(!channel.send_line("hello"));
        assert_eq!(channel.state(), ConnectionState::Closed);
    }
}
