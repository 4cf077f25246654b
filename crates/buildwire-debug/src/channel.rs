//! Control channel transport.
//! - accept_control: bind and accept the single control client
//! - ControlChannel: serialized line writer shared by both threads
//! - ControlReader: background command loop

#![allow(missing_docs)]

use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use buildwire_report::{EventChannel, Project};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::control::DebugControl;
use crate::error::DebugError;
use crate::protocol::{encode_resumed, ControlCommand};
use crate::snapshot::KnownProperties;
use crate::supervisor::Supervisor;

/// Longest a suspend notification or response may block on a client that
/// stopped reading. A timed out write closes the channel.
pub const CONTROL_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Bind `host:port` and wait for one control client.
pub fn accept_control(host: &str, port: u16) -> Result<TcpStream, DebugError> {
    let listener = TcpListener::bind((host, port))?;
    let (stream, peer) = listener.accept()?;
    stream.set_nodelay(true)?;
    stream.set_write_timeout(Some(CONTROL_WRITE_TIMEOUT))?;
    info!(%peer, "control client connected");
    Ok(stream)
}

/// Outbound half of the control connection.
///
/// Responses come from the reader thread and suspend notifications from the
/// build thread; one mutex keeps their lines whole.
#[derive(Debug, Default)]
pub struct ControlChannel {
    writer: Mutex<Option<TcpStream>>,
}

impl ControlChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, stream: TcpStream) {
        *self.writer.lock() = Some(stream);
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.writer.lock().is_some()
    }

    /// Write one line. Returns false when the line was dropped.
    pub fn send_line(&self, line: &str) -> bool {
        let mut writer = self.writer.lock();
        let Some(stream) = writer.as_mut() else {
            return false;
        };
        match writeln!(stream, "{line}").and_then(|()| stream.flush()) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "control channel write failed; closing");
                if let Some(stream) = writer.take() {
                    let _ = stream.shutdown(Shutdown::Both);
                }
                false
            }
        }
    }

    /// Shut the socket down, which also ends the reader loop.
    pub fn close(&self) {
        if let Some(stream) = self.writer.lock().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Decodes control commands for the lifetime of the control connection.
pub(crate) struct ControlReader {
    pub control: DebugControl,
    pub channel: Arc<ControlChannel>,
    pub events: EventChannel,
    pub project: Project,
    pub supervisor: Arc<dyn Supervisor>,
    pub known: KnownProperties,
}

impl ControlReader {
    pub fn spawn(self, stream: TcpStream) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("buildwire-control".into())
            .spawn(move || self.run(BufReader::new(stream)))
    }

    /// Read until the stream ends, a read fails, a command is malformed or
    /// the client terminates the build.
    pub fn run(mut self, reader: impl BufRead) {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    debug!(error = %err, "control read failed");
                    break;
                }
            };
            match ControlCommand::parse(&line) {
                Ok(Some(command)) => {
                    if self.dispatch(command).is_break() {
                        return;
                    }
                }
                Ok(None) => debug!(%line, "ignoring unknown control command"),
                Err(err) => {
                    warn!(error = %err, "control protocol error");
                    break;
                }
            }
        }
        info!("control client gone; build continues unsupervised");
        self.control.detach();
        self.channel.close();
    }

    fn dispatch(&mut self, command: ControlCommand) -> ControlFlow<()> {
        debug!(?command, "control command");
        match command {
            ControlCommand::Step => {
                let channel = &self.channel;
                self.control.step(|reason| {
                    channel.send_line(&encode_resumed(reason));
                });
            }
            ControlCommand::Suspend => self.control.request_suspend(),
            ControlCommand::Resume => {
                let channel = &self.channel;
                self.control.resume(|reason| {
                    channel.send_line(&encode_resumed(reason));
                });
            }
            ControlCommand::Terminate => {
                self.channel.close();
                self.events.close();
                self.control.terminate();
                self.supervisor.terminate();
                return ControlFlow::Break(());
            }
            ControlCommand::Stack => {
                if let Some(frame) = self.control.stack_frame() {
                    self.channel.send_line(&frame.encode());
                }
            }
            ControlCommand::AddBreakpoint(line) => {
                self.control.add_breakpoint(line);
            }
            ControlCommand::RemoveBreakpoint(line) => {
                self.control.remove_breakpoint(line);
            }
            ControlCommand::Properties => {
                let snapshot = self.known.snapshot(&self.project.properties());
                self.channel.send_line(&snapshot);
            }
        }
        ControlFlow::Continue(())
    }
}
