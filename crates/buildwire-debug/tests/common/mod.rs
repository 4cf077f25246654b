#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use buildwire_debug::{
    BuildDriver, BuildScript, DebugBuildReporter, DebugConfig, ReplayOutcome, Supervisor,
    DEBUG_PORT_PROPERTY,
};
use buildwire_report::{CONNECT_PORT_PROPERTY, PROCESS_ID_PROPERTY};
use smol_str::SmolStr;

pub const SCRIPT: &str = r#"
name = "demo"

[[targets]]
name = "compile"

[[targets.tasks]]
name = "javac"
file = "build.xml"
line = 12
messages = [{ text = "Compiling" }]

[[targets]]
name = "package"

[[targets.tasks]]
name = "jar"
file = "build.xml"
line = 20
"#;

/// A target without tasks ahead of one with a task.
pub const TARGETS_SCRIPT: &str = r#"
name = "demo"

[[targets]]
name = "init"

[[targets]]
name = "compile"

[[targets.tasks]]
name = "javac"
file = "build.xml"
line = 12
"#;

/// Records `terminate` instead of exiting the test process.
#[derive(Debug, Default)]
pub struct RecordingSupervisor {
    terminated: AtomicBool,
}

impl RecordingSupervisor {
    pub fn terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

impl Supervisor for RecordingSupervisor {
    fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }
}

pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Event-channel listener collecting every line until the reporter hangs up.
pub fn event_listener() -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        BufReader::new(stream)
            .lines()
            .map_while(Result::ok)
            .collect()
    });
    (port, handle)
}

/// Event-channel listener handing over each line as it arrives.
pub fn event_stream() -> (u16, Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        for line in BufReader::new(stream).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    (port, rx)
}

/// Lines up to and including `marker`.
pub fn events_until(events: &Receiver<String>, marker: &str) -> Vec<String> {
    let mut seen = Vec::new();
    loop {
        let line = events
            .recv_timeout(Duration::from_secs(5))
            .unwrap_or_else(|err| panic!("no '{marker}' after {seen:?}: {err}"));
        let done = line == marker;
        seen.push(line);
        if done {
            return seen;
        }
    }
}

/// The test script wired to the given ports.
pub fn script(event_port: u16, debug_port: Option<u16>) -> BuildScript {
    wire(SCRIPT, event_port, debug_port)
}

/// `text` parsed and wired to the given ports.
pub fn wire(text: &str, event_port: u16, debug_port: Option<u16>) -> BuildScript {
    let mut script = BuildScript::from_toml_str(text).unwrap();
    let properties = &mut script.properties;
    properties.insert(
        SmolStr::new(CONNECT_PORT_PROPERTY),
        SmolStr::new(event_port.to_string()),
    );
    properties.insert(SmolStr::new(PROCESS_ID_PROPERTY), SmolStr::new("77"));
    if let Some(port) = debug_port {
        properties.insert(
            SmolStr::new(DEBUG_PORT_PROPERTY),
            SmolStr::new(port.to_string()),
        );
    }
    script
}

/// Replay `script` on a build thread under a debug reporter.
pub fn spawn_build(
    script: BuildScript,
    supervisor: Arc<RecordingSupervisor>,
) -> JoinHandle<ReplayOutcome> {
    thread::spawn(move || {
        let mut reporter = DebugBuildReporter::with_supervisor(DebugConfig::default(), supervisor);
        BuildDriver::new(script).run(&mut reporter, DebugBuildReporter::is_terminated)
    })
}

/// Test-side end of the control connection.
pub struct ControlClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl ControlClient {
    /// Connect once the build thread starts listening.
    pub fn connect(port: u16) -> Self {
        for _ in 0..500 {
            if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)) {
                stream
                    .set_read_timeout(Some(Duration::from_secs(5)))
                    .unwrap();
                let writer = stream.try_clone().unwrap();
                return Self {
                    reader: BufReader::new(stream),
                    writer,
                };
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("control port {port} never opened");
    }

    pub fn send(&mut self, command: &str) {
        writeln!(self.writer, "{command}").unwrap();
        self.writer.flush().unwrap();
    }

    /// Next response line, or `None` once the build closed the connection.
    pub fn next_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(err) => panic!("control read failed: {err}"),
        }
    }

    pub fn expect_line(&mut self, expected: &str) {
        assert_eq!(self.next_line().as_deref(), Some(expected));
    }
}
