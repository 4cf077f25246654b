#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildwire_report::{
    Dialer, Project, RemoteBuildReporter, ReporterConfig, RetryPolicy, CONNECT_PORT_PROPERTY,
    PROCESS_ID_PROPERTY,
};

/// Everything written to the fake event channel.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<u8>>>);

impl Transcript {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

struct TranscriptWriter(Transcript);

impl Write for TranscriptWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 .0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Dialer whose listener can be switched on and off from the test.
#[derive(Debug, Clone)]
pub struct ScriptedDialer {
    pub listening: Arc<AtomicBool>,
    pub attempts: Arc<AtomicU32>,
    pub transcript: Transcript,
}

impl ScriptedDialer {
    pub fn listening() -> Self {
        Self {
            listening: Arc::new(AtomicBool::new(true)),
            attempts: Arc::new(AtomicU32::new(0)),
            transcript: Transcript::default(),
        }
    }

    pub fn refusing() -> Self {
        let dialer = Self::listening();
        dialer.listening.store(false, Ordering::SeqCst);
        dialer
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Dialer for ScriptedDialer {
    fn dial(&mut self, _host: &str, _port: u16) -> io::Result<Box<dyn Write + Send>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.listening.load(Ordering::SeqCst) {
            Ok(Box::new(TranscriptWriter(self.transcript.clone())))
        } else {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
        }
    }
}

pub fn fast_config() -> ReporterConfig {
    ReporterConfig {
        retry: RetryPolicy {
            attempts: 4,
            backoff: Duration::from_millis(1),
        },
        ..ReporterConfig::default()
    }
}

pub fn project_with_port() -> Project {
    let project = Project::new("demo");
    project.set_property(CONNECT_PORT_PROPERTY, "4100");
    project.set_property(PROCESS_ID_PROPERTY, "77");
    project
}

pub fn reporter(config: ReporterConfig, dialer: &ScriptedDialer) -> RemoteBuildReporter {
    RemoteBuildReporter::with_dialer(config, Box::new(dialer.clone()))
}
