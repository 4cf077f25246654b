//! Remote build event reporter.

use std::time::Instant;

use smol_str::SmolStr;
use tracing::{debug, info, warn};

use crate::channel::{ConnectionState, Dialer, EventChannel, TcpDialer};
use crate::config::ReporterConfig;
use crate::error::ReportError;
use crate::event::{BuildEvent, BuildFailure, Priority, Project};
use crate::listener::BuildListener;
use crate::wire::{self, MARKER_LEVEL};

/// Forwards build lifecycle events to a listener over the event channel.
///
/// The listener's port is a build property, so nothing can be sent until the
/// build has started. Messages logged before then are queued and replayed
/// once, right after the process identifier.
pub struct RemoteBuildReporter {
    config: ReporterConfig,
    channel: EventChannel,
    dialer: Box<dyn Dialer>,
    pending: Option<Vec<BuildEvent>>,
    started_at: Instant,
}

impl std::fmt::Debug for RemoteBuildReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBuildReporter")
            .field("config", &self.config)
            .field("channel", &self.channel)
            .field("pending", &self.pending.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

impl RemoteBuildReporter {
    /// Reporter dialing the listener over TCP.
    #[must_use]
    pub fn new(config: ReporterConfig) -> Self {
        Self::with_dialer(config, Box::new(TcpDialer))
    }

    /// Reporter connecting through `dialer`.
    #[must_use]
    pub fn with_dialer(config: ReporterConfig, dialer: Box<dyn Dialer>) -> Self {
        Self {
            config,
            channel: EventChannel::new(),
            dialer,
            pending: None,
            started_at: Instant::now(),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// Handle to the event channel.
    #[must_use]
    pub fn channel(&self) -> &EventChannel {
        &self.channel
    }

    /// Number of events waiting for the connection (primarily for tests).
    #[doc(hidden)]
    #[must_use]
    pub fn queued_events(&self) -> usize {
        self.pending.as_ref().map_or(0, Vec::len)
    }

    /// Send a debug milestone marker as a plain message with level -1.
    pub fn send_marker(&self, marker: &str) {
        self.channel
            .send_line(&wire::encode_plain(MARKER_LEVEL, marker));
    }

    /// Close the event channel and drop anything still queued.
    pub fn close(&mut self) {
        self.pending = None;
        self.channel.close();
    }

    fn establish_connection(&mut self, event: &BuildEvent) {
        if self.channel.state() != ConnectionState::Unconnected {
            return;
        }
        let port = match resolve_port(&event.project, &self.config.port_property) {
            Ok(port) => port,
            Err(err) => {
                debug!(error = %err, "event reporting disabled");
                self.close();
                return;
            }
        };
        if let Err(err) = self.channel.connect(
            self.dialer.as_mut(),
            &self.config.host,
            port,
            self.config.retry,
        ) {
            warn!(error = %err, "event reporting disabled");
            self.pending = None;
            return;
        }

        let process_id = event
            .project
            .property(&self.config.process_id_property)
            .unwrap_or_else(|| SmolStr::new(std::process::id().to_string()));
        self.channel.send_line(&wire::encode_process_id(&process_id));
        info!(port, %process_id, "event channel ready");

        if let Some(pending) = self.pending.take() {
            debug!(count = pending.len(), "replaying queued events");
            for queued in &pending {
                self.marshal(queued);
            }
        }
    }

    fn log_message(&mut self, event: &BuildEvent) {
        if !event.priority.passes(self.config.message_output_level) {
            return;
        }
        match self.channel.state() {
            ConnectionState::Connected => self.marshal(event),
            ConnectionState::Unconnected | ConnectionState::Connecting => {
                self.pending.get_or_insert_with(Vec::new).push(event.clone());
            }
            ConnectionState::Closed => {}
        }
    }

    fn marshal(&self, event: &BuildEvent) {
        let Some(message) = event.message.as_deref() else {
            return;
        };
        let level = event.priority.level();
        match event.task_ref() {
            Some(task) if !self.config.emacs_mode => {
                for line in wire::split_lines(message) {
                    self.channel.send_line(&wire::encode_task(
                        level,
                        &task.name,
                        line,
                        task.location.as_ref(),
                    ));
                }
            }
            _ => {
                for line in wire::split_lines(message) {
                    self.channel.send_line(&wire::encode_plain(level, line));
                }
            }
        }
    }
}

fn resolve_port(project: &Project, property: &str) -> Result<u16, ReportError> {
    let value = project
        .property(property)
        .ok_or_else(|| ReportError::MissingPort(SmolStr::new(property)))?;
    value
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| ReportError::InvalidPort {
            property: SmolStr::new(property),
            value,
        })
}

impl BuildListener for RemoteBuildReporter {
    fn build_started(&mut self, event: &BuildEvent) {
        self.started_at = Instant::now();
        self.establish_connection(event);
    }

    fn build_finished(&mut self, event: &BuildEvent) {
        if let Some(BuildFailure::Failed(message)) = &event.failure {
            let failure = BuildEvent::build(&event.project)
                .with_message(format!("BUILD FAILED\n{message}"), Priority::Error);
            self.log_message(&failure);
        }
        let summary = BuildEvent::build(&event.project).with_message(
            format!("Total time: {}", wire::format_elapsed(self.started_at.elapsed())),
            self.config.message_output_level,
        );
        self.log_message(&summary);
        self.close();
    }

    fn target_started(&mut self, event: &BuildEvent) {
        self.establish_connection(event);
        if let Some(target) = event.target_ref() {
            if Priority::Info.passes(self.config.message_output_level) {
                let line = BuildEvent::build(&event.project)
                    .with_message(format!("{}:", target.name), Priority::Info);
                self.log_message(&line);
            }
        }
    }

    fn message_logged(&mut self, event: &BuildEvent) {
        // help output arrives without a build or target start to connect on
        if event.priority == Priority::ProjectHelp {
            self.establish_connection(event);
        }
        self.log_message(event);
    }
}
