//! Event reporter with a debug control channel.

use std::sync::Arc;
use std::thread::JoinHandle;

use buildwire_report::{BuildEvent, BuildListener, Project, RemoteBuildReporter, ReportError};
use smol_str::SmolStr;
use tracing::{debug, info, warn};

use crate::channel::{accept_control, ControlChannel, ControlReader};
use crate::config::DebugConfig;
use crate::control::DebugControl;
use crate::error::DebugError;
use crate::protocol::{
    encode_suspended, SuspendReason, BUILD_FINISHED, BUILD_STARTED, TARGET_FINISHED,
    TARGET_STARTED, TASK_FINISHED, TASK_STARTED,
};
use crate::snapshot::KnownProperties;
use crate::supervisor::{ExitProcess, Supervisor};

/// Wraps a [`RemoteBuildReporter`] and lets a control client suspend the
/// build at target and task boundaries.
///
/// Every hook first delegates to the reporter, then sends its milestone
/// marker on the event channel, then evaluates the suspend predicate. The
/// build thread parks inside the hook while suspended.
pub struct DebugBuildReporter {
    reporter: RemoteBuildReporter,
    config: DebugConfig,
    control: DebugControl,
    channel: Arc<ControlChannel>,
    supervisor: Arc<dyn Supervisor>,
    reader: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for DebugBuildReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugBuildReporter")
            .field("reporter", &self.reporter)
            .field("config", &self.config)
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

impl DebugBuildReporter {
    /// Reporter whose `terminate` command exits the process.
    #[must_use]
    pub fn new(config: DebugConfig) -> Self {
        Self::with_supervisor(config, Arc::new(ExitProcess))
    }

    /// Reporter that routes `terminate` to `supervisor`.
    #[must_use]
    pub fn with_supervisor(config: DebugConfig, supervisor: Arc<dyn Supervisor>) -> Self {
        let reporter = RemoteBuildReporter::new(config.report.clone());
        Self::with_reporter(reporter, config, supervisor)
    }

    /// Use an already configured event reporter.
    #[must_use]
    pub fn with_reporter(
        reporter: RemoteBuildReporter,
        config: DebugConfig,
        supervisor: Arc<dyn Supervisor>,
    ) -> Self {
        Self {
            reporter,
            config,
            control: DebugControl::new(),
            channel: Arc::new(ControlChannel::new()),
            supervisor,
            reader: None,
        }
    }

    /// Handle to the shared suspend state.
    #[must_use]
    pub fn control(&self) -> &DebugControl {
        &self.control
    }

    /// The wrapped event reporter.
    #[must_use]
    pub fn reporter(&self) -> &RemoteBuildReporter {
        &self.reporter
    }

    /// A control client sent `terminate`.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.control.is_terminated()
    }

    fn open_control(&mut self, project: &Project) -> Result<(), DebugError> {
        let port = resolve_debug_port(project, &self.config.port_property)?;
        let stream = accept_control(&self.config.bind_host, port)?;
        let read_half = stream.try_clone()?;
        self.channel.install(stream);
        self.control.attach();
        let reader = ControlReader {
            control: self.control.clone(),
            channel: Arc::clone(&self.channel),
            events: self.reporter.channel().clone(),
            project: project.clone(),
            supervisor: Arc::clone(&self.supervisor),
            known: KnownProperties::new(),
        };
        self.reader = Some(reader.spawn(read_half)?);
        info!(port, "control channel ready");
        Ok(())
    }

    fn close_control(&mut self) {
        self.channel.close();
        self.control.detach();
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("control reader panicked");
            }
        }
    }

    fn suspend_at_boundary(&self) {
        let channel = &self.channel;
        self.control.check_boundary(|reason| {
            channel.send_line(&encode_suspended(reason));
        });
    }
}

fn resolve_debug_port(project: &Project, property: &str) -> Result<u16, ReportError> {
    let value = project
        .property(property)
        .ok_or_else(|| ReportError::MissingPort(SmolStr::new(property)))?;
    match value.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ReportError::InvalidPort {
            property: SmolStr::new(property),
            value,
        }),
    }
}

impl BuildListener for DebugBuildReporter {
    fn build_started(&mut self, event: &BuildEvent) {
        self.reporter.build_started(event);
        self.reporter.send_marker(BUILD_STARTED);
        match self.open_control(&event.project) {
            Ok(()) => {
                let channel = &self.channel;
                self.control
                    .suspend_now(SuspendReason::ClientRequest, |reason| {
                        channel.send_line(&encode_suspended(reason));
                    });
            }
            Err(err) => {
                debug!(error = %err, "control channel disabled");
                self.channel.close();
            }
        }
    }

    fn build_finished(&mut self, event: &BuildEvent) {
        self.reporter.send_marker(BUILD_FINISHED);
        self.reporter.build_finished(event);
        self.close_control();
    }

    fn target_started(&mut self, event: &BuildEvent) {
        self.reporter.target_started(event);
        self.reporter.send_marker(TARGET_STARTED);
        if let Some(target) = event.target_ref() {
            self.control.enter_target(target.clone());
        }
        self.suspend_at_boundary();
    }

    fn target_finished(&mut self, event: &BuildEvent) {
        self.reporter.target_finished(event);
        self.reporter.send_marker(TARGET_FINISHED);
        self.control.leave_target();
        self.suspend_at_boundary();
    }

    fn task_started(&mut self, event: &BuildEvent) {
        self.reporter.task_started(event);
        self.reporter.send_marker(TASK_STARTED);
        if let Some(task) = event.task_ref() {
            self.control.enter_task(task.clone());
        }
        self.suspend_at_boundary();
    }

    fn task_finished(&mut self, event: &BuildEvent) {
        self.reporter.task_finished(event);
        self.reporter.send_marker(TASK_FINISHED);
        self.control.leave_task();
        self.suspend_at_boundary();
    }

    fn message_logged(&mut self, event: &BuildEvent) {
        self.reporter.message_logged(event);
    }
}

impl Drop for DebugBuildReporter {
    fn drop(&mut self) {
        self.close_control();
    }
}
