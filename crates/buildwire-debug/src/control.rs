//! Suspend/resume control and execution position.

#![allow(missing_docs)]

use std::sync::Arc;

use buildwire_report::{Target, Task};
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::debug;

use crate::breakpoints::BreakpointSet;
use crate::protocol::{ResumeReason, SuspendReason};
use crate::snapshot::StackFrame;

/// Execution state of the build thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// The build thread is parked inside a lifecycle hook.
    Suspended,
    Terminated,
}

/// Where the build currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPosition {
    pub target: Option<Target>,
    pub task: Option<Task>,
}

#[derive(Debug)]
struct DebugState {
    run_state: RunState,
    /// A control client is connected and can release a suspended build.
    attached: bool,
    breakpoints: BreakpointSet,
    step_requested: bool,
    client_suspend_requested: bool,
    position: ExecutionPosition,
    last_suspend: Option<SuspendReason>,
}

/// Shared debug control.
///
/// The build thread parks in [`DebugControl::check_boundary`] while the
/// control reader thread flips flags and wakes it. All state sits behind one
/// mutex/condvar pair.
#[derive(Debug, Clone)]
pub struct DebugControl {
    state: Arc<(Mutex<DebugState>, Condvar)>,
}

impl Default for DebugControl {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugControl {
    /// Create a detached control in running mode.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new((
                Mutex::new(DebugState {
                    run_state: RunState::Running,
                    attached: false,
                    breakpoints: BreakpointSet::new(),
                    step_requested: false,
                    client_suspend_requested: false,
                    position: ExecutionPosition::default(),
                    last_suspend: None,
                }),
                Condvar::new(),
            )),
        }
    }

    /// Mark a control client as connected.
    pub fn attach(&self) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock();
        if state.run_state != RunState::Terminated {
            state.attached = true;
        }
    }

    /// The control client went away: release a suspended build and never
    /// suspend again.
    pub fn detach(&self) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        state.attached = false;
        state.step_requested = false;
        state.client_suspend_requested = false;
        if state.run_state == RunState::Suspended {
            state.run_state = RunState::Running;
        }
        cvar.notify_all();
        debug!("debug control detached");
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        let (lock, _) = &*self.state;
        lock.lock().attached
    }

    #[must_use]
    pub fn run_state(&self) -> RunState {
        let (lock, _) = &*self.state;
        lock.lock().run_state
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.run_state() == RunState::Suspended
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.run_state() == RunState::Terminated
    }

    #[must_use]
    pub fn last_suspend(&self) -> Option<SuspendReason> {
        let (lock, _) = &*self.state;
        lock.lock().last_suspend
    }

    pub fn add_breakpoint(&self, line: u32) -> bool {
        let (lock, _) = &*self.state;
        lock.lock().breakpoints.add(line)
    }

    pub fn remove_breakpoint(&self, line: u32) -> bool {
        let (lock, _) = &*self.state;
        lock.lock().breakpoints.remove(line)
    }

    /// Snapshot current breakpoint lines.
    #[must_use]
    pub fn breakpoints(&self) -> Vec<u32> {
        let (lock, _) = &*self.state;
        lock.lock().breakpoints.iter().collect()
    }

    /// Ask for a suspend at the next boundary.
    pub fn request_suspend(&self) {
        let (lock, _) = &*self.state;
        lock.lock().client_suspend_requested = true;
    }

    /// Release the build and suspend again at the next boundary.
    ///
    /// `ack` runs before the build thread can observe the release, so the
    /// acknowledgment always precedes the next suspend notification.
    pub fn step(&self, ack: impl FnOnce(ResumeReason)) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        if state.run_state == RunState::Terminated {
            return;
        }
        state.step_requested = true;
        state.run_state = RunState::Running;
        ack(ResumeReason::Step);
        cvar.notify_all();
    }

    /// Release the build. `ack` is ordered like in [`DebugControl::step`].
    pub fn resume(&self, ack: impl FnOnce(ResumeReason)) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        if state.run_state == RunState::Terminated {
            return;
        }
        state.run_state = RunState::Running;
        ack(ResumeReason::ClientRequest);
        cvar.notify_all();
    }

    /// Enter the terminal state and release the build thread.
    pub fn terminate(&self) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        state.run_state = RunState::Terminated;
        state.attached = false;
        cvar.notify_all();
    }

    pub fn enter_target(&self, target: Target) {
        let (lock, _) = &*self.state;
        lock.lock().position.target = Some(target);
    }

    pub fn leave_target(&self) {
        let (lock, _) = &*self.state;
        lock.lock().position.target = None;
    }

    pub fn enter_task(&self, task: Task) {
        let (lock, _) = &*self.state;
        lock.lock().position.task = Some(task);
    }

    pub fn leave_task(&self) {
        let (lock, _) = &*self.state;
        lock.lock().position.task = None;
    }

    #[must_use]
    pub fn position(&self) -> ExecutionPosition {
        let (lock, _) = &*self.state;
        lock.lock().position.clone()
    }

    /// Stack frame for the current task, if one is running.
    #[must_use]
    pub fn stack_frame(&self) -> Option<StackFrame> {
        let (lock, _) = &*self.state;
        let state = lock.lock();
        StackFrame::for_position(&state.position)
    }

    /// Decide whether the build suspends at this boundary and park the
    /// calling thread if so.
    ///
    /// Priority: breakpoint on the current task's line, then a pending step,
    /// then a pending client request. Step and client flags are consumed only
    /// when they cause the suspend. `notify` runs under the lock before the
    /// thread parks.
    pub fn check_boundary(&self, notify: impl FnOnce(SuspendReason)) -> Option<SuspendReason> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        if !state.attached || state.run_state != RunState::Running {
            return None;
        }
        let breakpoint = state
            .position
            .task
            .as_ref()
            .and_then(Task::line)
            .filter(|line| state.breakpoints.contains(*line));
        let reason = if let Some(line) = breakpoint {
            SuspendReason::Breakpoint(line)
        } else if state.step_requested {
            state.step_requested = false;
            SuspendReason::Step
        } else if state.client_suspend_requested {
            state.client_suspend_requested = false;
            SuspendReason::ClientRequest
        } else {
            return None;
        };
        park(cvar, &mut state, reason, notify);
        Some(reason)
    }

    /// Suspend unconditionally if a client is attached.
    pub fn suspend_now(&self, reason: SuspendReason, notify: impl FnOnce(SuspendReason)) -> bool {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        if !state.attached || state.run_state != RunState::Running {
            return false;
        }
        park(cvar, &mut state, reason, notify);
        true
    }
}

fn park(
    cvar: &Condvar,
    state: &mut MutexGuard<'_, DebugState>,
    reason: SuspendReason,
    notify: impl FnOnce(SuspendReason),
) {
    state.run_state = RunState::Suspended;
    state.last_suspend = Some(reason);
    debug!(%reason, "build suspended");
    notify(reason);
    while state.run_state == RunState::Suspended {
        cvar.wait(state);
    }
    debug!(state = ?state.run_state, "build released");
}
