//! Termination seam.

use tracing::info;

/// Exit status used when a control client terminates the build.
pub const TERMINATED_EXIT_CODE: i32 = 1;

/// Owner of the hosting process.
///
/// Invoked from the control reader thread after both channels are closed,
/// when a client sends `terminate`.
pub trait Supervisor: Send + Sync {
    /// Abort the build. May not return.
    fn terminate(&self);
}

/// Ends the hosting process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExitProcess;

impl Supervisor for ExitProcess {
    fn terminate(&self) {
        info!("build terminated by control client");
        std::process::exit(TERMINATED_EXIT_CODE);
    }
}
