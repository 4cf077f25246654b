//! Build listener trait.

use crate::event::BuildEvent;

/// Lifecycle hooks called synchronously by the build execution thread.
///
/// Hooks return nothing: a listener can never change the build outcome.
pub trait BuildListener {
    /// Called once before the first target runs.
    fn build_started(&mut self, event: &BuildEvent);

    /// Called once after the last target, with the failure if any.
    fn build_finished(&mut self, event: &BuildEvent);

    /// Called when a target begins.
    fn target_started(&mut self, event: &BuildEvent);

    /// Called when a target ends.
    fn target_finished(&mut self, _event: &BuildEvent) {}

    /// Called when a task begins.
    fn task_started(&mut self, _event: &BuildEvent) {}

    /// Called when a task ends.
    fn task_finished(&mut self, _event: &BuildEvent) {}

    /// Called for every message logged by the build, a target, or a task.
    fn message_logged(&mut self, event: &BuildEvent);
}
