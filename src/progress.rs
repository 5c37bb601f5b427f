//! Console progress for provisioning runs.

use crate::ui;
use declarative::{ProgressCallback, StepDescriptor, StepError, StepResult, StepStatus};
use std::time::Duration;

/// Prints one line per step, plus retry notices
pub struct ConsoleProgress {
    quiet: bool,
}

impl ConsoleProgress {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_step_start(&mut self, index: usize, total: usize, step: &StepDescriptor) {
        if !self.quiet {
            ui::step(index + 1, total, &step.description());
        }
    }

    fn on_retry(
        &mut self,
        step: &StepDescriptor,
        attempt: u32,
        max_attempts: u32,
        error: &StepError,
        delay: Duration,
    ) {
        ui::warn(&format!(
            "{} attempt {attempt}/{max_attempts} failed: {error} (retrying in {})",
            step.id(),
            ui::format_duration(delay)
        ));
    }

    fn on_step_complete(&mut self, step: &StepDescriptor, result: &StepResult) {
        match result.status {
            StepStatus::Failed => ui::error(&format!(
                "{} failed: {}",
                step.id(),
                result.last_error.as_deref().unwrap_or("unknown error")
            )),
            _ if self.quiet => {}
            status => ui::dim(&format!("{} {}", ui::status_label(status), step.id())),
        }
    }
}
