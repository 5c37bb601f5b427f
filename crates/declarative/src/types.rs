//! Core types for step execution and state tracking

use crate::backoff::BackoffConfig;
use crate::error::StepError;
use crate::step::{StepDescriptor, short_fingerprint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a step in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not attempted (yet)
    Pending,
    /// Applied and verified
    Applied,
    /// Already applied with the same fingerprint
    Skipped,
    /// Gave up after the allowed attempts, or failed fatally
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Recorded result of executing one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    /// Fingerprint of the descriptor this result was produced for
    pub fingerprint: String,
    pub status: StepStatus,
    /// Attempts made in the run that produced this result
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StepResult {
    fn new(step: &StepDescriptor, status: StepStatus) -> Self {
        Self {
            step_id: step.id().to_string(),
            fingerprint: step.fingerprint().to_string(),
            status,
            attempts: 0,
            last_error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn pending(step: &StepDescriptor) -> Self {
        Self::new(step, StepStatus::Pending)
    }

    pub fn skipped(step: &StepDescriptor) -> Self {
        Self::new(step, StepStatus::Skipped)
    }

    /// Whether this record means `step` needs no work.
    ///
    /// Only an Applied record with an identical fingerprint counts; any drift
    /// in the parameters forces re-application.
    pub fn satisfies(&self, step: &StepDescriptor) -> bool {
        self.status == StepStatus::Applied && self.fingerprint == step.fingerprint()
    }

    pub fn mark_applied(&mut self) {
        self.status = StepStatus::Applied;
        self.last_error = None;
        self.timestamp = Utc::now();
    }

    pub fn mark_failed(&mut self, error: &StepError) {
        self.status = StepStatus::Failed;
        self.last_error = Some(error.to_string());
        self.timestamp = Utc::now();
    }
}

/// What to do with the rest of the plan once a step has failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop; later steps usually depend on earlier ones
    #[default]
    Abort,
    /// Keep going with the remaining steps
    Continue,
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just report what would run
    pub dry_run: bool,
    /// Attempts per step before giving up (network waits always get one)
    pub max_attempts: u32,
    /// Delay schedule between attempts and between reachability probes
    pub backoff: BackoffConfig,
    pub policy: FailurePolicy,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_attempts: 3,
            backoff: BackoffConfig::default(),
            policy: FailurePolicy::Abort,
        }
    }
}

/// Details of a step that ended the run in failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub step_id: String,
    pub fingerprint: String,
    pub last_error: String,
    pub attempts: u32,
}

impl FailureReport {
    pub fn from_result(result: &StepResult) -> Self {
        Self {
            step_id: result.step_id.clone(),
            fingerprint: result.fingerprint.clone(),
            last_error: result
                .last_error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
            attempts: result.attempts,
        }
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step '{}' (fingerprint {}) failed after {} attempt(s): {}",
            self.step_id,
            short_fingerprint(&self.fingerprint),
            self.attempts,
            self.last_error
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub pending: usize,
}

impl ExecuteSummary {
    /// Number of steps that changed the system
    pub fn total_changes(&self) -> usize {
        self.applied
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of steps accounted for
    pub fn total(&self) -> usize {
        self.applied + self.skipped + self.failed + self.pending
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &StepResult) {
        match result.status {
            StepStatus::Applied => self.applied += 1,
            StepStatus::Skipped => self.skipped += 1,
            StepStatus::Failed => self.failed += 1,
            StepStatus::Pending => self.pending += 1,
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// One result per plan step, in plan order
    pub results: Vec<StepResult>,
    /// Steps that ended Failed, in the order they failed
    pub failures: Vec<FailureReport>,
    /// The run stopped early because cancellation was requested
    pub cancelled: bool,
}

impl RunReport {
    pub fn summary(&self) -> ExecuteSummary {
        let mut summary = ExecuteSummary::default();
        for result in &self.results {
            summary.add_result(result);
        }
        summary
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// Result for a given step id
    pub fn result(&self, step_id: &str) -> Option<&StepResult> {
        self.results.iter().find(|r| r.step_id == step_id)
    }
}
