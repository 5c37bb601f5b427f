//! Execution engine - applies a plan step by step with retry and resumability
//!
//! Steps run strictly in plan order on the calling thread. Package managers
//! and systemd are not safe to drive concurrently, and later steps usually
//! depend on earlier ones.

use crate::apply::{apply_step, verify_step};
use crate::cancel::CancelToken;
use crate::context::{ApplyContext, NoProgress, ProgressCallback};
use crate::error::StepError;
use crate::planner::Plan;
use crate::step::{StepDescriptor, StepKind, short_fingerprint};
use crate::store::StateStore;
use crate::types::{
    ExecuteOptions, FailurePolicy, FailureReport, RunReport, StepResult, StepStatus,
};
use anyhow::Result;
use std::collections::HashSet;

/// Runs plans against a set of collaborators and a state store
pub struct Executor<'a> {
    ctx: ApplyContext<'a>,
    store: &'a mut dyn StateStore,
    opts: ExecuteOptions,
    cancel: CancelToken,
}

impl<'a> Executor<'a> {
    pub fn new(ctx: ApplyContext<'a>, store: &'a mut dyn StateStore, opts: ExecuteOptions) -> Self {
        Self {
            ctx,
            store,
            opts,
            cancel: CancelToken::new(),
        }
    }

    /// Share a cancellation token with a signal handler or another thread
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run a plan without progress reporting
    pub fn run(&mut self, plan: &Plan) -> Result<RunReport> {
        self.run_with_progress(plan, &mut NoProgress)
    }

    /// Run a plan, reporting progress to `progress`.
    ///
    /// Returns one result per step in plan order. Errors are returned only
    /// when the state store cannot be written; step failures are reported
    /// in [`RunReport::failures`].
    ///
    /// Under [`FailurePolicy::Continue`] a step whose dependencies failed
    /// (or were themselves held back) stays Pending.
    pub fn run_with_progress<P: ProgressCallback>(
        &mut self,
        plan: &Plan,
        progress: &mut P,
    ) -> Result<RunReport> {
        let recorded = self.store.load();
        let total = plan.len();
        let mut report = RunReport {
            results: Vec::with_capacity(total),
            ..RunReport::default()
        };

        let mut held_back: HashSet<&str> = HashSet::new();

        for (index, step) in plan.iter().enumerate() {
            let halted = !report.failures.is_empty() && self.opts.policy == FailurePolicy::Abort;
            if halted || report.cancelled || self.cancel.is_cancelled() {
                if !halted && !report.cancelled {
                    log::warn!("Cancelled before step '{}'", step.id());
                    report.cancelled = true;
                }
                report.results.push(StepResult::pending(step));
                continue;
            }

            if let Some(dep) = step
                .dependencies()
                .iter()
                .find(|dep| held_back.contains(dep.as_str()))
            {
                log::warn!("Holding back '{}': '{dep}' did not complete", step.id());
                held_back.insert(step.id());
                report.results.push(StepResult::pending(step));
                continue;
            }

            progress.on_step_start(index, total, step);

            let result = if recorded.get(step.id()).is_some_and(|r| r.satisfies(step)) {
                log::debug!(
                    "Skipping '{}': already applied ({})",
                    step.id(),
                    step.short_fingerprint()
                );
                StepResult::skipped(step)
            } else if self.opts.dry_run {
                log::info!("Would apply '{}': {}", step.id(), step.description());
                StepResult::pending(step)
            } else {
                if let Some(prior) = recorded.get(step.id()) {
                    log::debug!(
                        "Re-applying '{}' (recorded {} with fingerprint {})",
                        step.id(),
                        prior.status,
                        short_fingerprint(&prior.fingerprint)
                    );
                }
                self.apply_with_retry(step, progress)?
            };

            if result.status == StepStatus::Failed {
                held_back.insert(step.id());
                let failure = FailureReport::from_result(&result);
                log::error!("{failure}");
                if result.last_error.as_deref() == Some(&StepError::Cancelled.to_string()) {
                    report.cancelled = true;
                }
                report.failures.push(failure);
            }

            progress.on_step_complete(step, &result);
            report.results.push(result);
        }

        Ok(report)
    }

    /// Apply one step, retrying retryable failures with backoff.
    ///
    /// Every attempt's outcome is persisted so a crash mid-retry leaves a
    /// Failed record rather than a stale Applied one.
    fn apply_with_retry<P: ProgressCallback>(
        &mut self,
        step: &StepDescriptor,
        progress: &mut P,
    ) -> Result<StepResult> {
        // The probe owns its own retry loop.
        let max_attempts = if step.kind() == StepKind::NetworkWait {
            1
        } else {
            self.opts.max_attempts.max(1)
        };
        let mut delays = self.opts.backoff.delays();
        let mut result = StepResult::pending(step);

        loop {
            result.attempts += 1;
            let outcome = apply_step(step, &self.ctx, &self.opts.backoff, &self.cancel)
                .and_then(|()| verify_step(step, &self.ctx));

            let err = match outcome {
                Ok(()) => {
                    result.mark_applied();
                    self.store.save(step.id(), &result)?;
                    log::info!("Applied '{}': {}", step.id(), step.description());
                    return Ok(result);
                }
                Err(err) => err,
            };

            result.mark_failed(&err);
            self.store.save(step.id(), &result)?;

            if !err.is_retryable() || result.attempts >= max_attempts {
                return Ok(result);
            }

            let delay = delays.next().unwrap_or(self.opts.backoff.max_delay);
            log::warn!(
                "'{}' attempt {}/{} failed: {}. Retrying in {}s...",
                step.id(),
                result.attempts,
                max_attempts,
                err,
                delay.as_secs_f64()
            );
            progress.on_retry(step, result.attempts, max_attempts, &err, delay);

            if !self.cancel.sleep(delay) {
                result.mark_failed(&StepError::Cancelled);
                self.store.save(step.id(), &result)?;
                return Ok(result);
            }
        }
    }
}
