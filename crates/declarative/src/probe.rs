//! Reachability probe - wait for the network with bounded, cancellable retries

use crate::backoff::BackoffConfig;
use crate::cancel::CancelToken;
use crate::context::NetworkLayer;
use std::time::{Duration, Instant};

/// Default timeout for a single connectivity check
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Retrying wrapper around a single [`NetworkLayer::reachability_check`]
pub struct ReachabilityProbe<'a> {
    network: &'a dyn NetworkLayer,
    cancel: CancelToken,
    probe_timeout: Duration,
    deadline: Option<Instant>,
}

impl<'a> ReachabilityProbe<'a> {
    pub fn new(network: &'a dyn NetworkLayer, cancel: &CancelToken) -> Self {
        Self {
            network,
            cancel: cancel.clone(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            deadline: None,
        }
    }

    /// Timeout for each individual check
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Give up once waiting longer would pass `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Probe `target` until it answers.
    ///
    /// Returns `true` on the first successful check, `false` once
    /// `max_attempts` checks have failed, the deadline would be passed, or
    /// cancellation was requested. `max_attempts == 0` returns `false`
    /// without probing.
    pub fn wait_until_reachable(
        &self,
        target: &str,
        max_attempts: u32,
        initial_delay: Duration,
        backoff_factor: f64,
        max_delay: Duration,
    ) -> bool {
        self.wait_with(
            target,
            max_attempts,
            &BackoffConfig::new(initial_delay, backoff_factor, max_delay),
        )
    }

    /// Same as [`Self::wait_until_reachable`] with a prepared backoff config.
    pub fn wait_with(&self, target: &str, max_attempts: u32, backoff: &BackoffConfig) -> bool {
        if max_attempts == 0 {
            log::debug!("Reachability check for {target} short-circuited (0 attempts)");
            return false;
        }

        let mut delays = backoff.delays();
        for attempt in 1..=max_attempts {
            if self.cancel.is_cancelled() {
                log::warn!("Reachability wait for {target} cancelled");
                return false;
            }

            if self.network.reachability_check(target, self.probe_timeout) {
                log::info!("{target} reachable (attempt {attempt}/{max_attempts})");
                return true;
            }

            if attempt == max_attempts {
                break;
            }

            let delay = delays.next().unwrap_or(backoff.max_delay);
            if let Some(deadline) = self.deadline
                && Instant::now() + delay > deadline
            {
                log::warn!("Reachability wait for {target} hit its deadline");
                return false;
            }

            log::warn!(
                "{target} unreachable (attempt {attempt}/{max_attempts}), retrying in {}s",
                delay.as_secs_f64()
            );
            if !self.cancel.sleep(delay) {
                log::warn!("Reachability wait for {target} cancelled");
                return false;
            }
        }

        log::error!("{target} still unreachable after {max_attempts} attempt(s)");
        false
    }
}
