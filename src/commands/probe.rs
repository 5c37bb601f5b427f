//! `piprov probe` - wait for a network target with backoff
//!
//! Uses the same reachability logic as the plan's network wait step, so it
//! doubles as a way to check connectivity before running `apply`.

use anyhow::{Context as AnyhowContext, Result, bail};
use declarative::{BackoffConfig, ReachabilityProbe};
use std::time::{Duration, Instant};

use crate::Context;
use crate::cli::ProbeArgs;
use crate::system::TcpProbe;
use crate::ui;

pub fn run(ctx: &Context, args: ProbeArgs) -> Result<()> {
    let defaults = ctx.settings.probe()?;
    let target = args.target.clone().unwrap_or(defaults.target);
    let attempts = args.attempts.unwrap_or(defaults.max_attempts);
    let timeout = match args.timeout {
        Some(secs) => seconds("--timeout", secs, false)?,
        None => defaults.timeout,
    };
    let backoff = backoff_from_args(ctx.settings.retry()?, &args)?;

    if !ctx.quiet {
        ui::info(&format!(
            "Probing {target} (up to {attempts} attempt(s), {} per attempt)",
            ui::format_duration(timeout)
        ));
    }

    let network = TcpProbe;
    let started = Instant::now();
    let reachable = ReachabilityProbe::new(&network, &ctx.cancel)
        .with_probe_timeout(timeout)
        .wait_until_reachable(
            &target,
            attempts,
            backoff.initial_delay,
            backoff.factor,
            backoff.max_delay,
        );

    if reachable {
        ui::success(&format!(
            "{target} reachable after {}",
            ui::format_duration(started.elapsed())
        ));
        return Ok(());
    }
    if ctx.cancel.is_cancelled() {
        bail!("Probe of {target} interrupted");
    }
    bail!("{target} unreachable after {attempts} attempt(s)")
}

/// Configured backoff with command-line overrides applied
fn backoff_from_args(base: BackoffConfig, args: &ProbeArgs) -> Result<BackoffConfig> {
    let initial_delay = match args.initial_delay {
        Some(secs) => seconds("--initial-delay", secs, true)?,
        None => base.initial_delay,
    };
    let max_delay = match args.max_delay {
        Some(secs) => seconds("--max-delay", secs, true)?,
        None => base.max_delay,
    };
    let factor = args.factor.unwrap_or(base.factor);
    if !factor.is_finite() || factor < 1.0 {
        bail!("--factor must be a number >= 1 (got {factor})");
    }
    Ok(BackoffConfig::new(initial_delay, factor, max_delay))
}

fn seconds(flag: &str, secs: f64, allow_zero: bool) -> Result<Duration> {
    if secs == 0.0 && !allow_zero {
        bail!("{flag} must be greater than zero");
    }
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("{flag} must be a non-negative number of seconds (got {secs})"))
}
