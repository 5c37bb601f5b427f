//! `piprov apply` - run the provisioning plan

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{
    BackoffConfig, ExecuteOptions, Executor, FailurePolicy, FileStateStore, MemoryStateStore,
    RunReport, StateStore,
};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::Settings;
use crate::progress::ConsoleProgress;
use crate::system::HostSystem;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let loaded = super::load_plan(ctx, args.target.as_deref())?;
    let opts = execute_options(&ctx.settings, loaded.config.retry, &args)?;
    let dry_run = opts.dry_run;

    ui::header(if dry_run {
        "Provisioning (dry run)"
    } else {
        "Provisioning"
    });
    ui::kv("Device", &loaded.identity.id);
    ui::kv("Topic", &loaded.config.mqtt.sensor_topic_for(&loaded.identity.id));
    ui::kv("State", &ctx.state_file.display().to_string());
    if dry_run {
        ui::warn("Dry run - no changes will be made");
    }
    println!();

    let system = HostSystem::new();
    let mut progress = ConsoleProgress::new(ctx.quiet);
    let mut file_store = FileStateStore::new(&ctx.state_file);

    let report = if dry_run {
        // Work on a snapshot so nothing can reach the state file
        let mut snapshot = MemoryStateStore::with_records(file_store.load());
        Executor::new(system.context(), &mut snapshot, opts)
            .with_cancel(ctx.cancel.clone())
            .run_with_progress(&loaded.plan, &mut progress)?
    } else {
        Executor::new(system.context(), &mut file_store, opts)
            .with_cancel(ctx.cancel.clone())
            .run_with_progress(&loaded.plan, &mut progress)?
    };

    print_summary(&report, dry_run);
    outcome(&report)
}

/// Executor options from settings, with command-line overrides
fn execute_options(
    settings: &Settings,
    backoff: BackoffConfig,
    args: &ApplyArgs,
) -> Result<ExecuteOptions> {
    let max_attempts = match args.max_attempts {
        Some(n) => n,
        None => settings.step_max_attempts()?,
    };
    let policy = if args.continue_on_failure {
        FailurePolicy::Continue
    } else {
        settings.failure_policy()?
    };

    Ok(ExecuteOptions {
        dry_run: args.dry_run,
        max_attempts,
        backoff,
        policy,
    })
}

fn print_summary(report: &RunReport, dry_run: bool) {
    let summary = report.summary();
    println!();
    println!(
        "{} {} applied, {} skipped, {} failed, {} pending",
        "Summary:".bold(),
        summary.applied.to_string().green(),
        summary.skipped,
        if summary.failed > 0 {
            summary.failed.to_string().red()
        } else {
            summary.failed.to_string().normal()
        },
        summary.pending
    );

    if dry_run && summary.pending > 0 {
        ui::info(&format!(
            "{} step(s) would run. Re-run without --dry-run to apply.",
            summary.pending
        ));
    } else if report.is_success() && summary.total_changes() == 0 {
        ui::success("Already provisioned, nothing to do");
    } else if report.is_success() {
        ui::success("Provisioning complete");
    }
}

/// Turn a report into the process outcome
fn outcome(report: &RunReport) -> Result<()> {
    for failure in &report.failures {
        ui::error(&failure.to_string());
    }
    if report.cancelled {
        bail!("Provisioning interrupted; run apply again to resume");
    }
    if !report.failures.is_empty() {
        bail!(
            "{} step(s) failed; fix the cause and run apply again to resume",
            report.failures.len()
        );
    }
    Ok(())
}
