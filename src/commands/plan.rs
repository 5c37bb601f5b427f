use anyhow::Result;
use colored::Colorize;
use declarative::{FileStateStore, StateMap, StateStore, StepDescriptor, StepStatus};

use crate::Context;
use crate::ui;

/// What `apply` would do with a step, judged from its record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedState {
    /// Applied with the same fingerprint; will be skipped
    UpToDate,
    /// Applied with different parameters; will run again
    Drifted,
    /// Last attempt failed; will be retried
    Failed,
    /// Never recorded
    New,
}

impl PlannedState {
    pub fn of(step: &StepDescriptor, records: &StateMap) -> Self {
        match records.get(step.id()) {
            None => Self::New,
            Some(record) if record.satisfies(step) => Self::UpToDate,
            Some(record) if record.status == StepStatus::Failed => Self::Failed,
            Some(_) => Self::Drifted,
        }
    }

    pub fn will_run(self) -> bool {
        self != Self::UpToDate
    }
}

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let loaded = super::load_plan(ctx, target)?;
    let records = FileStateStore::new(&ctx.state_file).load();

    ui::header("Provisioning plan");
    ui::kv("Device", &loaded.identity.id);
    if let Some(source) = ctx.settings.source() {
        ui::kv("Config", &source.display().to_string());
    }
    println!();

    let mut to_run = 0;
    for (i, step) in loaded.plan.iter().enumerate() {
        let state = PlannedState::of(step, &records);
        if state.will_run() {
            to_run += 1;
        }

        let marker = match state {
            PlannedState::UpToDate => "=".dimmed(),
            PlannedState::Drifted => "~".yellow(),
            PlannedState::Failed => "!".red(),
            PlannedState::New => "+".green(),
        };
        println!(
            "  {marker} {:>2}. {} {} {}",
            i + 1,
            step.id().bold(),
            step.kind().to_string().cyan(),
            format!("[{}]", step.short_fingerprint()).dimmed()
        );
        if !ctx.quiet {
            ui::dim(&format!("     {}", step.description()));
        }
    }

    println!();
    if to_run == 0 {
        ui::success("Everything is up to date");
    } else {
        ui::info(&format!("{to_run} of {} step(s) would run", loaded.plan.len()));
    }
    Ok(())
}
