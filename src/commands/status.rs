use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use declarative::{ExecuteSummary, FileStateStore, StateStore, StepResult, short_fingerprint};

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let records = FileStateStore::new(&ctx.state_file).load();

    ui::header("Provisioning Status");
    ui::kv("State", &ctx.state_file.display().to_string());
    println!();

    if records.is_empty() {
        ui::info("No steps recorded yet");
        ui::dim("Run: piprov apply");
        return Ok(());
    }

    let mut summary = ExecuteSummary::default();
    for record in records.values() {
        summary.add_result(record);
        print_record(record, ctx.verbose > 0);
    }

    println!();
    println!(
        "{} {} applied, {} failed",
        "Recorded:".bold(),
        summary.applied.to_string().green(),
        if summary.failed > 0 {
            summary.failed.to_string().red()
        } else {
            summary.failed.to_string().normal()
        }
    );
    if summary.failed > 0 {
        ui::dim("Run: piprov apply (failed steps resume from where they stopped)");
    }
    Ok(())
}

fn fingerprint_label(record: &StepResult, full: bool) -> &str {
    if full {
        &record.fingerprint
    } else {
        short_fingerprint(&record.fingerprint)
    }
}

fn print_record(record: &StepResult, full_fingerprint: bool) {
    let fingerprint = fingerprint_label(record, full_fingerprint);
    let when = record.timestamp.with_timezone(&Local);

    println!(
        "  {} {} {} {}",
        ui::status_label(record.status),
        record.step_id.bold(),
        format!("[{fingerprint}]").dimmed(),
        format!(
            "{} attempt(s), {}",
            record.attempts,
            when.format("%Y-%m-%d %H:%M:%S")
        )
        .dimmed()
    );
    if let Some(error) = &record.last_error {
        println!("      {} {}", "↳".red(), error);
    }
}
