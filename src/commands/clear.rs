use anyhow::Result;
use declarative::{FileStateStore, StateStore};

use crate::Context;
use crate::ui;

/// Which requested ids were forgotten and which had no record
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ClearOutcome {
    pub cleared: Vec<String>,
    pub unknown: Vec<String>,
}

pub fn run(ctx: &Context, ids: &[String], all: bool) -> Result<()> {
    let mut store = FileStateStore::new(&ctx.state_file);

    if all {
        let count = store.load().len();
        store.clear_all()?;
        ui::success(&format!("Forgot {count} recorded step(s)"));
        return Ok(());
    }

    let outcome = clear_records(&mut store, ids)?;
    for id in &outcome.cleared {
        ui::success(&format!("Forgot {id}"));
    }
    for id in &outcome.unknown {
        ui::warn(&format!("No record for {id}"));
    }
    if !outcome.cleared.is_empty() {
        ui::dim("These steps will run on the next apply");
    }
    Ok(())
}

pub fn clear_records(store: &mut dyn StateStore, ids: &[String]) -> Result<ClearOutcome> {
    let mut outcome = ClearOutcome::default();
    for id in ids {
        if store.clear(id)? {
            log::info!("Cleared record for {id}");
            outcome.cleared.push(id.clone());
        } else {
            outcome.unknown.push(id.clone());
        }
    }
    Ok(outcome)
}
