use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "piprov")]
#[command(version)]
#[command(about = "Resumable provisioning for Raspberry Pi sensor nodes", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Provisioning env file [default: /etc/ratsensor/provision.env]
    #[arg(short, long, global = true, env = "PIPROV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Step state file (overrides STATE_FILE)
    #[arg(long, global = true, env = "PIPROV_STATE")]
    pub state: Option<PathBuf>,

    /// Append log output to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision this node, skipping steps that are already applied
    Apply(ApplyArgs),

    /// Show the plan and what apply would do
    Plan(PlanArgs),

    /// Show recorded step results
    Status,

    /// Forget recorded results so steps run again
    Clear(ClearArgs),

    /// Wait until a network target answers
    Probe(ProbeArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Only run steps matching this id or dotted prefix (e.g. "file", "service.ratsensor")
    pub target: Option<String>,

    /// Dry run - show what would be done
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Keep going after a step fails (overrides FAILURE_POLICY)
    #[arg(long)]
    pub continue_on_failure: bool,

    /// Attempts per step (overrides STEP_MAX_ATTEMPTS)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: Option<u32>,
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Only show steps matching this id or dotted prefix
    pub target: Option<String>,
}

#[derive(Parser)]
pub struct ClearArgs {
    /// Step ids to forget
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub ids: Vec<String>,

    /// Forget every recorded step
    #[arg(long)]
    pub all: bool,
}

#[derive(Parser)]
pub struct ProbeArgs {
    /// host:port to connect to (defaults to PROBE_TARGET)
    pub target: Option<String>,

    /// Maximum number of checks (defaults to PROBE_MAX_ATTEMPTS)
    #[arg(short, long)]
    pub attempts: Option<u32>,

    /// Seconds before the first retry (defaults to RETRY_INITIAL_DELAY)
    #[arg(long)]
    pub initial_delay: Option<f64>,

    /// Delay multiplier (defaults to RETRY_BACKOFF_FACTOR)
    #[arg(long)]
    pub factor: Option<f64>,

    /// Upper bound on a single delay in seconds (defaults to RETRY_MAX_DELAY)
    #[arg(long)]
    pub max_delay: Option<f64>,

    /// Seconds per connection attempt (defaults to PROBE_TIMEOUT)
    #[arg(long)]
    pub timeout: Option<f64>,
}
