//! # Declarative
//!
//! A small engine for idempotent, resumable system provisioning.
//!
//! A [`Plan`] is an ordered list of [`StepDescriptor`]s. Each descriptor
//! carries a fingerprint of its parameters; the [`Executor`] consults a
//! [`StateStore`] before every step and skips steps that were already applied
//! with the same fingerprint. Anything else is applied, verified and
//! recorded, with transient failures retried on an exponential backoff.
//!
//! ## Core Concepts
//!
//! - **StepDescriptor**: One idempotent action (install packages, write a file,
//!   enable or start a service, wait for the network)
//! - **StateStore**: Durable record of the last result per step id
//! - **Executor**: Runs a plan in order with retry, failure policy and dry run
//! - **ReachabilityProbe**: Bounded, cancellable wait for a network target
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Executor, ExecuteOptions, FileStateStore, Plan, StepDescriptor};
//!
//! let plan = Plan::from_steps([
//!     StepDescriptor::package_install("packages.base", ["wpasupplicant"])?,
//!     StepDescriptor::file_write("file.hostname", "/etc/hostname", "pi\n", 0o644)?,
//! ])?;
//!
//! let mut store = FileStateStore::new("/var/lib/piprov/state.toml");
//! let report = Executor::new(ctx, &mut store, ExecuteOptions::default()).run(&plan)?;
//! ```
//!
//! ## Collaborator Traits
//!
//! The engine never touches the system directly. It goes through:
//!
//! - [`PackageManager`]: Installs and queries packages
//! - [`Filesystem`]: Writes files with a mode and reads them back
//! - [`ServiceManager`]: Enables, starts and inspects services
//! - [`NetworkLayer`]: Performs a single reachability check
//!
//! so the executor can be tested against in-memory fakes.

mod apply;
pub mod atomic;
pub mod backoff;
pub mod cancel;
pub mod context;
pub mod error;
pub mod executor;
pub mod planner;
pub mod probe;
pub mod step;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use backoff::{Backoff, BackoffConfig};
pub use cancel::CancelToken;
pub use context::{
    ApplyContext, Filesystem, NetworkLayer, NoProgress, PackageManager, ProgressCallback,
    ServiceManager, ServiceStatus,
};
pub use error::{ErrorCategory, StepError};
pub use executor::Executor;
pub use planner::Plan;
pub use probe::{DEFAULT_PROBE_TIMEOUT, ReachabilityProbe};
pub use step::{StepDescriptor, StepKind, StepParams, combine_fingerprints, short_fingerprint};
pub use store::{FileStateStore, MemoryStateStore, StateMap, StateStore};
pub use types::{
    ExecuteOptions, ExecuteSummary, FailurePolicy, FailureReport, RunReport, StepResult,
    StepStatus,
};
