//! Pipeline entry points for watch operations.
//!
//! - `Watcher::run_once`: one fetch → guard → hash → compare → notify → persist pass
//! - `Watcher::check`: the same pass with crash alerting applied

pub mod detect;
pub mod guard;
pub mod watch;

pub use detect::{Change, ChangeDetector};
pub use guard::{ContentGuard, ContentGuardConfig, GuardResult};
pub use watch::{CheckReport, RunOutcome, Watcher};
