//! External executor hand-off.
//!
//! This module launches the updater script, waits for its result through
//! the marker files and replays each plan against project references once
//! the script has finished.

mod host;
mod monitor;
mod sync;

#[cfg(test)]
pub use host::MockUpgradeExecutor;
pub use host::{ScriptExecutor, UpgradeExecutor, WORK_DIR_ENV};
pub use monitor::{CompletionMonitor, CompletionOutcome};
pub use sync::ReferenceSynchronizer;
