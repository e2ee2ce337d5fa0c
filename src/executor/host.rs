//! Automation host that runs the updater script.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{CommandConfig, ExecutorConfig};
use crate::error::{ExternalError, Result};

/// Environment variable telling the script where to write its markers.
pub const WORK_DIR_ENV: &str = "UPGRADE_PILOT_WORK_DIR";

/// External executor that performs the upgrade described by a document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpgradeExecutor: Send + Sync {
    /// Starts the executor for a solution and upgrade document.
    ///
    /// Returns once the executor is running; completion is reported through
    /// the marker files.
    async fn launch(&self, solution: &Path, document: &Path) -> Result<()>;

    /// Returns true once a launched executor is no longer running.
    async fn has_exited(&self) -> Result<bool>;

    /// Releases the executor once a result has been read.
    async fn shutdown(&self) -> Result<()>;
}

/// Runs the updater script under the configured automation host.
#[derive(Debug)]
pub struct ScriptExecutor {
    host: CommandConfig,
    script: PathBuf,
    work_dir: PathBuf,
    child: Mutex<Option<Child>>,
}

impl ScriptExecutor {
    /// Creates an executor from the executor configuration.
    #[must_use]
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            host: config.host.clone(),
            script: config.script.clone(),
            work_dir: config.work_dir.clone(),
            child: Mutex::new(None),
        }
    }

    fn command(&self, solution: &Path, document: &Path) -> Command {
        let mut command = Command::new(&self.host.program);
        command
            .args(&self.host.args)
            .arg(&self.script)
            .arg(solution)
            .arg(document)
            .env(WORK_DIR_ENV, &self.work_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl UpgradeExecutor for ScriptExecutor {
    async fn launch(&self, solution: &Path, document: &Path) -> Result<()> {
        info!(
            "Running {} with {}",
            self.script.display(),
            self.host.program
        );
        let child = self
            .command(solution, document)
            .spawn()
            .map_err(|e| ExternalError::spawn(&self.host.program, e.to_string()))?;

        *self.child.lock().await = Some(child);
        Ok(())
    }

    async fn has_exited(&self) -> Result<bool> {
        let mut child = self.child.lock().await;
        match child.as_mut() {
            Some(child) => Ok(child.try_wait()?.is_some()),
            None => Ok(false),
        }
    }

    async fn shutdown(&self) -> Result<()> {
        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };

        match child.try_wait()? {
            Some(status) => debug!("Automation host exited with {status}"),
            None => {
                warn!("Automation host still running after result, stopping it");
                child.kill().await?;
            }
        }
        Ok(())
    }
}
