//! Completion handshake with the external executor.
//!
//! The executor signals through two marker files in the work directory. The
//! progress marker holds free text that is overwritten in place; the result
//! marker appears once, holding either the success token or a failure detail.
//! Any result marker left over from a previous run is removed before polling
//! starts.
//!
//! Markers are UTF-8 unless they start with a UTF-8 or UTF-16 byte order
//! mark, which is honoured and stripped.

use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::{debug, info};

use crate::config::ExecutorConfig;
use crate::error::{ExternalError, Result, UpgradeError};

/// Terminal outcome reported by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The result marker held the success token.
    Succeeded,
    /// The result marker held anything else, carried verbatim.
    Failed(String),
}

impl CompletionOutcome {
    /// Returns true for [`CompletionOutcome::Succeeded`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Converts a failure into an [`ExternalError::ExecutorFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the outcome is a failure.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Succeeded => Ok(()),
            Self::Failed(detail) => Err(ExternalError::ExecutorFailed { detail }.into()),
        }
    }
}

/// Polls the marker files until the executor reports a result.
#[derive(Debug, Clone)]
pub struct CompletionMonitor {
    progress_path: PathBuf,
    result_path: PathBuf,
    interval: Duration,
    max_wait: Option<Duration>,
    success_token: String,
}

impl CompletionMonitor {
    /// Creates a monitor for explicit marker paths.
    #[must_use]
    pub fn new(
        progress_path: impl Into<PathBuf>,
        result_path: impl Into<PathBuf>,
        interval: Duration,
    ) -> Self {
        Self {
            progress_path: progress_path.into(),
            result_path: result_path.into(),
            interval,
            max_wait: None,
            success_token: String::from("success"),
        }
    }

    /// Creates a monitor from the executor configuration.
    #[must_use]
    pub fn from_config(config: &ExecutorConfig) -> Self {
        let mut monitor = Self::new(
            config.progress_path(),
            config.result_path(),
            Duration::from_millis(config.poll_interval_ms),
        )
        .with_success_token(config.success_token.clone());
        monitor.max_wait = config.max_wait_secs.map(Duration::from_secs);
        monitor
    }

    /// Gives up after the given duration.
    #[must_use]
    pub const fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Sets the result marker content that signals success.
    #[must_use]
    pub fn with_success_token(mut self, token: impl Into<String>) -> Self {
        self.success_token = token.into();
        self
    }

    /// Path of the result marker.
    #[must_use]
    pub fn result_path(&self) -> &Path {
        &self.result_path
    }

    /// Removes a result marker left by a previous run.
    ///
    /// Call this before the executor is started so a fast executor cannot
    /// have its fresh result deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing marker cannot be removed.
    pub async fn clear_stale_result(&self) -> Result<()> {
        match fs::remove_file(&self.result_path).await {
            Ok(()) => {
                debug!("Removed stale result marker {}", self.result_path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(UpgradeError::Io(e)),
        }
    }

    /// Waits for the result marker, logging progress at info level.
    ///
    /// # Errors
    ///
    /// See [`CompletionMonitor::await_completion_with`].
    pub async fn await_completion(&self) -> Result<CompletionOutcome> {
        self.await_completion_with(|progress| info!("{progress}")).await
    }

    /// Waits for the result marker, passing each distinct progress text to
    /// `on_progress`.
    ///
    /// The progress marker is read on every other tick. Its line breaks are
    /// removed and unchanged text is not reported again. Progress read errors
    /// are ignored for that tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the result marker cannot be read or the maximum
    /// wait elapses first.
    pub async fn await_completion_with<F>(&self, mut on_progress: F) -> Result<CompletionOutcome>
    where
        F: FnMut(&str),
    {
        info!("Waiting for operation to complete...");
        let start = Instant::now();
        let mut tick: u64 = 0;
        let mut last_progress = String::new();

        while !fs::try_exists(&self.result_path).await.unwrap_or(false) {
            if tick % 2 == 0
                && let Some(progress) = self.read_progress().await
                && progress != last_progress
            {
                on_progress(&progress);
                last_progress = progress;
            }
            tick += 1;

            if let Some(max_wait) = self.max_wait
                && start.elapsed() >= max_wait
            {
                return Err(ExternalError::Timeout {
                    path: self.result_path.clone(),
                    waited_secs: start.elapsed().as_secs(),
                }
                .into());
            }

            tokio::time::sleep(self.interval).await;
        }

        // Grace period for the writer to finish flushing.
        tokio::time::sleep(self.interval).await;

        let unreadable = |message: String| ExternalError::ResultUnreadable {
            path: self.result_path.clone(),
            message,
        };
        let bytes = fs::read(&self.result_path)
            .await
            .map_err(|e| unreadable(e.to_string()))?;
        let result = decode_marker(&bytes)
            .ok_or_else(|| unreadable(String::from("marker is not valid UTF-8 or UTF-16 text")))?;

        if result == self.success_token {
            info!("Operation completed successfully!");
            Ok(CompletionOutcome::Succeeded)
        } else {
            debug!("Executor reported failure after {tick} ticks");
            Ok(CompletionOutcome::Failed(result))
        }
    }

    async fn read_progress(&self) -> Option<String> {
        match fs::read(&self.progress_path).await {
            Ok(bytes) => {
                let text = decode_marker(&bytes);
                if text.is_none() {
                    debug!("Progress marker is not valid text");
                }
                text.map(|t| t.replace("\r\n", ""))
            }
            Err(e) => {
                debug!("Progress marker not readable: {e}");
                None
            }
        }
    }
}

/// Decodes marker bytes, honouring and stripping a byte order mark.
fn decode_marker(bytes: &[u8]) -> Option<String> {
    let (encoding, bom_len) = Encoding::for_bom(bytes).unwrap_or((UTF_8, 0));
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        .map(Cow::into_owned)
}
