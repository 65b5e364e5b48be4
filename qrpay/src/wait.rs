//! Operator control over the balance wait.
//!
//! While the flow waits for funds, an operator can tell it to stop waiting
//! and proceed by editing a small text file:
//!
//! ```text
//! waitForBalance=false
//! ```
//!
//! The resource is re-read on every poll iteration, so edits take effect on
//! the next iteration without restarting the process.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use regex::Regex;

/// Default location of the wait-control file.
pub const DEFAULT_WAIT_CONTROL_FILE: &str = "config.txt";

static WAIT_FOR_BALANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)waitForBalance\s*=\s*(true|false)").expect("valid wait-control pattern")
});

/// Errors reading the wait-control resource.
#[derive(Debug, thiserror::Error)]
pub enum WaitControlError {
    /// The resource could not be read.
    #[error("failed to read wait-control file {}: {source}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Extracts the `waitForBalance` flag from the wait-control text.
///
/// Matching is by pattern, not strict parsing: the first
/// `waitForBalance = true|false` occurrence wins, case-insensitively.
/// Returns `None` if there is no match.
#[must_use]
pub fn parse_wait_flag(text: &str) -> Option<bool> {
    WAIT_FOR_BALANCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().eq_ignore_ascii_case("true"))
}

/// A live source of the "keep waiting for balance" policy.
pub trait WaitControl: Send + Sync {
    /// Reads the current flag.
    ///
    /// `Ok(None)` means the resource says nothing, which leaves the wait
    /// behavior unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`WaitControlError`] if the resource cannot be read.
    fn read_policy(&self) -> Result<Option<bool>, WaitControlError>;

    /// Returns `false` only when the resource explicitly disables waiting.
    ///
    /// Read failures are logged and treated as "keep waiting".
    fn current_wait_policy(&self) -> bool {
        match self.read_policy() {
            Ok(flag) => flag.unwrap_or(true),
            Err(err) => {
                tracing::warn!(error = %err, "Could not read wait control, continuing to wait");
                true
            }
        }
    }
}

/// Reads the wait flag from a text file on every call.
#[derive(Debug, Clone)]
pub struct FileWaitControl {
    path: PathBuf,
}

impl FileWaitControl {
    /// Creates a wait control backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the watched path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileWaitControl {
    fn default() -> Self {
        Self::new(DEFAULT_WAIT_CONTROL_FILE)
    }
}

impl WaitControl for FileWaitControl {
    fn read_policy(&self) -> Result<Option<bool>, WaitControlError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| WaitControlError::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(parse_wait_flag(&text))
    }
}

/// An in-memory wait flag that can be flipped from another handle.
///
/// Clones share the same flag.
#[derive(Debug, Clone)]
pub struct SharedWaitControl {
    wait: Arc<AtomicBool>,
}

impl SharedWaitControl {
    /// Creates a shared flag with the given initial value.
    #[must_use]
    pub fn new(wait: bool) -> Self {
        Self {
            wait: Arc::new(AtomicBool::new(wait)),
        }
    }

    /// Sets whether the flow should keep waiting for balance.
    pub fn set(&self, wait: bool) {
        self.wait.store(wait, Ordering::SeqCst);
    }
}

impl Default for SharedWaitControl {
    fn default() -> Self {
        Self::new(true)
    }
}

impl WaitControl for SharedWaitControl {
    fn read_policy(&self) -> Result<Option<bool>, WaitControlError> {
        Ok(Some(self.wait.load(Ordering::SeqCst)))
    }
}
