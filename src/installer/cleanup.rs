//! Deferred cleanup of temporary artifacts.
//!
//! Every step that creates something deletable (a download directory, an
//! extraction directory) registers the matching release action here right
//! after acquiring it. [`run_setup`](super::run_setup) drains the registry
//! once the install has finished, whether it succeeded, failed or panicked.
//!
//! A registry belongs to one run. Draining executes actions exactly once, in
//! insertion order, logs each failure on its own, and leaves the registry
//! empty so it can be reused.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use tracing::{debug, warn};

type CleanupFn = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// Identifies a registered action so it can be withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupHandle(u64);

struct CleanupAction {
    id: u64,
    label: String,
    run: CleanupFn,
}

/// Ordered set of release actions for one run.
#[derive(Default)]
pub struct CleanupRegistry {
    actions: Vec<CleanupAction>,
    next_id: u64,
}

impl std::fmt::Debug for CleanupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupRegistry")
            .field("pending", &self.actions.iter().map(|a| a.label.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl CleanupRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an arbitrary async release action.
    pub fn register<F, Fut>(&mut self, label: impl Into<String>, action: F) -> CleanupHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        let label = label.into();
        debug!(label = %label, "Registered cleanup action");
        self.actions.push(CleanupAction {
            id,
            label,
            run: Box::new(move || action().boxed()),
        });
        CleanupHandle(id)
    }

    /// Register deletion of a file. A file that is already gone counts as
    /// deleted.
    pub fn remove_file(&mut self, path: &Path) -> CleanupHandle {
        let path = path.to_path_buf();
        self.register(format!("remove file {}", path.display()), move || async move {
            ignore_missing(tokio::fs::remove_file(&path).await, &path)
        })
    }

    /// Register recursive deletion of a directory. A directory that is
    /// already gone counts as deleted.
    pub fn remove_dir_all(&mut self, path: &Path) -> CleanupHandle {
        let path = path.to_path_buf();
        self.register(format!("remove directory {}", path.display()), move || async move {
            ignore_missing(tokio::fs::remove_dir_all(&path).await, &path)
        })
    }

    /// Withdraw an action that is no longer needed. Returns whether it was
    /// still pending.
    pub fn unregister(&mut self, handle: CleanupHandle) -> bool {
        let before = self.actions.len();
        self.actions.retain(|a| a.id != handle.0);
        before != self.actions.len()
    }

    /// Number of pending actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no action is pending.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run every pending action in insertion order and clear the registry.
    ///
    /// Failures (including panics) are logged and never stop the remaining
    /// actions.
    ///
    /// # Returns
    ///
    /// The number of actions that failed.
    pub async fn run_all(&mut self) -> usize {
        let actions = std::mem::take(&mut self.actions);
        let mut failures = 0;
        for action in actions {
            debug!(label = %action.label, "Running cleanup action");
            match AssertUnwindSafe((action.run)()).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(label = %action.label, error = %format!("{e:#}"), "Cleanup action failed");
                }
                Err(_) => {
                    failures += 1;
                    warn!(label = %action.label, "Cleanup action panicked");
                }
            }
        }
        failures
    }
}

impl Drop for CleanupRegistry {
    fn drop(&mut self) {
        if !self.actions.is_empty() {
            warn!(pending = self.actions.len(), "Cleanup registry dropped with pending actions");
        }
    }
}

fn ignore_missing(result: std::io::Result<()>, path: &Path) -> anyhow::Result<()> {
    match result {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            Err(anyhow::Error::new(e).context(format!("failed to remove {}", path.display())))
        }
        _ => Ok(()),
    }
}
