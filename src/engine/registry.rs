//! # Execution registry: id → live execution entry.
//!
//! The registry owns the handles of every execution the engine has started:
//! the coordination cell, the driver's join handle, and the per-execution
//! cancellation token.
//!
//! ## Rules
//! - `get_or_spawn` is the idempotency point for starting executions: the
//!   spawn closure runs only if the id is absent, under the write lock, so
//!   two concurrent starts with the same id produce exactly one driver.
//! - Terminal executions stay registered: late signal submitters must get
//!   `ExecutionAlreadyCompleted` (not `ExecutionNotFound`) and late waiters
//!   must still observe the stored result.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::cell::ExecutionCell;

/// Handle to a live (or finished) execution.
struct Entry {
    cell: Arc<ExecutionCell>,
    /// Join handle for the driver's task.
    join: JoinHandle<()>,
    /// Individual cancellation token for this execution's driver.
    cancel: CancellationToken,
}

/// Registry of executions known to one engine instance.
pub(crate) struct Registry {
    executions: RwLock<HashMap<String, Entry>>,
}

impl Registry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            executions: RwLock::new(HashMap::new()),
        })
    }

    /// Looks up the cell for an execution id.
    pub(crate) async fn get(&self, id: &str) -> Option<Arc<ExecutionCell>> {
        self.executions.read().await.get(id).map(|e| Arc::clone(&e.cell))
    }

    /// Returns the existing cell for `id`, or spawns a new execution.
    ///
    /// The closure is invoked only when the id is absent, while the write
    /// lock is held (the closure must not block). Returns the cell and
    /// whether it was created by this call.
    pub(crate) async fn get_or_spawn<F>(&self, id: &str, spawn: F) -> (Arc<ExecutionCell>, bool)
    where
        F: FnOnce(Arc<str>) -> (Arc<ExecutionCell>, JoinHandle<()>, CancellationToken),
    {
        let mut executions = self.executions.write().await;
        if let Some(entry) = executions.get(id) {
            return (Arc::clone(&entry.cell), false);
        }
        let (cell, join, cancel) = spawn(Arc::from(id));
        executions.insert(
            id.to_string(),
            Entry {
                cell: Arc::clone(&cell),
                join,
                cancel,
            },
        );
        (cell, true)
    }

    /// Cancels all drivers and waits for them to exit: cancel → join.
    pub(crate) async fn cancel_all(&self) {
        let entries: Vec<(String, Entry)> = {
            let mut executions = self.executions.write().await;
            executions.drain().collect()
        };

        for (_, entry) in &entries {
            entry.cancel.cancel();
        }
        for (_, entry) in entries {
            let _ = entry.join.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_noop(id: Arc<str>) -> (Arc<ExecutionCell>, JoinHandle<()>, CancellationToken) {
        let cell = Arc::new(ExecutionCell::new(id, String::new()));
        let token = CancellationToken::new();
        let join = tokio::spawn(async {});
        (cell, join, token)
    }

    #[tokio::test]
    async fn test_get_or_spawn_is_idempotent() {
        let registry = Registry::new();
        let (first, created_first) = registry.get_or_spawn("dup", spawn_noop).await;
        let (second, created_second) = registry.get_or_spawn("dup", spawn_noop).await;

        assert!(created_first);
        assert!(!created_second);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_get_unknown_id() {
        let registry = Registry::new();
        assert!(registry.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_all_joins_drivers() {
        let registry = Registry::new();
        let (_, _) = registry
            .get_or_spawn("one", |id| {
                let cell = Arc::new(ExecutionCell::new(id, String::new()));
                let token = CancellationToken::new();
                let child = token.clone();
                let join = tokio::spawn(async move { child.cancelled().await });
                (cell, join, token)
            })
            .await;

        registry.cancel_all().await;
        assert!(registry.get("one").await.is_none());
    }
}
