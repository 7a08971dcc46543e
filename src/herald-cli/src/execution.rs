//! Async execution that the binary can wait on before exiting.

use std::sync::{Arc, Mutex};

use herald_core::{ExecutionProvider, Task};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

/// Runs tasks on the blocking pool and remembers them until drained.
#[derive(Debug, Clone)]
pub struct TrackedExecution {
    handle: Handle,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl TrackedExecution {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            pending: Arc::default(),
        }
    }

    /// Waits for every task submitted so far.
    pub async fn drain(&self) {
        let pending = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for task in pending {
            if let Err(err) = task.await {
                warn!(error = %err, "Background command did not finish");
            }
        }
    }
}

impl ExecutionProvider for TrackedExecution {
    fn submit(&self, task: Task) {
        let join = self.handle.spawn_blocking(task);
        match self.pending.lock() {
            Ok(mut pending) => {
                pending.retain(|t| !t.is_finished());
                pending.push(join);
            }
            Err(poisoned) => poisoned.into_inner().push(join),
        }
    }
}
