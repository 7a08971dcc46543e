//! Execution strategies for handlers.
//!
//! Parsing and binding always happen on the dispatching thread. The only
//! place work leaves that thread is [`ExecutionProvider::submit`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tokio::runtime::Handle;

use crate::error::ExecutionFailure;
use crate::spec::Handler;
use crate::value::Arguments;

/// A unit of work ready to run.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted tasks.
pub trait ExecutionProvider: Send + Sync {
    fn submit(&self, task: Task);
}

/// Runs tasks immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncExecution;

impl ExecutionProvider for SyncExecution {
    fn submit(&self, task: Task) {
        task();
    }
}

/// Runs tasks in the background without waiting for them.
///
/// Uses the blocking pool of a tokio runtime when one is available, and a
/// dedicated thread otherwise.
#[derive(Debug, Clone, Default)]
pub struct AsyncExecution {
    handle: Option<Handle>,
}

impl AsyncExecution {
    /// Captures the current tokio runtime, if there is one.
    pub fn new() -> Self {
        Self {
            handle: Handle::try_current().ok(),
        }
    }

    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }
}

impl ExecutionProvider for AsyncExecution {
    fn submit(&self, task: Task) {
        match &self.handle {
            Some(handle) => {
                handle.spawn_blocking(task);
            }
            None => {
                std::thread::spawn(task);
            }
        }
    }
}

/// Invokes a handler, turning both errors and panics into an
/// [`ExecutionFailure`].
pub(crate) fn run_handler<S>(
    handler: &Handler<S>,
    sender: &S,
    arguments: &Arguments,
    command: &str,
    subcommand: &str,
) -> Result<(), ExecutionFailure> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(sender, arguments)));
    let cause = match outcome {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(err)) => err,
        Err(payload) => anyhow::anyhow!("handler panicked: {}", panic_message(payload.as_ref())),
    };
    Err(ExecutionFailure {
        command: command.to_string(),
        subcommand: subcommand.to_string(),
        cause,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_sync_runs_inline() {
        let (tx, rx) = mpsc::channel();
        SyncExecution.submit(Box::new(move || tx.send(1).unwrap()));
        assert_eq!(rx.try_recv(), Ok(1));
    }

    #[test]
    fn test_async_without_runtime_uses_thread() {
        let (tx, rx) = mpsc::channel();
        AsyncExecution::new().submit(Box::new(move || tx.send(std::thread::current().id()).unwrap()));
        let id = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_ne!(id, std::thread::current().id());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_async_with_runtime_uses_blocking_pool() {
        let execution = AsyncExecution::new();
        assert!(execution.handle.is_some());

        let (tx, rx) = tokio::sync::oneshot::channel();
        execution.submit(Box::new(move || {
            let _ = tx.send(42);
        }));
        assert_eq!(rx.await.unwrap(), 42);
    }

    fn failing(_: &(), _: &Arguments) -> anyhow::Result<()> {
        anyhow::bail!("no such player")
    }

    fn panicking(_: &(), _: &Arguments) -> anyhow::Result<()> {
        panic!("boom")
    }

    fn succeeding(_: &(), _: &Arguments) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_run_handler_wraps_error_and_panic() {
        let handler: Handler<()> = Arc::new(failing);
        let failure = run_handler(&handler, &(), &Arguments::new(), "give", "default").unwrap_err();
        assert_eq!(failure.cause.to_string(), "no such player");
        assert_eq!(failure.command, "give");

        let handler: Handler<()> = Arc::new(panicking);
        let failure = run_handler(&handler, &(), &Arguments::new(), "give", "default").unwrap_err();
        assert_eq!(failure.cause.to_string(), "handler panicked: boom");

        let handler: Handler<()> = Arc::new(succeeding);
        assert!(run_handler(&handler, &(), &Arguments::new(), "give", "default").is_ok());
    }
}
