//! Background Task Management
//!
//! Registration, panic capture, and graceful shutdown for the crate's
//! long-running tasks (currently the abandoned-reservation sweep).

use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Long-lived background worker
    Worker,
    /// Fixed-interval task
    Periodic,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Worker => write!(f, "Worker"),
            TaskKind::Periodic => write!(f, "Periodic"),
        }
    }
}

struct RegisteredTask {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Owns every spawned background task and the shutdown token they watch
pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token tasks should select on to observe shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Register and start a task. Panics inside the task are caught and
    /// logged rather than taking the runtime down.
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let wrapped = async move {
            let result: Result<(), Box<dyn std::any::Any + Send>> =
                AssertUnwindSafe(future).catch_unwind().await;
            if let Err(panic_info) = result {
                let panic_msg: String = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                tracing::error!(task = %name, kind = %kind, panic = %panic_msg, "Background task panicked");
            }
        };

        let handle = tokio::spawn(wrapped);
        tracing::debug!(task = %name, kind = %kind, "Registered background task");
        self.tasks.push(RegisteredTask { name, kind, handle });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks that have exited when they should still be running
    pub fn check_health(&self) -> usize {
        let mut failed = 0;
        for task in &self.tasks {
            if task.handle.is_finished() {
                tracing::error!(task = %task.name, kind = %task.kind, "Background task exited unexpectedly");
                failed += 1;
            }
        }
        failed
    }

    /// Cancel every task and wait for it to finish
    pub async fn shutdown(self) {
        tracing::info!("Shutting down {} background tasks", self.tasks.len());
        self.shutdown.cancel();
        for task in self.tasks {
            match task.handle.await {
                Ok(()) => tracing::debug!(task = %task.name, "Task completed"),
                Err(e) if e.is_cancelled() => tracing::debug!(task = %task.name, "Task cancelled"),
                Err(e) => tracing::error!(task = %task.name, error = ?e, "Task panicked"),
            }
        }
        tracing::info!("All background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_cancels_workers() {
        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();
        tasks.spawn("waiter", TaskKind::Worker, async move {
            token.cancelled().await;
        });
        assert_eq!(tasks.len(), 1);
        tasks.shutdown().await;
    }

    #[tokio::test]
    async fn panics_are_captured() {
        let mut tasks = BackgroundTasks::new();
        tasks.spawn("boom", TaskKind::Worker, async {
            panic!("boom");
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tasks.check_health(), 1);
        tasks.shutdown().await;
    }
}
