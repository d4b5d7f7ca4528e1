// src/sched/task.rs

//! The scheduling unit: one task per main package.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::watch;
use tracing::debug;

use crate::recipe::Recipe;

use super::scheduler::Shared;
use super::step;

/// Final outcome of a task.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// At least one architecture was built or indexed (or would have been,
    /// in a dry run).
    Built,
    /// Every architecture was already published.
    Skipped,
    /// The build failed, or a dependency failed first.
    Failed(Arc<anyhow::Error>),
}

pub struct Task {
    pub(crate) pkg: String,
    pub(crate) recipe: Arc<Recipe>,
    pub(crate) deps: Vec<Arc<Task>>,
    pub(crate) shared: Arc<Shared>,
    started: AtomicBool,
    /// Completion latch: publishes the outcome exactly once.
    done: watch::Sender<Option<TaskOutcome>>,
}

impl Task {
    pub(crate) fn new(
        pkg: String,
        recipe: Arc<Recipe>,
        deps: Vec<Arc<Task>>,
        shared: Arc<Shared>,
    ) -> Arc<Self> {
        let (done, _) = watch::channel(None);
        Arc::new(Self {
            pkg,
            recipe,
            deps,
            shared,
            started: AtomicBool::new(false),
            done,
        })
    }

    pub fn package(&self) -> &str {
        &self.pkg
    }

    /// Start this task if nobody else has.
    pub(crate) fn maybe_start(self: Arc<Self>) {
        if !self.started.swap(true, Ordering::SeqCst) {
            tokio::spawn(async move { self.start().await });
        }
    }

    /// Park until this task completes and return its outcome.
    pub(crate) async fn wait(&self) -> TaskOutcome {
        let mut rx = self.done.subscribe();
        let result = match rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => (*outcome)
                .clone()
                .expect("latch publishes an outcome before waking waiters"),
            // The sender lives on `self`; the channel cannot close first.
            Err(_) => TaskOutcome::Failed(Arc::new(anyhow!("task latch closed unexpectedly"))),
        };
        result
    }

    async fn start(self: Arc<Self>) {
        let outcome = self.execute().await;
        // Publish on the latch first so waiters see the outcome, then report
        // completion; the channel send must not hold the latch.
        self.done.send_replace(Some(outcome));
        let _ = self.shared.done_tx.send(Arc::clone(&self)).await;
    }

    async fn execute(&self) -> TaskOutcome {
        // Dependencies the user did not select still get built.
        for dep in &self.deps {
            Arc::clone(dep).maybe_start();
        }

        if !self.deps.is_empty() {
            let names: Vec<&str> = self.deps.iter().map(|d| d.package()).collect();
            debug!(task = %self.pkg, deps = ?names, "waiting on dependencies");
        }

        for dep in &self.deps {
            if let TaskOutcome::Failed(err) = dep.wait().await {
                return TaskOutcome::Failed(err);
            }
        }

        if let Err(err) = self.shared.cancel.check() {
            return TaskOutcome::Failed(Arc::new(err));
        }

        // Dependency waits happen outside the permit so tasks blocked on
        // their deps do not count against the job cap.
        let _permit = match self.shared.jobs.acquire().await {
            Ok(permit) => permit,
            Err(_) => return TaskOutcome::Failed(Arc::new(self.shared.cancel.error())),
        };

        if let Err(err) = self.shared.cancel.check() {
            return TaskOutcome::Failed(Arc::new(err));
        }

        match step::run(self).await {
            Ok(step::StepOutcome::Built) => TaskOutcome::Built,
            Ok(step::StepOutcome::Skipped) => TaskOutcome::Skipped,
            Err(err) => TaskOutcome::Failed(Arc::new(err)),
        }
    }
}
