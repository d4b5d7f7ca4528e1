// src/sched/scheduler.rs

//! Task materialization, selection, and completion aggregation.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tracing::{error, info};

use crate::cli::Runner;
use crate::dag::PackageGraph;
use crate::errors::{ApkforgeError, Result};
use crate::exec::Backends;
use crate::recipe::RecipeSet;

use super::cancel::CancelToken;
use super::task::{Task, TaskOutcome};

/// Global build configuration, resolved from the CLI.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub dir: PathBuf,
    pub pipeline_dir: PathBuf,
    pub runner: Runner,
    pub archs: Vec<String>,
    pub dry_run: bool,
    pub extra_keys: Vec<String>,
    pub extra_repos: Vec<String>,
    pub signing_key: PathBuf,
    pub namespace: String,
    pub out_dir: PathBuf,
    pub cache_dir: String,
    pub cache_source: String,
    pub generate_index: bool,
    pub jobs: usize,
}

/// State shared by every task.
pub(crate) struct Shared {
    pub(crate) opts: BuildOptions,
    /// arch -> artifact filenames already published. Written once during the
    /// index probe, read-only afterwards.
    pub(crate) exists: HashMap<String, HashSet<String>>,
    /// Global job cap: one permit per task inside its build step.
    pub(crate) jobs: Semaphore,
    /// Serializes index generation and failed-log dumps.
    pub(crate) serial: Mutex<()>,
    pub(crate) done_tx: mpsc::Sender<Arc<Task>>,
    pub(crate) backends: Backends,
    pub(crate) cancel: CancelToken,
}

pub struct Scheduler {
    tasks: HashMap<String, Arc<Task>>,
    done_rx: mpsc::Receiver<Arc<Task>>,
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Materialize one task per graph vertex and wire dependency edges into
    /// dependency tasks.
    pub fn new(
        opts: BuildOptions,
        recipes: &RecipeSet,
        graph: &PackageGraph,
        exists: HashMap<String, HashSet<String>>,
        backends: Backends,
        cancel: CancelToken,
    ) -> Result<Self> {
        let jobs = opts.jobs.max(1);
        // Capacity >= jobs keeps producers from blocking on the aggregator.
        let (done_tx, done_rx) = mpsc::channel(jobs);

        let shared = Arc::new(Shared {
            opts,
            exists,
            jobs: Semaphore::new(jobs),
            serial: Mutex::new(()),
            done_tx,
            backends,
            cancel,
        });

        let mut tasks: HashMap<String, Arc<Task>> = HashMap::with_capacity(graph.len());
        // Dependencies come first in the sorted order, so every edge can be
        // wired to an existing task.
        for pkg in graph.sorted() {
            let recipe = recipes.get(pkg).ok_or_else(|| {
                ApkforgeError::ConfigError(format!(
                    "package {pkg} is in the graph but has no recipe"
                ))
            })?;
            let key = format!("{}:{}", recipe.package.name, recipe.package.version);

            let mut deps = Vec::new();
            let edges = graph.adjacency().get(&key).map(Vec::as_slice).unwrap_or(&[]);
            for edge in edges {
                let dep = edge.split_once(':').map(|(name, _)| name).unwrap_or(edge);
                let dep_task = tasks.get(dep).ok_or_else(|| {
                    ApkforgeError::ConfigError(format!(
                        "dependency {dep} of {pkg} has no task"
                    ))
                })?;
                deps.push(Arc::clone(dep_task));
            }

            tasks.insert(
                pkg.clone(),
                Task::new(pkg.clone(), Arc::clone(recipe), deps, Arc::clone(&shared)),
            );
        }

        Ok(Self {
            tasks,
            done_rx,
            shared,
        })
    }

    /// The tasks named on the command line, or all of them.
    fn select(&self, args: &[String]) -> Result<HashSet<String>> {
        if args.is_empty() {
            return Ok(self.tasks.keys().cloned().collect());
        }
        let mut selected = HashSet::with_capacity(args.len());
        for arg in args {
            if !self.tasks.contains_key(arg) {
                return Err(ApkforgeError::UnknownPackage(arg.clone()));
            }
            selected.insert(arg.clone());
        }
        Ok(selected)
    }

    /// Start the selected tasks and drain completions until every one of
    /// them has finished.
    pub async fn run(mut self, args: &[String]) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(ApkforgeError::ConfigError("no packages to build".to_string()));
        }

        let mut outstanding = self.select(args)?;
        let count = outstanding.len();

        for pkg in &outstanding {
            if let Some(task) = self.tasks.get(pkg) {
                Arc::clone(task).maybe_start();
            }
        }

        let mut errs: Vec<String> = Vec::new();
        let mut skipped = 0usize;

        while !outstanding.is_empty() {
            let Some(task) = self.done_rx.recv().await else {
                // Unreachable while `shared` holds a sender; bail loudly
                // rather than report a partial run as success.
                return Err(ApkforgeError::Other(anyhow!(
                    "completion channel closed with {} tasks outstanding",
                    outstanding.len()
                )));
            };
            // Lazily started dependencies outside the selection complete on
            // the same channel; drain them without reporting.
            if !outstanding.remove(task.package()) {
                continue;
            }

            match task.wait().await {
                TaskOutcome::Failed(err) => {
                    errs.push(format!("failed to build {}: {err:#}", task.package()));
                    error!("Failed to build {} ({}/{})", task.package(), errs.len(), count);
                }
                TaskOutcome::Skipped => {
                    // Logging every skipped package is too noisy; summarize
                    // the streak between actual builds.
                    skipped += 1;
                }
                TaskOutcome::Built => {
                    if skipped != 0 {
                        info!("Skipped building {skipped} packages");
                        skipped = 0;
                    }
                    let finished = count - outstanding.len() - errs.len();
                    info!("Finished building {} ({}/{})", task.package(), finished, count);
                }
            }
        }

        if skipped != 0 {
            info!("Skipped building {skipped} packages");
        }

        // After a cancellation the individual errors are noise; summarize.
        if self.shared.cancel.is_cancelled() {
            return Err(ApkforgeError::Other(anyhow!(
                "failed to build {count} packages: {}",
                self.shared.cancel.error()
            )));
        }

        if errs.is_empty() {
            Ok(())
        } else {
            Err(ApkforgeError::Other(anyhow!(errs.join("\n"))))
        }
    }
}
