// src/lib.rs

pub mod cli;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod index;
pub mod layout;
pub mod logging;
pub mod recipe;
pub mod sched;

use std::collections::{HashMap, HashSet};

use anyhow::Context;
use tokio::fs;
use tracing::debug;

use crate::cli::CliArgs;
use crate::dag::PackageGraph;
use crate::errors::Result;
use crate::exec::Backends;
use crate::recipe::RecipeSet;
use crate::sched::{BuildOptions, CancelToken, Scheduler};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - recipe loading + graph preparation
/// - the remote index probe (concurrently with the above)
/// - the task scheduler with the production backends
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let opts = resolve_options(&args);
    let cancel = CancelToken::new();

    // Ctrl-C -> cooperative cancellation.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {err}");
                return;
            }
            cancel.cancel("interrupted");
        });
    }

    // Graph preparation and the per-arch index probes run concurrently.
    let dir = opts.dir.clone();
    let graph_handle =
        tokio::task::spawn_blocking(move || -> Result<(RecipeSet, PackageGraph)> {
            let recipes = RecipeSet::load_dir(&dir)?;
            let graph = PackageGraph::build(&recipes)?;
            Ok((recipes, graph))
        });

    let exists = probe_indexes(&opts, &args.destination_repository).await?;

    let (recipes, graph) = graph_handle
        .await
        .context("graph preparation panicked")??;
    debug!(packages = graph.len(), "prepared dependency graph");

    let scheduler = Scheduler::new(
        opts,
        &recipes,
        &graph,
        exists,
        Backends::production(),
        cancel,
    )?;
    scheduler.run(&args.packages).await
}

/// Create the per-arch buildlog directories and fetch the published-artifact
/// sets, concurrently across architectures.
async fn probe_indexes(
    opts: &BuildOptions,
    dst: &str,
) -> Result<HashMap<String, HashSet<String>>> {
    let client = reqwest::Client::new();
    let mut handles = Vec::with_capacity(opts.archs.len());

    for arch in &opts.archs {
        let arch = arch.clone();
        let dst = dst.to_string();
        let client = client.clone();
        let log_dir = layout::logdir(&opts.out_dir, &arch);

        handles.push(tokio::spawn(async move {
            fs::create_dir_all(&log_dir)
                .await
                .with_context(|| format!("creating buildlogs directory {}", log_dir.display()))?;
            let exist = index::probe::fetch_index(&client, &dst, &arch).await?;
            Ok::<_, anyhow::Error>((arch, exist))
        }));
    }

    let mut exists = HashMap::with_capacity(handles.len());
    for handle in handles {
        let (arch, exist) = handle.await.context("index probe panicked")??;
        exists.insert(arch, exist);
    }
    Ok(exists)
}

/// Apply the workspace-relative defaults the CLI leaves unset.
fn resolve_options(args: &CliArgs) -> BuildOptions {
    let dir = args.dir.clone();
    let signing_key = args
        .signing_key
        .clone()
        .unwrap_or_else(|| dir.join("local-melange.rsa"));
    let pipeline_dir = args
        .pipeline_dir
        .clone()
        .unwrap_or_else(|| dir.join("pipelines"));
    let out_dir = args.out_dir.clone().unwrap_or_else(|| dir.join("packages"));
    let jobs = if args.jobs == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        args.jobs
    };

    BuildOptions {
        dir,
        pipeline_dir,
        runner: args.runner,
        archs: args.archs.clone(),
        dry_run: args.dry_run,
        extra_keys: args.extra_keys.clone(),
        extra_repos: args.extra_repos.clone(),
        signing_key,
        namespace: args.namespace.clone(),
        out_dir,
        cache_dir: args.cache_dir.clone(),
        cache_source: args.cache_source.clone(),
        generate_index: args.generate_index,
        jobs,
    }
}
