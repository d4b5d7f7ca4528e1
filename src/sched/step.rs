// src/sched/step.rs

//! The per-architecture build step for one task.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::exec::BuildRequest;
use crate::index::IndexRequest;
use crate::layout;

use super::task::Task;

/// What the build step did for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    Built,
    Skipped,
}

/// Classify each architecture as published / built / needs-build, run the
/// missing builds, then regenerate the affected indexes.
pub(crate) async fn run(task: &Task) -> Result<StepOutcome> {
    let opts = &task.shared.opts;
    let archs = filter_archs(&opts.archs, &task.recipe.package.target_architecture);

    let mut needs_build: Vec<String> = Vec::new();
    let mut needs_index: Vec<String> = Vec::new();

    for arch in archs {
        let apk_file = task.recipe.artifact();
        let apk_path = layout::artifact_path(&opts.out_dir, &arch, &apk_file);

        // Already published?
        if task
            .shared
            .exists
            .get(&arch)
            .is_some_and(|set| set.contains(&apk_file))
        {
            debug!("Skipping {apk_file}, already indexed");
            continue;
        }
        needs_index.push(arch.clone());

        // Already built locally?
        if apk_path.exists() {
            debug!("Skipping {}, already built", apk_path.display());
            continue;
        }
        needs_build.push(arch);
    }

    if needs_build.is_empty() && needs_index.is_empty() {
        return Ok(StepOutcome::Skipped);
    }

    // The task is the unit of parallelism; its architectures build
    // sequentially.
    for arch in &needs_build {
        if opts.dry_run {
            info!(
                "DRYRUN: would have built {}/{}/{}.apk",
                opts.out_dir.display(),
                arch,
                task.recipe.package.pkgver()
            );
            continue;
        }
        build_arch(task, arch).await?;
    }

    if !opts.generate_index {
        return Ok(StepOutcome::Built);
    }

    // The index file is shared by every task of a given arch; writes are
    // serialized globally.
    let _guard = task.shared.serial.lock().await;
    for arch in &needs_index {
        generate_index(task, arch).await?;
    }

    Ok(StepOutcome::Built)
}

async fn build_arch(task: &Task, arch: &str) -> Result<()> {
    task.shared.cancel.check()?;

    let opts = &task.shared.opts;
    let log_path = layout::logfile(&opts.out_dir, arch, &task.recipe.package.pkgver());

    let source_dir = layout::source_dir(&opts.dir, task.package());
    fs::create_dir_all(&source_dir)
        .await
        .with_context(|| format!("creating source directory {}", source_dir.display()))?;

    let build_date = task
        .shared
        .backends
        .source_epoch
        .commit_timestamp(&task.recipe.path)
        .await
        .context("finding source date epoch")?;

    info!("Building {}", task.package());

    let req = BuildRequest {
        package: task.package().to_string(),
        arch: arch.to_string(),
        recipe_path: task.recipe.path.clone(),
        pipeline_dir: opts.pipeline_dir.clone(),
        extra_keys: opts.extra_keys.clone(),
        extra_repos: opts.extra_repos.clone(),
        signing_key: opts.signing_key.clone(),
        runner: opts.runner,
        env_file: layout::env_file(&opts.dir, arch),
        namespace: opts.namespace.clone(),
        source_dir,
        cache_source: opts.cache_source.clone(),
        cache_dir: opts.cache_dir.clone(),
        out_dir: opts.out_dir.clone(),
        build_date,
        log_path: log_path.clone(),
        remove_workspace: true,
        cancel: task.shared.cancel.clone(),
    };

    if let Err(err) = task.shared.backends.driver.build(req).await {
        // Failure logs from concurrent tasks must not interleave.
        let _guard = task.shared.serial.lock().await;
        dump_logs(&log_path);
        return Err(err).with_context(|| format!("building package (see {log_path:?} for logs)"));
    }

    Ok(())
}

/// Echo a failed build's log file to stdout, framed so CI can fold it.
fn dump_logs(path: &Path) {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            println!("::group::{}", path.display());
            print!("{contents}");
            println!("::endgroup::");
        }
        Err(err) => error!("failed to read logs {path:?}: {err}"),
    }
}

async fn generate_index(task: &Task, arch: &str) -> Result<()> {
    let opts = &task.shared.opts;
    let package_dir = opts.out_dir.join(arch);
    info!("Generating apk index from packages in {}", package_dir.display());

    let apk_path = layout::artifact_path(&opts.out_dir, arch, &task.recipe.artifact());
    if opts.dry_run {
        info!("DRYRUN: would have indexed {}", apk_path.display());
        return Ok(());
    }

    let mut package_files = vec![apk_path];
    for sub in &task.recipe.subpackages {
        let sub_path = layout::artifact_path(
            &opts.out_dir,
            arch,
            &task.recipe.subpackage_artifact(sub),
        );
        if !sub_path.exists() {
            warn!("Skipping subpackage {} (was not built)", sub_path.display());
            continue;
        }
        package_files.push(sub_path);
    }

    let req = IndexRequest {
        package_files,
        signing_key: opts.signing_key.clone(),
        merge: true,
        index_file: layout::index_file(&opts.out_dir, arch),
    };

    task.shared
        .backends
        .indexer
        .generate(req)
        .await
        .with_context(|| format!("generating index for {arch}"))
}

/// Intersection of the global arch list and a recipe's declared targets.
///
/// An empty target list (or `["all"]`) accepts every global arch; otherwise
/// the intersection preserves the global order.
pub fn filter_archs(globals: &[String], targets: &[String]) -> Vec<String> {
    if targets.is_empty() || targets[0] == "all" {
        return globals.to_vec();
    }
    globals
        .iter()
        .filter(|arch| targets.contains(*arch))
        .cloned()
        .collect()
}
