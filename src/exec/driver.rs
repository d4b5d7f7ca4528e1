// src/exec/driver.rs

//! Downstream build tool invocation.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::warn;

use crate::cli::Runner;
use crate::sched::CancelToken;

/// One recipe × architecture build, handed to the driver.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub package: String,
    pub arch: String,
    pub recipe_path: PathBuf,
    pub pipeline_dir: PathBuf,
    pub extra_keys: Vec<String>,
    pub extra_repos: Vec<String>,
    pub signing_key: PathBuf,
    pub runner: Runner,
    pub env_file: PathBuf,
    pub namespace: String,
    pub source_dir: PathBuf,
    pub cache_source: String,
    pub cache_dir: String,
    pub out_dir: PathBuf,
    /// RFC 3339 build date for reproducible builds.
    pub build_date: String,
    /// File receiving the build tool's combined output.
    pub log_path: PathBuf,
    /// Remove the build workspace when the build finishes.
    pub remove_workspace: bool,
    pub cancel: CancelToken,
}

/// Trait abstracting the downstream build tool.
///
/// Production code uses [`MelangeDriver`]; tests substitute a fake that
/// records requests without spawning processes.
pub trait BuildDriver: Send + Sync {
    fn build(&self, req: BuildRequest) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs `melange build` for a single recipe × architecture.
#[derive(Debug, Default)]
pub struct MelangeDriver;

impl BuildDriver for MelangeDriver {
    fn build(&self, req: BuildRequest) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let log = std::fs::File::create(&req.log_path)
                .with_context(|| format!("creating logfile {}", req.log_path.display()))?;
            let log_err = log.try_clone().context("cloning logfile handle")?;

            let mut cmd = Command::new("melange");
            cmd.arg("build")
                .arg(&req.recipe_path)
                .arg("--arch")
                .arg(&req.arch)
                .arg("--pipeline-dir")
                .arg(&req.pipeline_dir)
                .arg("--signing-key")
                .arg(&req.signing_key)
                .arg("--runner")
                .arg(req.runner.as_str())
                .arg("--env-file")
                .arg(&req.env_file)
                .arg("--namespace")
                .arg(&req.namespace)
                .arg("--source-dir")
                .arg(&req.source_dir)
                .arg("--cache-dir")
                .arg(&req.cache_dir)
                .arg("--out-dir")
                .arg(&req.out_dir)
                .arg("--build-date")
                .arg(&req.build_date);
            if !req.cache_source.is_empty() {
                cmd.arg("--cache-source").arg(&req.cache_source);
            }
            for key in &req.extra_keys {
                cmd.arg("--keyring-append").arg(key);
            }
            for repo in &req.extra_repos {
                cmd.arg("--repository-append").arg(repo);
            }
            if req.remove_workspace {
                cmd.arg("--rm");
            }

            cmd.stdin(Stdio::null())
                .stdout(Stdio::from(log))
                .stderr(Stdio::from(log_err))
                .kill_on_drop(true);

            let mut child = cmd
                .spawn()
                .with_context(|| format!("spawning melange build for {}", req.package))?;

            tokio::select! {
                status = child.wait() => {
                    let status = status
                        .with_context(|| format!("waiting for melange build of {}", req.package))?;
                    if !status.success() {
                        bail!("melange build exited with {status}");
                    }
                    Ok(())
                }
                _ = req.cancel.cancelled() => {
                    // Cleanup goes to our own stderr, not the per-task log
                    // file, so it survives the cancellation.
                    warn!(package = %req.package, arch = %req.arch, "build cancelled; killing melange");
                    if let Err(err) = child.kill().await {
                        warn!(package = %req.package, error = %err, "failed to kill melange process");
                    }
                    Err(req.cancel.error())
                }
            }
        })
    }
}
