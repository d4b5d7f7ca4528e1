// src/index/generate.rs

//! Index generation seam.
//!
//! The scheduler talks to an [`IndexGenerator`] instead of a concrete tool.
//! Production code uses [`MelangeIndex`]; tests substitute an implementation
//! that records requests without touching the filesystem.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::debug;

/// Request to (re)generate one per-arch package index.
#[derive(Debug, Clone)]
pub struct IndexRequest {
    /// Artifacts to index, main package first.
    pub package_files: Vec<PathBuf>,
    pub signing_key: PathBuf,
    /// Merge into the existing index instead of rewriting it.
    pub merge: bool,
    pub index_file: PathBuf,
}

/// Trait abstracting how the package index is generated.
pub trait IndexGenerator: Send + Sync {
    fn generate(&self, req: IndexRequest) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Shells out to `melange index`.
#[derive(Debug, Default)]
pub struct MelangeIndex;

impl IndexGenerator for MelangeIndex {
    fn generate(&self, req: IndexRequest) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut cmd = Command::new("melange");
            cmd.arg("index")
                .arg("-o")
                .arg(&req.index_file)
                .arg("--signing-key")
                .arg(&req.signing_key);
            if req.merge {
                cmd.arg("--merge");
            }
            cmd.args(&req.package_files);

            debug!(index = %req.index_file.display(), files = req.package_files.len(), "generating index");

            let output = cmd.output().await.context("running melange index")?;
            if !output.status.success() {
                bail!(
                    "melange index exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Ok(())
        })
    }
}
