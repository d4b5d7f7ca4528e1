// src/layout.rs

//! Filesystem layout of the workspace and the output directory.
//!
//! ```text
//! {out}/{arch}/APKINDEX.tar.gz           generated index
//! {out}/{arch}/{pkgver}.apk              artifacts
//! {out}/{arch}/buildlogs/{pkgver}.log    per-task per-arch build log
//! {dir}/{pkg}/                           source dir, created on demand
//! {dir}/build-{arch}.env                 per-arch env file
//! ```

use std::path::{Path, PathBuf};

/// Directory holding per-task build logs for one architecture.
pub fn logdir(out: &Path, arch: &str) -> PathBuf {
    out.join(arch).join("buildlogs")
}

/// Build log file for one package on one architecture.
pub fn logfile(out: &Path, arch: &str, pkgver: &str) -> PathBuf {
    logdir(out, arch).join(format!("{pkgver}.log"))
}

/// An artifact inside the per-arch output directory.
pub fn artifact_path(out: &Path, arch: &str, artifact: &str) -> PathBuf {
    out.join(arch).join(artifact)
}

/// The per-arch package index.
pub fn index_file(out: &Path, arch: &str) -> PathBuf {
    out.join(arch).join("APKINDEX.tar.gz")
}

/// Per-arch env file handed to the build driver.
pub fn env_file(dir: &Path, arch: &str) -> PathBuf {
    dir.join(format!("build-{arch}.env"))
}

/// Source working directory for one package.
pub fn source_dir(dir: &Path, pkg: &str) -> PathBuf {
    dir.join(pkg)
}
