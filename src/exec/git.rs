// src/exec/git.rs

//! Commit-timestamp resolution for reproducible builds.
//!
//! The build date fed to the build driver is the commit timestamp of the
//! recipe file, not `now`, so rebuilding an unchanged recipe yields the same
//! package. An untracked file (or missing git) fails the task rather than
//! silently substituting the current time.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::process::Command;

/// Resolves the source-date-epoch for a recipe file.
pub trait SourceEpochResolver: Send + Sync {
    fn commit_timestamp<'a>(
        &'a self,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
}

/// Asks git for the last commit touching the file.
#[derive(Debug, Default)]
pub struct GitSourceEpoch;

impl SourceEpochResolver for GitSourceEpoch {
    fn commit_timestamp<'a>(
        &'a self,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let output = Command::new("git")
                .args(["log", "-1", "--pretty=%ct", "--follow"])
                .arg(path)
                .output()
                .await
                .context("running git log")?;
            if !output.status.success() {
                bail!(
                    "git log {} exited with {}: {}",
                    path.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            epoch_to_rfc3339(&String::from_utf8_lossy(&output.stdout))
        })
    }
}

/// Parse a `%ct` value (seconds since epoch) into an RFC 3339 timestamp.
pub fn epoch_to_rfc3339(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let secs: i64 = trimmed
        .parse()
        .with_context(|| format!("parsing commit timestamp {trimmed:?}"))?;
    let ts: DateTime<Utc> = DateTime::from_timestamp(secs, 0)
        .with_context(|| format!("commit timestamp {secs} out of range"))?;
    Ok(ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_epoch_as_rfc3339() {
        assert_eq!(
            epoch_to_rfc3339("1700000000\n").expect("valid epoch"),
            "2023-11-14T22:13:20Z"
        );
    }

    #[test]
    fn empty_output_is_an_error() {
        // `git log` on an untracked file prints nothing and exits 0.
        assert!(epoch_to_rfc3339("").is_err());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(epoch_to_rfc3339("not-a-number").is_err());
    }
}
