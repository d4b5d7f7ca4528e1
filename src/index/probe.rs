// src/index/probe.rs

//! Remote index probe: which artifacts are already published?

use std::collections::HashSet;

use anyhow::Context;
use tracing::debug;

use crate::errors::{ApkforgeError, Result};
use crate::index::apkindex;

/// Fetch the set of artifact filenames published for one architecture.
///
/// An empty destination repository yields an empty set; otherwise a failed
/// fetch or parse is fatal to the whole run, so the scheduler never acts on
/// a partial belief about what is published.
pub async fn fetch_index(
    client: &reqwest::Client,
    dst: &str,
    arch: &str,
) -> Result<HashSet<String>> {
    let mut exist = HashSet::new();
    if dst.is_empty() {
        return Ok(exist);
    }

    let url = format!("{dst}/{arch}/APKINDEX.tar.gz");
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|source| ApkforgeError::HttpError {
            url: url.clone(),
            source,
        })?
        .error_for_status()
        .map_err(|source| ApkforgeError::HttpError {
            url: url.clone(),
            source,
        })?;
    let body = resp.bytes().await.map_err(|source| ApkforgeError::HttpError {
        url: url.clone(),
        source,
    })?;

    let entries =
        apkindex::parse_archive(body.as_ref()).with_context(|| format!("parsing index {url}"))?;
    for entry in entries {
        exist.insert(entry.filename());
    }

    debug!(arch, count = exist.len(), "fetched remote index");
    Ok(exist)
}
