// src/index/apkindex.rs

//! Parsing of `APKINDEX.tar.gz` archives.
//!
//! The archive is a gzipped tar containing an `APKINDEX` text member:
//! blank-line separated stanzas of `X:value` lines, of which only the
//! package name (`P:`) and full version (`V:`, including the `-r{epoch}`
//! suffix) matter here.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;

/// One package declared by an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub version: String,
}

impl IndexEntry {
    /// Artifact filename as published in the repository.
    pub fn filename(&self) -> String {
        format!("{}-{}.apk", self.name, self.version)
    }
}

/// Parse a gzipped `APKINDEX.tar.gz` archive.
pub fn parse_archive(reader: impl Read) -> Result<Vec<IndexEntry>> {
    let gz = GzDecoder::new(reader);
    let mut archive = tar::Archive::new(gz);

    for entry in archive.entries().context("reading index archive")? {
        let mut entry = entry.context("reading index archive entry")?;
        let is_index = entry
            .path()
            .map(|p| p.as_ref() == Path::new("APKINDEX"))
            .unwrap_or(false);
        if !is_index {
            continue;
        }
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .context("reading APKINDEX member")?;
        return Ok(parse_text(&text));
    }

    bail!("archive does not contain an APKINDEX member")
}

/// Parse the stanza text of an `APKINDEX` member.
pub fn parse_text(text: &str) -> Vec<IndexEntry> {
    let mut entries = Vec::new();
    let mut name: Option<&str> = None;
    let mut version: Option<&str> = None;

    let flush = |name: &mut Option<&str>, version: &mut Option<&str>,
                 entries: &mut Vec<IndexEntry>| {
        if let (Some(n), Some(v)) = (name.take(), version.take()) {
            entries.push(IndexEntry {
                name: n.to_string(),
                version: v.to_string(),
            });
        }
    };

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            flush(&mut name, &mut version, &mut entries);
            continue;
        }
        if let Some(rest) = line.strip_prefix("P:") {
            name = Some(rest);
        } else if let Some(rest) = line.strip_prefix("V:") {
            version = Some(rest);
        }
    }
    // Final stanza may lack a trailing blank line.
    flush(&mut name, &mut version, &mut entries);

    entries
}
