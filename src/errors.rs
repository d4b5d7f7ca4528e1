// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApkforgeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error reading {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown package: {0}")]
    UnknownPackage(String),

    #[error("Cycle detected in package graph: {0}")]
    DagCycle(String),

    #[error("YAML parsing error in {}: {source}", path.display())]
    YamlError {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("HTTP error fetching {url}: {source}")]
    HttpError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ApkforgeError>;
