// src/recipe/model.rs

//! Typed recipe model.
//!
//! Recipes are melange-style YAML documents. Only the fields the orchestrator
//! reads are modelled here; everything else in the document is ignored and
//! left for the downstream build tool to interpret.

use std::path::PathBuf;

use serde::Deserialize;

/// A parsed recipe: one main package plus its subpackages.
#[derive(Debug, Clone, Deserialize)]
pub struct Recipe {
    pub package: Package,

    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub subpackages: Vec<Subpackage>,

    /// Path of the recipe file on disk; filled in by the loader.
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,

    #[serde(default)]
    pub epoch: u64,

    /// Architectures this package builds for; empty (or `["all"]`) means
    /// every architecture the orchestrator targets.
    #[serde(default, rename = "target-architecture")]
    pub target_architecture: Vec<String>,
}

/// Build environment section; its package list is the build-time
/// dependency set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub contents: Contents,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Contents {
    #[serde(default)]
    pub packages: Vec<String>,
}

/// A subpackage; version and epoch are inherited from the main package.
#[derive(Debug, Clone, Deserialize)]
pub struct Subpackage {
    pub name: String,
}

impl Package {
    /// `{name}-{version}-r{epoch}`, the stem of every artifact filename.
    pub fn pkgver(&self) -> String {
        format!("{}-{}-r{}", self.name, self.version, self.epoch)
    }
}

impl Recipe {
    /// Filename of the main package artifact.
    pub fn artifact(&self) -> String {
        format!("{}.apk", self.package.pkgver())
    }

    /// Filename of a subpackage artifact.
    pub fn subpackage_artifact(&self, sub: &Subpackage) -> String {
        format!(
            "{}-{}-r{}.apk",
            sub.name, self.package.version, self.package.epoch
        )
    }

    /// Build-time dependency names, version constraints stripped.
    pub fn build_deps(&self) -> impl Iterator<Item = &str> {
        self.environment.contents.packages.iter().map(|d| dep_name(d))
    }
}

/// Strip any version constraint from a dependency entry
/// (`"openssl-dev=3.1"` -> `"openssl-dev"`).
pub fn dep_name(dep: &str) -> &str {
    dep.split(['=', '<', '>', '~']).next().unwrap_or(dep)
}
