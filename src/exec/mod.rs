// src/exec/mod.rs

//! External collaborators driven by the scheduler.
//!
//! - [`driver`] invokes the downstream build tool for one recipe × arch.
//! - [`git`] resolves the commit timestamp of a recipe file.
//!
//! Each collaborator sits behind a trait so tests can substitute fakes that
//! never spawn processes; [`Backends`] bundles them.

pub mod driver;
pub mod git;

use std::sync::Arc;

use crate::index::generate::{IndexGenerator, MelangeIndex};

pub use driver::{BuildDriver, BuildRequest, MelangeDriver};
pub use git::{GitSourceEpoch, SourceEpochResolver};

/// The pluggable backends the scheduler drives.
#[derive(Clone)]
pub struct Backends {
    pub driver: Arc<dyn BuildDriver>,
    pub indexer: Arc<dyn IndexGenerator>,
    pub source_epoch: Arc<dyn SourceEpochResolver>,
}

impl Backends {
    /// Production backends: melange subprocesses and git.
    pub fn production() -> Self {
        Self {
            driver: Arc::new(MelangeDriver),
            indexer: Arc::new(MelangeIndex),
            source_epoch: Arc::new(GitSourceEpoch),
        }
    }
}
