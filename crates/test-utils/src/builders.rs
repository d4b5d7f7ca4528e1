use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use apkforge::cli::Runner;
use apkforge::recipe::RecipeSet;
use apkforge::sched::BuildOptions;

/// Builder for a single recipe, written as YAML into a workspace dir.
pub struct RecipeBuilder {
    name: String,
    version: String,
    epoch: u64,
    deps: Vec<String>,
    archs: Vec<String>,
    subpackages: Vec<String>,
}

impl RecipeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "1.0".to_string(),
            epoch: 0,
            deps: Vec::new(),
            archs: Vec::new(),
            subpackages: Vec::new(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn dep(mut self, dep: &str) -> Self {
        self.deps.push(dep.to_string());
        self
    }

    pub fn arch(mut self, arch: &str) -> Self {
        self.archs.push(arch.to_string());
        self
    }

    pub fn subpackage(mut self, name: &str) -> Self {
        self.subpackages.push(name.to_string());
        self
    }

    /// Serialize as a melange-style YAML document.
    pub fn to_yaml(&self) -> String {
        let mut out = String::new();
        writeln!(out, "package:").unwrap();
        writeln!(out, "  name: {}", self.name).unwrap();
        writeln!(out, "  version: \"{}\"", self.version).unwrap();
        writeln!(out, "  epoch: {}", self.epoch).unwrap();
        if !self.archs.is_empty() {
            writeln!(out, "  target-architecture:").unwrap();
            for arch in &self.archs {
                writeln!(out, "    - {arch}").unwrap();
            }
        }
        if !self.deps.is_empty() {
            writeln!(out, "environment:").unwrap();
            writeln!(out, "  contents:").unwrap();
            writeln!(out, "    packages:").unwrap();
            for dep in &self.deps {
                writeln!(out, "      - {dep}").unwrap();
            }
        }
        if !self.subpackages.is_empty() {
            writeln!(out, "subpackages:").unwrap();
            for sub in &self.subpackages {
                writeln!(out, "  - name: {sub}").unwrap();
            }
        }
        out
    }

    /// Write `{name}.yaml` into `dir` and return its path.
    pub fn write(&self, dir: &Path) -> PathBuf {
        let path = dir.join(format!("{}.yaml", self.name));
        std::fs::write(&path, self.to_yaml()).expect("writing recipe fixture");
        path
    }
}

/// Write a set of recipes into a directory and load them back.
pub fn workspace(dir: &Path, recipes: &[RecipeBuilder]) -> RecipeSet {
    for recipe in recipes {
        recipe.write(dir);
    }
    RecipeSet::load_dir(dir).expect("loading recipe fixtures")
}

/// Reasonable defaults for scheduler tests: single arch, no index
/// generation, fake-backend friendly.
pub fn build_options(dir: &Path, jobs: usize) -> BuildOptions {
    BuildOptions {
        dir: dir.to_path_buf(),
        pipeline_dir: dir.join("pipelines"),
        runner: Runner::Docker,
        archs: vec!["x86_64".to_string()],
        dry_run: false,
        extra_keys: Vec::new(),
        extra_repos: Vec::new(),
        signing_key: dir.join("local-melange.rsa"),
        namespace: "wolfi".to_string(),
        out_dir: dir.join("packages"),
        cache_dir: "./melange-cache/".to_string(),
        cache_source: String::new(),
        generate_index: false,
        jobs,
    }
}
