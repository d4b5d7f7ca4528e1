// src/recipe/loader.rs

//! Workspace walker: discovers and parses every recipe in a directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{ApkforgeError, Result};
use crate::recipe::model::Recipe;

/// All recipes of a workspace, indexed by main package name, with a reverse
/// map from subpackage names to their owning main package.
#[derive(Debug, Clone, Default)]
pub struct RecipeSet {
    by_name: HashMap<String, Arc<Recipe>>,
    sub_owner: HashMap<String, String>,
}

impl RecipeSet {
    /// Load every recipe in `dir`.
    ///
    /// Only top-level, non-hidden `.yaml`/`.yml` files are considered;
    /// recipes never live in subdirectories.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let entries = fs::read_dir(dir).map_err(|source| ApkforgeError::IoError {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ApkforgeError::IoError {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if !name.ends_with(".yaml") && !name.ends_with(".yml") {
                continue;
            }
            paths.push(path);
        }
        paths.sort();

        let mut set = Self::default();
        for path in paths {
            let contents = fs::read_to_string(&path).map_err(|source| ApkforgeError::IoError {
                path: path.clone(),
                source,
            })?;
            let mut recipe: Recipe =
                serde_yaml::from_str(&contents).map_err(|source| ApkforgeError::YamlError {
                    path: path.clone(),
                    source,
                })?;
            recipe.path = path;
            set.insert(recipe)?;
        }

        debug!(count = set.len(), "loaded recipes from workspace");
        Ok(set)
    }

    /// Register one recipe, rejecting duplicate package and subpackage names.
    pub fn insert(&mut self, recipe: Recipe) -> Result<()> {
        let name = recipe.package.name.clone();
        if self.by_name.contains_key(&name) {
            return Err(ApkforgeError::ConfigError(format!(
                "duplicate package {name:?} (from {})",
                recipe.path.display()
            )));
        }
        for sub in &recipe.subpackages {
            if let Some(existing) = self.sub_owner.get(&sub.name) {
                if existing != &name {
                    return Err(ApkforgeError::ConfigError(format!(
                        "subpackage {:?} declared by both {existing:?} and {name:?}",
                        sub.name
                    )));
                }
            }
        }
        for sub in &recipe.subpackages {
            self.sub_owner.insert(sub.name.clone(), name.clone());
        }
        self.by_name.insert(name, Arc::new(recipe));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Recipe>> {
        self.by_name.get(name)
    }

    /// The local main package that provides `dep`: either `dep` itself, or
    /// the owner of a subpackage named `dep`. `None` means non-local.
    pub fn owner_of(&self, dep: &str) -> Option<&str> {
        if let Some((name, _)) = self.by_name.get_key_value(dep) {
            return Some(name.as_str());
        }
        self.sub_owner.get(dep).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_recipe(dir: &Path, file: &str, name: &str) {
        let contents = format!("package:\n  name: {name}\n  version: \"1.0\"\n");
        fs::write(dir.join(file), contents).expect("writing fixture");
    }

    #[test]
    fn loads_top_level_recipes() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_recipe(tmp.path(), "config-1.yaml", "config-1");
        write_recipe(tmp.path(), "config-2.yml", "config-2");

        let set = RecipeSet::load_dir(tmp.path()).expect("loading");
        assert_eq!(set.len(), 2);
        assert!(set.get("config-1").is_some());
        assert!(set.get("config-2").is_some());
    }

    #[test]
    fn skips_recipes_in_subdirectories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_recipe(tmp.path(), "config-1.yaml", "config-1");
        fs::create_dir(tmp.path().join("subdir")).expect("mkdir");
        write_recipe(&tmp.path().join("subdir"), "not-a-config.yaml", "not-a-config");

        let set = RecipeSet::load_dir(tmp.path()).expect("loading");
        assert_eq!(set.len(), 1);
        assert!(set.get("not-a-config").is_none());
    }

    #[test]
    fn skips_hidden_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_recipe(tmp.path(), "config-1.yaml", "config-1");
        write_recipe(tmp.path(), ".not-a-config.yaml", "hidden");

        let set = RecipeSet::load_dir(tmp.path()).expect("loading");
        assert_eq!(set.len(), 1);
        assert!(set.get("hidden").is_none());
    }

    #[test]
    fn rejects_duplicate_package_names() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_recipe(tmp.path(), "a.yaml", "same");
        write_recipe(tmp.path(), "b.yaml", "same");

        let err = RecipeSet::load_dir(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate package"));
    }

    #[test]
    fn parse_errors_are_fatal() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(tmp.path().join("broken.yaml"), "package:\n  version: \"1.0\"\n")
            .expect("writing fixture");

        // `name` is required.
        let err = RecipeSet::load_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, ApkforgeError::YamlError { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn missing_workspace_is_an_io_error() {
        let err = RecipeSet::load_dir(Path::new("/nonexistent/apkforge-workspace")).unwrap_err();
        assert!(matches!(err, ApkforgeError::IoError { .. }));
    }

    #[test]
    fn resolves_subpackage_owners() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(
            tmp.path().join("foo.yaml"),
            "package:\n  name: foo\n  version: \"1.0\"\nsubpackages:\n  - name: foo-dev\n",
        )
        .expect("writing fixture");

        let set = RecipeSet::load_dir(tmp.path()).expect("loading");
        assert_eq!(set.owner_of("foo"), Some("foo"));
        assert_eq!(set.owner_of("foo-dev"), Some("foo"));
        assert_eq!(set.owner_of("bar"), None);
    }
}
