// src/recipe/mod.rs

//! Declarative package recipes.
//!
//! - [`model`] holds the typed recipe parsed from YAML.
//! - [`loader`] walks a workspace directory and indexes recipes by name.

pub mod loader;
pub mod model;

pub use loader::RecipeSet;
pub use model::{dep_name, Package, Recipe, Subpackage};
