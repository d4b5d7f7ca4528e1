// src/dag/graph.rs

//! Dependency graph construction and validation.
//!
//! The full build-time graph (every environment package of every recipe) is
//! reduced in two steps: edges to dependencies that are not provided by a
//! local recipe are dropped, and edges to a local subpackage resolve to the
//! subpackage's owning main package. What remains is a graph whose vertices
//! are exactly the buildable main packages.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{ApkforgeError, Result};
use crate::recipe::{Recipe, RecipeSet};

/// Acyclic dependency graph over main package names.
#[derive(Debug, Clone)]
pub struct PackageGraph {
    /// `"name:version"` vertex -> outgoing edges `"dep:version"`.
    ///
    /// Keys carry version suffixes; split on the first `:` for the name.
    adjacency: HashMap<String, Vec<String>>,
    /// Main package names, dependencies before dependents.
    sorted: Vec<String>,
}

impl PackageGraph {
    /// Build and validate the graph for a recipe set.
    ///
    /// A dependency cycle is a fatal configuration error.
    pub fn build(recipes: &RecipeSet) -> Result<Self> {
        let mut names: Vec<&str> = recipes.names().collect();
        names.sort_unstable();

        let mut adjacency: HashMap<String, Vec<String>> = HashMap::with_capacity(names.len());
        // Name-level edges (dependency, dependent) for cycle checking.
        let mut name_edges: Vec<(String, String)> = Vec::new();

        for name in &names {
            let Some(recipe) = recipes.get(name) else {
                continue;
            };
            let mut edges: Vec<String> = Vec::new();
            for dep in recipe.build_deps() {
                let Some(owner) = recipes.owner_of(dep) else {
                    debug!(package = %name, dep, "dropping edge to non-local dependency");
                    continue;
                };
                // A package may depend on its own subpackages at build time.
                if owner == *name {
                    continue;
                }
                let Some(owner_recipe) = recipes.get(owner) else {
                    continue;
                };
                let target = vertex_key(owner_recipe);
                if !edges.contains(&target) {
                    name_edges.push((owner.to_string(), (*name).to_string()));
                    edges.push(target);
                }
            }
            adjacency.insert(vertex_key(recipe), edges);
        }

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in &names {
            graph.add_node(name);
        }
        for (dep, pkg) in &name_edges {
            graph.add_edge(dep.as_str(), pkg.as_str(), ());
        }

        let sorted = match toposort(&graph, None) {
            Ok(order) => order.into_iter().map(str::to_string).collect(),
            Err(cycle) => {
                return Err(ApkforgeError::DagCycle(format!(
                    "cycle involving package '{}'",
                    cycle.node_id()
                )))
            }
        };

        Ok(Self { adjacency, sorted })
    }

    /// Main package names, dependencies first.
    pub fn sorted(&self) -> &[String] {
        &self.sorted
    }

    /// Versioned adjacency map.
    pub fn adjacency(&self) -> &HashMap<String, Vec<String>> {
        &self.adjacency
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}

fn vertex_key(recipe: &Recipe) -> String {
    format!("{}:{}", recipe.package.name, recipe.package.version)
}
