//! Read-only architecture view built with `petgraph`.
//!
//! Groups services into their diagram categories and links each service
//! to the services it references through `*_SERVICE_SERVICE_HOST`-style
//! variables. Rendering the diagram is left to external tooling.

use std::collections::HashMap;

use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use topoc_common::constants;

use crate::model::{Category, Topology};

/// A category with its services and nested categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    /// Category name.
    pub name: String,
    /// Services placed directly in this category.
    pub services: Vec<String>,
    /// Nested categories, in first-seen order.
    pub categories: Vec<CategoryNode>,
}

impl CategoryNode {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            services: Vec::new(),
            categories: Vec::new(),
        }
    }
}

/// Categories and inter-service references of a topology.
#[derive(Debug)]
pub struct ArchitectureView {
    categories: Vec<CategoryNode>,
    graph: Graph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl ArchitectureView {
    /// Builds the view from a loaded topology.
    #[must_use]
    pub fn from_topology(topology: &Topology) -> Self {
        let mut categories = vec![CategoryNode::new(constants::DEFAULT_CATEGORY)];
        let mut graph = Graph::new();
        let mut nodes = HashMap::new();

        for service in &topology.services {
            let _ = nodes.insert(service.name.clone(), graph.add_node(service.name.clone()));
            match service.architecture_categories.first() {
                Some(category) => place(&mut categories, category, &service.name),
                None => categories[0].services.push(service.name.clone()),
            }
        }

        for service in &topology.services {
            let from = nodes[&service.name];
            let referenced = service
                .containers
                .iter()
                .flat_map(|c| &c.environment_variables)
                .map(|v| referenced_service_name(&v.name));
            for name in referenced {
                if name == service.name {
                    continue;
                }
                if let Some(&to) = nodes.get(&name) {
                    let _ = graph.update_edge(from, to, ());
                }
            }
        }

        Self {
            categories,
            graph,
            nodes,
        }
    }

    /// Top-level categories; the first one is always `Default`.
    #[must_use]
    pub fn categories(&self) -> &[CategoryNode] {
        &self.categories
    }

    /// Every `(from, to)` reference, in edge insertion order.
    #[must_use]
    pub fn references(&self) -> Vec<(String, String)> {
        self.graph
            .edge_references()
            .map(|e| (self.graph[e.source()].clone(), self.graph[e.target()].clone()))
            .collect()
    }

    /// Services referenced by the named service.
    #[must_use]
    pub fn dependencies_of(&self, service: &str) -> Vec<String> {
        let Some(&idx) = self.nodes.get(service) else {
            return Vec::new();
        };
        let mut names: Vec<String> = self
            .graph
            .neighbors(idx)
            .map(|n| self.graph[n].clone())
            .collect();
        names.sort();
        names
    }
}

/// Converts a variable name into the service name it refers to.
///
/// `ORDERS_DB_SERVICE_SERVICE_HOST` becomes `orders-db`.
#[must_use]
pub fn referenced_service_name(variable: &str) -> String {
    variable
        .replace(constants::SERVICE_HOST_SUFFIX, "")
        .replace('_', "-")
        .to_lowercase()
}

fn place(nodes: &mut Vec<CategoryNode>, category: &Category, service: &str) {
    let idx = if let Some(idx) = nodes.iter().position(|n| n.name == category.name) {
        idx
    } else {
        nodes.push(CategoryNode::new(category.name.clone()));
        nodes.len() - 1
    };
    match category.architecture_categories.first() {
        Some(nested) => place(&mut nodes[idx].categories, nested, service),
        None => nodes[idx].services.push(service.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology() -> Topology {
        let services = "
- name: shop-db
  containers:
    - name: postgres
- name: shop-api
  architecture_categories:
    - name: Backend
      architecture_categories:
        - name: APIs
  containers:
    - name: api
      environment_variables:
        - name: SHOP_DB_SERVICE_SERVICE_HOST
        - name: SHOP_API_SERVICE_SERVICE_HOST
        - name: UNRELATED
- name: shop-worker
  architecture_categories:
    - name: Backend
  containers:
    - name: worker
      environment_variables:
        - name: SHOP_DB_SERVICE_SERVICE_HOST
";
        Topology {
            environments: Vec::new(),
            services: serde_yaml::from_str(services).expect("parse"),
        }
    }

    #[test]
    fn uncategorised_services_land_in_default() {
        let view = ArchitectureView::from_topology(&topology());
        assert_eq!(view.categories()[0].name, "Default");
        assert_eq!(view.categories()[0].services, vec!["shop-db"]);
    }

    #[test]
    fn nested_categories_are_preserved() {
        let view = ArchitectureView::from_topology(&topology());
        let backend = &view.categories()[1];
        assert_eq!(backend.name, "Backend");
        assert_eq!(backend.services, vec!["shop-worker"]);
        assert_eq!(backend.categories[0].name, "APIs");
        assert_eq!(backend.categories[0].services, vec!["shop-api"]);
    }

    #[test]
    fn host_variables_become_references() {
        let view = ArchitectureView::from_topology(&topology());
        let refs = view.references();
        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&("shop-api".into(), "shop-db".into())));
        assert!(refs.contains(&("shop-worker".into(), "shop-db".into())));
        assert_eq!(view.dependencies_of("shop-api"), vec!["shop-db"]);
    }

    #[test]
    fn self_references_are_skipped() {
        let view = ArchitectureView::from_topology(&topology());
        assert!(!view.references().iter().any(|(a, b)| a == b));
    }

    #[test]
    fn referenced_name_conversion() {
        assert_eq!(
            referenced_service_name("ORDERS_DB_SERVICE_SERVICE_HOST"),
            "orders-db"
        );
    }
}
