//! Package tree data model.
//!
//! A [`Package`] is one node of a dependency tree as reported by the
//! package resolver. The same id may occur several times in one tree; each
//! occurrence is an independent node.

use serde::{Deserialize, Serialize};

/// A package and its direct dependencies at a specific version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Package {
    /// Package identifier, unique within a tree.
    pub id: String,
    /// Opaque version string.
    pub version: String,
    /// Direct dependencies in resolver order.
    #[serde(default)]
    pub dependencies: Vec<Package>,
}

impl Package {
    /// Creates a package without dependencies.
    #[must_use]
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            dependencies: Vec::new(),
        }
    }

    /// Returns the package with the given dependencies attached.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<Self>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Returns true if one of the direct dependencies has the given id.
    #[must_use]
    pub fn depends_directly_on(&self, id: &str) -> bool {
        self.dependencies.iter().any(|d| d.id == id)
    }

    /// Returns true if `id` is a dependency of one of this package's direct
    /// dependencies, i.e. it sits exactly two levels below this node.
    ///
    /// Only that single level is inspected.
    #[must_use]
    pub fn has_second_level_dependency(&self, id: &str) -> bool {
        self.dependencies.iter().any(|d| d.depends_directly_on(id))
    }

    /// Counts every node in the tree, duplicates included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.dependencies.iter().map(Self::node_count).sum::<usize>()
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Package {
        Package::new("A", "2.0").with_dependencies(vec![
            Package::new("B", "2.0").with_dependencies(vec![Package::new("D", "1.1")]),
            Package::new("C", "2.0"),
        ])
    }

    #[test]
    fn test_second_level_lookup_is_one_level_only() {
        let root = sample();
        assert!(root.has_second_level_dependency("D"));
        assert!(!root.has_second_level_dependency("B"));
        assert!(!root.has_second_level_dependency("A"));
    }

    #[test]
    fn test_deserialize_without_dependencies_field() {
        let pkg: Package = serde_json::from_str(r#"{"id":"A","version":"1.0"}"#)
            .expect("leaf package should parse");
        assert!(pkg.dependencies.is_empty());
        assert_eq!(pkg.to_string(), "A 1.0");
    }

    #[test]
    fn test_node_count_counts_duplicates() {
        let root = Package::new("A", "1").with_dependencies(vec![
            Package::new("B", "1").with_dependencies(vec![Package::new("X", "1")]),
            Package::new("C", "1").with_dependencies(vec![Package::new("X", "1")]),
        ]);
        assert_eq!(root.node_count(), 5);
    }
}
