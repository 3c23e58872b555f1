//! Dependency ordering of resolved structs.
//!
//! A validator constant must be declared after every constant it references,
//! so structs are emitted in DFS postorder over "references" edges.

use crate::error::{Error, Result};
use crate::ir::{FieldDef, QualifiedName, Registry, StructDef, TypeRef};
use std::collections::BTreeMap;

/// Knobs for edge discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphOptions {
    /// Follow every field of an anonymous struct instead of only the first.
    pub all_anonymous_fields: bool,
}

/// Struct dependency graph. Nodes are indices in declaration order.
#[derive(Debug)]
pub struct DependencyGraph {
    nodes: Vec<QualifiedName>,
    edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    pub fn build(registry: &Registry, options: &GraphOptions) -> Result<Self> {
        let structs = registry.structs();
        let index: BTreeMap<&QualifiedName, usize> = structs
            .iter()
            .enumerate()
            .map(|(i, s)| (&s.name, i))
            .collect();

        let mut edges = Vec::with_capacity(structs.len());
        for def in &structs {
            let mut targets = Vec::new();
            for field in &def.fields {
                ultimate_types(field, options, &mut targets);
            }

            let mut node_edges: Vec<usize> = Vec::with_capacity(targets.len());
            for target in targets {
                let &to = index.get(target).ok_or_else(|| {
                    Error::Ordering(format!(
                        "{} references {target}, which was never registered",
                        def.name
                    ))
                })?;
                if !node_edges.contains(&to) {
                    node_edges.push(to);
                }
            }
            edges.push(node_edges);
        }

        Ok(Self {
            nodes: structs.iter().map(|s| s.name.clone()).collect(),
            edges,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct dependencies of a node, in field order.
    pub fn dependencies(&self, name: &QualifiedName) -> Vec<&QualifiedName> {
        self.nodes
            .iter()
            .position(|n| n == name)
            .map(|i| self.edges[i].iter().map(|&j| &self.nodes[j]).collect())
            .unwrap_or_default()
    }

    /// Dependencies first. Every node appears exactly once; cycles are cut
    /// where the walk first re-enters a node.
    pub fn sort(&self) -> Vec<&QualifiedName> {
        let mut visited = vec![false; self.nodes.len()];
        let mut ordering = Vec::with_capacity(self.nodes.len());
        for node in 0..self.nodes.len() {
            if !visited[node] {
                self.visit(node, &mut visited, &mut ordering);
            }
        }
        ordering.into_iter().map(|i| &self.nodes[i]).collect()
    }

    fn visit(&self, node: usize, visited: &mut [bool], ordering: &mut Vec<usize>) {
        visited[node] = true;
        for &next in &self.edges[node] {
            if !visited[next] {
                self.visit(next, visited, ordering);
            }
        }
        ordering.push(node);
    }
}

/// Struct references that determine ordering for one field.
///
/// Containers are looked through. For an anonymous struct only its first
/// field counts unless [`GraphOptions::all_anonymous_fields`] is set.
fn ultimate_types<'f>(field: &'f FieldDef, options: &GraphOptions, out: &mut Vec<&'f QualifiedName>) {
    match field {
        FieldDef::Basic {
            ty: TypeRef::Struct(target),
            ..
        } => out.push(target),
        FieldDef::Basic { .. } | FieldDef::Unknown { .. } => {}
        FieldDef::Array { element, .. } => ultimate_types(element, options, out),
        FieldDef::Map { value, .. } => ultimate_types(value, options, out),
        FieldDef::Anonymous { fields, .. } => {
            if options.all_anonymous_fields {
                for field in fields {
                    ultimate_types(field, options, out);
                }
            } else if let Some(first) = fields.first() {
                ultimate_types(first, options, out);
            }
        }
        // Expanded before ordering; the backend rejects leftovers.
        FieldDef::Embedded(_) => {}
    }
}

/// Registry contents in emission order.
pub fn order_structs(registry: &Registry, options: &GraphOptions) -> Result<Vec<StructDef>> {
    let graph = DependencyGraph::build(registry, options)?;
    let ordered = graph
        .sort()
        .into_iter()
        .map(|name| {
            registry
                .get(name)
                .cloned()
                .ok_or_else(|| Error::Ordering(format!("sorted struct {name} is not registered")))
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(structs = ordered.len(), "ordered structs");
    Ok(ordered)
}
