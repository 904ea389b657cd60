//! Read-only graph export of a diagram.
//!
//! A [`GraphExport`] is what validators see: every block as a node and
//! every line as an edge, each with its resolved properties and its
//! directed adjacency in both directions. It owns copies of everything it
//! holds and keeps no reference back into the diagram, so it is only good
//! for the run that produced it.
//!
//! # Adjacency
//!
//! Nodes and edges alternate. A node's `next` lists the edges leaving it
//! and its `prev` the edges arriving at it; an edge's `prev` is the node
//! its source end is latched to and its `next` the node at its target end.
//! A line with an unattached end therefore has an empty `prev` or `next`.

use indexmap::IndexMap;

use crate::{identifier::Id, property::Property};

/// One exported node or edge.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphObjectExport {
    template: Id,
    props: Property,
    prev: Vec<Id>,
    next: Vec<Id>,
}

impl GraphObjectExport {
    /// Creates an export with no adjacency.
    pub fn new(template: Id, props: Property) -> Self {
        Self {
            template,
            props,
            prev: Vec::new(),
            next: Vec::new(),
        }
    }

    /// Adds `id` to the objects feeding into this one.
    pub fn with_prev(mut self, id: Id) -> Self {
        self.prev.push(id);
        self
    }

    /// Adds `id` to the objects this one feeds into.
    pub fn with_next(mut self, id: Id) -> Self {
        self.next.push(id);
        self
    }

    pub(crate) fn push_prev(&mut self, id: Id) {
        self.prev.push(id);
    }

    pub(crate) fn push_next(&mut self, id: Id) {
        self.next.push(id);
    }

    /// The declared template (e.g. `note`).
    pub fn template(&self) -> Id {
        self.template
    }

    /// Top-level properties as a dictionary.
    pub fn props(&self) -> &Property {
        &self.props
    }

    /// Ids feeding into this object, in diagram order.
    pub fn prev(&self) -> &[Id] {
        &self.prev
    }

    /// Ids this object feeds into, in diagram order.
    pub fn next(&self) -> &[Id] {
        &self.next
    }
}

/// Nodes and edges of a diagram, keyed by object id in diagram order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphExport {
    nodes: IndexMap<Id, GraphObjectExport>,
    edges: IndexMap<Id, GraphObjectExport>,
}

impl GraphExport {
    /// Assembles an export from already-resolved nodes and edges.
    pub fn new(
        nodes: IndexMap<Id, GraphObjectExport>,
        edges: IndexMap<Id, GraphObjectExport>,
    ) -> Self {
        Self { nodes, edges }
    }

    /// Iterates nodes in diagram order.
    pub fn nodes(&self) -> impl Iterator<Item = (Id, &GraphObjectExport)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// Iterates edges in diagram order.
    pub fn edges(&self) -> impl Iterator<Item = (Id, &GraphObjectExport)> {
        self.edges.iter().map(|(id, edge)| (*id, edge))
    }

    pub fn node(&self, id: Id) -> Option<&GraphObjectExport> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: Id) -> Option<&GraphObjectExport> {
        self.edges.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` when there are neither nodes nor edges.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Records a directed connection from a node to an edge or from an
    /// edge to a node, updating both sides.
    ///
    /// Returns `false` (and changes nothing) if either id is missing.
    pub fn link(&mut self, from: Id, to: Id) -> bool {
        let from_is_node = self.nodes.contains_key(&from);
        let to_is_node = self.nodes.contains_key(&to);
        if (!from_is_node && !self.edges.contains_key(&from))
            || (!to_is_node && !self.edges.contains_key(&to))
        {
            return false;
        }

        let source = if from_is_node {
            self.nodes.get_mut(&from)
        } else {
            self.edges.get_mut(&from)
        };
        if let Some(source) = source {
            source.push_next(to);
        }

        let target = if to_is_node {
            self.nodes.get_mut(&to)
        } else {
            self.edges.get_mut(&to)
        };
        if let Some(target) = target {
            target.push_prev(from);
        }
        true
    }
}
