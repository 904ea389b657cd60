//! Semantic analysis: turns a diagram into a [`GraphExport`].
//!
//! Blocks become nodes and lines become edges. Groups, including the page,
//! are walked for their children but are not exported themselves.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, trace};
use thiserror::Error;

use attack_flow_core::{
    diagram::{DiagramObject, DiagramObjectModel},
    graph::{GraphExport, GraphObjectExport},
    identifier::Id,
};

/// Structural faults that make a diagram impossible to export.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("line '{line}' is latched to '{endpoint}', which is not a block in the diagram")]
    DanglingReference { line: Id, endpoint: Id },

    #[error("id '{0}' is used by more than one object")]
    DuplicateId(Id),
}

/// Builds graph exports from diagrams.
pub struct SemanticAnalyzer;

impl SemanticAnalyzer {
    /// Exports `diagram` as a graph of nodes and edges.
    ///
    /// Nodes and edges keep the diagram's pre-order, and each adjacency
    /// list lists ids in the order the lines appear.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DuplicateId`] if two objects share an id and
    /// [`AnalysisError::DanglingReference`] if a line end names anything
    /// other than a block of this diagram.
    pub fn to_graph(diagram: &DiagramObjectModel) -> Result<GraphExport, AnalysisError> {
        let mut seen = HashSet::from([diagram.page().id()]);
        let mut nodes = IndexMap::new();
        let mut edges = IndexMap::new();
        let mut latches = Vec::new();

        for object in diagram.subtree() {
            let id = object.id();
            if !seen.insert(id) {
                return Err(AnalysisError::DuplicateId(id));
            }

            let export = GraphObjectExport::new(object.template(), object.props().clone());
            match object {
                DiagramObject::Block(_) => {
                    nodes.insert(id, export);
                }
                DiagramObject::Line(line) => {
                    edges.insert(id, export);
                    latches.push((id, line.source(), line.target()));
                }
                DiagramObject::Group(_) => {}
            }
        }

        let mut graph = GraphExport::new(nodes, edges);
        for (line, source, target) in latches {
            if let Some(source) = source {
                Self::ensure_block(&graph, line, source)?;
                graph.link(source, line);
            }
            if let Some(target) = target {
                Self::ensure_block(&graph, line, target)?;
                graph.link(line, target);
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count();
            "Graph exported"
        );
        trace!(graph:?; "Exported graph");

        Ok(graph)
    }

    fn ensure_block(graph: &GraphExport, line: Id, endpoint: Id) -> Result<(), AnalysisError> {
        if graph.node(endpoint).is_none() {
            return Err(AnalysisError::DanglingReference { line, endpoint });
        }
        Ok(())
    }
}
