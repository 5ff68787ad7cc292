// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph documents: the on-disk form of a graph.
//!
//! Operations are stored by name and re-created from a registry on load.
//! Connections are replayed through [`Graph::connect`], so a document that
//! describes an invalid graph is refused with the same error a gesture
//! would get.

use crate::edge::{Edge, EdgeId};
use crate::graph::{ConnectionError, Graph, GraphError};
use crate::node::NodeId;
use crate::parameter::ParamValue;
use crate::registry::OperationRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current document format version
pub const DOCUMENT_FORMAT_VERSION: u32 = 1;

/// Serialized graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Format version
    pub version: u32,
    /// Graph name
    pub name: String,
    /// Nodes in registry order
    pub nodes: Vec<NodeRecord>,
    /// Connected input slots
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
    /// Active viewer
    #[serde(default)]
    pub sink: Option<NodeId>,
    /// Context-selected node
    #[serde(default)]
    pub selected: Option<NodeId>,
}

/// Serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node ID
    pub id: NodeId,
    /// Registered operation name
    pub operation: String,
    /// Display name
    pub name: String,
    /// Position in the graph view
    #[serde(default)]
    pub position: [f32; 2],
    /// Disabled flag
    #[serde(default)]
    pub disabled: bool,
    /// Parameter values by label
    #[serde(default)]
    pub parameters: IndexMap<String, ParamValue>,
    /// Input slot edge IDs in slot order
    #[serde(default)]
    pub inputs: Vec<EdgeId>,
}

/// Serialized connection into one input slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Node owning the slot
    pub destination: NodeId,
    /// Slot index
    pub slot: usize,
    /// Node feeding the slot
    pub source: NodeId,
}

/// Error loading or saving a graph document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document text is not valid RON for this format
    #[error("Failed to parse graph document: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Document could not be serialized
    #[error("Failed to serialize graph document: {0}")]
    Serialize(#[from] ron::Error),

    /// Document was written by a newer version
    #[error("Graph document version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the document
        found: u32,
        /// Newest supported version
        supported: u32,
    },

    /// Operation not in the registry
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Connection names a slot the node does not have
    #[error("Node {node} has no input slot {slot}")]
    InvalidSlot {
        /// Destination node
        node: NodeId,
        /// Slot index
        slot: usize,
    },

    /// Node could not be rebuilt
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Connection was refused
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl GraphDocument {
    /// Parse a document from RON text
    pub fn from_ron(text: &str) -> Result<Self, DocumentError> {
        let document: GraphDocument = ron::from_str(text)?;
        if document.version > DOCUMENT_FORMAT_VERSION {
            return Err(DocumentError::UnsupportedVersion {
                found: document.version,
                supported: DOCUMENT_FORMAT_VERSION,
            });
        }
        Ok(document)
    }

    /// Render the document as pretty RON
    pub fn to_ron(&self) -> Result<String, DocumentError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load a document from disk
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path)?;
        let document = Self::from_ron(&content)?;
        tracing::info!("Loaded graph document '{}' from {:?}", document.name, path);
        Ok(document)
    }

    /// Save the document to disk
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        std::fs::write(path, self.to_ron()?)?;
        tracing::info!("Saved graph document '{}' to {:?}", self.name, path);
        Ok(())
    }
}

impl Graph {
    /// Capture the graph as a document
    pub fn to_document(&self) -> GraphDocument {
        let mut nodes = Vec::with_capacity(self.node_count());
        let mut connections = Vec::new();

        for node in self.nodes() {
            nodes.push(NodeRecord {
                id: node.id,
                operation: node.descriptor().name.clone(),
                name: node.name.clone(),
                position: node.position,
                disabled: node.is_disabled(),
                parameters: node.parameters().values(),
                inputs: node.inputs().to_vec(),
            });
            for (slot, edge) in node.inputs().iter().enumerate() {
                if let Some(source) = self.edge(*edge).and_then(Edge::source) {
                    connections.push(ConnectionRecord {
                        destination: node.id,
                        slot,
                        source,
                    });
                }
            }
        }

        GraphDocument {
            version: DOCUMENT_FORMAT_VERSION,
            name: self.name.clone(),
            nodes,
            connections,
            sink: self.sink(),
            selected: self.selected(),
        }
    }

    /// Rebuild a graph from a document
    pub fn from_document(
        document: &GraphDocument,
        registry: &OperationRegistry,
    ) -> Result<Self, DocumentError> {
        if document.version > DOCUMENT_FORMAT_VERSION {
            return Err(DocumentError::UnsupportedVersion {
                found: document.version,
                supported: DOCUMENT_FORMAT_VERSION,
            });
        }

        let mut graph = Graph::new(document.name.clone());
        for record in &document.nodes {
            let operation = registry
                .create(&record.operation)
                .ok_or_else(|| DocumentError::UnknownOperation(record.operation.clone()))?;
            let id = graph.add_operation_with_id(record.id, operation, &record.inputs)?;
            graph.rename(id, record.name.clone())?;
            graph.set_position(id, record.position)?;
            graph.set_disabled(id, record.disabled)?;
            for (label, value) in &record.parameters {
                graph.set_parameter(id, label, value.clone())?;
            }
        }

        for connection in &document.connections {
            let edge = graph
                .node(connection.destination)
                .ok_or(ConnectionError::NodeNotFound(connection.destination))?
                .input(connection.slot)
                .ok_or(DocumentError::InvalidSlot {
                    node: connection.destination,
                    slot: connection.slot,
                })?;
            graph.connect(connection.source, edge)?;
        }

        if let Some(sink) = document.sink {
            graph.set_sink(sink)?;
        }
        graph.set_selected(document.selected)?;

        tracing::debug!(
            "Rebuilt graph '{}' with {} nodes",
            graph.name,
            graph.node_count()
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::create_default_registry;

    fn sample() -> Graph {
        let registry = create_default_registry();
        let mut graph = Graph::new("Sample");
        let open = graph.add_operation(registry.create("Open Table").unwrap()).unwrap();
        let select = graph.add_operation(registry.create("Select").unwrap()).unwrap();
        let viewer = graph.add_operation(registry.create("Viewer").unwrap()).unwrap();
        graph
            .set_parameter(open, "File", ParamValue::FilePath("roads.tab".into()))
            .unwrap();
        graph
            .set_parameter(select, "Where", ParamValue::Text("Lanes > 2".into()))
            .unwrap();
        graph.set_position(select, [40.0, 120.0]).unwrap();
        graph.set_disabled(select, true).unwrap();
        let e1 = graph.node(select).unwrap().main_edge().unwrap();
        let e2 = graph.node(viewer).unwrap().main_edge().unwrap();
        graph.connect(open, e1).unwrap();
        graph.connect(select, e2).unwrap();
        graph.set_sink(viewer).unwrap();
        graph
    }

    #[test]
    fn test_document_rebuilds_same_graph() {
        let graph = sample();
        let document = graph.to_document();
        assert_eq!(document.nodes.len(), 3);
        assert_eq!(document.connections.len(), 2);

        let text = document.to_ron().unwrap();
        let parsed = GraphDocument::from_ron(&text).unwrap();
        assert_eq!(parsed, document);

        let rebuilt = Graph::from_document(&parsed, &create_default_registry()).unwrap();
        assert_eq!(rebuilt.to_document(), document);
        let sink = rebuilt.sink().unwrap();
        assert_eq!(rebuilt.node_hash(sink), graph.node_hash(sink));
    }

    #[test]
    fn test_rebuild_keeps_edge_ids() {
        let graph = sample();
        let viewer = graph.sink().unwrap();
        let edge = graph.node(viewer).unwrap().main_edge().unwrap();

        let rebuilt = Graph::from_document(&graph.to_document(), &create_default_registry()).unwrap();
        assert_eq!(rebuilt.node(viewer).unwrap().main_edge(), Some(edge));
        let kept: Vec<EdgeId> = rebuilt.edges().map(|e| e.id).collect();
        let original: Vec<EdgeId> = graph.edges().map(|e| e.id).collect();
        assert_eq!(kept, original);
    }

    #[test]
    fn test_document_without_edge_ids_still_loads() {
        let mut document = sample().to_document();
        for node in &mut document.nodes {
            node.inputs.clear();
        }
        let rebuilt = Graph::from_document(&document, &create_default_registry()).unwrap();
        assert_eq!(rebuilt.to_document().connections, document.connections);
    }

    #[test]
    fn test_repeated_edge_id_rejected() {
        let mut document = sample().to_document();
        let taken = document.nodes[1].inputs[0];
        document.nodes[2].inputs[0] = taken;
        assert!(matches!(
            Graph::from_document(&document, &create_default_registry()),
            Err(DocumentError::Graph(GraphError::DuplicateEdge(id))) if id == taken
        ));
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut document = sample().to_document();
        document.version = DOCUMENT_FORMAT_VERSION + 1;
        let text = document.to_ron().unwrap();
        assert!(matches!(
            GraphDocument::from_ron(&text),
            Err(DocumentError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let mut document = sample().to_document();
        document.nodes[0].operation = "Buffer".into();
        assert!(matches!(
            Graph::from_document(&document, &create_default_registry()),
            Err(DocumentError::UnknownOperation(name)) if name == "Buffer"
        ));
    }

    #[test]
    fn test_invalid_connection_rejected() {
        let mut document = sample().to_document();
        let viewer = document.sink.unwrap();
        let open = document.nodes[0].id;
        // Viewer feeding the table reader: wrong class at both ends.
        document.connections.push(ConnectionRecord {
            destination: open,
            slot: 0,
            source: viewer,
        });
        assert!(matches!(
            Graph::from_document(&document, &create_default_registry()),
            Err(DocumentError::InvalidSlot { .. })
        ));

        let mut document = sample().to_document();
        let select = document.nodes[1].id;
        document.connections[0] = ConnectionRecord {
            destination: select,
            slot: 0,
            source: viewer,
        };
        assert!(matches!(
            Graph::from_document(&document, &create_default_registry()),
            Err(DocumentError::Connection(ConnectionError::SourceIsSink(_)))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.ron");
        let document = sample().to_document();
        document.save(&path).unwrap();
        assert_eq!(GraphDocument::load(&path).unwrap(), document);
    }
}
