// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure and the topology mutation protocol.
//!
//! Every mutation validates first and writes afterwards, so a rejected
//! gesture leaves the graph exactly as it was.

use crate::edge::{Edge, EdgeId, EdgeType};
use crate::node::{Node, NodeClass, NodeId};
use crate::operation::{DescriptorError, Operation};
use crate::parameter::{ParamValue, ParameterError};
use indexmap::IndexMap;

/// Vertical gap between a node and one inserted below it
const INSERT_SPACING: f32 = 80.0;

/// A node graph
#[derive(Debug)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in insertion order
    nodes: IndexMap<NodeId, Node>,
    /// Edges in creation order
    edges: IndexMap<EdgeId, Edge>,
    /// Active viewer; evaluation starts here
    sink: Option<NodeId>,
    /// Last singly-selected node; anchors insertion
    selected: Option<NodeId>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            sink: None,
            selected: None,
        }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    fn instantiate(
        &mut self,
        id: NodeId,
        operation: Box<dyn Operation>,
        edge_ids: &[EdgeId],
    ) -> Result<NodeId, DescriptorError> {
        let mut node = Node::new(id, operation)?;
        let class = node.class();
        let arity = node.max_inputs();

        for slot in 0..arity {
            let edge_type = if class == NodeClass::Sink {
                EdgeType::ViewerLink
            } else if slot == 0 && arity > 1 {
                EdgeType::Base
            } else {
                EdgeType::Default
            };
            let edge_id = edge_ids.get(slot).copied().unwrap_or_else(EdgeId::new);
            let edge = Edge::new(edge_id, id, slot, edge_type);
            node.add_edge(edge.id, slot == 0);
            self.edges.insert(edge.id, edge);
        }

        tracing::debug!("Added node '{}' ({:?}, {} inputs)", node.name, class, arity);
        let inputs = node.inputs().to_vec();
        self.nodes.insert(id, node);
        for edge in inputs {
            self.adjust_edge(edge);
        }
        Ok(id)
    }

    /// Add a node around an operation, with every input slot unconnected
    pub fn add_operation(&mut self, operation: Box<dyn Operation>) -> Result<NodeId, DescriptorError> {
        self.instantiate(NodeId::new(), operation, &[])
    }

    /// Add a node under a known ID.
    ///
    /// `edge_ids` names the input slot edges in slot order; slots past its
    /// end get fresh IDs.
    pub fn add_operation_with_id(
        &mut self,
        id: NodeId,
        operation: Box<dyn Operation>,
        edge_ids: &[EdgeId],
    ) -> Result<NodeId, GraphError> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        for (slot, edge) in edge_ids.iter().enumerate() {
            if self.edges.contains_key(edge) || edge_ids[..slot].contains(edge) {
                return Err(GraphError::DuplicateEdge(*edge));
            }
        }
        Ok(self.instantiate(id, operation, edge_ids)?)
    }

    /// Create a node the way the UI does: below the selected node if there
    /// is one, free-standing otherwise
    pub fn create_node(&mut self, operation: Box<dyn Operation>) -> Result<NodeId, GraphError> {
        match self.selected {
            Some(selected) => self.insert_node_above(selected, operation),
            None => Ok(self.add_operation(operation)?),
        }
    }

    /// Insert a new node directly downstream of `selected`.
    ///
    /// Every edge that left `selected` now leaves the new node, and the new
    /// node's main edge is fed by `selected`. A new node that cannot take
    /// part in that chain (no inputs, wrong class at either end) is added
    /// unconnected.
    pub fn insert_node_above(
        &mut self,
        selected: NodeId,
        operation: Box<dyn Operation>,
    ) -> Result<NodeId, GraphError> {
        let anchor = self
            .nodes
            .get(&selected)
            .ok_or(ConnectionError::NodeNotFound(selected))?;
        let anchor_class = anchor.class();
        let anchor_pos = anchor.position;
        let outgoing = self.edges_out(selected);

        let id = self.add_operation(operation)?;
        let (class, main) = {
            let node = &mut self.nodes[&id];
            node.position = [anchor_pos[0], anchor_pos[1] + INSERT_SPACING];
            (node.class(), node.main_edge())
        };

        let Some(main) = main else {
            return Ok(id);
        };
        if !anchor_class.can_feed() || !class.can_receive() {
            tracing::debug!("Node {} left unconnected below {}", id, selected);
            return Ok(id);
        }

        if class.can_feed() {
            for edge in outgoing {
                self.set_edge_source(edge, Some(id));
            }
        }
        self.set_edge_source(main, Some(selected));
        tracing::debug!("Inserted node {} below {}", id, selected);
        Ok(id)
    }

    /// Remove a node and heal the chain around it.
    ///
    /// Edges into the node go with it. Edges out of the node are re-fed by
    /// whatever fed the node's main edge, or left unconnected.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, ConnectionError> {
        let node = self
            .nodes
            .get(&node_id)
            .ok_or(ConnectionError::NodeNotFound(node_id))?;
        let heal = node
            .main_edge()
            .and_then(|e| self.edges.get(&e))
            .and_then(Edge::source);
        let inputs = node.inputs().to_vec();

        for edge in self.edges_out(node_id) {
            self.set_edge_source(edge, heal);
        }
        for edge in inputs {
            self.edges.shift_remove(&edge);
        }
        if self.sink == Some(node_id) {
            self.sink = None;
        }
        if self.selected == Some(node_id) {
            self.selected = None;
        }

        let node = self
            .nodes
            .shift_remove(&node_id)
            .ok_or(ConnectionError::NodeNotFound(node_id))?;
        tracing::debug!("Removed node '{}' ({})", node.name, node_id);
        Ok(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Whether a node is in the graph
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn require_node(&self, node_id: NodeId) -> Result<&Node, ConnectionError> {
        self.nodes
            .get(&node_id)
            .ok_or(ConnectionError::NodeNotFound(node_id))
    }

    fn require_node_mut(&mut self, node_id: NodeId) -> Result<&mut Node, ConnectionError> {
        self.nodes
            .get_mut(&node_id)
            .ok_or(ConnectionError::NodeNotFound(node_id))
    }

    /// Rename a node
    pub fn rename(&mut self, node_id: NodeId, name: impl Into<String>) -> Result<(), ConnectionError> {
        self.require_node_mut(node_id)?.name = name.into();
        Ok(())
    }

    /// Enable or disable a node
    pub fn set_disabled(&mut self, node_id: NodeId, disabled: bool) -> Result<(), ConnectionError> {
        self.require_node_mut(node_id)?.set_disabled(disabled);
        tracing::debug!("Node {} disabled={}", node_id, disabled);
        Ok(())
    }

    /// Set a parameter value on a node
    pub fn set_parameter(
        &mut self,
        node_id: NodeId,
        label: &str,
        value: ParamValue,
    ) -> Result<(), GraphError> {
        self.require_node_mut(node_id)?
            .parameters_mut()
            .set(label, value)
            .map_err(|source| GraphError::Parameter {
                node: node_id,
                source,
            })
    }

    /// Move a node and refresh the geometry of its edges
    pub fn set_position(&mut self, node_id: NodeId, position: [f32; 2]) -> Result<(), ConnectionError> {
        self.require_node_mut(node_id)?.position = position;
        let touching: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| e.involves_node(node_id))
            .map(|e| e.id)
            .collect();
        for edge in touching {
            self.adjust_edge(edge);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sink and selection
    // ------------------------------------------------------------------

    /// Designate the node evaluation starts from
    pub fn set_sink(&mut self, node_id: NodeId) -> Result<(), ConnectionError> {
        self.require_node(node_id)?;
        self.sink = Some(node_id);
        tracing::debug!("Sink set to {}", node_id);
        Ok(())
    }

    /// Current sink
    pub fn sink(&self) -> Option<NodeId> {
        self.sink
    }

    /// Set or clear the context-selected node
    pub fn set_selected(&mut self, node_id: Option<NodeId>) -> Result<(), ConnectionError> {
        if let Some(id) = node_id {
            self.require_node(id)?;
        }
        self.selected = node_id;
        Ok(())
    }

    /// Context-selected node
    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    /// Get an edge by ID
    pub fn edge(&self, edge_id: EdgeId) -> Option<&Edge> {
        self.edges.get(&edge_id)
    }

    /// Get all edges
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Get the number of edges (connected or not)
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Connected input edges of a node: the main edge first, then the other
    /// slots in order
    pub fn edges_in(&self, node_id: NodeId) -> Vec<EdgeId> {
        let Some(node) = self.nodes.get(&node_id) else {
            return Vec::new();
        };
        let connected = |id: &EdgeId| self.edges.get(id).is_some_and(Edge::is_connected);

        let mut result = Vec::with_capacity(node.inputs().len());
        if let Some(main) = node.main_edge().filter(|e| connected(e)) {
            result.push(main);
        }
        for edge in node.inputs() {
            if connected(edge) && !result.contains(edge) {
                result.push(*edge);
            }
        }
        result
    }

    /// Edges fed by a node
    pub fn edges_out(&self, node_id: NodeId) -> Vec<EdgeId> {
        self.edges
            .values()
            .filter(|e| e.source() == Some(node_id))
            .map(|e| e.id)
            .collect()
    }

    /// Nodes feeding a node, in `edges_in` order
    pub fn upstream_nodes(&self, node_id: NodeId) -> Vec<NodeId> {
        self.edges_in(node_id)
            .into_iter()
            .filter_map(|e| self.edges.get(&e)?.source())
            .collect()
    }

    /// Nodes fed by a node
    pub fn downstream_nodes(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        for edge in self.edges.values().filter(|e| e.source() == Some(node_id)) {
            if !result.contains(&edge.destination()) {
                result.push(edge.destination());
            }
        }
        result
    }

    /// Source of a node's main edge
    pub fn main_source(&self, node_id: NodeId) -> Option<NodeId> {
        let main = self.nodes.get(&node_id)?.main_edge()?;
        self.edges.get(&main)?.source()
    }

    /// Edges referencing a node that is not in the graph
    pub fn dangling_edges(&self) -> Vec<EdgeId> {
        self.edges
            .values()
            .filter(|e| {
                !self.nodes.contains_key(&e.destination())
                    || e.source().is_some_and(|s| !self.nodes.contains_key(&s))
            })
            .map(|e| e.id)
            .collect()
    }

    fn set_edge_source(&mut self, edge_id: EdgeId, source: Option<NodeId>) {
        if let Some(edge) = self.edges.get_mut(&edge_id) {
            edge.set_source(source);
        }
        self.adjust_edge(edge_id);
    }

    fn adjust_edge(&mut self, edge_id: EdgeId) {
        let Some(edge) = self.edges.get(&edge_id) else {
            return;
        };
        let source_pos = edge
            .source()
            .and_then(|s| self.nodes.get(&s))
            .map(|n| n.position);
        let Some(dest_pos) = self.nodes.get(&edge.destination()).map(|n| n.position) else {
            return;
        };
        if let Some(edge) = self.edges.get_mut(&edge_id) {
            edge.adjust(source_pos, dest_pos);
        }
    }

    /// Check that `source` may feed `edge_id` without touching anything
    pub fn validate_connection(&self, source: NodeId, edge_id: EdgeId) -> Result<(), ConnectionError> {
        let edge = self
            .edges
            .get(&edge_id)
            .ok_or(ConnectionError::EdgeNotFound(edge_id))?;
        let destination = edge.destination();
        let source_node = self.require_node(source)?;
        let dest_node = self.require_node(destination)?;

        if source == destination {
            return Err(ConnectionError::SelfLoop);
        }
        if !source_node.class().can_feed() {
            return Err(ConnectionError::SourceIsSink(source));
        }
        if !dest_node.class().can_receive() {
            return Err(ConnectionError::DestinationIsSource(destination));
        }
        if edge.source() == Some(source) {
            return Ok(());
        }
        if self.upstream_order(source).contains(&destination) {
            return Err(ConnectionError::WouldCycle {
                upstream: source,
                destination,
            });
        }
        Ok(())
    }

    /// Feed `edge_id` from `source`, replacing any previous source
    pub fn connect(&mut self, source: NodeId, edge_id: EdgeId) -> Result<(), ConnectionError> {
        self.validate_connection(source, edge_id)?;
        self.set_edge_source(edge_id, Some(source));
        tracing::debug!("Connected {} -> edge {}", source, edge_id);
        Ok(())
    }

    /// Detach an edge's source; returns the former source
    pub fn disconnect(&mut self, edge_id: EdgeId) -> Result<Option<NodeId>, ConnectionError> {
        let previous = self
            .edges
            .get(&edge_id)
            .ok_or(ConnectionError::EdgeNotFound(edge_id))?
            .source();
        self.set_edge_source(edge_id, None);
        tracing::debug!("Disconnected edge {}", edge_id);
        Ok(previous)
    }

    /// Replace an edge's source in one step; `None` disconnects.
    ///
    /// Returns the former source. A rejected connection keeps the old one.
    pub fn rewire(
        &mut self,
        edge_id: EdgeId,
        new_source: Option<NodeId>,
    ) -> Result<Option<NodeId>, ConnectionError> {
        match new_source {
            Some(source) => {
                self.validate_connection(source, edge_id)?;
                let previous = self.edges.get(&edge_id).and_then(Edge::source);
                self.set_edge_source(edge_id, Some(source));
                tracing::debug!("Rewired edge {} to {}", edge_id, source);
                Ok(previous)
            }
            None => self.disconnect(edge_id),
        }
    }

    /// Start dragging an edge's free end; detaches the current source
    pub fn begin_rewire(&mut self, edge_id: EdgeId) -> Result<Option<NodeId>, ConnectionError> {
        let edge = self
            .edges
            .get_mut(&edge_id)
            .ok_or(ConnectionError::EdgeNotFound(edge_id))?;
        let previous = edge.source();
        let start = edge.source_point();
        edge.set_source(None);
        edge.set_dragged(true);
        edge.set_free_point(start);
        self.adjust_edge(edge_id);
        Ok(previous)
    }

    /// Move the free end of a dragged edge
    pub fn drag_edge_to(&mut self, edge_id: EdgeId, point: [f32; 2]) -> Result<(), ConnectionError> {
        let edge = self
            .edges
            .get_mut(&edge_id)
            .ok_or(ConnectionError::EdgeNotFound(edge_id))?;
        if edge.is_dragged() {
            edge.set_free_point(point);
        }
        Ok(())
    }

    /// Drop a dragged edge, on a node or on empty space
    pub fn finish_rewire(&mut self, edge_id: EdgeId, target: Option<NodeId>) -> Result<(), ConnectionError> {
        self.edges
            .get_mut(&edge_id)
            .ok_or(ConnectionError::EdgeNotFound(edge_id))?
            .set_dragged(false);
        let result = match target {
            Some(source) => self.connect(source, edge_id),
            None => Ok(()),
        };
        self.adjust_edge(edge_id);
        result
    }

    /// Mark the edge under the pointer in break-edge mode
    pub fn set_hovered_edge(&mut self, edge_id: Option<EdgeId>) {
        for edge in self.edges.values_mut() {
            edge.set_hovered(Some(edge.id) == edge_id);
        }
    }

    /// Edge marked as hovered
    pub fn hovered_edge(&self) -> Option<EdgeId> {
        self.edges.values().find(|e| e.is_hovered()).map(|e| e.id)
    }

    /// Put `new_node` on `target_edge`: `A -> B` becomes `A -> new -> B`.
    ///
    /// The new node's main edge is fed by `A`, and `target_edge` (still ending
    /// at `B`) is fed by the new node.
    pub fn splice_onto_edge(&mut self, target_edge: EdgeId, new_node: NodeId) -> Result<(), ConnectionError> {
        let edge = self
            .edges
            .get(&target_edge)
            .ok_or(ConnectionError::EdgeNotFound(target_edge))?;
        let destination = edge.destination();
        let upstream = edge
            .source()
            .ok_or(ConnectionError::EdgeNotConnected(target_edge))?;

        let node = self.require_node(new_node)?;
        if new_node == upstream || new_node == destination {
            return Err(ConnectionError::SelfLoop);
        }
        let main = node.main_edge().ok_or(ConnectionError::NoMainEdge(new_node))?;
        if self.edges.get(&main).is_some_and(Edge::is_connected) {
            return Err(ConnectionError::MainEdgeOccupied(new_node));
        }
        if !node.class().can_feed() {
            return Err(ConnectionError::SourceIsSink(new_node));
        }
        if !node.class().can_receive() {
            return Err(ConnectionError::DestinationIsSource(new_node));
        }
        if self.upstream_order(new_node).contains(&destination) {
            return Err(ConnectionError::WouldCycle {
                upstream: new_node,
                destination,
            });
        }
        if self.upstream_order(upstream).contains(&new_node) {
            return Err(ConnectionError::WouldCycle {
                upstream,
                destination: new_node,
            });
        }

        self.set_edge_source(main, Some(upstream));
        self.set_edge_source(target_edge, Some(new_node));
        tracing::debug!("Spliced node {} onto edge {}", new_node, target_edge);
        Ok(())
    }

    /// Create a node from `operation` and splice it onto `target_edge`.
    ///
    /// Nothing is left behind if the splice is rejected.
    pub fn splice_new_operation(
        &mut self,
        target_edge: EdgeId,
        operation: Box<dyn Operation>,
    ) -> Result<NodeId, GraphError> {
        let edge = self
            .edges
            .get(&target_edge)
            .ok_or(ConnectionError::EdgeNotFound(target_edge))?;
        if !edge.is_connected() {
            return Err(ConnectionError::EdgeNotConnected(target_edge).into());
        }
        let [sx, sy] = edge.source_point();
        let [dx, dy] = edge.dest_point();

        let id = self.add_operation(operation)?;
        if let Err(err) = self.splice_onto_edge(target_edge, id) {
            self.discard_node(id);
            return Err(err.into());
        }
        // Best effort: a missing node here would already have failed the splice.
        let _ = self.set_position(id, [(sx + dx) / 2.0, (sy + dy) / 2.0]);
        Ok(id)
    }

    /// Drop an unconnected node without healing anything around it
    fn discard_node(&mut self, node_id: NodeId) {
        if let Some(node) = self.nodes.shift_remove(&node_id) {
            for edge in node.inputs() {
                self.edges.shift_remove(edge);
            }
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when a topology edit is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Edge not found
    #[error("Edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// Node would feed itself
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Sink nodes never feed other nodes
    #[error("Node {0} is a sink and cannot feed an edge")]
    SourceIsSink(NodeId),

    /// Source nodes never take inputs
    #[error("Node {0} is a source and cannot take inputs")]
    DestinationIsSource(NodeId),

    /// The edit would close a cycle
    #[error("Connecting {upstream} to {destination} would create a cycle")]
    WouldCycle {
        /// Prospective feeding node
        upstream: NodeId,
        /// Destination already upstream of the source
        destination: NodeId,
    },

    /// Edge has no source
    #[error("Edge {0} is not connected")]
    EdgeNotConnected(EdgeId),

    /// Node has no input slots
    #[error("Node {0} has no main edge")]
    NoMainEdge(NodeId),

    /// Node's main edge is already fed
    #[error("Main edge of node {0} is already connected")]
    MainEdgeOccupied(NodeId),
}

/// Error from a graph edit that may also create a node
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Operation descriptor could not be parsed
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Topology edit rejected
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Parameter edit rejected
    #[error("Parameter error on node {node}: {source}")]
    Parameter {
        /// Node being edited
        node: NodeId,
        /// Underlying error
        source: ParameterError,
    },

    /// A node with this ID already exists
    #[error("Duplicate node ID: {0}")]
    DuplicateNode(NodeId),

    /// An edge with this ID already exists
    #[error("Duplicate edge ID: {0}")]
    DuplicateEdge(EdgeId),
}
