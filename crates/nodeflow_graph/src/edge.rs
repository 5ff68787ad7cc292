// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge definitions for the graph.
//!
//! Every input slot of a node owns exactly one edge for the node's whole
//! life. Connecting and disconnecting only changes the edge's source; the
//! destination is fixed at construction.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Vertical distance of an unconnected edge's free end above its node
const FREE_END_RISE: f32 = 40.0;
/// Horizontal distance of an unconnected edge's free end from its node
const FREE_END_SIDE: f32 = 30.0;
/// Arrow head size, used to keep mask edges clear of the node body
const ARROW_SIZE: f32 = 10.0;

/// Unique identifier for an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    /// Create a new random edge ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Edge type; decides the dependency role and the unconnected geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeType {
    /// Feeds a viewer
    ViewerLink,
    /// Ordinary input
    Default,
    /// Base input of a multi-input node
    Base,
    /// Mask input
    Mask,
}

impl EdgeType {
    /// Offset of the free end from the destination when no source is set
    pub fn default_offset(self) -> [f32; 2] {
        match self {
            Self::ViewerLink | Self::Base => [FREE_END_SIDE, -FREE_END_RISE],
            Self::Default => [-FREE_END_SIDE, -FREE_END_RISE],
            Self::Mask => [-FREE_END_RISE - 2.0 * ARROW_SIZE, 0.0],
        }
    }
}

/// A directed link into one input slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique edge ID
    pub id: EdgeId,
    edge_type: EdgeType,
    source: Option<NodeId>,
    destination: NodeId,
    slot: usize,
    dragged: bool,
    hovered: bool,
    source_point: [f32; 2],
    dest_point: [f32; 2],
}

impl Edge {
    /// Create an unconnected edge for `slot` of `destination`
    pub(crate) fn new(id: EdgeId, destination: NodeId, slot: usize, edge_type: EdgeType) -> Self {
        Self {
            id,
            edge_type,
            source: None,
            destination,
            slot,
            dragged: false,
            hovered: false,
            source_point: [0.0, 0.0],
            dest_point: [0.0, 0.0],
        }
    }

    /// Edge type
    pub fn edge_type(&self) -> EdgeType {
        self.edge_type
    }

    /// Source node, if connected
    pub fn source(&self) -> Option<NodeId> {
        self.source
    }

    /// Destination node
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Input slot on the destination
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Whether a source is attached
    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }

    /// Whether the edge is being dragged
    pub fn is_dragged(&self) -> bool {
        self.dragged
    }

    /// Whether the pointer hovers the edge in break-edge mode
    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    /// Start point in graph space
    pub fn source_point(&self) -> [f32; 2] {
        self.source_point
    }

    /// End point in graph space
    pub fn dest_point(&self) -> [f32; 2] {
        self.dest_point
    }

    /// Check if this edge involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.source == Some(node_id) || self.destination == node_id
    }

    pub(crate) fn set_source(&mut self, source: Option<NodeId>) {
        self.source = source;
    }

    pub(crate) fn set_dragged(&mut self, dragged: bool) {
        self.dragged = dragged;
    }

    pub(crate) fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    /// Move the free end while dragging
    pub(crate) fn set_free_point(&mut self, point: [f32; 2]) {
        self.source_point = point;
    }

    /// Recompute endpoints from node positions.
    ///
    /// Without a source the free end sits at the type's default offset from
    /// the destination, unless the edge is being dragged.
    pub fn adjust(&mut self, source_pos: Option<[f32; 2]>, dest_pos: [f32; 2]) {
        self.dest_point = dest_pos;
        match source_pos {
            Some(pos) => self.source_point = pos,
            None if !self.dragged => {
                let [dx, dy] = self.edge_type.default_offset();
                self.source_point = [dest_pos[0] + dx, dest_pos[1] + dy];
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_offsets() {
        assert!(EdgeType::ViewerLink.default_offset()[0] > 0.0);
        assert!(EdgeType::Base.default_offset()[0] > 0.0);
        assert!(EdgeType::Default.default_offset()[0] < 0.0);
        assert!(EdgeType::Mask.default_offset()[0] < 0.0);
        assert_eq!(EdgeType::Mask.default_offset()[1], 0.0);
    }

    #[test]
    fn test_adjust_unconnected_and_dragged() {
        let mut edge = Edge::new(EdgeId::new(), NodeId::new(), 0, EdgeType::Default);
        edge.adjust(None, [100.0, 100.0]);
        assert_eq!(edge.source_point(), [70.0, 60.0]);
        assert_eq!(edge.dest_point(), [100.0, 100.0]);

        edge.set_dragged(true);
        edge.set_free_point([5.0, 5.0]);
        edge.adjust(None, [100.0, 100.0]);
        assert_eq!(edge.source_point(), [5.0, 5.0]);

        edge.adjust(Some([0.0, 0.0]), [100.0, 100.0]);
        assert_eq!(edge.source_point(), [0.0, 0.0]);
    }
}
