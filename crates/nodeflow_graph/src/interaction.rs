// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer and key interaction as an explicit state machine.
//!
//! The UI resolves what lies under the pointer and feeds events in; each
//! transition calls at most one graph mutation.

use crate::edge::EdgeId;
use crate::graph::{Graph, GraphError};
use crate::node::NodeId;
use crate::registry::OperationFactory;
use indexmap::IndexSet;
use std::fmt;

/// Pointer button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Left button
    Primary,
    /// Middle button
    Middle,
    /// Right button
    Secondary,
}

/// What lies under the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    /// Empty canvas
    Empty,
    /// A node body
    Node(NodeId),
    /// An edge line
    Edge(EdgeId),
}

/// Input event, positions in graph space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEvent {
    /// Button pressed
    PointerPressed {
        /// Button
        button: PointerButton,
        /// Pointer position
        position: [f32; 2],
        /// Target under the pointer
        hit: Hit,
    },
    /// Pointer moved
    PointerMoved {
        /// Pointer position
        position: [f32; 2],
        /// Target under the pointer
        hit: Hit,
    },
    /// Button released
    PointerReleased {
        /// Button
        button: PointerButton,
        /// Pointer position
        position: [f32; 2],
        /// Target under the pointer
        hit: Hit,
    },
    /// Break-edge modifier pressed (`true`) or released (`false`)
    BreakEdgeModifier(bool),
    /// Delete key
    Delete,
    /// Disable toggle key
    ToggleDisabled,
}

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionMode {
    /// Waiting for input
    #[default]
    Idle,
    /// Panning the view
    Pan {
        /// Last pointer position
        last: [f32; 2],
    },
    /// Rubber-band selection
    BoxSelect {
        /// Corner where the drag started
        start: [f32; 2],
        /// Opposite corner
        current: [f32; 2],
    },
    /// Dragging the free end of an edge
    EdgeDrag {
        /// Edge being rewired
        edge: EdgeId,
        /// Source before the drag started
        original: Option<NodeId>,
    },
    /// Break-edge modifier held
    BreakEdgeInsert,
}

/// Result of handling one event
#[derive(Debug)]
pub enum InteractionOutcome {
    /// Nothing changed
    None,
    /// View or transient state changed
    ViewChanged,
    /// Selection changed
    SelectionChanged,
    /// Graph topology or node state changed
    GraphChanged,
    /// A graph edit was refused; the graph is unchanged
    Rejected(GraphError),
}

impl InteractionOutcome {
    /// Whether the graph was modified
    pub fn changed_graph(&self) -> bool {
        matches!(self, Self::GraphChanged)
    }
}

/// Interaction state for one graph view
#[derive(Default)]
pub struct InteractionState {
    mode: InteractionMode,
    selection: IndexSet<NodeId>,
    pan: [f32; 2],
    break_edge_operation: Option<OperationFactory>,
}

impl fmt::Debug for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionState")
            .field("mode", &self.mode)
            .field("selection", &self.selection)
            .field("pan", &self.pan)
            .finish_non_exhaustive()
    }
}

impl InteractionState {
    /// Create a new idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Operation created by the break-edge gesture
    pub fn set_break_edge_operation(&mut self, factory: Option<OperationFactory>) {
        self.break_edge_operation = factory;
    }

    /// Operation created by the break-edge gesture, if configured
    pub fn break_edge_operation(&self) -> Option<&OperationFactory> {
        self.break_edge_operation.as_ref()
    }

    /// Current mode
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Selected nodes in selection order
    pub fn selection(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.selection.iter().copied()
    }

    /// Whether a node is selected
    pub fn is_selected(&self, node_id: NodeId) -> bool {
        self.selection.contains(&node_id)
    }

    /// View pan offset
    pub fn pan(&self) -> [f32; 2] {
        self.pan
    }

    /// Clear selection
    pub fn clear_selection(&mut self, graph: &mut Graph) {
        self.selection.clear();
        // Clearing to `None` cannot fail.
        let _ = graph.set_selected(None);
    }

    /// Forget nodes that are no longer in the graph
    pub fn retain_existing(&mut self, graph: &Graph) {
        self.selection.retain(|id| graph.contains_node(*id));
    }

    /// Abandon any gesture in progress and return to idle
    pub fn cancel_gesture(&mut self) {
        if self.mode != InteractionMode::Idle {
            tracing::debug!("Cancelled {:?}", self.mode);
        }
        self.mode = InteractionMode::Idle;
    }

    /// Feed one event through the state machine
    pub fn handle(&mut self, graph: &mut Graph, event: InteractionEvent) -> InteractionOutcome {
        use InteractionEvent as E;
        use InteractionMode as M;

        match (self.mode, event) {
            (M::Idle, E::PointerPressed { button: PointerButton::Middle, position, .. }) => {
                self.mode = M::Pan { last: position };
                InteractionOutcome::ViewChanged
            }
            (M::Pan { last }, E::PointerMoved { position, .. }) => {
                self.pan[0] += position[0] - last[0];
                self.pan[1] += position[1] - last[1];
                self.mode = M::Pan { last: position };
                InteractionOutcome::ViewChanged
            }
            (M::Pan { .. }, E::PointerReleased { .. }) => {
                self.mode = M::Idle;
                InteractionOutcome::ViewChanged
            }

            (M::Idle, E::PointerPressed { button: PointerButton::Primary, position, hit }) => {
                self.press_primary(graph, position, hit)
            }
            (M::BoxSelect { start, .. }, E::PointerMoved { position, .. }) => {
                self.mode = M::BoxSelect {
                    start,
                    current: position,
                };
                InteractionOutcome::ViewChanged
            }
            (M::BoxSelect { start, .. }, E::PointerReleased { position, .. }) => {
                self.mode = M::Idle;
                self.finish_box_select(graph, start, position)
            }

            (M::EdgeDrag { edge, .. }, E::PointerMoved { position, .. }) => {
                match graph.drag_edge_to(edge, position) {
                    Ok(()) => InteractionOutcome::ViewChanged,
                    Err(err) => InteractionOutcome::Rejected(err.into()),
                }
            }
            (M::EdgeDrag { edge, original }, E::PointerReleased { hit, .. }) => {
                self.mode = M::Idle;
                self.drop_edge(graph, edge, original, hit)
            }

            (M::Idle, E::BreakEdgeModifier(true)) => {
                self.mode = M::BreakEdgeInsert;
                InteractionOutcome::ViewChanged
            }
            (M::BreakEdgeInsert, E::PointerMoved { hit, .. }) => {
                let hovered = match hit {
                    Hit::Edge(edge) => Some(edge),
                    _ => None,
                };
                if graph.hovered_edge() == hovered {
                    return InteractionOutcome::None;
                }
                graph.set_hovered_edge(hovered);
                InteractionOutcome::ViewChanged
            }
            (
                M::BreakEdgeInsert,
                E::PointerPressed { button: PointerButton::Primary, hit: Hit::Edge(edge), .. },
            ) => self.break_edge(graph, edge),
            (M::BreakEdgeInsert, E::BreakEdgeModifier(false)) => {
                graph.set_hovered_edge(None);
                self.mode = M::Idle;
                InteractionOutcome::ViewChanged
            }

            (M::Idle, E::Delete) => self.delete_selected(graph),
            (M::Idle, E::ToggleDisabled) => self.toggle_disabled(graph),

            _ => InteractionOutcome::None,
        }
    }

    fn press_primary(&mut self, graph: &mut Graph, position: [f32; 2], hit: Hit) -> InteractionOutcome {
        match hit {
            Hit::Node(node) => {
                if let Err(err) = graph.set_selected(Some(node)) {
                    return InteractionOutcome::Rejected(err.into());
                }
                self.selection.clear();
                self.selection.insert(node);
                InteractionOutcome::SelectionChanged
            }
            Hit::Empty => {
                self.clear_selection(graph);
                self.mode = InteractionMode::BoxSelect {
                    start: position,
                    current: position,
                };
                InteractionOutcome::SelectionChanged
            }
            Hit::Edge(edge) => match graph.begin_rewire(edge) {
                Ok(original) => {
                    self.mode = InteractionMode::EdgeDrag { edge, original };
                    InteractionOutcome::GraphChanged
                }
                Err(err) => InteractionOutcome::Rejected(err.into()),
            },
        }
    }

    fn finish_box_select(&mut self, graph: &mut Graph, start: [f32; 2], end: [f32; 2]) -> InteractionOutcome {
        let min = [start[0].min(end[0]), start[1].min(end[1])];
        let max = [start[0].max(end[0]), start[1].max(end[1])];

        self.selection = graph
            .nodes()
            .filter(|n| {
                let [x, y] = n.position;
                x >= min[0] && x <= max[0] && y >= min[1] && y <= max[1]
            })
            .map(|n| n.id)
            .collect();

        let single = if self.selection.len() == 1 {
            self.selection.first().copied()
        } else {
            None
        };
        // Every candidate came from the graph's own node list.
        let _ = graph.set_selected(single);
        InteractionOutcome::SelectionChanged
    }

    fn drop_edge(
        &mut self,
        graph: &mut Graph,
        edge: EdgeId,
        original: Option<NodeId>,
        hit: Hit,
    ) -> InteractionOutcome {
        let target = match hit {
            Hit::Node(node) => Some(node),
            _ => None,
        };
        match graph.finish_rewire(edge, target) {
            Ok(()) => InteractionOutcome::GraphChanged,
            Err(err) => {
                tracing::warn!("Edge drop rejected: {}", err);
                if let Err(restore) = graph.rewire(edge, original) {
                    tracing::warn!("Could not restore edge {}: {}", edge, restore);
                }
                InteractionOutcome::Rejected(err.into())
            }
        }
    }

    fn break_edge(&mut self, graph: &mut Graph, edge: EdgeId) -> InteractionOutcome {
        let Some(factory) = self.break_edge_operation.as_ref() else {
            return InteractionOutcome::None;
        };
        match graph.splice_new_operation(edge, factory()) {
            Ok(node) => {
                graph.set_hovered_edge(None);
                self.selection.clear();
                self.selection.insert(node);
                // The new node was just added.
                let _ = graph.set_selected(Some(node));
                InteractionOutcome::GraphChanged
            }
            Err(err) => {
                tracing::warn!("Break-edge insert rejected: {}", err);
                InteractionOutcome::Rejected(err)
            }
        }
    }

    fn delete_selected(&mut self, graph: &mut Graph) -> InteractionOutcome {
        if self.selection.is_empty() {
            return InteractionOutcome::None;
        }
        for node in std::mem::take(&mut self.selection) {
            if let Err(err) = graph.remove_node(node) {
                tracing::warn!("Could not delete node: {}", err);
            }
        }
        InteractionOutcome::GraphChanged
    }

    fn toggle_disabled(&mut self, graph: &mut Graph) -> InteractionOutcome {
        let mut changed = false;
        for node in &self.selection {
            let Some(disabled) = graph.node(*node).map(|n| n.is_disabled()) else {
                continue;
            };
            changed |= graph.set_disabled(*node, !disabled).is_ok();
        }
        if changed {
            InteractionOutcome::GraphChanged
        } else {
            InteractionOutcome::None
        }
    }
}
