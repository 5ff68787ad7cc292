// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph.

use crate::edge::EdgeId;
use crate::operation::{DescriptorError, Operation, OperationDescriptor};
use crate::parameter::Parameters;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node class, derived from the operation descriptor's class token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClass {
    /// Reads or creates data; never has a connected input
    Source,
    /// Viewer; never feeds another node
    Sink,
    /// Reshapes data
    Transform,
    /// Writes data out
    Output,
    /// Routing dot; forwards its input unchanged
    PassThrough,
    /// Everything else
    Default,
}

impl NodeClass {
    /// Map a descriptor class token to a node class
    pub fn from_class_name(class_name: &str) -> Self {
        match class_name {
            "Input" | "Create" => Self::Source,
            "Viewer" => Self::Sink,
            "Output" => Self::Output,
            "Transform" => Self::Transform,
            "Dot" | "Other" => Self::PassThrough,
            _ => Self::Default,
        }
    }

    /// Whether an edge may originate here
    pub fn can_feed(self) -> bool {
        self != Self::Sink
    }

    /// Whether an edge may terminate here
    pub fn can_receive(self) -> bool {
        self != Self::Source
    }
}

/// A node instance in the graph
#[derive(Debug)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Display name (user-editable)
    pub name: String,
    /// Position in the graph view
    pub position: [f32; 2],
    descriptor: OperationDescriptor,
    class: NodeClass,
    /// Input edges, one per slot; slot 0 is created first
    inputs: Vec<EdgeId>,
    main_edge: Option<EdgeId>,
    disabled: bool,
    parameters: Parameters,
    operation: Box<dyn Operation>,
}

impl Node {
    /// Create a node around an operation.
    ///
    /// Input edges are attached by the graph afterwards.
    pub fn new(id: NodeId, operation: Box<dyn Operation>) -> Result<Self, DescriptorError> {
        let descriptor = OperationDescriptor::parse(&operation.description())?;
        let mut parameters = Parameters::new();
        operation.declare_parameters(&mut parameters);

        Ok(Self {
            id,
            name: descriptor.name.clone(),
            position: [0.0, 0.0],
            class: descriptor.class(),
            descriptor,
            inputs: Vec::new(),
            main_edge: None,
            disabled: false,
            parameters,
            operation,
        })
    }

    /// Append an input edge; `is_main` makes it the main edge
    pub(crate) fn add_edge(&mut self, edge: EdgeId, is_main: bool) {
        debug_assert!(self.inputs.len() < self.descriptor.max_inputs);
        self.inputs.push(edge);
        if is_main {
            self.main_edge = Some(edge);
        }
    }

    /// Operation descriptor
    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    /// Node class
    pub fn class(&self) -> NodeClass {
        self.class
    }

    /// Declared number of input slots
    pub fn max_inputs(&self) -> usize {
        self.descriptor.max_inputs
    }

    /// Input edges in slot order
    pub fn inputs(&self) -> &[EdgeId] {
        &self.inputs
    }

    /// Input edge of a slot
    pub fn input(&self, slot: usize) -> Option<EdgeId> {
        self.inputs.get(slot).copied()
    }

    /// Main input edge
    pub fn main_edge(&self) -> Option<EdgeId> {
        self.main_edge
    }

    /// Whether the node is disabled
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub(crate) fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Whether the node forwards its input instead of producing a result
    pub fn passes_through(&self) -> bool {
        self.disabled || self.class == NodeClass::PassThrough
    }

    /// Parameter state
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Mutable parameter state
    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    /// Wrapped operation
    pub fn operation(&self) -> &dyn Operation {
        self.operation.as_ref()
    }
}
