// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph engine for `NodeFlow`.
//!
//! A directed acyclic graph of operation nodes, edited interactively and
//! evaluated into an ordered list of textual commands for an external
//! execution engine.
//!
//! ## Architecture
//!
//! - Every input slot of a node owns one edge; edits only move sources
//! - Topology mutations validate first and are all-or-nothing
//! - Content hashes name generated datasets (`_<hash>`)
//! - Evaluation walks upstream from the sink and dispatches in order
//! - Interaction gestures are an explicit state machine over the graph

pub mod document;
pub mod edge;
pub mod engine;
pub mod evaluation;
pub mod graph;
pub mod hash;
pub mod interaction;
pub mod node;
pub mod operation;
pub mod ops;
pub mod parameter;
pub mod registry;

pub use document::{DocumentError, GraphDocument};
pub use edge::{Edge, EdgeId, EdgeType};
pub use engine::{CommandEngine, EngineError, RecordingEngine, ScriptEngine};
pub use evaluation::{Command, EvaluationReport, EvaluationStatus};
pub use graph::{ConnectionError, Graph, GraphError};
pub use interaction::{InteractionEvent, InteractionMode, InteractionOutcome, InteractionState};
pub use node::{Node, NodeClass, NodeId};
pub use operation::{CommandContext, DescriptorError, Operation, OperationDescriptor};
pub use parameter::{ParamValue, ParameterError, Parameters};
pub use registry::{OperationFactory, OperationRegistry};
