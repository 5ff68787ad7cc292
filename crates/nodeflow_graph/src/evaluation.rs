// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation: ordering, content hashing and command generation.
//!
//! Evaluation borrows the graph immutably for the whole pass, so no edit
//! and no second evaluation can start until dispatch has finished.

use crate::engine::{CommandEngine, DispatchFailure};
use crate::graph::Graph;
use crate::hash::digest_hex;
use crate::node::NodeId;
use crate::operation::CommandContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One command produced by a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Node that produced the command
    pub node: NodeId,
    /// Content hash of that node
    pub hash: String,
    /// Command text
    pub text: String,
}

/// How an evaluation pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationStatus {
    /// No sink designated; nothing ran
    NoSink,
    /// Sink has no connected input; nothing ran
    SinkUnconnected,
    /// Order traversed and commands dispatched
    Completed,
}

/// Outcome of one evaluation pass
#[derive(Debug)]
pub struct EvaluationReport {
    /// How the pass ended
    pub status: EvaluationStatus,
    /// Nodes visited, upstream first
    pub order: Vec<NodeId>,
    /// Commands in dispatch order
    pub commands: Vec<Command>,
    /// Commands the engine refused
    pub failures: Vec<DispatchFailure>,
}

impl EvaluationReport {
    fn idle(status: EvaluationStatus) -> Self {
        Self {
            status,
            order: Vec::new(),
            commands: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Whether every command was accepted
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Command texts in dispatch order
    pub fn command_texts(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.text.as_str()).collect()
    }
}

/// Per-pass state threaded through the traversal
pub struct EvaluationContext<'a> {
    /// The graph being evaluated
    pub graph: &'a Graph,
    /// Hashes computed during this pass
    hashes: HashMap<NodeId, String>,
    /// Commands accumulated so far
    commands: Vec<Command>,
}

impl<'a> EvaluationContext<'a> {
    /// Create a new evaluation context
    pub fn new(graph: &'a Graph) -> Self {
        Self {
            graph,
            hashes: HashMap::new(),
            commands: Vec::new(),
        }
    }

    /// Content hash of a node.
    ///
    /// Digest of the resolved upstream hashes, in `edges_in` order, followed
    /// by the node's parameter hash.
    pub fn hash(&mut self, node_id: NodeId) -> Option<String> {
        if let Some(hash) = self.hashes.get(&node_id) {
            return Some(hash.clone());
        }
        let graph = self.graph;
        let node = graph.node(node_id)?;

        let mut material = String::new();
        for upstream in graph.upstream_nodes(node_id) {
            if let Some(resolved) = graph.resolve_through(upstream) {
                if let Some(hash) = self.hash(resolved) {
                    material.push_str(&hash);
                }
            }
        }
        material.push_str(&node.parameters().hash());

        let hash = digest_hex(&material);
        self.hashes.insert(node_id, hash.clone());
        Some(hash)
    }

    /// Hash of the resolved upstream result feeding each slot
    pub fn input_hashes(&mut self, node_id: NodeId) -> Vec<Option<String>> {
        let graph = self.graph;
        let Some(node) = graph.node(node_id) else {
            return Vec::new();
        };
        node.inputs()
            .iter()
            .map(|edge| {
                let source = graph.edge(*edge)?.source()?;
                let resolved = graph.resolve_through(source)?;
                self.hash(resolved)
            })
            .collect()
    }

    /// Run one node: ask its operation for a command and record it.
    ///
    /// Upstream nodes are not visited; the caller walks the order.
    pub fn execute(&mut self, node_id: NodeId) {
        let graph = self.graph;
        let Some(node) = graph.node(node_id) else {
            return;
        };
        if node.passes_through() {
            return;
        }
        let Some(hash) = self.hash(node_id) else {
            return;
        };
        let inputs = self.input_hashes(node_id);
        let ctx = CommandContext::new(node_id, &node.name, &hash, node.parameters(), &inputs);
        let text = node.operation().build_command(&ctx);
        if text.is_empty() {
            tracing::debug!("Node '{}' produced no command", node.name);
            return;
        }
        self.commands.push(Command {
            node: node_id,
            hash,
            text,
        });
    }

    /// Commands accumulated so far
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Consume the context, returning its commands
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

impl Graph {
    /// Nodes `root` depends on, upstream first, ending at `root`.
    ///
    /// Walks a single shared stack in pre-order, reverses the trace and keeps
    /// the first occurrence of each node.
    pub fn upstream_order(&self, root: NodeId) -> Vec<NodeId> {
        if !self.contains_node(root) {
            return Vec::new();
        }

        let mut stack = vec![root];
        let mut trace = Vec::new();
        while let Some(current) = stack.pop() {
            trace.push(current);
            stack.extend(self.upstream_nodes(current));
        }

        let mut order = Vec::with_capacity(trace.len());
        for node in trace.into_iter().rev() {
            if !order.contains(&node) {
                order.push(node);
            }
        }
        order
    }

    /// Follow disabled and pass-through nodes up their first connected input.
    ///
    /// Returns the node whose result a consumer of `node_id` actually reads,
    /// or `None` if the chain ends in a pass-through with nothing feeding it.
    pub fn resolve_through(&self, node_id: NodeId) -> Option<NodeId> {
        let mut current = node_id;
        loop {
            let node = self.node(current)?;
            if !node.passes_through() {
                return Some(current);
            }
            current = self.upstream_nodes(current).first().copied()?;
        }
    }

    /// Content hash of a node, recomputed from scratch
    pub fn node_hash(&self, node_id: NodeId) -> Option<String> {
        EvaluationContext::new(self).hash(node_id)
    }

    /// Build the command list for the current sink without dispatching it
    pub fn build_commands(&self) -> EvaluationReport {
        let Some(sink) = self.sink() else {
            return EvaluationReport::idle(EvaluationStatus::NoSink);
        };
        if self.edges_in(sink).is_empty() {
            return EvaluationReport::idle(EvaluationStatus::SinkUnconnected);
        }

        let order = self.upstream_order(sink);
        let mut ctx = EvaluationContext::new(self);
        for node in &order {
            ctx.execute(*node);
        }

        EvaluationReport {
            status: EvaluationStatus::Completed,
            order,
            commands: ctx.into_commands(),
            failures: Vec::new(),
        }
    }

    /// Evaluate from the sink and hand every command to `engine`, in order.
    ///
    /// A refused command is recorded in the report and the rest are still
    /// dispatched.
    pub fn evaluate(&self, engine: &mut dyn CommandEngine) -> EvaluationReport {
        let mut report = self.build_commands();
        match report.status {
            EvaluationStatus::NoSink => {
                tracing::debug!("No sink set; nothing to evaluate");
                return report;
            }
            EvaluationStatus::SinkUnconnected => {
                tracing::debug!("Sink has no inputs; nothing to evaluate");
                return report;
            }
            EvaluationStatus::Completed => {}
        }

        for command in &report.commands {
            if let Err(error) = engine.run_command(&command.text) {
                tracing::warn!("Command failed: {} ({})", command.text, error);
                report.failures.push(DispatchFailure {
                    node: command.node,
                    command: command.text.clone(),
                    error,
                });
            }
        }

        tracing::info!(
            "Evaluated {} nodes, dispatched {} commands ({} failed)",
            report.order.len(),
            report.commands.len(),
            report.failures.len()
        );
        report
    }
}
