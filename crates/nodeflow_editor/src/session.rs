// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor session: one open graph and everything needed to edit it.
//!
//! Every edit made through the session is committed to the undo history
//! when it changes the graph document.

use crate::config::EditorSettings;
use crate::history::{History, HistoryError};
use nodeflow_graph::interaction::{InteractionEvent, InteractionMode};
use nodeflow_graph::ops::create_default_registry;
use nodeflow_graph::{
    CommandEngine, ConnectionError, DocumentError, EdgeId, EvaluationReport, Graph,
    GraphDocument, GraphError, InteractionOutcome, InteractionState, NodeId, Operation,
    OperationRegistry, ParamValue,
};
use std::path::Path;

/// Error from an editor session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Graph edit failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Topology edit rejected
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Document could not be loaded or saved
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Undo/redo failed
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Operation not in the registry
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}

/// Editing session
pub struct EditorSession {
    graph: Graph,
    registry: OperationRegistry,
    interaction: InteractionState,
    engine: Box<dyn CommandEngine>,
    history: History,
    /// Document before an edge drag that has not been dropped yet
    pending_edit: Option<GraphDocument>,
    auto_evaluate: bool,
    last_report: Option<EvaluationReport>,
    dirty: bool,
}

impl EditorSession {
    /// Create a session on an empty graph with the built-in operations
    pub fn new(settings: &EditorSettings, engine: Box<dyn CommandEngine>) -> Self {
        Self::with_registry(settings, create_default_registry(), engine)
    }

    /// Create a session with a custom operation registry
    pub fn with_registry(
        settings: &EditorSettings,
        registry: OperationRegistry,
        engine: Box<dyn CommandEngine>,
    ) -> Self {
        let mut interaction = InteractionState::new();
        match registry.get(&settings.break_edge_operation) {
            Some(op) => interaction.set_break_edge_operation(Some(op.factory())),
            None => tracing::warn!(
                "Break-edge operation '{}' is not registered",
                settings.break_edge_operation
            ),
        }

        Self {
            graph: Graph::default(),
            registry,
            interaction,
            engine,
            history: History::with_max_depth(settings.history_depth),
            pending_edit: None,
            auto_evaluate: settings.auto_evaluate,
            last_report: None,
            dirty: false,
        }
    }

    /// The graph being edited
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Registered operations
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Interaction state
    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    /// Undo history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Report from the last evaluation
    pub fn last_report(&self) -> Option<&EvaluationReport> {
        self.last_report.as_ref()
    }

    /// Whether there are unsaved edits
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Replace the graph with one rebuilt from a document
    pub fn open_document(&mut self, document: &GraphDocument) -> Result<(), SessionError> {
        self.graph = Graph::from_document(document, &self.registry)?;
        self.interaction = self.fresh_interaction();
        self.history.clear();
        self.pending_edit = None;
        self.last_report = None;
        self.dirty = false;
        tracing::info!("Opened graph '{}'", self.graph.name);
        Ok(())
    }

    /// Load a graph document from disk
    pub fn open(&mut self, path: &Path) -> Result<(), SessionError> {
        let document = GraphDocument::load(path)?;
        self.open_document(&document)
    }

    /// Save the graph document to disk
    pub fn save(&mut self, path: &Path) -> Result<(), SessionError> {
        self.graph.to_document().save(path)?;
        self.dirty = false;
        Ok(())
    }

    fn fresh_interaction(&self) -> InteractionState {
        let mut interaction = InteractionState::new();
        interaction.set_break_edge_operation(self.interaction.break_edge_operation().cloned());
        interaction
    }

    /// Apply one edit; commit it to history if the document changed.
    ///
    /// A failed edit leaves the graph untouched and records nothing.
    pub fn apply<T, E, F>(&mut self, description: &str, edit: F) -> Result<T, SessionError>
    where
        F: FnOnce(&mut Graph) -> Result<T, E>,
        SessionError: From<E>,
    {
        let before = self.graph.to_document();
        let value = edit(&mut self.graph)?;
        self.commit(description, before)?;
        Ok(value)
    }

    fn commit(&mut self, description: &str, before: GraphDocument) -> Result<(), SessionError> {
        let after = self.graph.to_document();
        if after == before {
            return Ok(());
        }
        self.history.record(description, &before, &after)?;
        self.dirty = true;
        if self.auto_evaluate {
            self.evaluate();
        }
        Ok(())
    }

    fn instantiate(&self, name: &str) -> Result<Box<dyn Operation>, SessionError> {
        self.registry
            .create(name)
            .ok_or_else(|| SessionError::UnknownOperation(name.to_string()))
    }

    /// Create a node by operation name, below the selected node if any
    pub fn create_node(&mut self, operation: &str) -> Result<NodeId, SessionError> {
        let op = self.instantiate(operation)?;
        self.apply(&format!("Create {operation}"), |g| g.create_node(op))
    }

    /// Connect `source` into `edge`
    pub fn connect(&mut self, source: NodeId, edge: EdgeId) -> Result<(), SessionError> {
        self.apply("Connect", |g| g.connect(source, edge))
    }

    /// Disconnect an edge
    pub fn disconnect(&mut self, edge: EdgeId) -> Result<Option<NodeId>, SessionError> {
        self.apply("Disconnect", |g| g.disconnect(edge))
    }

    /// Replace an edge's source
    pub fn rewire(&mut self, edge: EdgeId, source: Option<NodeId>) -> Result<Option<NodeId>, SessionError> {
        self.apply("Rewire", |g| g.rewire(edge, source))
    }

    /// Splice a new node, by operation name, onto an edge
    pub fn splice(&mut self, edge: EdgeId, operation: &str) -> Result<NodeId, SessionError> {
        let op = self.instantiate(operation)?;
        self.apply(&format!("Insert {operation}"), |g| g.splice_new_operation(edge, op))
    }

    /// Remove a node and heal its neighbours
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), SessionError> {
        self.apply("Delete node", |g| g.remove_node(node).map(|_| ()))?;
        self.interaction.retain_existing(&self.graph);
        Ok(())
    }

    /// Designate the active viewer
    pub fn set_sink(&mut self, node: NodeId) -> Result<(), SessionError> {
        self.apply("Set viewer", |g| g.set_sink(node))
    }

    /// Set the context-selected node without recording history
    pub fn set_selected(&mut self, node: Option<NodeId>) -> Result<(), SessionError> {
        Ok(self.graph.set_selected(node)?)
    }

    /// Enable or disable a node
    pub fn set_disabled(&mut self, node: NodeId, disabled: bool) -> Result<(), SessionError> {
        let description = if disabled { "Disable node" } else { "Enable node" };
        self.apply(description, |g| g.set_disabled(node, disabled))
    }

    /// Set a parameter value
    pub fn set_parameter(&mut self, node: NodeId, label: &str, value: ParamValue) -> Result<(), SessionError> {
        self.apply(&format!("Set {label}"), |g| g.set_parameter(node, label, value))
    }

    /// Rename a node
    pub fn rename(&mut self, node: NodeId, name: &str) -> Result<(), SessionError> {
        self.apply("Rename node", |g| g.rename(node, name))
    }

    /// Feed one UI event through the interaction state machine.
    ///
    /// An edge drag is committed as one edit when it is dropped.
    pub fn handle_event(&mut self, event: InteractionEvent) -> Result<InteractionOutcome, SessionError> {
        let resuming = self.pending_edit.is_some();
        let before = self
            .pending_edit
            .take()
            .unwrap_or_else(|| self.graph.to_document());

        let outcome = self.interaction.handle(&mut self.graph, event);
        if matches!(self.interaction.mode(), InteractionMode::EdgeDrag { .. }) {
            self.pending_edit = Some(before);
        } else if resuming || outcome.changed_graph() {
            self.commit("Edit graph", before)?;
        }
        Ok(outcome)
    }

    /// Undo the last edit
    pub fn undo(&mut self) -> Result<(), SessionError> {
        let document = self.history.undo()?;
        self.restore(&document)
    }

    /// Redo the last undone edit
    pub fn redo(&mut self) -> Result<(), SessionError> {
        let document = self.history.redo()?;
        self.restore(&document)
    }

    fn restore(&mut self, document: &GraphDocument) -> Result<(), SessionError> {
        self.graph = Graph::from_document(document, &self.registry)?;
        self.interaction.retain_existing(&self.graph);
        self.interaction.cancel_gesture();
        self.pending_edit = None;
        self.dirty = true;
        Ok(())
    }

    /// Evaluate from the sink and dispatch to the session engine
    pub fn evaluate(&mut self) -> &EvaluationReport {
        let report = self.graph.evaluate(self.engine.as_mut());
        self.last_report.insert(report)
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("graph", &self.graph.name)
            .field("nodes", &self.graph.node_count())
            .field("auto_evaluate", &self.auto_evaluate)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

/// Starter graph: `Open Table` into `Select` into `Viewer`, viewer as sink
pub fn starter_document(registry: &OperationRegistry) -> Result<GraphDocument, SessionError> {
    let create = |name: &str| {
        registry
            .create(name)
            .ok_or_else(|| SessionError::UnknownOperation(name.to_string()))
    };

    let mut graph = Graph::new("Untitled");
    let open = graph.add_operation(create("Open Table")?).map_err(GraphError::from)?;
    graph.set_position(open, [0.0, 0.0])?;
    graph.set_selected(Some(open))?;
    let select = graph.create_node(create("Select")?)?;
    graph.set_selected(Some(select))?;
    let viewer = graph.create_node(create("Viewer")?)?;
    graph.set_parameter(open, "File", ParamValue::FilePath("data/table.tab".into()))?;
    graph.set_sink(viewer)?;
    graph.set_selected(None)?;
    Ok(graph.to_document())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeflow_graph::RecordingEngine;

    fn session() -> EditorSession {
        EditorSession::new(&EditorSettings::default(), Box::new(RecordingEngine::new()))
    }

    #[test]
    fn test_starter_document_evaluates() {
        let mut session = session();
        let document = starter_document(session.registry()).unwrap();
        session.open_document(&document).unwrap();
        assert_eq!(session.graph().node_count(), 3);

        let report = session.evaluate();
        assert_eq!(report.commands.len(), 3);
        assert!(report.command_texts()[2].starts_with("Browse * From _"));
    }

    #[test]
    fn test_edits_are_undoable() {
        let mut session = session();
        let open = session.create_node("Open Table").unwrap();
        session.set_selected(Some(open)).unwrap();
        let select = session.create_node("Select").unwrap();
        assert_eq!(session.graph().main_source(select), Some(open));
        assert_eq!(session.history().stats().undo_count, 2);

        session.undo().unwrap();
        assert!(!session.graph().contains_node(select));
        session.redo().unwrap();
        assert_eq!(session.graph().main_source(select), Some(open));
        assert!(session.has_unsaved_changes());
    }

    #[test]
    fn test_rejected_edit_records_nothing() {
        let mut session = session();
        let open = session.create_node("Open Table").unwrap();
        let viewer = session.create_node("Viewer").unwrap();
        let edge = session.graph().node(viewer).unwrap().main_edge().unwrap();

        let result = session.connect(viewer, edge);
        assert!(matches!(result, Err(SessionError::Connection(ConnectionError::SelfLoop))));
        assert_eq!(session.history().stats().undo_count, 2);

        assert!(matches!(
            session.create_node("Buffer"),
            Err(SessionError::UnknownOperation(_))
        ));
        session.connect(open, edge).unwrap();
        assert_eq!(session.history().undo_description(), Some("Connect"));
    }

    #[test]
    fn test_auto_evaluate() {
        let settings = EditorSettings {
            auto_evaluate: true,
            ..Default::default()
        };
        let mut session = EditorSession::new(&settings, Box::new(RecordingEngine::new()));
        let document = starter_document(session.registry()).unwrap();
        session.open_document(&document).unwrap();
        assert!(session.last_report().is_none());

        let sink = session.graph().sink().unwrap();
        session.set_disabled(sink, false).unwrap();
        assert!(session.last_report().is_none());
        let select = session.graph().main_source(sink).unwrap();
        session.set_disabled(select, true).unwrap();
        let report = session.last_report().unwrap();
        assert_eq!(report.commands.len(), 2);
    }
}
