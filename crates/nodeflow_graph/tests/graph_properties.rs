// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end properties of editing and evaluating graphs.

use nodeflow_graph::ops::{create_default_registry, OpenTable, Select, Viewer};
use nodeflow_graph::{
    CommandContext, ConnectionError, EdgeId, EngineError, EvaluationStatus, Graph, NodeId,
    Operation, OperationDescriptor, ParamValue, Parameters, RecordingEngine, ScriptEngine,
};
use std::io::{self, BufWriter, Write};

/// Two-input operation for diamond-shaped graphs
#[derive(Debug)]
struct Join;

impl Operation for Join {
    fn description(&self) -> String {
        "Query/Join;Join two tables./2".to_string()
    }

    fn declare_parameters(&self, params: &mut Parameters) {
        params.text("On", "ID");
    }

    fn build_command(&self, ctx: &CommandContext<'_>) -> String {
        match (ctx.input_ref(0), ctx.input_ref(1)) {
            (Some(a), Some(b)) => format!("Join {a} {b} Into {}", ctx.output_ref()),
            _ => String::new(),
        }
    }
}

/// Source-class operation that still declares an input slot
#[derive(Debug)]
struct Generate;

impl Operation for Generate {
    fn description(&self) -> String {
        "Create/Generate;Generate a grid./1".to_string()
    }

    fn declare_parameters(&self, _params: &mut Parameters) {}

    fn build_command(&self, ctx: &CommandContext<'_>) -> String {
        format!("Create Grid Into {}", ctx.output_ref())
    }
}

fn slot(graph: &Graph, node: NodeId, index: usize) -> EdgeId {
    graph.node(node).unwrap().input(index).unwrap()
}

fn open(graph: &mut Graph, file: &str) -> NodeId {
    let id = graph.add_operation(Box::new(OpenTable)).unwrap();
    graph
        .set_parameter(id, "File", ParamValue::FilePath(file.into()))
        .unwrap();
    id
}

fn select(graph: &mut Graph, condition: &str) -> NodeId {
    let id = graph.add_operation(Box::new(Select)).unwrap();
    graph
        .set_parameter(id, "Where", ParamValue::Text(condition.into()))
        .unwrap();
    id
}

#[test]
fn descriptor_parses_into_fields() {
    let d = OperationDescriptor::parse("Input/Open Table;Open data table./0").unwrap();
    assert_eq!(d.class_name, "Input");
    assert_eq!(d.name, "Open Table");
    assert_eq!(d.description, "Open data table.");
    assert_eq!(d.max_inputs, 0);
}

#[test]
fn diamond_order_visits_shared_ancestor_once() {
    let mut graph = Graph::new("diamond");
    let a = open(&mut graph, "a.tab");
    let b = select(&mut graph, "X > 1");
    let c = select(&mut graph, "X < 1");
    let d = graph.add_operation(Box::new(Join)).unwrap();
    graph.connect(a, slot(&graph, b, 0)).unwrap();
    graph.connect(a, slot(&graph, c, 0)).unwrap();
    graph.connect(b, slot(&graph, d, 0)).unwrap();
    graph.connect(c, slot(&graph, d, 1)).unwrap();

    let order = graph.upstream_order(d);
    let pos = |n: NodeId| order.iter().position(|x| *x == n).unwrap();
    assert_eq!(order.len(), 4);
    assert_eq!(order.iter().filter(|n| **n == a).count(), 1);
    assert!(pos(a) < pos(b) && pos(a) < pos(c));
    assert!(pos(b) < pos(d) && pos(c) < pos(d));
    assert_eq!(*order.last().unwrap(), d);

    // Closing the diamond back onto its root is a cycle.
    let e = select(&mut graph, "");
    graph.connect(d, slot(&graph, e, 0)).unwrap();
    let f = graph.add_operation(Box::new(Join)).unwrap();
    graph.connect(e, slot(&graph, f, 1)).unwrap();
    assert!(matches!(
        graph.connect(f, slot(&graph, b, 0)),
        Err(ConnectionError::WouldCycle { .. })
    ));
    assert_eq!(graph.main_source(b), Some(a));
}

#[test]
fn parameter_change_rehashes_downstream_only() {
    let mut graph = Graph::new("hashes");
    let a = open(&mut graph, "a.tab");
    let sibling = open(&mut graph, "b.tab");
    let b = select(&mut graph, "");
    let d = graph.add_operation(Box::new(Join)).unwrap();
    graph.connect(a, slot(&graph, b, 0)).unwrap();
    graph.connect(b, slot(&graph, d, 0)).unwrap();
    graph.connect(sibling, slot(&graph, d, 1)).unwrap();

    let snapshot = |g: &Graph| -> Vec<String> {
        [a, sibling, b, d]
            .iter()
            .map(|n| g.node_hash(*n).unwrap())
            .collect()
    };
    let before = snapshot(&graph);
    graph
        .set_parameter(b, "Where", ParamValue::Text("Kind = 'road'".into()))
        .unwrap();
    let after = snapshot(&graph);

    assert_eq!(before[0], after[0]);
    assert_eq!(before[1], after[1]);
    assert_ne!(before[2], after[2]);
    assert_ne!(before[3], after[3]);
}

#[test]
fn identical_content_gives_identical_hashes() {
    let mut graph = Graph::new("content");
    let a1 = open(&mut graph, "a.tab");
    let a2 = open(&mut graph, "a.tab");
    let b1 = select(&mut graph, "X > 1");
    let b2 = select(&mut graph, "X > 1");
    graph.connect(a1, slot(&graph, b1, 0)).unwrap();
    graph.connect(a2, slot(&graph, b2, 0)).unwrap();
    assert_eq!(graph.node_hash(b1), graph.node_hash(b2));
}

#[test]
fn disabling_a_node_equals_removing_it() {
    let mut graph = Graph::new("pass-through");
    let a = open(&mut graph, "parcels.tab");
    let x = select(&mut graph, "Area > 500");
    let b = select(&mut graph, "Zone = 'R1'");
    let viewer = graph.add_operation(Box::new(Viewer)).unwrap();
    graph.connect(a, slot(&graph, x, 0)).unwrap();
    graph.connect(x, slot(&graph, b, 0)).unwrap();
    graph.connect(b, slot(&graph, viewer, 0)).unwrap();
    graph.set_sink(viewer).unwrap();

    graph.set_disabled(x, true).unwrap();
    let mut disabled = RecordingEngine::new();
    let report = graph.evaluate(&mut disabled);
    assert_eq!(report.status, EvaluationStatus::Completed);
    assert_eq!(report.order, vec![a, x, b, viewer]);

    graph.remove_node(x).unwrap();
    let mut removed = RecordingEngine::new();
    graph.evaluate(&mut removed);

    assert_eq!(disabled.commands().len(), 3);
    assert_eq!(disabled.commands(), removed.commands());
}

#[test]
fn splice_places_new_node_between_neighbours() {
    let mut graph = Graph::new("splice");
    let a = open(&mut graph, "a.tab");
    let b = graph.add_operation(Box::new(Viewer)).unwrap();
    let edge = slot(&graph, b, 0);
    graph.connect(a, edge).unwrap();
    graph.set_sink(b).unwrap();

    let x = graph.splice_new_operation(edge, Box::new(Select)).unwrap();
    assert_eq!(graph.main_source(b), Some(x));
    assert_eq!(graph.main_source(x), Some(a));
    assert_eq!(graph.upstream_order(b), vec![a, x, b]);

    let report = graph.evaluate(&mut RecordingEngine::new());
    assert_eq!(report.order, vec![a, x, b]);
    assert!(report.commands[1].text.starts_with("Select * From _"));
}

#[test]
fn removing_spliced_node_restores_direct_link() {
    let mut graph = Graph::new("remove");
    let a = open(&mut graph, "a.tab");
    let b = graph.add_operation(Box::new(Viewer)).unwrap();
    let edge = slot(&graph, b, 0);
    graph.connect(a, edge).unwrap();
    let x = graph.splice_new_operation(edge, Box::new(Select)).unwrap();

    graph.remove_node(x).unwrap();
    assert_eq!(graph.main_source(b), Some(a));
    assert!(graph.dangling_edges().is_empty());
    assert!(graph.edges().all(|e| !e.involves_node(x)));
}

#[test]
fn class_rules_reject_connections() {
    let registry = create_default_registry();
    let mut graph = Graph::new("classes");
    let reader = graph.add_operation(registry.create("Open Table").unwrap()).unwrap();
    let viewer = graph.add_operation(registry.create("Viewer").unwrap()).unwrap();
    let save = graph.add_operation(registry.create("Save Table").unwrap()).unwrap();

    let before = graph.to_document();
    assert_eq!(
        graph.connect(viewer, slot(&graph, save, 0)),
        Err(ConnectionError::SourceIsSink(viewer))
    );
    assert_eq!(graph.to_document(), before);
    assert!(graph.node(reader).unwrap().inputs().is_empty());

    let grid = graph.add_operation(Box::new(Generate)).unwrap();
    let grid_input = slot(&graph, grid, 0);
    let before = graph.to_document();
    assert_eq!(
        graph.connect(reader, grid_input),
        Err(ConnectionError::DestinationIsSource(grid))
    );
    assert_eq!(graph.to_document(), before);
}

/// Script target whose device rejects every write
struct BrokenDevice;

impl Write for BrokenDevice {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("input/output error"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn buffered_script_failures_reach_the_report() {
    let mut graph = Graph::new("script");
    let a = open(&mut graph, "a.tab");
    let b = select(&mut graph, "");
    let viewer = graph.add_operation(Box::new(Viewer)).unwrap();
    graph.connect(a, slot(&graph, b, 0)).unwrap();
    graph.connect(b, slot(&graph, viewer, 0)).unwrap();
    graph.set_sink(viewer).unwrap();

    let mut engine = ScriptEngine::new(BufWriter::new(BrokenDevice));
    let report = graph.evaluate(&mut engine);

    assert_eq!(report.commands.len(), 3);
    assert_eq!(report.failures.len(), 3);
    assert!(!report.is_success());
    assert!(report
        .failures
        .iter()
        .all(|f| matches!(f.error, EngineError::Io(_))));
    assert_eq!(engine.written(), 0);
}
