//! Property tests for round-graph normalization over arbitrary payloads.

// Only the library under test and a few dev-dependencies are used here.
#![allow(unused_crate_dependencies)]

use std::collections::HashSet;

use delegation_graph::components::round_graph::{RoundGraphResponse, SanitizedGraph, normalize};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

/// Identifier-ish values drawn from a tiny domain so collisions are common.
fn scalar() -> impl Strategy<Value = Value> {
	prop_oneof![
		Just(Value::Null),
		any::<bool>().prop_map(Value::Bool),
		(0i64..6).prop_map(|n| json!(n)),
		(0i64..3).prop_map(|n| json!(n as f64)),
		prop::sample::select(vec!["1", "2", "a", "e-1-2-0", ""]).prop_map(|s| json!(s)),
		Just(json!([1])),
		Just(json!({ "id": 1 })),
	]
}

fn with_optional(fields: Vec<(&'static str, Option<Value>)>) -> Value {
	let mut object = Map::new();
	for (key, value) in fields {
		if let Some(value) = value {
			object.insert(key.to_owned(), value);
		}
	}
	Value::Object(object)
}

fn node_record() -> impl Strategy<Value = Value> {
	prop_oneof![
		4 => (prop::option::of(scalar()), prop::option::of(scalar())).prop_map(|(id, label)| {
			let data = label.map(|label| json!({ "label": label }));
			with_optional(vec![("id", id), ("data", data)])
		}),
		1 => scalar(),
	]
}

fn edge_record() -> impl Strategy<Value = Value> {
	prop_oneof![
		4 => (
			prop::option::of(scalar()),
			prop::option::of(scalar()),
			prop::option::of(scalar()),
		)
			.prop_map(|(id, source, target)| {
				with_optional(vec![("id", id), ("source", source), ("target", target)])
			}),
		1 => scalar(),
	]
}

fn list_or_junk(record: impl Strategy<Value = Value>) -> impl Strategy<Value = Value> {
	prop_oneof![
		4 => prop::collection::vec(record, 0..12).prop_map(Value::Array),
		1 => scalar(),
	]
}

fn payload() -> impl Strategy<Value = Value> {
	prop_oneof![
		6 => (
			prop::option::of(list_or_junk(node_record())),
			prop::option::of(list_or_junk(edge_record())),
		)
			.prop_map(|(nodes, edges)| with_optional(vec![("nodes", nodes), ("edges", edges)])),
		1 => scalar(),
	]
}

fn node_ids(graph: &SanitizedGraph) -> Vec<&str> {
	graph.nodes.iter().map(|n| n.id.as_str()).collect()
}

proptest! {
	#[test]
	fn every_edge_endpoint_is_a_node(raw in payload()) {
		let graph = normalize(&RoundGraphResponse::from(raw));
		let ids: HashSet<&str> = node_ids(&graph).into_iter().collect();
		for edge in &graph.edges {
			prop_assert!(ids.contains(edge.source.as_str()), "missing source {}", edge.source);
			prop_assert!(ids.contains(edge.target.as_str()), "missing target {}", edge.target);
		}
	}

	#[test]
	fn node_and_edge_ids_are_unique(raw in payload()) {
		let graph = normalize(&RoundGraphResponse::from(raw));
		let nodes: HashSet<&str> = node_ids(&graph).into_iter().collect();
		prop_assert_eq!(nodes.len(), graph.node_count());
		let edges: HashSet<&str> = graph.edges.iter().map(|e| e.id.as_str()).collect();
		prop_assert_eq!(edges.len(), graph.edge_count());
	}

	#[test]
	fn placeholders_are_exactly_the_unknown_endpoints(raw in payload()) {
		let graph = normalize(&RoundGraphResponse::from(raw));
		let real: HashSet<&str> = graph.participants().map(|n| n.id.as_str()).collect();
		let endpoints: HashSet<&str> = graph
			.edges
			.iter()
			.flat_map(|e| [e.source.as_str(), e.target.as_str()])
			.collect();
		let placeholders: HashSet<&str> = graph.placeholders().map(|n| n.id.as_str()).collect();
		let expected: HashSet<&str> = endpoints.difference(&real).copied().collect();
		prop_assert_eq!(placeholders, expected);
		for node in graph.placeholders() {
			prop_assert_eq!(&node.label, &node.id);
		}
		// Real nodes come first.
		let first_placeholder = graph.nodes.iter().position(|n| n.is_placeholder).unwrap_or(graph.nodes.len());
		prop_assert!(graph.nodes[first_placeholder..].iter().all(|n| n.is_placeholder));
	}

	#[test]
	fn renormalizing_is_a_fixed_point(raw in payload()) {
		let once = normalize(&RoundGraphResponse::from(raw));
		let twice = normalize(&once.to_raw());
		prop_assert_eq!(node_ids(&twice), node_ids(&once));
		prop_assert_eq!(&twice.edges, &once.edges);
		prop_assert_eq!(twice.placeholders().count(), 0);
	}

	#[test]
	fn edge_order_follows_input(n in 0usize..20) {
		let edges: Vec<Value> = (0..n).map(|i| json!({ "source": 1, "target": 2, "tag": i })).collect();
		let graph = normalize(&RoundGraphResponse::from(json!({ "edges": edges })));
		let ids: Vec<String> = graph.edges.iter().map(|e| e.id.clone()).collect();
		let expected: Vec<String> = (0..n).map(|i| format!("e-1-2-{i}")).collect();
		prop_assert_eq!(ids, expected);
	}
}
