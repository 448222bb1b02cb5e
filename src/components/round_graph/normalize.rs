//! Raw round-graph payload to [`SanitizedGraph`].
//!
//! Normalization never fails. Malformed records are coerced, and edges that
//! point at unknown participants get placeholder nodes instead of being dropped.

use std::collections::HashSet;

use log::{debug, warn};
use serde_json::{Number, Value};

use super::types::{DelegationEdge, ParticipantNode, RoundGraphResponse, SanitizedGraph};

/// Normalize a raw response into a render-safe graph.
pub fn normalize(raw: &RoundGraphResponse) -> SanitizedGraph {
	let mut known = HashSet::new();
	let mut nodes = Vec::new();
	for record in records(&raw.nodes, "nodes") {
		let id = scalar_text(record.get("id"));
		if !known.insert(id.clone()) {
			continue;
		}
		let label = record
			.get("data")
			.and_then(|data| data.get("label"))
			.and_then(label_text)
			.unwrap_or_else(|| id.clone());
		nodes.push(ParticipantNode {
			id,
			label,
			is_placeholder: false,
		});
	}

	let mut edge_ids = HashSet::new();
	let mut edges = Vec::new();
	for (ordinal, record) in records(&raw.edges, "edges").iter().enumerate() {
		let source = scalar_text(record.get("source"));
		let target = scalar_text(record.get("target"));
		let id = match record.get("id") {
			None | Some(Value::Null) => format!("e-{source}-{target}-{ordinal}"),
			given => scalar_text(given),
		};
		edges.push(DelegationEdge {
			id: unique_id(id, ordinal, &mut edge_ids),
			source,
			target,
		});
	}

	let mut missing = HashSet::new();
	let mut placeholders = Vec::new();
	for edge in &edges {
		for endpoint in [&edge.source, &edge.target] {
			if !known.contains(endpoint) && missing.insert(endpoint.clone()) {
				placeholders.push(ParticipantNode {
					id: endpoint.clone(),
					label: endpoint.clone(),
					is_placeholder: true,
				});
			}
		}
	}

	debug!(
		"normalized round graph: {} nodes ({} placeholders), {} edges",
		nodes.len() + placeholders.len(),
		placeholders.len(),
		edges.len()
	);
	nodes.extend(placeholders);
	SanitizedGraph { nodes, edges }
}

fn records<'a>(value: &'a Value, field: &str) -> &'a [Value] {
	match value {
		Value::Array(items) => items,
		Value::Null => &[],
		other => {
			warn!("round graph `{field}` is not a list ({other}); treating as empty");
			&[]
		}
	}
}

fn unique_id(mut id: String, ordinal: usize, taken: &mut HashSet<String>) -> String {
	while taken.contains(&id) {
		id = format!("{id}-{ordinal}");
	}
	taken.insert(id.clone());
	id
}

/// String form of an identifier field. Absent fields read as `undefined`.
pub(crate) fn scalar_text(value: Option<&Value>) -> String {
	match value {
		None => "undefined".to_owned(),
		Some(Value::Null) => "null".to_owned(),
		Some(Value::String(text)) => text.clone(),
		Some(Value::Bool(flag)) => flag.to_string(),
		Some(Value::Number(number)) => number_text(number),
		Some(other) => other.to_string(),
	}
}

fn number_text(number: &Number) -> String {
	if let Some(float) = number.as_f64().filter(|_| number.is_f64()) {
		if float.fract() == 0.0 && float.abs() < 1e15 {
			return format!("{}", float as i64);
		}
	}
	number.to_string()
}

fn label_text(value: &Value) -> Option<String> {
	match value {
		Value::String(text) => Some(text.clone()),
		Value::Number(number) => Some(number_text(number)),
		Value::Bool(flag) => Some(flag.to_string()),
		_ => None,
	}
}
