use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Payload of `GET /rounds/{id}/delegation-graph/`.
///
/// Both fields are kept as loose JSON; the normalizer decides what is usable.
/// Anything that is not a JSON object deserializes as an empty response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct RoundGraphResponse {
	/// Expected to be an array of node records.
	pub nodes: Value,
	/// Expected to be an array of edge records.
	pub edges: Value,
}

impl From<Value> for RoundGraphResponse {
	fn from(value: Value) -> Self {
		match value {
			Value::Object(mut fields) => Self {
				nodes: fields.remove("nodes").unwrap_or(Value::Null),
				edges: fields.remove("edges").unwrap_or(Value::Null),
			},
			_ => Self::default(),
		}
	}
}

/// A player in the round, or a stand-in for an unknown edge endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantNode {
	/// Unique within a [`SanitizedGraph`].
	pub id: String,
	/// Display text; falls back to the id.
	pub label: String,
	/// Synthesized for an edge endpoint missing from the raw node list.
	pub is_placeholder: bool,
}

/// `source` delegates its vote to `target`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegationEdge {
	/// Unique within a [`SanitizedGraph`].
	pub id: String,
	/// Id of the delegating node.
	pub source: String,
	/// Id of the node delegated to.
	pub target: String,
}

impl DelegationEdge {
	/// A participant delegating to themself.
	pub fn is_self_loop(&self) -> bool {
		self.source == self.target
	}
}

/// Render-safe graph: node ids are unique and every edge endpoint names a node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SanitizedGraph {
	/// Participants in payload order, then placeholders.
	pub nodes: Vec<ParticipantNode>,
	/// Edges in payload order.
	pub edges: Vec<DelegationEdge>,
}

impl SanitizedGraph {
	/// Includes placeholders.
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	/// Number of edges.
	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	/// True when there are no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Looks a node up by id.
	pub fn node(&self, id: &str) -> Option<&ParticipantNode> {
		self.nodes.iter().find(|node| node.id == id)
	}

	/// Nodes that came from the raw payload.
	pub fn participants(&self) -> impl Iterator<Item = &ParticipantNode> {
		self.nodes.iter().filter(|node| !node.is_placeholder)
	}

	/// Nodes synthesized for unknown edge endpoints.
	pub fn placeholders(&self) -> impl Iterator<Item = &ParticipantNode> {
		self.nodes.iter().filter(|node| node.is_placeholder)
	}

	/// Re-emit the graph in the wire shape it was normalized from.
	pub fn to_raw(&self) -> RoundGraphResponse {
		let nodes = self
			.nodes
			.iter()
			.map(|node| json!({ "id": node.id, "data": { "label": node.label } }))
			.collect();
		let edges = self
			.edges
			.iter()
			.map(|edge| json!({ "id": edge.id, "source": edge.source, "target": edge.target }))
			.collect();
		RoundGraphResponse {
			nodes: Value::Array(nodes),
			edges: Value::Array(edges),
		}
	}
}
