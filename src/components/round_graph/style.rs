//! Fixed style table. Ordinary nodes, placeholder nodes and directed edges
//! must stay visually distinct.

use super::surface::Size;
use super::types::ParticipantNode;

/// Average glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f64 = 0.6;
const LINE_HEIGHT: f64 = 1.25;

/// Node outline stroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderStyle {
	/// Continuous outline.
	Solid,
	/// Marks placeholder nodes.
	Dashed,
}

/// Look of one node class. Colours are CSS strings, lengths graph units.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeStyle {
	/// Box fill.
	pub fill: &'static str,
	/// Outline colour.
	pub border: &'static str,
	/// Outline width.
	pub border_width: f64,
	/// Outline stroke.
	pub border_style: BorderStyle,
	/// Label colour.
	pub text: &'static str,
	/// Label font size.
	pub font_size: f64,
	/// Space between label and outline.
	pub padding: f64,
	/// Labels wrap past this width.
	pub text_max_width: f64,
	/// Box corner rounding.
	pub corner_radius: f64,
}

impl NodeStyle {
	/// Split a label into lines no wider than `text_max_width`.
	pub fn wrap_label(&self, label: &str) -> Vec<String> {
		let per_line = ((self.text_max_width / (self.font_size * GLYPH_ADVANCE)).floor() as usize).max(1);
		let mut lines: Vec<String> = Vec::new();
		let mut current = String::new();
		for word in label.split_whitespace() {
			let mut word = word;
			while word.chars().count() > per_line {
				if !current.is_empty() {
					lines.push(std::mem::take(&mut current));
				}
				let split = word.char_indices().nth(per_line).map_or(word.len(), |(i, _)| i);
				lines.push(word[..split].to_owned());
				word = &word[split..];
			}
			let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
			if needed > per_line && !current.is_empty() {
				lines.push(std::mem::take(&mut current));
			}
			if !current.is_empty() {
				current.push(' ');
			}
			current.push_str(word);
		}
		if !current.is_empty() || lines.is_empty() {
			lines.push(current);
		}
		lines
	}

	/// Box that fits the wrapped label plus padding.
	pub fn box_size(&self, label: &str) -> Size {
		let lines = self.wrap_label(label);
		let widest = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
		let text_width = (widest as f64 * self.font_size * GLYPH_ADVANCE).min(self.text_max_width);
		Size::new(
			text_width.max(self.font_size) + 2.0 * self.padding,
			lines.len() as f64 * self.font_size * LINE_HEIGHT + 2.0 * self.padding,
		)
	}
}

/// Marker drawn at an edge's target end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrowShape {
	/// Filled triangle.
	Triangle,
}

/// Look of delegation edges.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeStyle {
	/// Stroke width.
	pub width: f64,
	/// Stroke colour.
	pub line: &'static str,
	/// Marker at the target end.
	pub target_arrow: ArrowShape,
	/// Marker colour.
	pub arrow_color: &'static str,
	/// Marker length.
	pub arrow_size: f64,
}

/// Overrides applied to selected elements.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedStyle {
	/// Node fill.
	pub fill: &'static str,
	/// Node outline, edge stroke and arrow.
	pub line: &'static str,
}

/// Visually distinct kinds of element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementClass {
	/// A participant from the payload.
	Node,
	/// A synthesized endpoint.
	Placeholder,
	/// A delegation.
	Edge,
}

/// One row of the legend.
pub struct LegendEntry {
	/// Element kind described.
	pub class: ElementClass,
	/// Caption.
	pub label: &'static str,
	/// Fill colour of the sample.
	pub swatch: &'static str,
	/// Outline colour of the sample.
	pub outline: &'static str,
}

/// Every style the renderer uses.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleTable {
	/// Participants.
	pub node: NodeStyle,
	/// Synthesized endpoints.
	pub placeholder: NodeStyle,
	/// Delegations.
	pub edge: EdgeStyle,
	/// Highlight overrides.
	pub selected: SelectedStyle,
}

impl Default for StyleTable {
	fn default() -> Self {
		let node = NodeStyle {
			fill: "#3b82f6",
			border: "#1e3a8a",
			border_width: 1.0,
			border_style: BorderStyle::Solid,
			text: "#0f172a",
			font_size: 12.0,
			padding: 8.0,
			text_max_width: 120.0,
			corner_radius: 6.0,
		};
		let placeholder = NodeStyle {
			fill: "#fde68a",
			border: "#f59e0b",
			border_style: BorderStyle::Dashed,
			text: "#7c2d12",
			..node.clone()
		};
		Self {
			node,
			placeholder,
			edge: EdgeStyle {
				width: 2.0,
				line: "#9ca3af",
				target_arrow: ArrowShape::Triangle,
				arrow_color: "#9ca3af",
				arrow_size: 9.0,
			},
			selected: SelectedStyle {
				fill: "#2563eb",
				line: "#2563eb",
			},
		}
	}
}

impl StyleTable {
	/// Style for `node`'s class.
	pub fn node_style(&self, node: &ParticipantNode) -> &NodeStyle {
		if node.is_placeholder {
			&self.placeholder
		} else {
			&self.node
		}
	}

	/// Class `node` is drawn as.
	pub fn class_of(node: &ParticipantNode) -> ElementClass {
		if node.is_placeholder {
			ElementClass::Placeholder
		} else {
			ElementClass::Node
		}
	}

	/// One entry per element class.
	pub fn legend(&self) -> [LegendEntry; 3] {
		[
			LegendEntry {
				class: ElementClass::Node,
				label: "Node",
				swatch: self.node.fill,
				outline: self.node.border,
			},
			LegendEntry {
				class: ElementClass::Placeholder,
				label: "Placeholder",
				swatch: self.placeholder.fill,
				outline: self.placeholder.border,
			},
			LegendEntry {
				class: ElementClass::Edge,
				label: "Edge",
				swatch: self.edge.line,
				outline: self.edge.arrow_color,
			},
		]
	}
}
