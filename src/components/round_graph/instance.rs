//! One live rendering session: a sanitized graph bound to a display surface.

use std::collections::HashMap;

use log::{debug, info, warn};

use super::layout::{Layout, LayoutOptions, layout};
use super::style::StyleTable;
use super::surface::{Bounds, DisplaySurface, Point, Scene, SceneEdge, SceneNode, Size, ViewTransform};
use super::types::{ParticipantNode, SanitizedGraph};

/// Extra screen pixels around an edge that still count as a hit.
const EDGE_HIT_SLOP: f64 = 4.0;

/// Lifecycle of a [`VisualizationInstance`]. It only moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceState {
	/// Constructed, not yet bound to a surface.
	Uninitialized,
	/// Drawing on its surface.
	Active,
	/// Surface handed back; cannot be reused.
	Destroyed,
}

/// Highlighted element, by index into the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
	/// Index into [`SanitizedGraph::nodes`].
	Node(usize),
	/// Index into [`SanitizedGraph::edges`].
	Edge(usize),
}

struct Transition {
	from: Vec<Point>,
	elapsed: f64,
	duration: f64,
}

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// Owns the surface while [`InstanceState::Active`]; [`destroy`](Self::destroy)
/// hands it back. Every viewport operation is a no-op in any other state.
pub struct VisualizationInstance<S: DisplaySurface> {
	state: InstanceState,
	surface: Option<S>,
	graph: SanitizedGraph,
	styles: StyleTable,
	options: LayoutOptions,
	layout: Layout,
	transition: Option<Transition>,
	transform: ViewTransform,
	extent: Size,
	selection: Option<Selection>,
	observing_resize: bool,
}

impl<S: DisplaySurface> VisualizationInstance<S> {
	/// An uninitialized instance holding an empty graph.
	pub fn new(options: LayoutOptions) -> Self {
		Self {
			state: InstanceState::Uninitialized,
			surface: None,
			graph: SanitizedGraph::default(),
			styles: StyleTable::default(),
			options,
			layout: Layout::default(),
			transition: None,
			transform: ViewTransform::default(),
			extent: Size::default(),
			selection: None,
			observing_resize: false,
		}
	}

	/// Create an instance that is already bound to `surface`.
	pub fn bind(surface: S, graph: SanitizedGraph, options: LayoutOptions) -> Self {
		let mut instance = Self::new(options);
		instance.activate(surface, graph);
		instance
	}

	/// Bind `graph` to `surface`, run the initial layout and fit.
	///
	/// Only an uninitialized instance can be created; otherwise the surface is
	/// handed back untouched.
	pub fn create(&mut self, surface: S, graph: SanitizedGraph) -> Result<(), S> {
		if self.state != InstanceState::Uninitialized {
			warn!("create() on a {:?} visualization instance ignored", self.state);
			return Err(surface);
		}
		self.activate(surface, graph);
		Ok(())
	}

	fn activate(&mut self, mut surface: S, graph: SanitizedGraph) {
		surface.attach();
		self.extent = surface.measure();
		let sizes: Vec<Size> = graph
			.nodes
			.iter()
			.map(|node| self.styles.node_style(node).box_size(&node.label))
			.collect();
		self.layout = layout(&graph, &sizes, &self.options);
		self.graph = graph;
		self.surface = Some(surface);
		self.state = InstanceState::Active;
		info!(
			"visualization bound: {} nodes, {} edges",
			self.graph.node_count(),
			self.graph.edge_count()
		);
		if self.options.fit {
			self.fit();
		} else {
			self.render();
		}
	}

	/// Release the surface and every listener registered on it. Idempotent.
	pub fn destroy(&mut self) -> Option<S> {
		if self.state != InstanceState::Active {
			return None;
		}
		let mut surface = self.surface.take()?;
		if self.observing_resize {
			surface.unobserve_resize();
			self.observing_resize = false;
		}
		surface.detach();
		self.state = InstanceState::Destroyed;
		self.transition = None;
		self.selection = None;
		info!("visualization destroyed");
		Some(surface)
	}

	/// Current lifecycle state.
	pub fn state(&self) -> InstanceState {
		self.state
	}

	/// True while bound to a surface.
	pub fn is_active(&self) -> bool {
		self.state == InstanceState::Active
	}

	/// Graph being drawn.
	pub fn graph(&self) -> &SanitizedGraph {
		&self.graph
	}

	/// Target positions; a running transition is still heading here.
	pub fn layout(&self) -> &Layout {
		&self.layout
	}

	/// Options the current layout was computed with.
	pub fn options(&self) -> &LayoutOptions {
		&self.options
	}

	/// Graph-to-screen mapping.
	pub fn transform(&self) -> ViewTransform {
		self.transform
	}

	/// Current zoom factor.
	pub fn zoom(&self) -> f64 {
		self.transform.k
	}

	/// Surface size at the last measure.
	pub fn extent(&self) -> Size {
		self.extent
	}

	/// Highlighted element.
	pub fn selection(&self) -> Option<Selection> {
		self.selection
	}

	/// The highlighted node, when a node is selected.
	pub fn selected_node(&self) -> Option<&ParticipantNode> {
		match self.selection? {
			Selection::Node(index) => self.graph.nodes.get(index),
			Selection::Edge(_) => None,
		}
	}

	/// A relayout transition is still running.
	pub fn is_animating(&self) -> bool {
		self.transition.is_some()
	}

	/// Start delivering surface resize events for the rest of this session.
	pub fn observe_resize(&mut self) {
		if self.observing_resize || !self.is_active() {
			return;
		}
		if let Some(surface) = self.surface.as_mut() {
			surface.observe_resize();
			self.observing_resize = true;
		}
	}

	/// Re-measure the surface and re-fit the existing placement.
	pub fn resize(&mut self) {
		let Some(surface) = self.surface.as_mut() else {
			return;
		};
		self.extent = surface.measure();
		debug!("surface resized to {}x{}", self.extent.width, self.extent.height);
		self.fit();
	}

	/// Run the layout again on the same elements, easing from the current
	/// positions when animation is enabled.
	pub fn relayout(&mut self) {
		if !self.is_active() {
			return;
		}
		let from = self.positions();
		let sizes: Vec<Size> = self.layout.placements.iter().map(|p| p.size).collect();
		self.layout = layout(&self.graph, &sizes, &self.options);
		let moved = from
			.iter()
			.zip(&self.layout.placements)
			.any(|(old, new)| *old != new.center);
		self.transition = (self.options.animate && self.options.animation_duration > 0.0 && moved)
			.then(|| Transition {
				from,
				elapsed: 0.0,
				duration: self.options.animation_duration,
			});
		if self.options.fit {
			self.fit();
		} else {
			self.render();
		}
	}

	/// Swap layout options and lay out again.
	pub fn set_layout_options(&mut self, options: LayoutOptions) {
		self.options = options;
		self.relayout();
	}

	/// Scale and pan so every node is inside the surface, less padding.
	pub fn fit(&mut self) {
		let Some(surface) = self.surface.as_ref() else {
			return;
		};
		let (min_zoom, max_zoom) = surface.zoom_bounds();
		let extent = self.extent;
		self.transform = match self.layout.bounds() {
			None => ViewTransform {
				x: extent.width / 2.0,
				y: extent.height / 2.0,
				k: 1.0,
			},
			Some(bounds) => {
				let padding = self.options.padding;
				let room_x = (extent.width - 2.0 * padding).max(1.0);
				let room_y = (extent.height - 2.0 * padding).max(1.0);
				let k = (room_x / bounds.width().max(1.0))
					.min(room_y / bounds.height().max(1.0))
					.clamp(min_zoom, max_zoom);
				let center = bounds.center();
				ViewTransform {
					x: extent.width / 2.0 - center.x * k,
					y: extent.height / 2.0 - center.y * k,
					k,
				}
			}
		};
		self.render();
	}

	/// Multiply the zoom level, keeping the surface centre fixed.
	pub fn zoom_by(&mut self, factor: f64) {
		let center = Point::new(self.extent.width / 2.0, self.extent.height / 2.0);
		self.zoom_at(center, factor);
	}

	/// Multiply the zoom level, keeping the graph point under `screen` fixed.
	pub fn zoom_at(&mut self, screen: Point, factor: f64) {
		let Some(surface) = self.surface.as_ref() else {
			return;
		};
		if !factor.is_finite() || factor <= 0.0 {
			return;
		}
		let (min_zoom, max_zoom) = surface.zoom_bounds();
		let t = &mut self.transform;
		let k = (t.k * factor).clamp(min_zoom, max_zoom);
		let ratio = k / t.k;
		t.x = screen.x - (screen.x - t.x) * ratio;
		t.y = screen.y - (screen.y - t.y) * ratio;
		t.k = k;
		self.render();
	}

	/// Shift the view by screen pixels.
	pub fn pan_by(&mut self, dx: f64, dy: f64) {
		if !self.is_active() {
			return;
		}
		self.transform.x += dx;
		self.transform.y += dy;
		self.render();
	}

	/// Select the node (or failing that, the edge) under a screen point.
	/// Clicking empty space clears the selection.
	pub fn select_at(&mut self, screen: Point) -> Option<Selection> {
		if !self.is_active() {
			return None;
		}
		let at = self.transform.screen_to_graph(screen);
		let positions = self.positions();
		let node_hit = self
			.layout
			.placements
			.iter()
			.zip(&positions)
			.rposition(|(placement, center)| Bounds::around(*center, placement.size).contains(at))
			.map(Selection::Node);
		let selection = node_hit.or_else(|| self.edge_at(at, &positions).map(Selection::Edge));
		self.selection = selection;
		self.render();
		selection
	}

	fn edge_at(&self, at: Point, positions: &[Point]) -> Option<usize> {
		let index = self.node_index();
		let slop = (self.styles.edge.width / 2.0 + EDGE_HIT_SLOP) / self.transform.k;
		self.graph.edges.iter().position(|edge| {
			if edge.is_self_loop() {
				return false;
			}
			match (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
				(Some(&s), Some(&t)) => segment_distance(at, positions[s], positions[t]) <= slop,
				_ => false,
			}
		})
	}

	/// Advance a running layout transition. Returns whether it is still running.
	pub fn tick(&mut self, dt: f64) -> bool {
		let Some(transition) = self.transition.as_mut() else {
			return false;
		};
		transition.elapsed += dt;
		if transition.elapsed >= transition.duration {
			self.transition = None;
		}
		self.render();
		self.transition.is_some()
	}

	/// Current on-screen node centres, mid-transition if one is running.
	pub fn positions(&self) -> Vec<Point> {
		let targets = self.layout.placements.iter().map(|p| p.center);
		match &self.transition {
			Some(transition) => {
				let t = ease_out_cubic((transition.elapsed / transition.duration).clamp(0.0, 1.0));
				transition
					.from
					.iter()
					.zip(targets)
					.map(|(from, to)| from.lerp(to, t))
					.collect()
			}
			None => targets.collect(),
		}
	}

	fn node_index(&self) -> HashMap<&str, usize> {
		self.graph
			.nodes
			.iter()
			.enumerate()
			.map(|(i, node)| (node.id.as_str(), i))
			.collect()
	}

	/// Draw the current state onto the surface.
	pub fn render(&mut self) {
		if !self.is_active() {
			return;
		}
		let positions = self.positions();
		let scene = build_scene(
			&self.graph,
			&self.styles,
			&self.layout,
			&positions,
			self.selection,
			self.transform,
			self.extent,
		);
		if let Some(surface) = self.surface.as_mut() {
			surface.present(&scene);
		}
	}
}

impl<S: DisplaySurface> Drop for VisualizationInstance<S> {
	fn drop(&mut self) {
		let _ = self.destroy();
	}
}

fn build_scene<'a>(
	graph: &'a SanitizedGraph,
	styles: &'a StyleTable,
	layout: &Layout,
	positions: &[Point],
	selection: Option<Selection>,
	transform: ViewTransform,
	extent: Size,
) -> Scene<'a> {
	let nodes: Vec<SceneNode<'a>> = graph
		.nodes
		.iter()
		.zip(&layout.placements)
		.zip(positions)
		.enumerate()
		.map(|(i, ((node, placement), center))| SceneNode {
			node,
			center: *center,
			size: placement.size,
			selected: selection == Some(Selection::Node(i)),
		})
		.collect();

	let index: HashMap<&str, usize> = graph
		.nodes
		.iter()
		.enumerate()
		.map(|(i, node)| (node.id.as_str(), i))
		.collect();
	let bends = parallel_bends(graph);
	let edges = graph
		.edges
		.iter()
		.enumerate()
		.filter_map(|(i, edge)| {
			let s = *index.get(edge.source.as_str())?;
			let t = *index.get(edge.target.as_str())?;
			Some(SceneEdge {
				edge,
				from: nodes.get(s)?.center,
				from_size: nodes.get(s)?.size,
				to: nodes.get(t)?.center,
				to_size: nodes.get(t)?.size,
				bend: bends[i],
				selected: selection == Some(Selection::Edge(i)),
			})
		})
		.collect();

	Scene {
		extent,
		transform,
		styles,
		nodes,
		edges,
	}
}

/// Spread edges that join the same pair of nodes so they do not overlap.
/// Bends are measured in each edge's own direction, so a reversed edge of the
/// pair is negated.
fn parallel_bends(graph: &SanitizedGraph) -> Vec<f64> {
	let mut groups: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
	for (i, edge) in graph.edges.iter().enumerate() {
		let key = if edge.source <= edge.target {
			(edge.source.as_str(), edge.target.as_str())
		} else {
			(edge.target.as_str(), edge.source.as_str())
		};
		groups.entry(key).or_default().push(i);
	}
	let mut bends = vec![0.0; graph.edges.len()];
	for ((low, _), members) in groups {
		let spread = (members.len() as f64 - 1.0) / 2.0;
		for (slot, &i) in members.iter().enumerate() {
			let edge = &graph.edges[i];
			bends[i] = if edge.is_self_loop() {
				slot as f64
			} else if edge.source == low {
				slot as f64 - spread
			} else {
				spread - slot as f64
			};
		}
	}
	bends
}

fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let length_sq = dx * dx + dy * dy;
	let t = if length_sq == 0.0 {
		0.0
	} else {
		(((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0)
	};
	let closest = a.lerp(b, t);
	((p.x - closest.x).powi(2) + (p.y - closest.y).powi(2)).sqrt()
}
