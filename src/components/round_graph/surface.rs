//! Display surface seam and the per-frame scene handed to it.

use super::style::StyleTable;
use super::types::{DelegationEdge, ParticipantNode};

/// A position, in graph or screen space depending on context.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	/// Horizontal, growing right.
	pub x: f64,
	/// Vertical, growing down.
	pub y: f64,
}

impl Point {
	/// Point at `(x, y)`.
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Linear interpolation; `t = 0` is `self`, `t = 1` is `to`.
	pub fn lerp(self, to: Point, t: f64) -> Point {
		Point::new(self.x + (to.x - self.x) * t, self.y + (to.y - self.y) * t)
	}
}

/// Width and height of a box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
	/// Horizontal extent.
	pub width: f64,
	/// Vertical extent.
	pub height: f64,
}

impl Size {
	/// Size of `width` by `height`.
	pub fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}
}

/// Axis-aligned box in graph coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
	/// Top-left corner.
	pub min: Point,
	/// Bottom-right corner.
	pub max: Point,
}

impl Bounds {
	/// Box of `size` centred on `center`.
	pub fn around(center: Point, size: Size) -> Self {
		let (hw, hh) = (size.width / 2.0, size.height / 2.0);
		Self {
			min: Point::new(center.x - hw, center.y - hh),
			max: Point::new(center.x + hw, center.y + hh),
		}
	}

	/// Smallest box holding both.
	pub fn union(self, other: Bounds) -> Self {
		Self {
			min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
			max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
		}
	}

	/// Horizontal extent.
	pub fn width(&self) -> f64 {
		self.max.x - self.min.x
	}

	/// Vertical extent.
	pub fn height(&self) -> f64 {
		self.max.y - self.min.y
	}

	/// Midpoint.
	pub fn center(&self) -> Point {
		self.min.lerp(self.max, 0.5)
	}

	/// Edges count as inside.
	pub fn contains(&self, point: Point) -> bool {
		(self.min.x..=self.max.x).contains(&point.x) && (self.min.y..=self.max.y).contains(&point.y)
	}
}

/// Screen = graph * k + (x, y).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal screen offset.
	pub x: f64,
	/// Vertical screen offset.
	pub y: f64,
	/// Zoom factor.
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

impl ViewTransform {
	/// Inverse of [`graph_to_screen`](Self::graph_to_screen).
	pub fn screen_to_graph(&self, screen: Point) -> Point {
		Point::new((screen.x - self.x) / self.k, (screen.y - self.y) / self.k)
	}

	/// Where a graph point lands on screen.
	pub fn graph_to_screen(&self, graph: Point) -> Point {
		Point::new(graph.x * self.k + self.x, graph.y * self.k + self.y)
	}
}

/// A node as drawn this frame.
pub struct SceneNode<'a> {
	/// The participant.
	pub node: &'a ParticipantNode,
	/// Current centre, mid-transition if one is running.
	pub center: Point,
	/// Box size.
	pub size: Size,
	/// Highlighted.
	pub selected: bool,
}

/// An edge as drawn this frame, with both endpoint boxes.
pub struct SceneEdge<'a> {
	/// The delegation.
	pub edge: &'a DelegationEdge,
	/// Source centre.
	pub from: Point,
	/// Source box.
	pub from_size: Size,
	/// Target centre.
	pub to: Point,
	/// Target box.
	pub to_size: Size,
	/// Signed multiple of the parallel-edge gap this edge is bowed by.
	pub bend: f64,
	/// Highlighted.
	pub selected: bool,
}

/// One frame of the visualization in graph coordinates.
pub struct Scene<'a> {
	/// Surface size in screen pixels.
	pub extent: Size,
	/// Graph-to-screen mapping.
	pub transform: ViewTransform,
	/// Styles to draw with.
	pub styles: &'a StyleTable,
	/// Drawn above the edges.
	pub nodes: Vec<SceneNode<'a>>,
	/// Drawn first.
	pub edges: Vec<SceneEdge<'a>>,
}

/// Something a [`VisualizationInstance`](super::instance::VisualizationInstance)
/// can draw into.
///
/// The instance owns its surface while active, so a surface is bound to at
/// most one instance at a time.
pub trait DisplaySurface {
	/// Acquire drawing resources.
	fn attach(&mut self);

	/// Release drawing resources. Called once per attach.
	fn detach(&mut self);

	/// Current drawable size in screen pixels.
	fn measure(&mut self) -> Size;

	/// Start delivering resize notifications to whoever owns the surface.
	fn observe_resize(&mut self);

	/// Stop resize notifications.
	fn unobserve_resize(&mut self);

	/// Draw one frame.
	fn present(&mut self, scene: &Scene<'_>);

	/// Smallest and largest zoom level the surface can draw sensibly.
	fn zoom_bounds(&self) -> (f64, f64) {
		(1e-3, 1e3)
	}
}

/// In-memory surface for exercising the lifecycle without a browser.
#[cfg(test)]
pub(crate) mod testing {
	use std::cell::RefCell;
	use std::rc::Rc;

	use super::*;

	#[derive(Debug, Default)]
	pub struct SurfaceLog {
		pub extent: Size,
		pub attached: bool,
		pub attaches: usize,
		pub detaches: usize,
		pub observing: bool,
		pub frames: usize,
		pub last_transform: Option<ViewTransform>,
		pub last_node_ids: Vec<String>,
		pub last_centers: Vec<Point>,
	}

	pub type SurfaceRecord = Rc<RefCell<SurfaceLog>>;

	pub struct RecordingSurface {
		log: SurfaceRecord,
	}

	impl RecordingSurface {
		pub fn new(width: f64, height: f64) -> (Self, SurfaceRecord) {
			let log = Rc::new(RefCell::new(SurfaceLog {
				extent: Size::new(width, height),
				..SurfaceLog::default()
			}));
			(Self { log: log.clone() }, log)
		}
	}

	impl DisplaySurface for RecordingSurface {
		fn attach(&mut self) {
			let mut log = self.log.borrow_mut();
			assert!(!log.attached, "surface attached twice");
			log.attached = true;
			log.attaches += 1;
		}

		fn detach(&mut self) {
			let mut log = self.log.borrow_mut();
			log.attached = false;
			log.detaches += 1;
		}

		fn measure(&mut self) -> Size {
			self.log.borrow().extent
		}

		fn observe_resize(&mut self) {
			self.log.borrow_mut().observing = true;
		}

		fn unobserve_resize(&mut self) {
			self.log.borrow_mut().observing = false;
		}

		fn present(&mut self, scene: &Scene<'_>) {
			let mut log = self.log.borrow_mut();
			assert!(log.attached, "present on a detached surface");
			log.frames += 1;
			log.last_transform = Some(scene.transform);
			log.last_node_ids = scene.nodes.iter().map(|n| n.node.id.clone()).collect();
			log.last_centers = scene.nodes.iter().map(|n| n.center).collect();
		}

		fn zoom_bounds(&self) -> (f64, f64) {
			(0.1, 10.0)
		}
	}
}
