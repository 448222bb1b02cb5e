//! `<canvas>` 2D rendering of a [`Scene`].

use std::rc::Rc;

use log::{debug, warn};
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::style::{ArrowShape, BorderStyle, NodeStyle};
use super::surface::{DisplaySurface, Point, Scene, SceneEdge, SceneNode, Size};

const FALLBACK_SIZE: Size = Size {
	width: 800.0,
	height: 600.0,
};
const BACKGROUND: &str = "#ffffff";
/// Graph-space offset between neighbouring parallel edges.
const PARALLEL_GAP: f64 = 22.0;
const LOOP_REACH: f64 = 26.0;

/// Draws into a canvas element sized to its parent.
pub struct CanvasSurface {
	canvas: HtmlCanvasElement,
	ctx: Option<CanvasRenderingContext2d>,
	on_resize: Rc<dyn Fn()>,
	resize_listener: Option<Closure<dyn FnMut()>>,
	size: Size,
}

impl CanvasSurface {
	/// `on_resize` runs on every window resize while the surface is observed.
	pub fn new(canvas: HtmlCanvasElement, on_resize: Rc<dyn Fn()>) -> Self {
		Self {
			canvas,
			ctx: None,
			on_resize,
			resize_listener: None,
			size: FALLBACK_SIZE,
		}
	}

	/// The element being drawn into.
	pub fn canvas(&self) -> &HtmlCanvasElement {
		&self.canvas
	}

	fn remove_listener(&mut self) {
		let Some(listener) = self.resize_listener.take() else {
			return;
		};
		if let Some(window) = web_sys::window() {
			let _ = window.remove_event_listener_with_callback("resize", listener.as_ref().unchecked_ref());
		}
	}
}

impl Drop for CanvasSurface {
	fn drop(&mut self) {
		self.remove_listener();
	}
}

impl DisplaySurface for CanvasSurface {
	fn attach(&mut self) {
		self.ctx = self
			.canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok());
		if self.ctx.is_none() {
			warn!("canvas has no 2d context; the graph will not be drawn");
		}
	}

	fn detach(&mut self) {
		if let Some(ctx) = self.ctx.take() {
			let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
			ctx.clear_rect(0.0, 0.0, self.size.width, self.size.height);
		}
	}

	fn measure(&mut self) -> Size {
		let parent = self
			.canvas
			.parent_element()
			.map(|p| Size::new(p.client_width() as f64, p.client_height() as f64))
			.filter(|size| size.width > 0.0 && size.height > 0.0);
		self.size = parent.unwrap_or(FALLBACK_SIZE);
		self.canvas.set_width(self.size.width as u32);
		self.canvas.set_height(self.size.height as u32);
		debug!("canvas measured at {}x{}", self.size.width, self.size.height);
		self.size
	}

	fn observe_resize(&mut self) {
		if self.resize_listener.is_some() {
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};
		let on_resize = self.on_resize.clone();
		let listener = Closure::<dyn FnMut()>::new(move || on_resize());
		if window
			.add_event_listener_with_callback("resize", listener.as_ref().unchecked_ref())
			.is_ok()
		{
			self.resize_listener = Some(listener);
		}
	}

	fn unobserve_resize(&mut self) {
		self.remove_listener();
	}

	fn present(&mut self, scene: &Scene<'_>) {
		let Some(ctx) = self.ctx.as_ref() else {
			return;
		};
		let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
		ctx.set_fill_style_str(BACKGROUND);
		ctx.fill_rect(0.0, 0.0, scene.extent.width, scene.extent.height);
		ctx.save();
		let _ = ctx.translate(scene.transform.x, scene.transform.y);
		let _ = ctx.scale(scene.transform.k, scene.transform.k);
		for edge in &scene.edges {
			draw_edge(ctx, scene, edge);
		}
		for node in &scene.nodes {
			draw_node(ctx, scene, node);
		}
		ctx.restore();
	}

	fn zoom_bounds(&self) -> (f64, f64) {
		(0.1, 10.0)
	}
}

/// Where the ray from `center` toward `toward` leaves a box of `size`.
fn box_exit(center: Point, size: Size, toward: Point) -> Point {
	let (dx, dy) = (toward.x - center.x, toward.y - center.y);
	let (hw, hh) = (size.width / 2.0, size.height / 2.0);
	let tx = if dx == 0.0 { f64::INFINITY } else { hw / dx.abs() };
	let ty = if dy == 0.0 { f64::INFINITY } else { hh / dy.abs() };
	let t = tx.min(ty);
	if t >= 1.0 {
		return center;
	}
	Point::new(center.x + dx * t, center.y + dy * t)
}

fn unit(from: Point, to: Point) -> Option<(f64, f64)> {
	let (dx, dy) = (to.x - from.x, to.y - from.y);
	let length = (dx * dx + dy * dy).sqrt();
	(length > 1e-6).then(|| (dx / length, dy / length))
}

fn draw_edge(ctx: &CanvasRenderingContext2d, scene: &Scene<'_>, edge: &SceneEdge<'_>) {
	let style = &scene.styles.edge;
	let (line, arrow) = if edge.selected {
		(scene.styles.selected.line, scene.styles.selected.line)
	} else {
		(style.line, style.arrow_color)
	};
	ctx.set_stroke_style_str(line);
	ctx.set_line_width(style.width);
	let _ = ctx.set_line_dash(&js_sys::Array::new());

	if edge.edge.is_self_loop() {
		let (hw, hh) = (edge.to_size.width / 2.0, edge.to_size.height / 2.0);
		let reach = LOOP_REACH + edge.bend * PARALLEL_GAP / 2.0;
		let start = Point::new(edge.to.x + hw * 0.3, edge.to.y - hh);
		let end = Point::new(edge.to.x + hw, edge.to.y - hh * 0.3);
		let c1 = Point::new(start.x, start.y - reach);
		let c2 = Point::new(end.x + reach, end.y);
		let Some((ux, uy)) = unit(c2, end) else {
			return;
		};
		ctx.begin_path();
		ctx.move_to(start.x, start.y);
		ctx.bezier_curve_to(
			c1.x,
			c1.y,
			c2.x,
			c2.y,
			end.x - ux * style.arrow_size,
			end.y - uy * style.arrow_size,
		);
		ctx.stroke();
		draw_arrow(ctx, style.target_arrow, arrow, style.arrow_size, end, (ux, uy));
		return;
	}

	let Some((ux, uy)) = unit(edge.from, edge.to) else {
		return;
	};
	let mid = edge.from.lerp(edge.to, 0.5);
	let control = Point::new(
		mid.x - uy * edge.bend * PARALLEL_GAP,
		mid.y + ux * edge.bend * PARALLEL_GAP,
	);
	let start = box_exit(edge.from, edge.from_size, control);
	let tip = box_exit(edge.to, edge.to_size, control);
	let Some((ax, ay)) = unit(control, tip) else {
		return;
	};
	let (end_x, end_y) = (tip.x - ax * style.arrow_size, tip.y - ay * style.arrow_size);

	ctx.begin_path();
	ctx.move_to(start.x, start.y);
	if edge.bend == 0.0 {
		ctx.line_to(end_x, end_y);
	} else {
		ctx.quadratic_curve_to(control.x, control.y, end_x, end_y);
	}
	ctx.stroke();
	draw_arrow(ctx, style.target_arrow, arrow, style.arrow_size, tip, (ax, ay));
}

fn draw_arrow(
	ctx: &CanvasRenderingContext2d,
	shape: ArrowShape,
	color: &str,
	size: f64,
	tip: Point,
	(ux, uy): (f64, f64),
) {
	match shape {
		ArrowShape::Triangle => {
			let (back_x, back_y) = (tip.x - ux * size, tip.y - uy * size);
			let (px, py) = (-uy * size * 0.5, ux * size * 0.5);
			ctx.set_fill_style_str(color);
			ctx.begin_path();
			ctx.move_to(tip.x, tip.y);
			ctx.line_to(back_x + px, back_y + py);
			ctx.line_to(back_x - px, back_y - py);
			ctx.close_path();
			ctx.fill();
		}
	}
}

fn rounded_rect(ctx: &CanvasRenderingContext2d, center: Point, size: Size, radius: f64) {
	let (x, y) = (center.x - size.width / 2.0, center.y - size.height / 2.0);
	let (w, h) = (size.width, size.height);
	let r = radius.min(w / 2.0).min(h / 2.0);
	ctx.begin_path();
	ctx.move_to(x + r, y);
	let _ = ctx.arc_to(x + w, y, x + w, y + h, r);
	let _ = ctx.arc_to(x + w, y + h, x, y + h, r);
	let _ = ctx.arc_to(x, y + h, x, y, r);
	let _ = ctx.arc_to(x, y, x + w, y, r);
	ctx.close_path();
}

fn draw_node(ctx: &CanvasRenderingContext2d, scene: &Scene<'_>, node: &SceneNode<'_>) {
	let style: &NodeStyle = scene.styles.node_style(node.node);
	rounded_rect(ctx, node.center, node.size, style.corner_radius);
	ctx.set_fill_style_str(if node.selected {
		scene.styles.selected.fill
	} else {
		style.fill
	});
	ctx.fill();

	let dash = match style.border_style {
		BorderStyle::Solid => js_sys::Array::new(),
		BorderStyle::Dashed => js_sys::Array::of2(&JsValue::from_f64(4.0), &JsValue::from_f64(3.0)),
	};
	let _ = ctx.set_line_dash(&dash);
	ctx.set_stroke_style_str(if node.selected {
		scene.styles.selected.line
	} else {
		style.border
	});
	ctx.set_line_width(style.border_width);
	ctx.stroke();
	let _ = ctx.set_line_dash(&js_sys::Array::new());

	let lines = style.wrap_label(&node.node.label);
	let line_height = style.font_size * 1.25;
	let top = node.center.y - line_height * (lines.len() as f64 - 1.0) / 2.0;
	ctx.set_fill_style_str(style.text);
	ctx.set_font(&format!("{}px sans-serif", style.font_size));
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	for (i, line) in lines.iter().enumerate() {
		let _ = ctx.fill_text_with_max_width(
			line,
			node.center.x,
			top + i as f64 * line_height,
			style.text_max_width,
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn box_exit_hits_the_nearest_side() {
		let c = Point::new(0.0, 0.0);
		let size = Size::new(40.0, 20.0);
		assert_eq!(box_exit(c, size, Point::new(100.0, 0.0)), Point::new(20.0, 0.0));
		assert_eq!(box_exit(c, size, Point::new(0.0, -50.0)), Point::new(0.0, -10.0));
		assert_eq!(box_exit(c, size, Point::new(40.0, 40.0)), Point::new(10.0, 10.0));
		assert_eq!(box_exit(c, size, Point::new(5.0, 2.0)), c);
	}

	#[test]
	fn unit_of_coincident_points_is_none() {
		let p = Point::new(3.0, 3.0);
		assert_eq!(unit(p, p), None);
		assert_eq!(unit(p, Point::new(3.0, 7.0)), Some((0.0, 1.0)));
	}
}
