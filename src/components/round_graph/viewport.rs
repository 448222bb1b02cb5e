//! User-facing viewport actions.

use super::instance::{Selection, VisualizationInstance};
use super::surface::{DisplaySurface, Point};

/// Borrowed handle on whatever instance is currently bound. Every action is a
/// silent no-op when there is none, or it is not active.
pub struct ViewportController<'a, S: DisplaySurface> {
	instance: Option<&'a mut VisualizationInstance<S>>,
	zoom_step: f64,
	wheel_sensitivity: f64,
}

impl<'a, S: DisplaySurface> ViewportController<'a, S> {
	/// `zoom_step` scales the buttons, `wheel_sensitivity` each wheel notch.
	pub fn new(
		instance: Option<&'a mut VisualizationInstance<S>>,
		zoom_step: f64,
		wheel_sensitivity: f64,
	) -> Self {
		Self {
			instance,
			zoom_step,
			wheel_sensitivity,
		}
	}

	fn active(&mut self) -> Option<&mut VisualizationInstance<S>> {
		self.instance.as_deref_mut().filter(|instance| instance.is_active())
	}

	/// An active instance is bound.
	pub fn is_active(&self) -> bool {
		self.instance.as_deref().is_some_and(VisualizationInstance::is_active)
	}

	/// Frame the whole graph.
	pub fn fit(&mut self) {
		if let Some(instance) = self.active() {
			instance.fit();
		}
	}

	/// Zoom around the surface centre.
	pub fn zoom_in(&mut self) {
		let step = self.zoom_step;
		if let Some(instance) = self.active() {
			instance.zoom_by(step);
		}
	}

	/// Inverse of [`zoom_in`](Self::zoom_in).
	pub fn zoom_out(&mut self) {
		let step = self.zoom_step;
		if let Some(instance) = self.active() {
			instance.zoom_by(1.0 / step);
		}
	}

	/// Re-run the layout, then fit.
	pub fn auto_layout(&mut self) {
		if let Some(instance) = self.active() {
			instance.relayout();
			instance.fit();
		}
	}

	/// Drag the view by screen pixels.
	pub fn pan_by(&mut self, dx: f64, dy: f64) {
		if let Some(instance) = self.active() {
			instance.pan_by(dx, dy);
		}
	}

	/// Mouse-wheel zoom around the pointer. Positive `delta_y` zooms out.
	pub fn wheel(&mut self, pointer: Point, delta_y: f64) {
		if delta_y == 0.0 {
			return;
		}
		let step = self.wheel_sensitivity / 2.0;
		let factor = if delta_y > 0.0 { 1.0 - step } else { 1.0 + step };
		if let Some(instance) = self.active() {
			instance.zoom_at(pointer, factor);
		}
	}

	/// Select the element under `pointer`, or clear the selection.
	pub fn select_at(&mut self, pointer: Point) -> Option<Selection> {
		self.active()?.select_at(pointer)
	}
}
