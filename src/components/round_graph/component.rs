use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use leptos::html::Canvas;
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, MouseEvent, WheelEvent};

use super::canvas::CanvasSurface;
use super::coordinator::{FetchOutcome, GraphViewCoordinator};
use super::instance::Selection;
use super::layout::LayoutAlgorithm;
use super::style::{ElementClass, StyleTable};
use super::surface::Point;
use super::types::SanitizedGraph;
use crate::api::RoundGraphClient;
use crate::config::GraphConfig;

/// Fixed animation step, one display frame at 60 Hz.
const FRAME_DT: f64 = 0.016;
/// Pointer travel below which a press counts as a click rather than a drag.
const CLICK_SLOP: f64 = 3.0;

type Shared = Rc<RefCell<Option<GraphViewCoordinator<CanvasSurface>>>>;

fn with_coordinator<R>(
	shared: &RefCell<Option<GraphViewCoordinator<CanvasSurface>>>,
	f: impl FnOnce(&mut GraphViewCoordinator<CanvasSurface>) -> R,
) -> Option<R> {
	let mut slot = shared.try_borrow_mut().ok()?;
	slot.as_mut().map(f)
}

/// `requestAnimationFrame` loop that advances layout transitions.
#[derive(Clone, Default)]
struct FrameLoop {
	callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
	handle: Rc<Cell<Option<i32>>>,
}

impl FrameLoop {
	fn start(&self, shared: Weak<RefCell<Option<GraphViewCoordinator<CanvasSurface>>>>) {
		if self.callback.borrow().is_some() {
			return;
		}
		let this = self.clone();
		*self.callback.borrow_mut() = Some(Closure::new(move || {
			this.handle.set(None);
			// Unmounted without cleanup: let the loop die.
			let Some(shared) = shared.upgrade() else {
				return;
			};
			with_coordinator(&shared, |c| c.tick(FRAME_DT));
			this.request();
		}));
		self.request();
	}

	fn request(&self) {
		let Some(window) = web_sys::window() else {
			return;
		};
		if let Some(cb) = self.callback.borrow().as_ref() {
			if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
				self.handle.set(Some(id));
			}
		}
	}

	fn stop(&self) {
		if let (Some(id), Some(window)) = (self.handle.take(), web_sys::window()) {
			let _ = window.cancel_animation_frame(id);
		}
		self.callback.borrow_mut().take();
	}
}

#[derive(Clone, Copy)]
struct Drag {
	origin: Point,
	last: Point,
	moved: bool,
}

fn pointer(canvas_ref: NodeRef<Canvas>, ev: &MouseEvent) -> Option<Point> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some(Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn describe_selection(c: &GraphViewCoordinator<CanvasSurface>) -> Option<String> {
	let instance = c.instance()?;
	let graph = instance.graph();
	match instance.selection()? {
		Selection::Node(i) => graph.nodes.get(i).map(|n| n.label.clone()),
		Selection::Edge(i) => graph
			.edges
			.get(i)
			.map(|e| format!("{} → {}", e.source, e.target)),
	}
}

fn initials(label: &str) -> String {
	label.chars().take(2).collect::<String>().to_uppercase()
}

fn algorithm_value(algorithm: LayoutAlgorithm) -> &'static str {
	match algorithm {
		LayoutAlgorithm::Breadthfirst => "breadthfirst",
		LayoutAlgorithm::ForceRelaxed => "force_relaxed",
	}
}

/// Interactive delegation graph for one round, fetched from the game API.
///
/// A new `round_id` starts a new fetch; the previous graph stays on screen
/// until it resolves.
#[component]
pub fn DelegationGraphView(
	/// Round whose delegations are shown.
	#[prop(into)]
	round_id: Signal<String>,
	/// Defaults to [`GraphConfig::load`].
	#[prop(optional)]
	config: Option<GraphConfig>,
) -> impl IntoView {
	let config = config.unwrap_or_else(GraphConfig::load);
	let client = RoundGraphClient::new(config.api_base.clone());
	let view_options = config.view.clone();

	let canvas_ref = NodeRef::<Canvas>::new();
	let shared: Shared = Rc::new(RefCell::new(None));
	let frames = FrameLoop::default();

	let graph = RwSignal::new(None::<SanitizedGraph>);
	let loading = RwSignal::new(false);
	let error = RwSignal::new(None::<String>);
	let selected = RwSignal::new(None::<String>);
	let algorithm = RwSignal::new(view_options.layout.algorithm);

	let (shared_init, frames_init) = (shared.clone(), frames.clone());
	Effect::new(move |_| {
		let round = round_id.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};

		if shared_init.borrow().is_none() {
			let canvas: HtmlCanvasElement = canvas.into();
			let weak = Rc::downgrade(&shared_init);
			let on_resize: Rc<dyn Fn()> = Rc::new(move || {
				if let Some(shared) = weak.upgrade() {
					with_coordinator(&shared, |c| c.handle_resize());
				}
			});
			let surface = CanvasSurface::new(canvas, on_resize);
			*shared_init.borrow_mut() = Some(GraphViewCoordinator::new(surface, view_options.clone()));
			frames_init.start(Rc::downgrade(&shared_init));
		}

		let Some(ticket) = with_coordinator(&shared_init, |c| c.begin_fetch(round)) else {
			return;
		};
		loading.set(true);
		error.set(None);

		let (client, weak) = (client.clone(), Rc::downgrade(&shared_init));
		spawn_local(async move {
			let round = ticket.round_id().to_owned();
			let result = client.round_graph(&round).await;
			let Some(shared) = weak.upgrade() else {
				return;
			};
			let applied = with_coordinator(&shared, |c| match c.complete_fetch(ticket, result) {
				FetchOutcome::Rendered {
					node_count,
					edge_count,
				} => {
					debug!("round {round}: {node_count} nodes, {edge_count} edges on screen");
					graph.set(c.graph().cloned());
					selected.set(None);
					loading.set(false);
				}
				FetchOutcome::Failed(e) => {
					error.set(Some(e.user_message()));
					loading.set(false);
				}
				FetchOutcome::Stale => {}
			});
			if applied.is_none() {
				debug!("graph view gone before round {round} resolved");
			}
		});
	});

	let handles = StoredValue::new_local((shared.clone(), frames));
	on_cleanup(move || {
		let _ = handles.try_with_value(|(shared, frames)| {
			frames.stop();
			if let Ok(mut slot) = shared.try_borrow_mut() {
				if let Some(mut coordinator) = slot.take() {
					coordinator.unmount();
				}
			}
		});
	});

	let drag: Rc<Cell<Option<Drag>>> = Rc::new(Cell::new(None));

	let drag_md = drag.clone();
	let on_mousedown = move |ev: MouseEvent| {
		if let Some(p) = pointer(canvas_ref, &ev) {
			drag_md.set(Some(Drag {
				origin: p,
				last: p,
				moved: false,
			}));
		}
	};

	let (shared_mm, drag_mm) = (shared.clone(), drag.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let (Some(mut d), Some(p)) = (drag_mm.get(), pointer(canvas_ref, &ev)) else {
			return;
		};
		if !d.moved && (p.x - d.origin.x).hypot(p.y - d.origin.y) <= CLICK_SLOP {
			return;
		}
		d.moved = true;
		with_coordinator(&shared_mm, |c| c.viewport().pan_by(p.x - d.last.x, p.y - d.last.y));
		d.last = p;
		drag_mm.set(Some(d));
	};

	let (shared_mu, drag_mu) = (shared.clone(), drag.clone());
	let on_mouseup = move |ev: MouseEvent| {
		let (Some(d), Some(p)) = (drag_mu.take(), pointer(canvas_ref, &ev)) else {
			return;
		};
		if d.moved {
			return;
		}
		let label = with_coordinator(&shared_mu, |c| {
			c.viewport().select_at(p);
			describe_selection(c)
		});
		selected.set(label.flatten());
	};

	let drag_ml = drag.clone();
	let on_mouseleave = move |_: MouseEvent| drag_ml.set(None);

	let shared_wh = shared.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		if let Some(p) = pointer(canvas_ref, &ev) {
			with_coordinator(&shared_wh, |c| c.viewport().wheel(p, ev.delta_y()));
		}
	};

	let shared_layout = shared.clone();
	let on_auto_layout = move |_: MouseEvent| {
		with_coordinator(&shared_layout, |c| c.viewport().auto_layout());
	};
	let shared_fit = shared.clone();
	let on_fit = move |_: MouseEvent| {
		with_coordinator(&shared_fit, |c| c.viewport().fit());
	};
	let shared_out = shared.clone();
	let on_zoom_out = move |_: MouseEvent| {
		with_coordinator(&shared_out, |c| c.viewport().zoom_out());
	};
	let shared_in = shared.clone();
	let on_zoom_in = move |_: MouseEvent| {
		with_coordinator(&shared_in, |c| c.viewport().zoom_in());
	};
	let shared_algo = shared;
	let on_algorithm = move |ev: leptos::ev::Event| {
		let next = match event_target_value(&ev).as_str() {
			"force_relaxed" => LayoutAlgorithm::ForceRelaxed,
			_ => LayoutAlgorithm::Breadthfirst,
		};
		with_coordinator(&shared_algo, |c| c.set_layout_algorithm(next));
		algorithm.set(next);
	};

	let node_count = move || graph.with(|g| g.as_ref().map_or(0, SanitizedGraph::node_count));
	let edge_count = move || graph.with(|g| g.as_ref().map_or(0, SanitizedGraph::edge_count));

	let legend = StyleTable::default()
		.legend()
		.into_iter()
		.map(|entry| {
			let swatch = match entry.class {
				ElementClass::Edge => format!("display: inline-block; width: 24px; height: 2px; background: {};", entry.swatch),
				ElementClass::Placeholder => format!(
					"display: inline-block; width: 12px; height: 12px; border-radius: 3px; background: {}; border: 1px dashed {};",
					entry.swatch, entry.outline
				),
				ElementClass::Node => format!(
					"display: inline-block; width: 12px; height: 12px; border-radius: 3px; background: {}; border: 1px solid {};",
					entry.swatch, entry.outline
				),
			};
			view! {
				<span class="round-graph__legend-entry">
					<span style=swatch></span>
					" "
					{entry.label}
				</span>
			}
		})
		.collect_view();

	view! {
		<section class="round-graph">
			<header class="round-graph__header">
				<h1>"Delegation Graph"</h1>
				<div class="round-graph__badges">
					<span class="round-graph__badge">{node_count}" nodes"</span>
					<span class="round-graph__badge">{edge_count}" edges"</span>
					<Show when=move || loading.get()>
						<span class="round-graph__badge round-graph__badge--loading">"Loading…"</span>
					</Show>
				</div>
			</header>

			{move || {
				error
					.get()
					.map(|message| {
						view! {
							<div class="round-graph__error" role="alert">
								<strong>"Error: "</strong>
								{message}
							</div>
						}
					})
			}}

			<div class="round-graph__toolbar">
				<button on:click=on_auto_layout>"Auto layout"</button>
				<button on:click=on_fit>"Fit"</button>
				<select
					on:change=on_algorithm
					prop:value=move || algorithm_value(algorithm.get())
				>
					<option value="breadthfirst">"Breadthfirst"</option>
					<option value="force_relaxed">"Force relaxed"</option>
				</select>
				<span class="round-graph__zoom">
					<button on:click=on_zoom_out aria-label="Zoom out">"−"</button>
					<button on:click=on_zoom_in aria-label="Zoom in">"+"</button>
				</span>
			</div>

			<div class="round-graph__body">
				<div class="round-graph__main">
					<div class="round-graph__stage" style="position: relative; height: 65vh;">
						<canvas
							node_ref=canvas_ref
							class="round-graph__canvas"
							on:mousedown=on_mousedown
							on:mousemove=on_mousemove
							on:mouseup=on_mouseup
							on:mouseleave=on_mouseleave
							on:wheel=on_wheel
							style="display: block; cursor: grab;"
						/>
						<Show when=move || graph.with(Option::is_none) && !loading.get()>
							<div class="round-graph__empty">"No graph data."</div>
						</Show>
					</div>
					<div class="round-graph__legend">{legend}</div>
				</div>

				<aside class="round-graph__side">
					{move || {
						selected
							.get()
							.map(|label| {
								view! {
									<div class="round-graph__selected">
										<h2>"Selected"</h2>
										<span>{label}</span>
									</div>
								}
							})
					}}
					<div>
						<h2>"Participants"</h2>
						{move || {
							graph
								.with(|g| {
									let nodes = g.as_ref().map(|g| g.nodes.clone()).unwrap_or_default();
									if nodes.is_empty() {
										return view! { <p class="round-graph__none">"No participants."</p> }
											.into_any();
									}
									view! {
										<ul class="round-graph__list">
											{nodes
												.into_iter()
												.map(|node| {
													let tag = node.is_placeholder.then(|| view! { <em>" placeholder"</em> });
													view! {
														<li>
															<span class="round-graph__initials">{initials(&node.label)}</span>
															<span class="round-graph__label">{node.label}</span>
															{tag}
														</li>
													}
												})
												.collect_view()}
										</ul>
									}
										.into_any()
								})
						}}
					</div>
					<div>
						<h2>"Delegations"</h2>
						{move || {
							graph
								.with(|g| {
									let edges = g.as_ref().map(|g| g.edges.clone()).unwrap_or_default();
									if edges.is_empty() {
										return view! { <p class="round-graph__none">"No delegations."</p> }
											.into_any();
									}
									view! {
										<ul class="round-graph__list">
											{edges
												.into_iter()
												.map(|edge| {
													view! {
														<li>
															<code>{edge.source}</code>
															<span>" → "</span>
															<code>{edge.target}</code>
														</li>
													}
												})
												.collect_view()}
										</ul>
									}
										.into_any()
								})
						}}
					</div>
				</aside>
			</div>
		</section>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn initials_are_two_uppercase_glyphs() {
		assert_eq!(initials("alice"), "AL");
		assert_eq!(initials("é"), "É");
		assert_eq!(initials(""), "");
	}

	#[test]
	fn algorithm_values_match_config_names() {
		for algorithm in [LayoutAlgorithm::Breadthfirst, LayoutAlgorithm::ForceRelaxed] {
			let json = format!("\"{}\"", algorithm_value(algorithm));
			assert_eq!(serde_json::from_str::<LayoutAlgorithm>(&json).unwrap(), algorithm);
		}
	}
}
