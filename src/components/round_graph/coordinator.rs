//! Bridges round-graph fetches and resize events to the visualization
//! lifecycle of a single display surface.
//!
//! Each fetch gets a generation number. Only the result of the most recent
//! fetch is applied; anything older is dropped on arrival.

use log::{debug, info, warn};

use super::instance::VisualizationInstance;
use super::layout::LayoutAlgorithm;
use super::normalize::normalize;
use super::surface::DisplaySurface;
use super::types::{RoundGraphResponse, SanitizedGraph};
use super::viewport::ViewportController;
use crate::config::ViewOptions;
use crate::error::FetchError;

/// Issued by [`GraphViewCoordinator::begin_fetch`]; hand it back with the result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
	generation: u64,
	round_id: String,
}

impl FetchTicket {
	/// Round the fetch was started for.
	pub fn round_id(&self) -> &str {
		&self.round_id
	}
}

/// What [`GraphViewCoordinator::complete_fetch`] did with a result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
	/// The new graph replaced whatever was on the surface.
	Rendered {
		/// Nodes after normalization, placeholders included.
		node_count: usize,
		/// Edges after normalization.
		edge_count: usize,
	},
	/// The request failed; the previous graph, if any, is still shown.
	Failed(FetchError),
	/// A newer fetch has started since this one; the result was ignored.
	Stale,
}

enum SurfaceSlot<S: DisplaySurface> {
	Idle(S),
	Bound(VisualizationInstance<S>),
	/// The surface was not handed back; nothing can be bound.
	Vacant,
}

/// Owns one display surface and the instance currently drawing on it.
pub struct GraphViewCoordinator<S: DisplaySurface> {
	slot: SurfaceSlot<S>,
	options: ViewOptions,
	generation: u64,
	loading: Option<String>,
	error: Option<FetchError>,
}

impl<S: DisplaySurface> GraphViewCoordinator<S> {
	/// Nothing is drawn until the first successful fetch.
	pub fn new(surface: S, options: ViewOptions) -> Self {
		Self {
			slot: SurfaceSlot::Idle(surface),
			options,
			generation: 0,
			loading: None,
			error: None,
		}
	}

	/// Mark a fetch for `round_id` as started. Whatever is on screen stays.
	pub fn begin_fetch(&mut self, round_id: impl Into<String>) -> FetchTicket {
		self.generation += 1;
		let round_id = round_id.into();
		info!("fetching delegation graph for round {round_id} (#{})", self.generation);
		self.loading = Some(round_id.clone());
		self.error = None;
		FetchTicket {
			generation: self.generation,
			round_id,
		}
	}

	/// Apply a fetch result, unless a newer fetch has started since.
	pub fn complete_fetch(
		&mut self,
		ticket: FetchTicket,
		result: Result<RoundGraphResponse, FetchError>,
	) -> FetchOutcome {
		if ticket.generation != self.generation {
			debug!(
				"dropping stale graph for round {} (#{}, latest #{})",
				ticket.round_id, ticket.generation, self.generation
			);
			return FetchOutcome::Stale;
		}
		self.loading = None;
		match result {
			Ok(raw) => {
				let graph = normalize(&raw);
				let (node_count, edge_count) = (graph.node_count(), graph.edge_count());
				self.error = None;
				self.show(graph);
				FetchOutcome::Rendered {
					node_count,
					edge_count,
				}
			}
			Err(e) => {
				warn!("delegation graph for round {} failed: {e}", ticket.round_id);
				self.error = Some(e.clone());
				FetchOutcome::Failed(e)
			}
		}
	}

	/// Replace the bound graph: the old instance is fully destroyed before the
	/// new one is created on the same surface.
	pub fn show(&mut self, graph: SanitizedGraph) {
		let surface = match std::mem::replace(&mut self.slot, SurfaceSlot::Vacant) {
			SurfaceSlot::Idle(surface) => Some(surface),
			SurfaceSlot::Bound(mut instance) => instance.destroy(),
			SurfaceSlot::Vacant => None,
		};
		let Some(surface) = surface else {
			warn!("no display surface to bind the graph to");
			return;
		};
		let mut instance = VisualizationInstance::bind(surface, graph, self.options.layout.clone());
		instance.observe_resize();
		instance.fit();
		self.slot = SurfaceSlot::Bound(instance);
	}

	/// Surface size changed: re-measure, then fit.
	pub fn handle_resize(&mut self) {
		if let SurfaceSlot::Bound(instance) = &mut self.slot {
			instance.resize();
			instance.fit();
		}
	}

	/// Advance animations; returns whether another frame is wanted.
	pub fn tick(&mut self, dt: f64) -> bool {
		match &mut self.slot {
			SurfaceSlot::Bound(instance) => instance.tick(dt),
			_ => false,
		}
	}

	/// Use a different layout algorithm for this and future graphs.
	pub fn set_layout_algorithm(&mut self, algorithm: LayoutAlgorithm) {
		if self.options.layout.algorithm == algorithm {
			return;
		}
		self.options.layout.algorithm = algorithm;
		if let SurfaceSlot::Bound(instance) = &mut self.slot {
			instance.set_layout_options(self.options.layout.clone());
		}
	}

	/// Viewport controls; every call is a no-op while no graph is shown.
	pub fn viewport(&mut self) -> ViewportController<'_, S> {
		let instance = match &mut self.slot {
			SurfaceSlot::Bound(instance) => Some(instance),
			_ => None,
		};
		ViewportController::new(instance, self.options.zoom_step, self.options.wheel_sensitivity)
	}

	/// Destroy the live instance, keeping the surface for a later graph.
	pub fn unmount(&mut self) {
		self.slot = match std::mem::replace(&mut self.slot, SurfaceSlot::Vacant) {
			SurfaceSlot::Bound(mut instance) => match instance.destroy() {
				Some(surface) => SurfaceSlot::Idle(surface),
				None => SurfaceSlot::Vacant,
			},
			other => other,
		};
		self.loading = None;
	}

	/// The live instance, if a graph has been rendered.
	pub fn instance(&self) -> Option<&VisualizationInstance<S>> {
		match &self.slot {
			SurfaceSlot::Bound(instance) => Some(instance),
			_ => None,
		}
	}

	/// The graph on screen.
	pub fn graph(&self) -> Option<&SanitizedGraph> {
		self.instance().map(VisualizationInstance::graph)
	}

	/// Zero while nothing is shown.
	pub fn node_count(&self) -> usize {
		self.graph().map_or(0, SanitizedGraph::node_count)
	}

	/// Zero while nothing is shown.
	pub fn edge_count(&self) -> usize {
		self.graph().map_or(0, SanitizedGraph::edge_count)
	}

	/// A fetch is outstanding.
	pub fn is_loading(&self) -> bool {
		self.loading.is_some()
	}

	/// Round of the outstanding fetch.
	pub fn loading_round(&self) -> Option<&str> {
		self.loading.as_deref()
	}

	/// Failure of the latest fetch, cleared when the next one begins.
	pub fn error(&self) -> Option<&FetchError> {
		self.error.as_ref()
	}

	/// Algorithm used for the next layout.
	pub fn layout_algorithm(&self) -> LayoutAlgorithm {
		self.options.layout.algorithm
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::components::round_graph::surface::testing::{SurfaceRecord, RecordingSurface};

	fn coordinator() -> (GraphViewCoordinator<RecordingSurface>, SurfaceRecord) {
		let (surface, record) = RecordingSurface::new(800.0, 600.0);
		(GraphViewCoordinator::new(surface, ViewOptions::default()), record)
	}

	fn payload(nodes: &[u32]) -> RoundGraphResponse {
		RoundGraphResponse::from(json!({
			"nodes": nodes.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>(),
			"edges": []
		}))
	}

	fn ids(c: &GraphViewCoordinator<RecordingSurface>) -> Vec<String> {
		c.graph()
			.map(|g| g.nodes.iter().map(|n| n.id.clone()).collect())
			.unwrap_or_default()
	}

	#[test]
	fn success_binds_a_fitted_instance() {
		let (mut c, record) = coordinator();
		let ticket = c.begin_fetch("3");
		assert!(c.is_loading());
		assert_eq!(c.loading_round(), Some("3"));
		let outcome = c.complete_fetch(ticket, Ok(payload(&[1, 2])));
		assert_eq!(
			outcome,
			FetchOutcome::Rendered {
				node_count: 2,
				edge_count: 0
			}
		);
		assert!(!c.is_loading());
		assert_eq!((c.node_count(), c.edge_count()), (2, 0));
		let log = record.borrow();
		assert!(log.attached);
		assert!(log.observing);
		assert_eq!(log.last_transform, c.instance().map(|i| i.transform()));
	}

	#[test]
	fn refresh_destroys_before_creating() {
		let (mut c, record) = coordinator();
		for round in 0..3 {
			let ticket = c.begin_fetch(round.to_string());
			c.complete_fetch(ticket, Ok(payload(&[round])));
			// RecordingSurface panics on a second attach without a detach.
			let log = record.borrow();
			assert_eq!(log.attaches, round as usize + 1);
			assert_eq!(log.detaches, round as usize);
		}
		assert_eq!(ids(&c), vec!["2"]);
	}

	#[test]
	fn slow_older_fetch_never_overwrites_newer() {
		let (mut c, _) = coordinator();
		let a = c.begin_fetch("1");
		let b = c.begin_fetch("2");
		assert!(matches!(c.complete_fetch(b, Ok(payload(&[20]))), FetchOutcome::Rendered { .. }));
		assert_eq!(c.complete_fetch(a, Ok(payload(&[10]))), FetchOutcome::Stale);
		assert_eq!(ids(&c), vec!["20"]);
	}

	#[test]
	fn same_round_refetch_is_also_last_wins() {
		let (mut c, _) = coordinator();
		let first = c.begin_fetch("4");
		let second = c.begin_fetch("4");
		assert_eq!(c.complete_fetch(first, Ok(payload(&[1]))), FetchOutcome::Stale);
		assert!(c.is_loading());
		c.complete_fetch(second, Ok(payload(&[2])));
		assert_eq!(ids(&c), vec!["2"]);
	}

	#[test]
	fn stale_failure_is_ignored() {
		let (mut c, _) = coordinator();
		let a = c.begin_fetch("1");
		let _b = c.begin_fetch("2");
		let outcome = c.complete_fetch(a, Err(FetchError::Transport("offline".into())));
		assert_eq!(outcome, FetchOutcome::Stale);
		assert!(c.error().is_none());
		assert!(c.is_loading());
	}

	#[test]
	fn failure_keeps_the_previous_graph_interactive() {
		let (mut c, record) = coordinator();
		let ok = c.begin_fetch("1");
		c.complete_fetch(ok, Ok(payload(&[7])));
		let frames = record.borrow().frames;

		let bad = c.begin_fetch("2");
		let err = FetchError::Status {
			status: 403,
			message: "Authentication credentials were not provided.".into(),
		};
		assert_eq!(c.complete_fetch(bad, Err(err.clone())), FetchOutcome::Failed(err.clone()));
		assert_eq!(c.error(), Some(&err));
		assert_eq!(ids(&c), vec!["7"]);
		assert!(record.borrow().attached);
		assert_eq!(record.borrow().detaches, 0);

		// A lone node is fitted at the surface's zoom ceiling, so zoom out.
		let before = c.instance().map(|i| i.transform()).unwrap();
		assert_eq!(before.k, 10.0);
		c.viewport().zoom_out();
		c.viewport().pan_by(15.0, -5.0);
		let after = c.instance().map(|i| i.transform()).unwrap();
		assert!((after.k - before.k / 1.2).abs() < 1e-9);
		assert_ne!((after.x, after.y), (before.x, before.y));
		assert_eq!(record.borrow().last_transform, Some(after));
		assert!(record.borrow().frames >= frames + 2);
	}

	#[test]
	fn new_fetch_clears_previous_error() {
		let (mut c, _) = coordinator();
		let bad = c.begin_fetch("1");
		c.complete_fetch(bad, Err(FetchError::Transport("offline".into())));
		assert!(c.error().is_some());
		c.begin_fetch("1");
		assert!(c.error().is_none());
	}

	#[test]
	fn resize_refits_only_when_bound() {
		let (mut c, record) = coordinator();
		c.handle_resize();
		assert_eq!(record.borrow().frames, 0);

		let t = c.begin_fetch("1");
		c.complete_fetch(t, Ok(payload(&[1, 2, 3])));
		let before = c.instance().map(|i| i.transform()).unwrap();
		record.borrow_mut().extent = crate::components::round_graph::Size::new(300.0, 200.0);
		c.handle_resize();
		let after = c.instance().map(|i| i.transform()).unwrap();
		assert_ne!(before, after);
		assert_eq!(record.borrow().last_transform, Some(after));
	}

	#[test]
	fn viewport_without_graph_is_inert() {
		let (mut c, record) = coordinator();
		let mut viewport = c.viewport();
		assert!(!viewport.is_active());
		viewport.fit();
		viewport.zoom_in();
		viewport.auto_layout();
		assert_eq!(record.borrow().frames, 0);
		assert_eq!((c.node_count(), c.edge_count()), (0, 0));
	}

	#[test]
	fn unmount_releases_surface_and_listener() {
		let (mut c, record) = coordinator();
		let t = c.begin_fetch("1");
		c.complete_fetch(t, Ok(payload(&[1])));
		c.unmount();
		assert!(c.instance().is_none());
		assert!(!record.borrow().attached);
		assert!(!record.borrow().observing);
		c.unmount();
		assert_eq!(record.borrow().detaches, 1);

		// The surface can be bound again afterwards.
		let t = c.begin_fetch("2");
		c.complete_fetch(t, Ok(payload(&[2])));
		assert!(record.borrow().attached);
	}

	#[test]
	fn switching_algorithm_relayouts_in_place() {
		let (mut c, record) = coordinator();
		let t = c.begin_fetch("1");
		c.complete_fetch(
			t,
			Ok(RoundGraphResponse::from(json!({
				"edges": [{ "source": 1, "target": 2 }, { "source": 1, "target": 3 }]
			}))),
		);
		c.set_layout_algorithm(LayoutAlgorithm::ForceRelaxed);
		assert_eq!(c.layout_algorithm(), LayoutAlgorithm::ForceRelaxed);
		assert_eq!(
			c.instance().map(|i| i.options().algorithm),
			Some(LayoutAlgorithm::ForceRelaxed)
		);
		assert_eq!(record.borrow().attaches, 1);
		while c.tick(0.1) {}
		assert!(!c.instance().is_some_and(|i| i.is_animating()));
	}
}
