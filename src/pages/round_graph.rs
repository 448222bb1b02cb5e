use leptos::prelude::*;
use leptos_meta::Title;
use leptos_router::hooks::use_params_map;

use crate::components::round_graph::DelegationGraphView;
use crate::config::GraphConfig;

/// `/rounds/:id/graph`
#[component]
pub fn RoundGraph() -> impl IntoView {
	let params = use_params_map();
	let round_id = Signal::derive(move || params.read().get("id").unwrap_or_default());

	view! {
		<Title text=move || format!("Round {} delegation graph", round_id.get()) />
		<DelegationGraphView round_id=round_id config=GraphConfig::load() />
	}
}
