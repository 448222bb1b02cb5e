use leptos::prelude::*;

/// Fallback for unknown routes.
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<h1>"Page not found"</h1>
		<p>"Delegation graphs live at " <code>"/rounds/<id>/graph"</code> "."</p>
	}
}
