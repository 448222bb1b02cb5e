//! Runtime configuration for the graph view.

use log::{info, warn};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::HtmlScriptElement;

use crate::components::round_graph::LayoutOptions;

/// Element id of the optional JSON override block in `index.html`.
pub const CONFIG_ELEMENT_ID: &str = "round-graph-config";

const DEFAULT_API_BASE: &str = "https://the-trust-gambit.onrender.com/api";

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
	/// Base URL of the game API, without a trailing slash.
	pub api_base: String,
	/// Viewport and layout tuning.
	pub view: ViewOptions,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			api_base: trim_base(option_env!("TRUST_GAMBIT_API_BASE").unwrap_or(DEFAULT_API_BASE)),
			view: ViewOptions::default(),
		}
	}
}

/// Viewport tuning.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
	/// Factor applied by the zoom buttons.
	pub zoom_step: f64,
	/// Mouse-wheel zoom speed; each notch scales zoom by `1 ± wheel_sensitivity / 2`.
	pub wheel_sensitivity: f64,
	/// Layout used for the initial placement and for auto layout.
	pub layout: LayoutOptions,
}

impl Default for ViewOptions {
	fn default() -> Self {
		Self {
			zoom_step: 1.2,
			wheel_sensitivity: 0.2,
			layout: LayoutOptions::default(),
		}
	}
}

impl GraphConfig {
	/// Parse a JSON override. Missing fields keep their defaults.
	pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
		let mut config: Self = serde_json::from_str(text)?;
		config.api_base = trim_base(&config.api_base);
		Ok(config)
	}

	/// Defaults, overridden by the `#round-graph-config` script element when
	/// the page provides one.
	pub fn load() -> Self {
		let Some(text) = config_element_text() else {
			return Self::default();
		};
		match Self::from_json(&text) {
			Ok(config) => {
				info!("graph config loaded from #{CONFIG_ELEMENT_ID}");
				config
			}
			Err(e) => {
				warn!("ignoring #{CONFIG_ELEMENT_ID}: {e}");
				Self::default()
			}
		}
	}
}

fn config_element_text() -> Option<String> {
	let document = web_sys::window()?.document()?;
	let element = document.get_element_by_id(CONFIG_ELEMENT_ID)?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok()
}

fn trim_base(base: &str) -> String {
	base.trim_end_matches('/').to_owned()
}
