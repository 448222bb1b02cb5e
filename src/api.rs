//! Client for the game API's round delegation-graph endpoint.

use log::debug;
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

use crate::components::round_graph::RoundGraphResponse;
use crate::error::FetchError;

/// localStorage key holding the session token set at login.
pub const TOKEN_KEY: &str = "tg_token";

/// Fetches round graphs from one API base URL.
#[derive(Clone, Debug)]
pub struct RoundGraphClient {
	base: String,
}

impl RoundGraphClient {
	/// Trailing slashes on `base` are dropped.
	pub fn new(base: impl Into<String>) -> Self {
		let base: String = base.into();
		Self {
			base: base.trim_end_matches('/').to_owned(),
		}
	}

	/// Endpoint for `round_id`, always with a trailing slash.
	pub fn round_graph_url(&self, round_id: &str) -> String {
		format!("{}/rounds/{round_id}/delegation-graph/", self.base)
	}

	/// GET the delegation graph for one round.
	pub async fn round_graph(&self, round_id: &str) -> Result<RoundGraphResponse, FetchError> {
		let url = self.round_graph_url(round_id);

		let headers = Headers::new().map_err(js_error)?;
		headers.set("Content-Type", "application/json").map_err(js_error)?;
		if let Some(token) = stored_token() {
			headers
				.set("Authorization", &format!("Token {token}"))
				.map_err(js_error)?;
		}
		let opts = RequestInit::new();
		opts.set_method("GET");
		opts.set_mode(RequestMode::Cors);
		opts.set_headers(&headers);

		let request = Request::new_with_str_and_init(&url, &opts).map_err(js_error)?;
		let window = web_sys::window().ok_or_else(|| FetchError::Transport("no window".into()))?;
		let response: Response = JsFuture::from(window.fetch_with_request(&request))
			.await
			.map_err(js_error)?
			.dyn_into()
			.map_err(|_| FetchError::Transport("response is not a Response".into()))?;

		let body = JsFuture::from(response.text().map_err(js_error)?)
			.await
			.map_err(js_error)?
			.as_string()
			.unwrap_or_default();
		debug!("GET {url} => {} ({} bytes)", response.status(), body.len());
		decode_response(response.status(), &response.status_text(), &body)
	}
}

/// Interpret a finished response.
///
/// A 2xx body that is not JSON becomes an empty graph. Errors carry the
/// server's `detail` or `error` field, else the status text.
pub fn decode_response(status: u16, status_text: &str, body: &str) -> Result<RoundGraphResponse, FetchError> {
	let data = if body.is_empty() {
		Value::Null
	} else {
		serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_owned()))
	};
	if (200..300).contains(&status) {
		return Ok(RoundGraphResponse::from(data));
	}
	let message = ["detail", "error"]
		.iter()
		.find_map(|key| data.get(key).and_then(message_text))
		.or_else(|| Some(status_text.to_owned()).filter(|text| !text.is_empty()))
		.unwrap_or_else(|| "Request failed".to_owned());
	Err(FetchError::Status { status, message })
}

fn message_text(value: &Value) -> Option<String> {
	match value {
		Value::Null | Value::Bool(false) => None,
		Value::String(s) if s.is_empty() => None,
		Value::String(s) => Some(s.clone()),
		Value::Number(n) if n.as_f64() == Some(0.0) => None,
		other => Some(other.to_string()),
	}
}

fn stored_token() -> Option<String> {
	let storage = web_sys::window()?.local_storage().ok()??;
	storage.get_item(TOKEN_KEY).ok()?.filter(|token| !token.is_empty())
}

fn js_error(err: JsValue) -> FetchError {
	let message = match err.dyn_ref::<js_sys::Error>() {
		Some(err) => String::from(err.message()),
		None => err.as_string().unwrap_or_else(|| format!("{err:?}")),
	};
	FetchError::Transport(message)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn url_has_trailing_slash_and_single_separator() {
		let client = RoundGraphClient::new("http://localhost:8000/api/");
		assert_eq!(
			client.round_graph_url("12"),
			"http://localhost:8000/api/rounds/12/delegation-graph/"
		);
	}

	#[test]
	fn success_bodies_decode_loosely() {
		let ok = decode_response(200, "OK", r#"{"nodes":[{"id":1}],"edges":[]}"#).unwrap();
		assert_eq!(ok.nodes, json!([{ "id": 1 }]));

		assert_eq!(decode_response(200, "OK", "").unwrap(), RoundGraphResponse::default());
		assert_eq!(
			decode_response(200, "OK", "<html>oops</html>").unwrap(),
			RoundGraphResponse::default()
		);
	}

	#[test]
	fn error_message_precedence() {
		let err = decode_response(403, "Forbidden", r#"{"detail":"Not allowed."}"#).unwrap_err();
		assert_eq!(
			err,
			FetchError::Status {
				status: 403,
				message: "Not allowed.".into()
			}
		);

		let err = decode_response(400, "Bad Request", r#"{"detail":"","error":"Round not started"}"#).unwrap_err();
		assert_eq!(err.user_message(), "Round not started");

		let err = decode_response(502, "Bad Gateway", "<html/>").unwrap_err();
		assert_eq!(err.user_message(), "Bad Gateway");

		let err = decode_response(500, "", "").unwrap_err();
		assert_eq!(err.user_message(), "Request failed");
	}
}
