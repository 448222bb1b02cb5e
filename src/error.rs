//! Errors that reach the user interface.

/// A failed round-graph request.
///
/// This is the only error the graph view surfaces; malformed payloads are
/// absorbed by the normalizer instead.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
	/// The request never produced an HTTP response.
	#[error("{0}")]
	Transport(String),

	/// The server answered with a non-success status.
	#[error("{message}")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Server-provided detail, else the status text.
		message: String,
	},
}

impl FetchError {
	/// Message shown to the user, never empty.
	pub fn user_message(&self) -> String {
		let message = self.to_string();
		if message.trim().is_empty() {
			"Failed to load graph".to_owned()
		} else {
			message
		}
	}
}
