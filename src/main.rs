//! Browser entry point for the round graph app.

// The library crate uses the dependencies; this binary only mounts it.
#![allow(unused_crate_dependencies)]

use delegation_graph::{App, init_logging};
use leptos::prelude::*;

fn main() {
	init_logging();
	mount_to_body(App)
}
