//! Round delegation graph: sanitizing, layout, viewport and the canvas view.

mod canvas;
mod component;
mod coordinator;
mod instance;
mod layout;
mod normalize;
mod style;
mod surface;
mod types;
mod viewport;

pub use canvas::CanvasSurface;
pub use component::DelegationGraphView;
pub use coordinator::{FetchOutcome, FetchTicket, GraphViewCoordinator};
pub use instance::{InstanceState, Selection, VisualizationInstance};
pub use layout::{Layout, LayoutAlgorithm, LayoutOptions, Placement, layout};
pub use normalize::normalize;
pub use style::{BorderStyle, ElementClass, LegendEntry, NodeStyle, StyleTable};
pub use surface::{Bounds, DisplaySurface, Point, Scene, SceneEdge, SceneNode, Size, ViewTransform};
pub use types::{DelegationEdge, ParticipantNode, RoundGraphResponse, SanitizedGraph};
pub use viewport::ViewportController;
