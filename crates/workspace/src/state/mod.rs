//! Workspace state: placed polygons and the attachment graph

pub mod polygon;
pub mod workspace;

pub use polygon::{Attachment, Edge, Placement, Polygon, PolygonState};
pub use workspace::{AttachReport, Chain, WorkspaceSnapshot, WorkspaceState};
