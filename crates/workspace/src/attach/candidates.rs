//! Snap candidate search

use glam::DVec3;
use serde::{Deserialize, Serialize};

use shared::{geometry, PolygonId};

use crate::state::polygon::Polygon;

/// An open edge close enough to a query point to snap onto
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub polygon: PolygonId,
    pub edge: usize,
    pub distance: f64,
}

/// Open edges within `threshold` of `point`, nearest first.
///
/// Ties keep polygon then edge order so the ranking is stable.
pub fn find_candidates<'a>(
    point: DVec3,
    polygons: impl IntoIterator<Item = &'a Polygon>,
    threshold: f64,
) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = polygons
        .into_iter()
        .flat_map(|poly| {
            poly.edges()
                .enumerate()
                .filter(|(_, edge)| edge.open)
                .map(move |(i, edge)| Candidate {
                    polygon: poly.id,
                    edge: i,
                    distance: geometry::point_segment_distance(point, edge.start, edge.end),
                })
        })
        .filter(|c| c.distance <= threshold)
        .collect();
    out.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.polygon.cmp(&b.polygon))
            .then(a.edge.cmp(&b.edge))
    });
    out
}
