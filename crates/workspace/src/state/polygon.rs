//! Placed polygon instances

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use shared::{geometry, PolyformError, PolygonId, Result};

use crate::attach::transform::RigidTransform;

/// Where a new polygon is put when it is added
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: DVec3,
    #[serde(default)]
    pub rotation: DQuat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Placement {
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Position must be finite and rotation a finite, non-zero quaternion
    pub fn check(&self) -> Result<()> {
        if !self.position.is_finite() {
            return Err(PolyformError::InvalidPlacement(format!(
                "position {} is not finite",
                self.position
            )));
        }
        let length = self.rotation.length();
        if !self.rotation.is_finite() || length < 1e-9 {
            return Err(PolyformError::InvalidPlacement(format!(
                "rotation {} cannot be normalised",
                self.rotation
            )));
        }
        Ok(())
    }
}

/// One side of an attachment, stored on the polygon that owns the edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub partner: PolygonId,
    pub partner_edge: usize,
    /// Signed fold angle; the partner stores the negation
    pub fold_angle: f64,
    pub attached_at_ms: u64,
}

/// Attachment progress of a single polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolygonState {
    Unattached,
    PartiallyAttached,
    FullyClosed,
}

/// World-space view of one edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub start: DVec3,
    pub end: DVec3,
    pub midpoint: DVec3,
    /// In-plane normal pointing away from the polygon
    pub normal: DVec3,
    pub face_normal: DVec3,
    pub open: bool,
}

impl Edge {
    pub fn direction(&self) -> DVec3 {
        (self.end - self.start).normalize_or_zero()
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

/// A regular polygon with unit edges, owned by the workspace
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub id: PolygonId,
    pub sides: u32,
    pub label: Option<String>,
    pub pose: RigidTransform,
    local_ring: Vec<DVec3>,
    links: Vec<Option<Attachment>>,
}

impl Polygon {
    pub fn new(id: PolygonId, sides: u32, placement: Placement) -> Result<Self> {
        placement.check()?;
        let local_ring = geometry::vertex_ring(sides)?;
        Ok(Self {
            id,
            sides,
            label: placement.label,
            pose: RigidTransform::new(placement.rotation.normalize(), placement.position),
            links: vec![None; local_ring.len()],
            local_ring,
        })
    }

    pub fn edge_count(&self) -> usize {
        self.local_ring.len()
    }

    pub fn circumradius(&self) -> f64 {
        geometry::circumradius(self.sides).unwrap_or(0.0)
    }

    pub fn internal_angle(&self) -> f64 {
        geometry::internal_angle(self.sides).unwrap_or(0.0)
    }

    pub fn centre(&self) -> DVec3 {
        self.pose.translation
    }

    pub fn face_normal(&self) -> DVec3 {
        self.pose.apply_vector(DVec3::Z)
    }

    /// World-space vertex ring
    pub fn vertices(&self) -> Vec<DVec3> {
        self.local_ring
            .iter()
            .map(|p| self.pose.apply_point(*p))
            .collect()
    }

    pub fn check_edge(&self, edge: usize) -> Result<()> {
        if edge < self.edge_count() {
            Ok(())
        } else {
            Err(PolyformError::EdgeOutOfRange {
                polygon: self.id,
                edge,
            })
        }
    }

    pub fn edge(&self, index: usize) -> Result<Edge> {
        self.check_edge(index)?;
        let n = self.edge_count();
        let start = self.pose.apply_point(self.local_ring[index]);
        let end = self.pose.apply_point(self.local_ring[(index + 1) % n]);
        let face_normal = self.face_normal();
        let direction = (end - start).normalize_or_zero();
        Ok(Edge {
            start,
            end,
            midpoint: (start + end) * 0.5,
            normal: direction.cross(face_normal),
            face_normal,
            open: self.links[index].is_none(),
        })
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        (0..self.edge_count()).filter_map(|i| self.edge(i).ok())
    }

    pub fn is_open(&self, edge: usize) -> bool {
        matches!(self.links.get(edge), Some(None))
    }

    pub fn open_edges(&self) -> impl Iterator<Item = usize> + '_ {
        self.links
            .iter()
            .enumerate()
            .filter(|(_, link)| link.is_none())
            .map(|(i, _)| i)
    }

    pub fn open_flags(&self) -> Vec<bool> {
        self.links.iter().map(Option::is_none).collect()
    }

    pub fn link(&self, edge: usize) -> Option<&Attachment> {
        self.links.get(edge).and_then(Option::as_ref)
    }

    /// `(edge, attachment)` for every closed edge, in edge order
    pub fn links(&self) -> impl Iterator<Item = (usize, &Attachment)> + '_ {
        self.links
            .iter()
            .enumerate()
            .filter_map(|(i, link)| link.as_ref().map(|a| (i, a)))
    }

    pub fn state(&self) -> PolygonState {
        let closed = self.links.iter().filter(|l| l.is_some()).count();
        if closed == 0 {
            PolygonState::Unattached
        } else if closed == self.edge_count() {
            PolygonState::FullyClosed
        } else {
            PolygonState::PartiallyAttached
        }
    }

    pub(crate) fn set_link(&mut self, edge: usize, link: Attachment) {
        self.links[edge] = Some(link);
    }

    /// Open every edge attached to `partner`, returning the freed edges
    pub(crate) fn release_partner(&mut self, partner: PolygonId) -> Vec<usize> {
        let mut freed = Vec::new();
        for (i, link) in self.links.iter_mut().enumerate() {
            if link.is_some_and(|l| l.partner == partner) {
                *link = None;
                freed.push(i);
            }
        }
        freed
    }

    /// Apply `transform` after the current pose
    pub(crate) fn transform(&mut self, transform: &RigidTransform) {
        self.pose = self.pose.then(transform);
    }

    pub(crate) fn translate(&mut self, delta: DVec3) {
        self.pose.translation += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_placement_rejected() {
        let zero = Placement {
            rotation: DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0),
            ..Default::default()
        };
        let nan = Placement {
            rotation: DQuat::from_xyzw(f64::NAN, 0.0, 0.0, 1.0),
            ..Default::default()
        };
        let far = Placement::at(DVec3::new(f64::INFINITY, 0.0, 0.0));
        for placement in [zero, nan, far] {
            let err = Polygon::new(0, 4, placement).unwrap_err();
            assert!(matches!(err, PolyformError::InvalidPlacement(_)));
        }
        let scaled = Placement {
            rotation: DQuat::from_xyzw(0.0, 0.0, 0.0, 3.0),
            ..Default::default()
        };
        let poly = Polygon::new(0, 4, scaled).unwrap();
        assert!(geometry::ring_has_unit_edges(&poly.vertices()));
    }

    #[test]
    fn test_new_polygon_has_all_edges_open() {
        let poly = Polygon::new(0, 5, Placement::default()).unwrap();
        assert_eq!(poly.edge_count(), 5);
        assert_eq!(poly.open_edges().count(), 5);
        assert_eq!(poly.state(), PolygonState::Unattached);
        assert!(poly.edges().all(|e| (e.length() - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_invalid_sides_rejected() {
        assert_eq!(
            Polygon::new(0, 2, Placement::default()).unwrap_err(),
            PolyformError::InvalidSideCount(2)
        );
        assert_eq!(
            Polygon::new(0, 21, Placement::default()).unwrap_err(),
            PolyformError::InvalidSideCount(21)
        );
    }

    #[test]
    fn test_edge_normals_point_outward() {
        let poly = Polygon::new(0, 6, Placement::at(DVec3::new(2.0, -1.0, 0.5))).unwrap();
        for edge in poly.edges() {
            let outward = edge.midpoint - poly.centre();
            assert!(edge.normal.dot(outward) > 0.0);
            assert!(edge.normal.dot(edge.direction()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_state_transitions() {
        let mut poly = Polygon::new(0, 3, Placement::default()).unwrap();
        let link = Attachment {
            partner: 1,
            partner_edge: 0,
            fold_angle: 0.0,
            attached_at_ms: 0,
        };
        poly.set_link(0, link);
        assert_eq!(poly.state(), PolygonState::PartiallyAttached);
        poly.set_link(1, Attachment { partner: 2, ..link });
        poly.set_link(2, Attachment { partner: 1, partner_edge: 2, ..link });
        assert_eq!(poly.state(), PolygonState::FullyClosed);
        assert!(!poly.is_open(1));

        assert_eq!(poly.release_partner(1), vec![0, 2]);
        assert_eq!(poly.open_edges().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_edge_out_of_range() {
        let poly = Polygon::new(4, 4, Placement::default()).unwrap();
        assert_eq!(
            poly.edge(4).unwrap_err(),
            PolyformError::EdgeOutOfRange { polygon: 4, edge: 4 }
        );
        assert!(!poly.is_open(9));
    }
}
