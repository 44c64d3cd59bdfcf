//! Workspace validation utilities.
//!
//! `WorkspaceValidator` checks the structural invariants of a workspace:
//! unit edges, symmetric links, one link per edge and chains matching the
//! attachment graph.

use std::collections::HashSet;

use shared::{geometry, PolygonId};

use crate::state::{workspace, WorkspaceState};

/// Validator for `WorkspaceState` integrity checks.
pub struct WorkspaceValidator<'a> {
    workspace: &'a WorkspaceState,
}

impl<'a> WorkspaceValidator<'a> {
    pub fn new(workspace: &'a WorkspaceState) -> Self {
        Self { workspace }
    }

    /// Every polygon's world ring still has unit edges.
    pub fn are_edges_unit(&self) -> bool {
        self.workspace
            .polygons()
            .all(|p| geometry::ring_has_unit_edges(&p.vertices()))
    }

    /// Links whose partner does not point back with the negated angle.
    pub fn asymmetric_links(&self) -> Vec<(PolygonId, usize)> {
        let mut bad = Vec::new();
        for poly in self.workspace.polygons() {
            for (edge, link) in poly.links() {
                let back = self
                    .workspace
                    .polygon(link.partner)
                    .and_then(|p| p.link(link.partner_edge));
                let ok = back.is_some_and(|b| {
                    b.partner == poly.id && b.partner_edge == edge && b.fold_angle == -link.fold_angle
                });
                if !ok {
                    bad.push((poly.id, edge));
                }
            }
        }
        bad
    }

    /// Edges claimed by more than one link, seen from the partner side.
    pub fn doubly_claimed_edges(&self) -> Vec<(PolygonId, usize)> {
        let mut seen = HashSet::new();
        let mut dup = Vec::new();
        for poly in self.workspace.polygons() {
            for (_, link) in poly.links() {
                let key = (link.partner, link.partner_edge);
                if !seen.insert(key) {
                    dup.push(key);
                }
            }
        }
        dup
    }

    /// Stored chains equal a fresh traversal of the graph.
    pub fn are_chains_current(&self) -> bool {
        let arena: Vec<_> = self.arena();
        workspace::compute_chains(&arena) == self.workspace.chains()
    }

    fn arena(&self) -> Vec<Option<crate::state::Polygon>> {
        let slots = self
            .workspace
            .polygons()
            .map(|p| p.id as usize + 1)
            .max()
            .unwrap_or(0);
        let mut arena = vec![None; slots];
        for poly in self.workspace.polygons() {
            arena[poly.id as usize] = Some(poly.clone());
        }
        arena
    }

    /// Run all validation checks and return a list of error messages.
    /// An empty list means the workspace is valid.
    pub fn validate_all(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.are_edges_unit() {
            errors.push("a polygon edge is not unit length".to_string());
        }
        for (id, edge) in self.asymmetric_links() {
            errors.push(format!("link on {id}:{edge} has no matching back-link"));
        }
        for (id, edge) in self.doubly_claimed_edges() {
            errors.push(format!("edge {id}:{edge} carries more than one attachment"));
        }
        if !self.are_chains_current() {
            errors.push("chains do not match the attachment graph".to_string());
        }

        errors
    }
}
