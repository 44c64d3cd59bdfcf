//! Save/load and autosave of the workspace

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use shared::symbol::MAX_CHAIN_LENGTH;
use shared::{PolyformError, PolygonId, Result};

use crate::attach::{AttachmentResolver, RigidTransform};
use crate::state::polygon::{Attachment, Placement, Polygon};

use super::WorkspaceState;

const DOCUMENT_FORMAT: u32 = 1;

/// One closed edge of a saved polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub edge: usize,
    pub partner: PolygonId,
    pub partner_edge: usize,
    pub fold_angle: f64,
    #[serde(default)]
    pub attached_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonRecord {
    pub id: PolygonId,
    pub sides: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub pose: RigidTransform,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkRecord>,
}

/// Serialized workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    pub format: u32,
    pub polygons: Vec<PolygonRecord>,
}

fn invalid(reason: String) -> PolyformError {
    PolyformError::InvalidDocument(reason)
}

impl WorkspaceState {
    pub fn to_document(&self) -> WorkspaceDocument {
        WorkspaceDocument {
            format: DOCUMENT_FORMAT,
            polygons: self
                .polygons()
                .map(|p| PolygonRecord {
                    id: p.id,
                    sides: p.sides,
                    label: p.label.clone(),
                    pose: p.pose,
                    links: p
                        .links()
                        .map(|(edge, link)| LinkRecord {
                            edge,
                            partner: link.partner,
                            partner_edge: link.partner_edge,
                            fold_angle: link.fold_angle,
                            attached_at_ms: link.attached_at_ms,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Rebuild a workspace, rejecting documents whose links are not symmetric
    pub fn from_document(doc: &WorkspaceDocument, resolver: AttachmentResolver) -> Result<Self> {
        if doc.polygons.len() > MAX_CHAIN_LENGTH {
            return Err(invalid(format!(
                "{} polygons, at most {MAX_CHAIN_LENGTH} allowed",
                doc.polygons.len()
            )));
        }
        if let Some(record) = doc.polygons.iter().find(|r| r.id as usize >= MAX_CHAIN_LENGTH) {
            return Err(invalid(format!("polygon id {} out of range", record.id)));
        }

        let mut ws = WorkspaceState::new(resolver);
        let slots = doc.polygons.iter().map(|r| r.id as usize + 1).max().unwrap_or(0);
        ws.polygons = vec![None; slots];
        ws.membership = vec![None; slots];

        for record in &doc.polygons {
            let slot = &mut ws.polygons[record.id as usize];
            if slot.is_some() {
                return Err(invalid(format!("duplicate polygon id {}", record.id)));
            }
            let placement = Placement {
                position: record.pose.translation,
                rotation: record.pose.rotation,
                label: record.label.clone(),
            };
            placement
                .check()
                .map_err(|e| invalid(format!("polygon {}: {e}", record.id)))?;
            *slot = Some(Polygon::new(record.id, record.sides, placement)?);
            ws.live += 1;
        }

        for record in &doc.polygons {
            for link in &record.links {
                if !link.fold_angle.is_finite() {
                    return Err(invalid(format!(
                        "link {}:{} has fold angle {}",
                        record.id, link.edge, link.fold_angle
                    )));
                }
                let partner = ws
                    .polygon(link.partner)
                    .ok_or(PolyformError::UnknownPolygon(link.partner))?;
                partner.check_edge(link.partner_edge)?;
                let poly = ws.get_mut(record.id)?;
                poly.check_edge(link.edge)?;
                poly.set_link(
                    link.edge,
                    Attachment {
                        partner: link.partner,
                        partner_edge: link.partner_edge,
                        fold_angle: link.fold_angle,
                        attached_at_ms: link.attached_at_ms,
                    },
                );
            }
        }

        for poly in ws.polygons() {
            for (edge, link) in poly.links() {
                let back = ws
                    .polygon(link.partner)
                    .and_then(|p| p.link(link.partner_edge));
                let symmetric = back.is_some_and(|b| {
                    b.partner == poly.id
                        && b.partner_edge == edge
                        && (b.fold_angle + link.fold_angle).abs() < 1e-9
                });
                if !symmetric {
                    return Err(invalid(format!(
                        "link {}:{} -> {}:{} has no matching back-link",
                        poly.id, edge, link.partner, link.partner_edge
                    )));
                }
            }
        }

        ws.recompute_chains();
        ws.version = 1;
        Ok(ws)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_document()).unwrap_or_default()
    }

    pub fn from_json(json: &str, resolver: AttachmentResolver) -> std::result::Result<Self, String> {
        let doc: WorkspaceDocument =
            serde_json::from_str(json).map_err(|e| format!("JSON parse error: {e}"))?;
        if doc.format != DOCUMENT_FORMAT {
            return Err(format!("unsupported workspace format {}", doc.format));
        }
        Self::from_document(&doc, resolver).map_err(|e| e.to_string())
    }

    /// Get autosave file path
    pub fn autosave_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "polyform", "polyform")
            .map(|dirs| dirs.data_dir().join("workspace.json"))
    }

    /// Write the workspace document to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json())
    }

    /// Read a workspace document from `path`. A missing file is `Ok(None)`.
    pub fn load_from(path: &Path, resolver: AttachmentResolver) -> std::result::Result<Option<Self>, String> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.to_string()),
        };
        Self::from_json(&json, resolver).map(Some)
    }

    /// Save workspace to autosave file
    pub fn autosave(&self) {
        if let Some(path) = Self::autosave_path() {
            if let Err(e) = self.save_to(&path) {
                tracing::warn!(path = %path.display(), "autosave failed: {e}");
            }
        }
    }

    /// Load workspace from autosave file
    pub fn load_autosave(resolver: AttachmentResolver) -> Option<Self> {
        let path = Self::autosave_path()?;
        match Self::load_from(&path, resolver) {
            Ok(ws) => ws,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring autosave: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn sample() -> WorkspaceState {
        let mut ws = WorkspaceState::new(AttachmentResolver::default());
        let a = ws.add_polygon(3, Placement::default().with_label("base")).unwrap();
        let b = ws.add_polygon(4, Placement::at(DVec3::new(3.0, 0.0, 0.0))).unwrap();
        let c = ws.add_polygon(3, Placement::default()).unwrap();
        ws.add_polygon(6, Placement::default()).unwrap();
        ws.attach(a, 0, b, 0, Some(0.5)).unwrap();
        ws.attach(b, 2, c, 1, None).unwrap();
        ws.remove_polygon(3).unwrap();
        ws
    }

    #[test]
    fn test_json_roundtrip_preserves_graph() {
        let ws = sample();
        let back = WorkspaceState::from_json(&ws.to_json(), AttachmentResolver::default()).unwrap();

        assert_eq!(back.len(), 3);
        assert_eq!(back.chains(), ws.chains());
        assert_eq!(back.open_edges(), ws.open_edges());
        assert_eq!(back.polygon(0).unwrap().label.as_deref(), Some("base"));
        for (x, y) in ws.polygons().zip(back.polygons()) {
            assert!((x.centre() - y.centre()).length() < 1e-9);
        }
    }

    #[test]
    fn test_asymmetric_link_rejected() {
        let mut doc = sample().to_document();
        doc.polygons[0].links[0].fold_angle += 1.0;
        let err = WorkspaceState::from_document(&doc, AttachmentResolver::default()).unwrap_err();
        assert!(matches!(err, PolyformError::InvalidDocument(_)), "{err:?}");
    }

    fn rejected(doc: &WorkspaceDocument) -> PolyformError {
        WorkspaceState::from_document(doc, AttachmentResolver::default()).unwrap_err()
    }

    #[test]
    fn test_degenerate_pose_rejected() {
        let mut doc = sample().to_document();
        doc.polygons[1].pose.rotation = glam::DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0);
        assert!(matches!(rejected(&doc), PolyformError::InvalidDocument(_)));

        let mut doc = sample().to_document();
        doc.polygons[1].pose.rotation = glam::DQuat::from_xyzw(f64::NAN, 0.0, 0.0, 1.0);
        assert!(matches!(rejected(&doc), PolyformError::InvalidDocument(_)));

        let mut doc = sample().to_document();
        doc.polygons[2].pose.translation = DVec3::new(0.0, f64::INFINITY, 0.0);
        assert!(matches!(rejected(&doc), PolyformError::InvalidDocument(_)));
    }

    #[test]
    fn test_non_finite_link_fold_rejected() {
        let mut doc = sample().to_document();
        doc.polygons[0].links[0].fold_angle = f64::NAN;
        assert!(matches!(rejected(&doc), PolyformError::InvalidDocument(_)));
    }

    #[test]
    fn test_huge_id_rejected_before_allocating() {
        let mut doc = sample().to_document();
        doc.polygons[2].id = PolygonId::MAX;
        doc.polygons[2].links.clear();
        doc.polygons[1].links.clear();
        doc.polygons[0].links.clear();
        assert!(matches!(rejected(&doc), PolyformError::InvalidDocument(_)));

        doc.polygons[2].id = MAX_CHAIN_LENGTH as PolygonId;
        assert!(matches!(rejected(&doc), PolyformError::InvalidDocument(_)));

        doc.polygons[2].id = MAX_CHAIN_LENGTH as PolygonId - 1;
        let ws = WorkspaceState::from_document(&doc, AttachmentResolver::default()).unwrap();
        assert_eq!(ws.len(), 3);
    }

    #[test]
    fn test_oversized_document_rejected() {
        let record = sample().to_document().polygons[1].clone();
        let polygons = (0..=MAX_CHAIN_LENGTH as PolygonId)
            .map(|id| PolygonRecord {
                id,
                links: Vec::new(),
                ..record.clone()
            })
            .collect();
        let doc = WorkspaceDocument { format: DOCUMENT_FORMAT, polygons };
        assert!(matches!(rejected(&doc), PolyformError::InvalidDocument(_)));
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir()
            .join(format!("polyform-{}", uuid::Uuid::new_v4()))
            .join("workspace.json");
        assert!(WorkspaceState::load_from(&path, AttachmentResolver::default())
            .unwrap()
            .is_none());

        let ws = sample();
        ws.save_to(&path).unwrap();
        let back = WorkspaceState::load_from(&path, AttachmentResolver::default())
            .unwrap()
            .unwrap();
        assert_eq!(back.chains(), ws.chains());
        assert_eq!(back.open_edges(), ws.open_edges());

        std::fs::write(&path, "{ not json").unwrap();
        assert!(WorkspaceState::load_from(&path, AttachmentResolver::default()).is_err());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_unknown_partner_rejected() {
        let mut doc = sample().to_document();
        doc.polygons[0].links[0].partner = 42;
        assert_eq!(
            WorkspaceState::from_document(&doc, AttachmentResolver::default()).unwrap_err(),
            PolyformError::UnknownPolygon(42)
        );
    }

    #[test]
    fn test_unsupported_format() {
        let json = r#"{"format":9,"polygons":[]}"#;
        assert!(WorkspaceState::from_json(json, AttachmentResolver::default()).is_err());
    }
}
