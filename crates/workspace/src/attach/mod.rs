//! Attachment resolver: edge eligibility, alignment and linking.

pub mod candidates;
pub mod score;
pub mod transform;

use std::collections::HashSet;
use std::fmt;

use glam::DVec3;

use shared::{PolyformError, ReferenceSet, Result};

use crate::state::polygon::{Attachment, Polygon};

pub use candidates::{find_candidates, Candidate};
pub use score::attachment_score;
pub use transform::{compute_transform, RigidTransform};

/// External rule deciding whether two side counts may share an edge
pub trait CompatibilityRule: Send + Sync {
    fn allows(&self, a_sides: u32, b_sides: u32) -> bool;
}

/// Only the listed (unordered) side-count pairs may join
#[derive(Debug, Clone, Default)]
pub struct AllowedPairs {
    pairs: HashSet<(u32, u32)>,
}

impl AllowedPairs {
    pub fn new(pairs: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Self {
            pairs: pairs.into_iter().map(|(a, b)| (a.min(b), a.max(b))).collect(),
        }
    }

    /// Every pair that appears as a two-member chain in `reference`
    pub fn from_reference(reference: &ReferenceSet) -> Self {
        Self::new(
            reference
                .iter()
                .filter(|entry| entry.sides.len() == 2)
                .map(|entry| (entry.sides[0], entry.sides[1])),
        )
    }
}

impl CompatibilityRule for AllowedPairs {
    fn allows(&self, a_sides: u32, b_sides: u32) -> bool {
        self.pairs.contains(&(a_sides.min(b_sides), a_sides.max(b_sides)))
    }
}

/// Validates and records attachments between polygon edges
pub struct AttachmentResolver {
    snap_threshold: f64,
    rule: Option<Box<dyn CompatibilityRule>>,
}

impl fmt::Debug for AttachmentResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentResolver")
            .field("snap_threshold", &self.snap_threshold)
            .field("rule", &self.rule.is_some())
            .finish()
    }
}

impl Default for AttachmentResolver {
    fn default() -> Self {
        Self::new(0.25)
    }
}

impl AttachmentResolver {
    pub fn new(snap_threshold: f64) -> Self {
        Self {
            snap_threshold,
            rule: None,
        }
    }

    pub fn with_rule(mut self, rule: impl CompatibilityRule + 'static) -> Self {
        self.rule = Some(Box::new(rule));
        self
    }

    pub fn set_rule(&mut self, rule: Option<Box<dyn CompatibilityRule>>) {
        self.rule = rule;
    }

    pub fn snap_threshold(&self) -> f64 {
        self.snap_threshold
    }

    pub fn find_candidates<'a>(
        &self,
        point: DVec3,
        polygons: impl IntoIterator<Item = &'a Polygon>,
    ) -> Vec<Candidate> {
        candidates::find_candidates(point, polygons, self.snap_threshold)
    }

    /// Check that `a.edge_a` and `b.edge_b` may be joined right now
    pub fn validate(&self, a: &Polygon, edge_a: usize, b: &Polygon, edge_b: usize) -> Result<()> {
        a.check_edge(edge_a)?;
        b.check_edge(edge_b)?;
        if a.id == b.id {
            return Err(PolyformError::IncompatibleEdge(format!(
                "polygon {} cannot attach to itself",
                a.id
            )));
        }
        if !a.is_open(edge_a) {
            return Err(PolyformError::EdgeAlreadyClosed {
                polygon: a.id,
                edge: edge_a,
            });
        }
        if !b.is_open(edge_b) {
            return Err(PolyformError::EdgeAlreadyClosed {
                polygon: b.id,
                edge: edge_b,
            });
        }
        if let Some(rule) = &self.rule {
            if !rule.allows(a.sides, b.sides) {
                return Err(PolyformError::IncompatibleEdge(format!(
                    "{}-gon and {}-gon are not an allowed pair",
                    a.sides, b.sides
                )));
            }
        }
        Ok(())
    }

    /// Fold angles must be finite; anything else would corrupt both poses
    pub fn check_fold(&self, fold_angle: f64) -> Result<()> {
        if fold_angle.is_finite() {
            Ok(())
        } else {
            Err(PolyformError::IncompatibleEdge(format!(
                "fold angle {fold_angle} is not finite"
            )))
        }
    }

    /// Close both edges and record the link on each side.
    ///
    /// Nothing is changed when validation fails.
    pub fn apply_attachment(
        &self,
        a: &mut Polygon,
        edge_a: usize,
        b: &mut Polygon,
        edge_b: usize,
        fold_angle: f64,
        attached_at_ms: u64,
    ) -> Result<()> {
        self.validate(a, edge_a, b, edge_b)?;
        self.check_fold(fold_angle)?;
        a.set_link(
            edge_a,
            Attachment {
                partner: b.id,
                partner_edge: edge_b,
                fold_angle,
                attached_at_ms,
            },
        );
        b.set_link(
            edge_b,
            Attachment {
                partner: a.id,
                partner_edge: edge_a,
                fold_angle: -fold_angle,
                attached_at_ms,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::polygon::Placement;

    fn pair() -> (Polygon, Polygon) {
        (
            Polygon::new(0, 3, Placement::default()).unwrap(),
            Polygon::new(1, 4, Placement::default()).unwrap(),
        )
    }

    #[test]
    fn test_apply_attachment_is_symmetric() {
        let resolver = AttachmentResolver::default();
        let (mut a, mut b) = pair();
        resolver.apply_attachment(&mut a, 1, &mut b, 3, 0.4, 7).unwrap();

        let forward = a.link(1).unwrap();
        let back = b.link(3).unwrap();
        assert_eq!((forward.partner, forward.partner_edge), (1, 3));
        assert_eq!((back.partner, back.partner_edge), (0, 1));
        assert_eq!(back.fold_angle, -forward.fold_angle);
        assert_eq!(forward.attached_at_ms, 7);
    }

    #[test]
    fn test_closed_edge_rejected_without_changes() {
        let resolver = AttachmentResolver::default();
        let (mut a, mut b) = pair();
        let mut c = Polygon::new(2, 3, Placement::default()).unwrap();
        resolver.apply_attachment(&mut a, 0, &mut b, 0, 0.0, 0).unwrap();

        let before = c.clone();
        let err = resolver.apply_attachment(&mut c, 0, &mut a, 0, 0.0, 0).unwrap_err();
        assert_eq!(err, PolyformError::EdgeAlreadyClosed { polygon: 0, edge: 0 });
        assert_eq!(c, before);
    }

    #[test]
    fn test_non_finite_fold_rejected() {
        let resolver = AttachmentResolver::default();
        let (mut a, mut b) = pair();
        for fold in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = resolver.apply_attachment(&mut a, 0, &mut b, 0, fold, 0).unwrap_err();
            assert!(matches!(err, PolyformError::IncompatibleEdge(_)));
        }
        assert!(a.is_open(0) && b.is_open(0));
        assert!(resolver.check_fold(-2.5).is_ok());
    }

    #[test]
    fn test_rule_rejects_pair() {
        let resolver = AttachmentResolver::default().with_rule(AllowedPairs::new([(3, 3)]));
        let (mut a, mut b) = pair();
        let err = resolver.apply_attachment(&mut a, 0, &mut b, 0, 0.0, 0).unwrap_err();
        assert!(matches!(err, PolyformError::IncompatibleEdge(_)));
        assert!(a.is_open(0) && b.is_open(0));
    }

    #[test]
    fn test_allowed_pairs_from_reference_are_unordered() {
        let rule = AllowedPairs::from_reference(&ReferenceSet::builtin());
        assert!(rule.allows(3, 4));
        assert!(rule.allows(4, 3));
        assert!(rule.allows(12, 12));
        assert!(!rule.allows(7, 9));
    }

    #[test]
    fn test_self_attachment_rejected() {
        let resolver = AttachmentResolver::default();
        let (a, _) = pair();
        let err = resolver.validate(&a, 0, &a, 1).unwrap_err();
        assert!(matches!(err, PolyformError::IncompatibleEdge(_)));
    }

    #[test]
    fn test_edge_index_checked() {
        let resolver = AttachmentResolver::default();
        let (a, b) = pair();
        assert_eq!(
            resolver.validate(&a, 3, &b, 0).unwrap_err(),
            PolyformError::EdgeOutOfRange { polygon: 0, edge: 3 }
        );
    }
}
