//! Workspace manager: polygon arena, attachment graph and chains.

mod chains;
mod persistence;
mod snapshot;

use std::time::{SystemTime, UNIX_EPOCH};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use shared::{reference, symbol, PolyformError, PolygonId, Result};

use crate::attach::{self, AttachmentResolver, Candidate};
use crate::state::polygon::{Placement, Polygon, PolygonState};

pub use chains::{compute_chains, Chain};
pub use persistence::{LinkRecord, PolygonRecord, WorkspaceDocument};
pub use snapshot::WorkspaceSnapshot;

/// Result of a successful attach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachReport {
    pub fold_angle: f64,
    pub score: f64,
    /// Symbol of the chain that now holds both polygons
    pub symbol: String,
    /// Polygons repositioned to close the joint
    pub moved: Vec<PolygonId>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Both polygons of the arena mutably; `a` and `b` must differ
fn pair_mut(
    polygons: &mut [Option<Polygon>],
    a: PolygonId,
    b: PolygonId,
) -> Result<(&mut Polygon, &mut Polygon)> {
    let (ia, ib) = (a as usize, b as usize);
    if ia == ib {
        return Err(PolyformError::IncompatibleEdge(format!(
            "polygon {a} cannot attach to itself"
        )));
    }
    let (lo, hi) = (ia.min(ib), ia.max(ib));
    if hi >= polygons.len() {
        return Err(PolyformError::UnknownPolygon(hi as PolygonId));
    }
    let (left, right) = polygons.split_at_mut(hi);
    let low = left[lo]
        .as_mut()
        .ok_or(PolyformError::UnknownPolygon(lo as PolygonId))?;
    let high = right[0]
        .as_mut()
        .ok_or(PolyformError::UnknownPolygon(hi as PolygonId))?;
    Ok(if ia < ib { (low, high) } else { (high, low) })
}

/// Owns every placed polygon. Ids index the arena and are never reused.
#[derive(Debug, Default)]
pub struct WorkspaceState {
    polygons: Vec<Option<Polygon>>,
    live: usize,
    chains: Vec<Chain>,
    /// Chain index per arena slot
    membership: Vec<Option<usize>>,
    resolver: AttachmentResolver,
    /// Bumped on every mutation
    version: u64,
    /// Bumped whenever the chain set changes
    chain_version: u64,
    last_modified: Option<PolygonId>,
}

impl WorkspaceState {
    pub fn new(resolver: AttachmentResolver) -> Self {
        Self {
            resolver,
            ..Default::default()
        }
    }

    pub fn resolver(&self) -> &AttachmentResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut AttachmentResolver {
        &mut self.resolver
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn chain_version(&self) -> u64 {
        self.chain_version
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn polygon(&self, id: PolygonId) -> Option<&Polygon> {
        self.polygons.get(id as usize).and_then(Option::as_ref)
    }

    fn get(&self, id: PolygonId) -> Result<&Polygon> {
        self.polygon(id).ok_or(PolyformError::UnknownPolygon(id))
    }

    fn get_mut(&mut self, id: PolygonId) -> Result<&mut Polygon> {
        self.polygons
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or(PolyformError::UnknownPolygon(id))
    }

    /// Live polygons in id order
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> + '_ {
        self.polygons.iter().filter_map(Option::as_ref)
    }

    pub fn polygon_state(&self, id: PolygonId) -> Option<PolygonState> {
        self.polygon(id).map(Polygon::state)
    }

    pub fn add_polygon(&mut self, sides: u32, placement: Placement) -> Result<PolygonId> {
        if self.live >= symbol::MAX_CHAIN_LENGTH {
            return Err(PolyformError::WorkspaceFull(self.live));
        }
        let id = self.polygons.len() as PolygonId;
        let polygon = Polygon::new(id, sides, placement)?;
        self.polygons.push(Some(polygon));
        self.membership.push(None);
        self.live += 1;
        self.version += 1;
        self.last_modified = Some(id);
        tracing::debug!(id, sides, "polygon added");
        Ok(id)
    }

    /// Remove a polygon, opening every edge that was attached to it.
    ///
    /// Chains are recomputed from scratch, so a chain may split in two.
    pub fn remove_polygon(&mut self, id: PolygonId) -> Result<Polygon> {
        let polygon = self
            .polygons
            .get_mut(id as usize)
            .and_then(Option::take)
            .ok_or(PolyformError::UnknownPolygon(id))?;

        let partners: Vec<PolygonId> = polygon.links().map(|(_, link)| link.partner).collect();
        for partner in &partners {
            if let Ok(p) = self.get_mut(*partner) {
                p.release_partner(id);
            }
        }

        self.live -= 1;
        self.version += 1;
        self.last_modified = match partners.first() {
            Some(&p) => Some(p),
            None if self.last_modified == Some(id) => None,
            None => self.last_modified,
        };
        self.recompute_chains();
        tracing::debug!(id, released = partners.len(), "polygon removed");
        Ok(polygon)
    }

    /// Attach `a.edge_a` to `b.edge_b`.
    ///
    /// Without an explicit fold the reference fold for the pair is used. When
    /// the polygons belong to different chains, `b`'s whole chain is moved
    /// rigidly so the two edges coincide; inside one chain only the link is
    /// recorded. A rejected attach leaves the workspace untouched.
    pub fn attach(
        &mut self,
        a: PolygonId,
        edge_a: usize,
        b: PolygonId,
        edge_b: usize,
        fold_angle: Option<f64>,
    ) -> Result<AttachReport> {
        let (pa, pb) = (self.get(a)?, self.get(b)?);
        self.resolver.validate(pa, edge_a, pb, edge_b)?;

        let fold = match fold_angle {
            Some(fold) => fold,
            None => reference::reference_fold_angle(pa.sides, pb.sides)?,
        };
        self.resolver.check_fold(fold)?;
        let score = attach::attachment_score(pa.sides, pb.sides, fold)?;

        let same_chain = matches!(
            (self.chain_index(a), self.chain_index(b)),
            (Some(x), Some(y)) if x == y
        );
        let moved = if same_chain {
            Vec::new()
        } else {
            let transform = attach::compute_transform(&pb.edge(edge_b)?, &pa.edge(edge_a)?, fold);
            let component = self.component(b);
            for id in &component {
                self.get_mut(*id)?.transform(&transform);
            }
            component
        };

        let (pa, pb) = pair_mut(&mut self.polygons, a, b)?;
        self.resolver
            .apply_attachment(pa, edge_a, pb, edge_b, fold, now_ms())?;

        self.version += 1;
        self.last_modified = Some(a);
        self.recompute_chains();

        let symbol = self
            .chain_of(a)
            .map(|chain| chain.symbol.clone())
            .unwrap_or_default();
        tracing::debug!(a, edge_a, b, edge_b, fold, %symbol, "attached");
        Ok(AttachReport {
            fold_angle: fold,
            score,
            symbol,
            moved,
        })
    }

    /// Translate a polygon together with the rest of its chain
    pub fn move_polygon(&mut self, id: PolygonId, delta: DVec3) -> Result<Vec<PolygonId>> {
        self.get(id)?;
        if !delta.is_finite() {
            return Err(PolyformError::InvalidPlacement(format!("move by {delta}")));
        }
        let component = self.component(id);
        for member in &component {
            self.get_mut(*member)?.translate(delta);
        }
        self.version += 1;
        self.last_modified = Some(id);
        Ok(component)
    }

    fn chain_index(&self, id: PolygonId) -> Option<usize> {
        self.membership.get(id as usize).copied().flatten()
    }

    pub fn chain_of(&self, id: PolygonId) -> Option<&Chain> {
        self.chain_index(id).and_then(|i| self.chains.get(i))
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    /// Members of `id`'s chain, or just `id` when it is unattached
    fn component(&self, id: PolygonId) -> Vec<PolygonId> {
        self.chain_of(id)
            .map(|chain| chain.members.clone())
            .unwrap_or_else(|| vec![id])
    }

    /// Every `(polygon, edge)` still free to attach
    pub fn open_edges(&self) -> Vec<(PolygonId, usize)> {
        self.polygons()
            .flat_map(|p| p.open_edges().map(move |e| (p.id, e)))
            .collect()
    }

    /// Open edges near `point`, optionally ignoring one polygon's chain
    pub fn find_candidates(&self, point: DVec3, exclude: Option<PolygonId>) -> Vec<Candidate> {
        let excluded = exclude.map(|id| self.component(id)).unwrap_or_default();
        self.resolver.find_candidates(
            point,
            self.polygons().filter(|p| !excluded.contains(&p.id)),
        )
    }

    /// Symbol of the most recently touched chain, or of the lone polygon
    pub fn last_modified_symbol(&self) -> Option<String> {
        let id = self.last_modified?;
        match self.chain_of(id) {
            Some(chain) => Some(chain.symbol.clone()),
            None => symbol::primitive_symbol(self.polygon(id)?.sides).ok(),
        }
    }

    fn recompute_chains(&mut self) {
        let chains = compute_chains(&self.polygons);
        let mut membership = vec![None; self.polygons.len()];
        for (index, chain) in chains.iter().enumerate() {
            for member in &chain.members {
                membership[*member as usize] = Some(index);
            }
        }
        if chains != self.chains {
            self.chain_version += 1;
            tracing::debug!(
                chains = chains.len(),
                chain_version = self.chain_version,
                "chain set changed"
            );
        }
        self.chains = chains;
        self.membership = membership;
    }
}
