//! Connected components of the attachment graph

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use shared::{symbol, PolygonId};

use crate::state::polygon::Polygon;

/// A maximal set of attached polygons, listed in traversal order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Smallest polygon id in the component
    pub root: PolygonId,
    pub members: Vec<PolygonId>,
    /// Side count of each member, parallel to `members`
    pub sides: Vec<u32>,
    pub symbol: String,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: PolygonId) -> bool {
        self.members.contains(&id)
    }
}

/// Every chain of the arena, ordered by root.
///
/// Roots are the smallest id of each component; from a root the traversal is
/// breadth-first, expanding each polygon's links in ascending edge order.
/// Polygons without links form no chain.
pub fn compute_chains(polygons: &[Option<Polygon>]) -> Vec<Chain> {
    let mut visited = vec![false; polygons.len()];
    let mut chains = Vec::new();

    for (index, slot) in polygons.iter().enumerate() {
        let Some(root) = slot else { continue };
        if visited[index] || root.links().next().is_none() {
            continue;
        }

        let mut members = Vec::new();
        let mut queue = VecDeque::from([root.id]);
        visited[index] = true;

        while let Some(id) = queue.pop_front() {
            let Some(poly) = polygons.get(id as usize).and_then(Option::as_ref) else {
                continue;
            };
            members.push(poly);
            for (_, link) in poly.links() {
                let partner = link.partner as usize;
                if partner < visited.len() && !visited[partner] {
                    visited[partner] = true;
                    queue.push_back(link.partner);
                }
            }
        }

        let sides: Vec<u32> = members.iter().map(|p| p.sides).collect();
        // live polygons are capped at the longest encodable chain
        if let Ok(symbol) = symbol::encode(&sides) {
            chains.push(Chain {
                root: root.id,
                members: members.iter().map(|p| p.id).collect(),
                sides,
                symbol,
            });
        }
    }
    chains
}
