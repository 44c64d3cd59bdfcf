//! Read-only view of the workspace handed to the predictive cache

use serde::{Deserialize, Serialize};

use super::{Chain, WorkspaceState};

/// Owned copy of the parts of the workspace that drive prediction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    pub version: u64,
    pub chain_version: u64,
    pub chains: Vec<Chain>,
    /// Distinct side counts of polygons that still have an open edge, ascending
    pub open_side_counts: Vec<u32>,
    pub last_modified_symbol: Option<String>,
}

impl WorkspaceState {
    pub fn snapshot(&self) -> WorkspaceSnapshot {
        let mut open_side_counts: Vec<u32> = self
            .polygons()
            .filter(|p| p.open_edges().next().is_some())
            .map(|p| p.sides)
            .collect();
        open_side_counts.sort_unstable();
        open_side_counts.dedup();

        WorkspaceSnapshot {
            version: self.version(),
            chain_version: self.chain_version(),
            chains: self.chains().to_vec(),
            open_side_counts,
            last_modified_symbol: self.last_modified_symbol(),
        }
    }
}
