//! In-memory registry of chains reported by workspaces

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use shared::{RegisterChainRequest, RegisterChainResponse};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRecord {
    pub id: String,
    pub symbol: String,
    pub sides: Vec<u32>,
    pub tier: u8,
    /// Source of the first registration
    pub source: String,
    pub registrations: u32,
}

/// Registered chains keyed by canonical symbol
#[derive(Debug, Default)]
pub struct ChainStore {
    chains: RwLock<HashMap<String, ChainRecord>>,
}

impl ChainStore {
    /// Record `request`; a symbol seen before keeps its id
    pub async fn register(&self, request: RegisterChainRequest) -> RegisterChainResponse {
        let mut chains = self.chains.write().await;
        if let Some(record) = chains.get_mut(&request.symbol) {
            record.registrations += 1;
            return RegisterChainResponse {
                id: record.id.clone(),
                symbol: record.symbol.clone(),
                created: false,
            };
        }

        let id = uuid::Uuid::new_v4().to_string();
        tracing::info!(symbol = %request.symbol, %id, source = %request.source, "chain registered");
        chains.insert(
            request.symbol.clone(),
            ChainRecord {
                id: id.clone(),
                symbol: request.symbol.clone(),
                sides: request.sides,
                tier: request.tier,
                source: request.source,
                registrations: 1,
            },
        );
        RegisterChainResponse {
            id,
            symbol: request.symbol,
            created: true,
        }
    }

    /// All records, by symbol
    pub async fn list(&self) -> Vec<ChainRecord> {
        let mut records: Vec<ChainRecord> = self.chains.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        records
    }
}
