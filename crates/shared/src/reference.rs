//! Preloaded reference set of known symbols and their attachment data.

use std::collections::BTreeMap;

use crate::{fold_table, geometry, symbol, AttachmentData, FoldSource, Result};

/// Side counts whose pairings are precomputed in the built-in set
pub const COMMON_SIDES: [u32; 7] = [3, 4, 5, 6, 8, 10, 12];

/// Symbol → attachment data lookup table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSet {
    entries: BTreeMap<String, AttachmentData>,
}

/// Fold angle for a pair: authoritative table first, local formula otherwise
pub fn reference_fold_angle(a: u32, b: u32) -> Result<f64> {
    match fold_table::authoritative_fold_angle(a, b) {
        Some(angle) => {
            geometry::check_sides(a)?;
            geometry::check_sides(b)?;
            Ok(angle)
        }
        None => geometry::fold_angle(a, b),
    }
}

/// Reference attachment data for a side sequence
pub fn reference_entry(sides: Vec<u32>) -> Result<AttachmentData> {
    let folds = sides
        .windows(2)
        .map(|w| reference_fold_angle(w[0], w[1]))
        .collect::<Result<Vec<_>>>()?;
    AttachmentData::from_parts(sides, folds, FoldSource::Reference)
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primitives, common pairs, short triangle clusters and square chains
    pub fn builtin() -> Self {
        let mut sequences: Vec<Vec<u32>> = symbol::primitive_symbols().map(|(n, _)| vec![n]).collect();
        for a in COMMON_SIDES {
            for b in COMMON_SIDES {
                sequences.push(vec![a, b]);
            }
        }
        for (a, b) in fold_table::known_pairs() {
            sequences.push(vec![a, b]);
            sequences.push(vec![b, a]);
        }
        sequences.extend((3..=5).map(|len| vec![3; len]));
        sequences.extend((3..=6).map(|len| vec![4; len]));

        let mut set = Self::new();
        for sides in sequences {
            // every sequence above is built from valid side counts
            if let Ok(entry) = reference_entry(sides) {
                set.insert(entry);
            }
        }
        set
    }

    pub fn insert(&mut self, entry: AttachmentData) {
        self.entries.insert(entry.symbol.clone(), entry);
    }

    pub fn get(&self, symbol: &str) -> Option<&AttachmentData> {
        self.entries.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttachmentData> {
        self.entries.values()
    }

    /// Parse a JSON array of entries, re-validating every symbol
    pub fn from_json(json: &str) -> std::result::Result<Self, String> {
        let entries: Vec<AttachmentData> =
            serde_json::from_str(json).map_err(|e| format!("JSON parse error: {e}"))?;
        let mut set = Self::new();
        for entry in entries {
            let sides = symbol::decode(&entry.symbol).map_err(|e| e.to_string())?;
            if sides != entry.sides {
                return Err(format!(
                    "symbol {} does not match sides {:?}",
                    entry.symbol, entry.sides
                ));
            }
            set.insert(entry);
        }
        Ok(set)
    }

    pub fn to_json(&self) -> String {
        let entries: Vec<&AttachmentData> = self.entries.values().collect();
        serde_json::to_string_pretty(&entries).unwrap_or_default()
    }
}
