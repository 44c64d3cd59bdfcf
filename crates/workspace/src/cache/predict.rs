//! Which symbols a warming pass should compute next

use std::collections::HashSet;

use shared::{symbol, ReferenceSet};

use crate::state::WorkspaceSnapshot;

/// Candidate symbols for one warming pass, in priority order.
///
/// 1. every primitive symbol, by ascending side count
/// 2. the most recently modified chain
/// 3. for each open side count `s` (ascending) and each primitive `p`, the
///    pair `[s, p]` when the reference set knows it
/// 4. the remaining chains of the snapshot, by root
///
/// Duplicates and symbols for which `is_settled` holds are dropped before the
/// list is cut to `max_candidates`.
pub fn predict_candidates(
    snapshot: &WorkspaceSnapshot,
    reference: &ReferenceSet,
    max_candidates: usize,
    is_settled: impl Fn(&str) -> bool,
) -> Vec<String> {
    let primitives = symbol::primitive_symbols().map(|(_, sym)| sym);
    let last = snapshot.last_modified_symbol.clone();
    let pairs = snapshot.open_side_counts.iter().flat_map(|&open| {
        symbol::primitive_symbols()
            .filter_map(move |(p, _)| symbol::pair_symbol(open, p).ok())
            .filter(|sym| reference.contains(sym))
    });
    let chains = snapshot.chains.iter().map(|chain| chain.symbol.clone());

    let mut seen = HashSet::new();
    primitives
        .chain(last)
        .chain(pairs)
        .chain(chains)
        .filter(|sym| seen.insert(sym.clone()))
        .filter(|sym| !is_settled(sym))
        .take(max_candidates)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Chain;

    fn snapshot(open: &[u32], last: Option<&str>) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            open_side_counts: open.to_vec(),
            last_modified_symbol: last.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_primitives_come_first() {
        let reference = ReferenceSet::builtin();
        let got = predict_candidates(&snapshot(&[3], Some("A3")), &reference, 20, |_| false);
        assert_eq!(got.len(), 20);
        assert_eq!(got[0], "A");
        assert_eq!(got[17], "R");
        assert_eq!(got[18], "A3");
        // first reference pair for an open triangle
        assert_eq!(got[19], "A2");
    }

    #[test]
    fn test_settled_symbols_are_skipped() {
        let reference = ReferenceSet::builtin();
        let got = predict_candidates(&snapshot(&[4], Some("BA")), &reference, 20, |s| {
            symbol::is_primitive(s)
        });
        assert_eq!(got[0], "BA");
        // pairs with a square, only those the reference set holds, no repeat of BA
        assert_eq!(&got[1..], &["B2", "BC", "BD", "BF", "BH", "BJ"]);
    }

    #[test]
    fn test_cap_is_respected() {
        let reference = ReferenceSet::builtin();
        let got = predict_candidates(&snapshot(&[3, 4, 5], None), &reference, 5, |_| false);
        assert_eq!(got, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_chain_symbols_fill_remaining_slots() {
        let reference = ReferenceSet::builtin();
        let mut snap = snapshot(&[], None);
        snap.chains.push(Chain {
            root: 0,
            members: vec![0, 1, 2],
            sides: vec![7, 9, 7],
            symbol: "EGE".into(),
        });
        let got = predict_candidates(&snap, &reference, 20, symbol::is_primitive);
        assert_eq!(got, vec!["EGE"]);
    }

    #[test]
    fn test_deterministic() {
        let reference = ReferenceSet::builtin();
        let snap = snapshot(&[6, 3], Some("DA"));
        let first = predict_candidates(&snap, &reference, 20, |_| false);
        let second = predict_candidates(&snap, &reference, 20, |_| false);
        assert_eq!(first, second);
    }
}
