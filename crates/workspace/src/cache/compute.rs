//! Producing attachment data for a symbol off the render path

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use shared::{geometry, symbol, AttachmentData, FoldSource, ReferenceSet, Result};

use crate::catalog::Catalog;

use super::{CacheEvent, WarmReport};

/// Catalog answers remembered for the length of one pass
#[derive(Debug, Default)]
pub(crate) struct PassContext {
    folds: HashMap<(u32, u32), Option<f64>>,
    /// Set after the first failed call; the rest of the pass stays local
    unreachable: bool,
}

impl PassContext {
    async fn fold_angle<C: Catalog>(
        &mut self,
        catalog: &C,
        a: u32,
        b: u32,
        timeout: Duration,
    ) -> Option<f64> {
        if !catalog.is_online() || self.unreachable {
            return None;
        }
        if let Some(known) = self.folds.get(&(a, b)) {
            return *known;
        }
        let answer = match tokio::time::timeout(timeout, catalog.fold_angle(a, b)).await {
            Ok(Ok(angle)) => Some(angle),
            Ok(Err(e)) => {
                tracing::debug!(a, b, "no authoritative fold: {e}");
                None
            }
            Err(_) => {
                tracing::warn!(a, b, ?timeout, "catalog timed out, using local folds");
                self.unreachable = true;
                None
            }
        };
        self.folds.insert((a, b), answer);
        answer
    }

    async fn primitive_ring<C: Catalog>(
        &mut self,
        catalog: &C,
        sides: u32,
        timeout: Duration,
    ) -> Option<Vec<[f64; 3]>> {
        if !catalog.is_online() || self.unreachable {
            return None;
        }
        let geometry = match tokio::time::timeout(timeout, catalog.primitive_geometry(sides)).await {
            Ok(Ok(geometry)) => geometry,
            Ok(Err(e)) => {
                tracing::debug!(sides, "no catalog ring: {e}");
                return None;
            }
            Err(_) => {
                tracing::warn!(sides, ?timeout, "catalog timed out, using kernel ring");
                self.unreachable = true;
                return None;
            }
        };
        let ring = geometry::ring_from_arrays(&geometry.vertices);
        if geometry.sides != sides
            || ring.len() != sides as usize
            || !geometry::ring_has_unit_edges(&ring)
        {
            tracing::warn!(sides, "catalog ring breaks the unit-edge invariant, ignoring it");
            return None;
        }
        Some(geometry.vertices)
    }
}

/// Compute an entry from the kernel, preferring catalog folds per pair
pub(crate) async fn compute_entry<C: Catalog>(
    sides: Vec<u32>,
    catalog: &C,
    timeout: Duration,
    ctx: &mut PassContext,
) -> Result<AttachmentData> {
    let mut folds = Vec::with_capacity(sides.len().saturating_sub(1));
    let mut authoritative = true;
    for pair in sides.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        match ctx.fold_angle(catalog, a, b, timeout).await {
            Some(angle) => folds.push(angle),
            None => {
                authoritative = false;
                folds.push(geometry::fold_angle(a, b)?);
            }
        }
    }

    let ring = match sides.as_slice() {
        [n] => {
            geometry::check_sides(*n)?;
            let ring = ctx.primitive_ring(catalog, *n, timeout).await;
            authoritative = ring.is_some();
            ring
        }
        _ => None,
    };

    let source = if authoritative {
        FoldSource::Authoritative
    } else {
        FoldSource::Fallback
    };
    let mut entry = AttachmentData::from_parts(sides, folds, source)?;
    entry.primitive_ring = ring;
    Ok(entry)
}

/// Reference entry when one exists, otherwise a fresh computation
pub(crate) async fn resolve_symbol<C: Catalog>(
    symbol: &str,
    reference: &ReferenceSet,
    catalog: &C,
    timeout: Duration,
    ctx: &mut PassContext,
) -> Result<AttachmentData> {
    let sides = symbol::decode(symbol)?;
    match reference.get(symbol) {
        Some(known) => {
            let mut entry = known.clone();
            if let [n] = sides.as_slice() {
                entry.primitive_ring = ctx.primitive_ring(catalog, *n, timeout).await;
            }
            Ok(entry)
        }
        None => compute_entry(sides, catalog, timeout, ctx).await,
    }
}

/// One warming pass: resolve every candidate and publish it on `tx`
pub(crate) async fn run_pass<C: Catalog>(
    candidates: Vec<String>,
    reference: &ReferenceSet,
    catalog: &C,
    timeout: Duration,
    tx: &UnboundedSender<CacheEvent>,
) -> WarmReport {
    let mut report = WarmReport {
        candidates: candidates.len(),
        ..Default::default()
    };
    let mut ctx = PassContext::default();

    for symbol in candidates {
        match resolve_symbol(&symbol, reference, catalog, timeout, &mut ctx).await {
            Ok(entry) => {
                match entry.fold_source {
                    FoldSource::Reference => report.reference_hits += 1,
                    FoldSource::Fallback => report.fallbacks += 1,
                    FoldSource::Authoritative => {}
                }
                if tx.send(CacheEvent::Published(Arc::new(entry))).is_err() {
                    // cache is gone
                    break;
                }
                report.published += 1;
            }
            Err(e) => {
                tracing::warn!(%symbol, "cannot warm symbol: {e}");
                report.failed += 1;
            }
        }
    }

    tracing::debug!(
        candidates = report.candidates,
        published = report.published,
        fallbacks = report.fallbacks,
        "warming pass finished"
    );
    report
}
