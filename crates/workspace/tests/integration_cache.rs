//! Integration tests for the predictive cache: warming, coalescing, catalog
//! fallbacks and chain registration.

use std::f64::consts::PI;
use std::time::{Duration, Instant};

use polyform_lib::fixtures::{registration_counts, FailingCatalog, SlowCatalog, StaticCatalog};
use polyform_lib::harness::TestHarness;
use polyform_lib::settings::AppSettings;
use polyform_lib::state::Placement;
use shared::{geometry, symbol, FoldSource, PolygonId};

/// Triangle, square and pentagon in one chain, built without warming
fn three_chain<C: polyform_lib::catalog::Catalog>(h: &mut TestHarness<C>) -> [PolygonId; 3] {
    let ws = h.session.workspace_mut();
    let a = ws.add_polygon(3, Placement::default()).unwrap();
    let b = ws.add_polygon(4, Placement::default()).unwrap();
    let c = ws.add_polygon(5, Placement::default()).unwrap();
    ws.attach(b, 2, c, 0, None).unwrap();
    ws.attach(a, 0, b, 0, None).unwrap();
    [a, b, c]
}

#[test]
fn test_poll_miss_returns_immediately() {
    let mut h = TestHarness::with_catalog(SlowCatalog::new(Duration::from_secs(5)));
    h.add(7);
    assert!(h.session.warm());

    let start = Instant::now();
    for _ in 0..1000 {
        assert!(h.session.poll("AGBR").is_none());
    }
    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(h.stats().misses, 1000);
}

#[test]
fn test_square_primitive_hit_after_one_warm() {
    let mut h = TestHarness::new();
    h.add(4);
    let report = h.warm_and_wait().unwrap();
    assert!(report.published >= 18);

    let data = h.session.poll("B").unwrap();
    assert_eq!(data.sides, vec![4]);
    assert!(data.fold_angles.is_empty());
    let stats = h.stats();
    assert_eq!((stats.hits, stats.misses), (1, 0));
}

#[test]
fn test_frame_placeholders_fill_in() {
    let mut h = TestHarness::new();
    let a = h.add(3);
    let b = h.add(3);
    h.session.workspace_mut().attach(a, 0, b, 0, None).unwrap();
    h.add(9);

    // first frame starts the pass and cannot have its results yet
    let first = h.frame();
    assert_eq!(first.chains.len(), 1);
    assert_eq!(first.polygons.len(), 3);
    h.wait_for_warm().unwrap();

    let second = h.frame();
    assert!(second.is_complete(), "{} placeholders", second.placeholders);
    let chain = second.chain("A2").unwrap();
    assert_eq!(chain.data.as_ref().unwrap().sides, vec![3, 3]);
    let loner = second.polygon(2).unwrap();
    assert_eq!(loner.vertices.len(), 9);
    assert!(loner.open.iter().all(|open| *open));
}

#[test]
fn test_second_warm_leaves_entries_unchanged() {
    let mut h = TestHarness::with_catalog(StaticCatalog::default());
    three_chain(&mut h);
    h.warm_and_wait().unwrap();

    let before: Vec<_> = ["A", "B", "C", "ABC"]
        .iter()
        .map(|sym| h.session.cache().peek(sym).cloned().unwrap())
        .collect();

    h.session.warm();
    h.wait_for_warm();
    for entry in before {
        let now = h.session.cache().peek(&entry.symbol).unwrap();
        assert_eq!(now.as_ref(), entry.as_ref());
    }
}

#[test]
fn test_catalog_folds_are_authoritative() {
    let mut h = TestHarness::with_catalog(StaticCatalog::default());
    three_chain(&mut h);
    h.warm_and_wait().unwrap();

    let entry = h.session.poll("ABC").unwrap();
    assert_eq!(entry.fold_source, FoldSource::Authoritative);
    assert_eq!(symbol::decode(&entry.symbol).unwrap(), vec![3, 4, 5]);
    assert!((entry.fold_angles[0] - StaticCatalog::fold_for(3, 4)).abs() < 1e-12);
    assert!((entry.fold_angles[1] - StaticCatalog::fold_for(4, 5)).abs() < 1e-12);
    assert!((entry.fold_angles[1] - PI / 9.0).abs() < 1e-12);
}

#[test]
fn test_broken_catalog_ring_is_ignored() {
    let mut h = TestHarness::with_catalog(StaticCatalog::default().with_broken_rings());
    h.add(6);
    h.warm_and_wait().unwrap();

    let hexagon = h.session.poll("D").unwrap();
    assert!(hexagon.primitive_ring.is_none());
    assert_eq!(hexagon.sides, vec![6]);
    assert_eq!(hexagon.fold_source, FoldSource::Reference);
}

#[test]
fn test_unreachable_catalog_falls_back_quickly() {
    let mut settings = AppSettings::default();
    settings.catalog.timeout_ms = 20;
    let mut h = TestHarness::with_settings(SlowCatalog::new(Duration::from_millis(400)), settings);
    three_chain(&mut h);

    let start = Instant::now();
    let report = h.warm_and_wait().unwrap();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(report.fallbacks >= 1);

    let entry = h.session.poll("ABC").unwrap();
    assert_eq!(entry.fold_source, FoldSource::Fallback);
    assert_eq!(entry.fold_angles[0], geometry::fold_angle(3, 4).unwrap());
    assert_eq!(entry.fold_angles[1], geometry::fold_angle(4, 5).unwrap());
}

#[test]
fn test_concurrent_warms_coalesce() {
    let mut settings = AppSettings::default();
    settings.catalog.timeout_ms = 1000;
    let mut h = TestHarness::with_settings(SlowCatalog::new(Duration::from_millis(10)), settings);
    h.add(5);

    assert!(h.session.warm());
    assert!(!h.session.warm());
    assert!(!h.session.warm());
    assert!(h.session.cache().is_pending());
    let stats = h.stats();
    assert_eq!((stats.warm_passes, stats.skipped_warms), (1, 2));

    h.wait_for_warm().unwrap();
    assert!(!h.session.cache().is_in_flight());
    // the skipped trigger is replayed on the next frame
    h.frame();
    assert!(!h.session.cache().is_pending());
    assert!(h.stats().warm_passes <= 2);
}

#[test]
fn test_capacity_evicts_oldest() {
    let mut settings = AppSettings::default();
    settings.cache.capacity = 4;
    let mut h = TestHarness::with_settings(polyform_lib::catalog::OfflineCatalog, settings);
    h.add(3);
    let report = h.warm_and_wait().unwrap();

    let stats = h.stats();
    assert_eq!(stats.entries, 4);
    assert_eq!(stats.evictions, report.published as u64 - 4);
    // primitives are published first and evicted first
    assert!(h.session.cache().peek("A").is_none());
}

#[test]
fn test_new_chains_are_registered_once() {
    let mut h = TestHarness::with_catalog(StaticCatalog::default());
    let a = h.add(3);
    let b = h.add(4);
    let c = h.add(4);
    h.attach(a, 0, b, 0, None).unwrap();
    h.attach(b, 2, c, 0, None).unwrap();
    for _ in 0..5 {
        h.frame();
    }

    let settled = h.wait_until(Duration::from_secs(5), |s| s.stats().registered >= 2);
    assert!(settled);
    let counts = registration_counts(h.session.cache().catalog());
    assert_eq!(counts.get("AB"), Some(&1));
    assert_eq!(counts.get("AB2"), Some(&1));
    let request = h
        .session
        .cache()
        .catalog()
        .registrations()
        .into_iter()
        .find(|r| r.symbol == "AB2")
        .unwrap();
    assert_eq!(request.sides, vec![3, 4, 4]);
    assert!(request.source.starts_with("workspace:"));
}

#[test]
fn test_failed_registration_is_counted() {
    let mut h = TestHarness::with_catalog(FailingCatalog);
    let a = h.add(3);
    let b = h.add(3);
    h.attach(a, 0, b, 0, None).unwrap();

    assert!(h.wait_until(Duration::from_secs(5), |s| s.stats().registration_failures >= 1));
    assert_eq!(h.stats().registered, 0);
    // warming still produced local data
    h.wait_for_warm();
    assert_eq!(h.session.poll("A2").unwrap().fold_source, FoldSource::Reference);
}

#[test]
fn test_offline_catalog_never_registers() {
    let mut h = TestHarness::new();
    let a = h.add(3);
    let b = h.add(3);
    h.attach(a, 0, b, 0, None).unwrap();
    h.wait_for_warm();
    std::thread::sleep(Duration::from_millis(20));
    h.session.cache_mut().pump();
    let stats = h.stats();
    assert_eq!((stats.registered, stats.registration_failures), (0, 0));
}
