//! Regular-polygon geometry under the unit edge length.
//!
//! All functions validate the side count first and fail with
//! [`PolyformError::InvalidSideCount`] outside `3..=20`. Rings lie in the XY
//! plane, counter-clockwise, centred on the origin, with the first edge
//! (vertex 0 → vertex 1) horizontal at the bottom.

use std::f64::consts::PI;

use glam::DVec3;

use crate::{PolyformError, Result, MAX_SIDES, MIN_SIDES, UNIT_EDGE_LENGTH};

/// Allowed deviation from the unit edge length
pub const EDGE_TOLERANCE: f64 = 1e-3;

/// Validate a side count
pub fn check_sides(sides: u32) -> Result<u32> {
    if (MIN_SIDES..=MAX_SIDES).contains(&sides) {
        Ok(sides)
    } else {
        Err(PolyformError::InvalidSideCount(sides))
    }
}

/// Circumradius `1 / (2·sin(π/n))`
pub fn circumradius(sides: u32) -> Result<f64> {
    let n = check_sides(sides)? as f64;
    Ok(UNIT_EDGE_LENGTH / (2.0 * (PI / n).sin()))
}

/// Distance from centre to edge midpoint
pub fn apothem(sides: u32) -> Result<f64> {
    let n = check_sides(sides)? as f64;
    Ok(UNIT_EDGE_LENGTH / (2.0 * (PI / n).tan()))
}

/// Internal angle `(n−2)·π/n`
pub fn internal_angle(sides: u32) -> Result<f64> {
    let n = check_sides(sides)? as f64;
    Ok((n - 2.0) * PI / n)
}

/// External angle `2π/n`
pub fn external_angle(sides: u32) -> Result<f64> {
    let n = check_sides(sides)? as f64;
    Ok(2.0 * PI / n)
}

/// Ordered vertex ring with consecutive points one unit apart
pub fn vertex_ring(sides: u32) -> Result<Vec<DVec3>> {
    let radius = circumradius(sides)?;
    let step = external_angle(sides)?;
    let start = -PI / 2.0 - step / 2.0;
    Ok((0..sides)
        .map(|k| {
            let theta = start + step * k as f64;
            DVec3::new(radius * theta.cos(), radius * theta.sin(), 0.0)
        })
        .collect())
}

/// Local fold angle between polygons with `a` and `b` sides:
/// `π − (internal(a) + internal(b)) / 2`.
///
/// The catalog's authoritative table takes precedence when reachable; this is
/// the fallback.
pub fn fold_angle(a: u32, b: u32) -> Result<f64> {
    Ok(PI - (internal_angle(a)? + internal_angle(b)?) / 2.0)
}

/// True when every closing pair of `ring` is unit distance apart
pub fn ring_has_unit_edges(ring: &[DVec3]) -> bool {
    if ring.len() < MIN_SIDES as usize {
        return false;
    }
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .all(|(a, b)| (a.distance(*b) - UNIT_EDGE_LENGTH).abs() <= EDGE_TOLERANCE)
}

pub fn ring_to_arrays(ring: &[DVec3]) -> Vec<[f64; 3]> {
    ring.iter().map(|p| p.to_array()).collect()
}

pub fn ring_from_arrays(points: &[[f64; 3]]) -> Vec<DVec3> {
    points.iter().map(|p| DVec3::from_array(*p)).collect()
}

/// Closest point on segment `a`–`b` to `p`, clamped to the segment
pub fn closest_point_on_segment(p: DVec3, a: DVec3, b: DVec3) -> DVec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f64::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Distance from `p` to segment `a`–`b`
pub fn point_segment_distance(p: DVec3, a: DVec3, b: DVec3) -> f64 {
    p.distance(closest_point_on_segment(p, a, b))
}
