//! Authoritative fold angles for edge pairs that occur on convex uniform solids.
//!
//! Stored as the cosine of the dihedral angle; the fold angle about the shared
//! edge is `π − dihedral`. Pairs are unordered.

use std::f64::consts::PI;

/// `(lo, hi, cos(dihedral), solid)` with `lo <= hi`
const DIHEDRALS: &[(u32, u32, f64, &str)] = &[
    (3, 3, 1.0 / 3.0, "tetrahedron"),
    (4, 4, 0.0, "cube"),
    (5, 5, -0.447_213_595_499_957_9, "dodecahedron"),
    (3, 4, 0.577_350_269_189_625_8, "square_pyramid"),
    (3, 5, -0.794_654_472_291_766_1, "icosidodecahedron"),
    (3, 6, -1.0 / 3.0, "truncated_tetrahedron"),
    (6, 6, 1.0 / 3.0, "truncated_tetrahedron"),
    (4, 6, -0.577_350_269_189_625_8, "truncated_octahedron"),
    (3, 8, -0.577_350_269_189_625_8, "truncated_cube"),
    (8, 8, 0.0, "truncated_cube"),
    (5, 6, -0.794_654_472_291_766_1, "truncated_icosahedron"),
    (3, 10, -0.794_654_472_291_766_1, "truncated_dodecahedron"),
    (10, 10, -0.447_213_595_499_957_9, "truncated_dodecahedron"),
];

fn ordered(a: u32, b: u32) -> (u32, u32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Fold angle for the pair when the table knows it
pub fn authoritative_fold_angle(a: u32, b: u32) -> Option<f64> {
    let (lo, hi) = ordered(a, b);
    DIHEDRALS
        .iter()
        .find(|(x, y, _, _)| *x == lo && *y == hi)
        .map(|(_, _, cos, _)| PI - cos.acos())
}

/// Solid the pair's entry was taken from
pub fn source_solid(a: u32, b: u32) -> Option<&'static str> {
    let (lo, hi) = ordered(a, b);
    DIHEDRALS
        .iter()
        .find(|(x, y, _, _)| *x == lo && *y == hi)
        .map(|(_, _, _, solid)| *solid)
}

/// Every unordered pair in the table
pub fn known_pairs() -> impl Iterator<Item = (u32, u32)> {
    DIHEDRALS.iter().map(|(a, b, _, _)| (*a, *b))
}
