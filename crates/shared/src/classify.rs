//! Chain classification: class, repeating pattern and scaffold applications.

use serde::{Deserialize, Serialize};

use crate::symbol;

/// Coarse shape class of a side sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainClass {
    Primitive,
    TriangleCluster,
    SquareChain,
    MixedChain,
    Other,
}

impl ChainClass {
    /// Baseline stability of the class in `0.0..=1.0`
    pub fn base_stability(self) -> f64 {
        match self {
            ChainClass::Primitive => 1.0,
            ChainClass::TriangleCluster => 0.95,
            ChainClass::SquareChain => 0.90,
            ChainClass::MixedChain => 0.85,
            ChainClass::Other => 0.70,
        }
    }
}

/// Shortest unit whose repetition spells the whole sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatPattern {
    /// Canonical symbol of the repeating unit
    pub unit: String,
    pub repeats: usize,
}

pub fn classify(sides: &[u32]) -> ChainClass {
    if sides.len() == 1 {
        return ChainClass::Primitive;
    }
    let triangles = sides.iter().filter(|&&s| s == 3).count();
    let squares = sides.iter().filter(|&&s| s == 4).count();
    if triangles == sides.len() {
        ChainClass::TriangleCluster
    } else if squares == sides.len() {
        ChainClass::SquareChain
    } else if triangles > 0 && squares > 0 {
        ChainClass::MixedChain
    } else {
        ChainClass::Other
    }
}

/// Smallest period `p < len` with `len % p == 0` that tiles the sequence
pub fn detect_pattern(sides: &[u32]) -> Option<RepeatPattern> {
    let len = sides.len();
    if len < 2 {
        return None;
    }
    (1..len)
        .filter(|p| len % p == 0)
        .find(|&p| sides.iter().enumerate().all(|(i, s)| *s == sides[i % p]))
        .and_then(|p| {
            Some(RepeatPattern {
                unit: symbol::encode(&sides[..p]).ok()?,
                repeats: len / p,
            })
        })
}

/// Polyform scaffolds a chain of this shape can seed
pub fn scaffold_applications(sides: &[u32]) -> Vec<String> {
    let len = sides.len();
    let triangles = sides.iter().filter(|&&s| s == 3).count();
    let squares = sides.iter().filter(|&&s| s == 4).count();
    let mut out = Vec::new();

    match classify(sides) {
        ChainClass::SquareChain => {
            out.push(format!("linear_expansion_{len}_squares"));
            out.push("rectangular_structures".to_string());
        }
        ChainClass::TriangleCluster => match len {
            3 => out.push("tetrahedron_corner".to_string()),
            4 => out.push("tetrahedron_face".to_string()),
            8 => out.push("octahedron_structure".to_string()),
            20 => out.push("icosahedron_structure".to_string()),
            _ => {}
        },
        ChainClass::MixedChain => match (triangles, squares) {
            (1, 1) if len == 2 => out.push("triangle_square_junction".to_string()),
            (4, 1) if len == 5 => out.push("square_pyramid_scaffold".to_string()),
            (2, 3) if len == 5 => out.push("triangular_prism_scaffold".to_string()),
            _ => {}
        },
        ChainClass::Primitive | ChainClass::Other => {}
    }
    out
}
