use serde::{Deserialize, Serialize};

pub mod classify;
pub mod fold_table;
pub mod geometry;
pub mod reference;
pub mod symbol;

pub use classify::{ChainClass, RepeatPattern};
pub use reference::ReferenceSet;

/// Stable identifier of a placed polygon inside one workspace
pub type PolygonId = u32;

/// Smallest supported side count
pub const MIN_SIDES: u32 = 3;

/// Largest supported side count
pub const MAX_SIDES: u32 = 20;

/// Every polygon edge has this length
pub const UNIT_EDGE_LENGTH: f64 = 1.0;

/// Error taxonomy shared by the workspace, the cache and the catalog service
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolyformError {
    #[error("side count {0} is outside 3..=20")]
    InvalidSideCount(u32),
    #[error("edge {edge} of polygon {polygon} is already closed")]
    EdgeAlreadyClosed { polygon: PolygonId, edge: usize },
    #[error("edges cannot be joined: {0}")]
    IncompatibleEdge(String),
    #[error("malformed symbol {symbol:?}: {reason}")]
    MalformedSymbol { symbol: String, reason: String },
    #[error("catalog unavailable: {0}")]
    CollaboratorUnavailable(String),
    #[error("unknown polygon {0}")]
    UnknownPolygon(PolygonId),
    #[error("polygon {polygon} has no edge {edge}")]
    EdgeOutOfRange { polygon: PolygonId, edge: usize },
    #[error("workspace already holds {0} polygons")]
    WorkspaceFull(usize),
    #[error("invalid placement: {0}")]
    InvalidPlacement(String),
    #[error("invalid workspace document: {0}")]
    InvalidDocument(String),
}

pub type Result<T> = std::result::Result<T, PolyformError>;

/// Where the fold angles of a cache entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldSource {
    /// Preloaded reference set
    Reference,
    /// Every pair answered by the catalog
    Authoritative,
    /// At least one pair fell back to the local formula
    Fallback,
}

impl FoldSource {
    /// Fallback entries are recomputed by later warming passes
    pub fn is_refreshable(self) -> bool {
        matches!(self, FoldSource::Fallback)
    }
}

/// Attachment data published into the predictive cache under `symbol`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentData {
    pub symbol: String,
    /// Member side counts in canonical traversal order
    pub sides: Vec<u32>,
    pub length: usize,
    /// Fold angle (radians) for each consecutive pair of `sides`
    pub fold_angles: Vec<f64>,
    pub class: ChainClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<RepeatPattern>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applications: Vec<String>,
    pub stability: f64,
    pub fold_source: FoldSource,
    /// Catalog-supplied vertex ring, only for single-primitive symbols
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive_ring: Option<Vec<[f64; 3]>>,
}

impl AttachmentData {
    /// Assemble an entry, deriving classification from the side sequence
    pub fn from_parts(
        sides: Vec<u32>,
        fold_angles: Vec<f64>,
        fold_source: FoldSource,
    ) -> Result<Self> {
        let symbol = symbol::encode(&sides)?;
        let class = classify::classify(&sides);
        Ok(Self {
            symbol,
            length: sides.len(),
            pattern: classify::detect_pattern(&sides),
            applications: classify::scaffold_applications(&sides),
            stability: class.base_stability(),
            class,
            fold_angles,
            fold_source,
            primitive_ring: None,
            sides,
        })
    }
}

/// Pass-back body for `POST /api/chains`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterChainRequest {
    pub symbol: String,
    pub sides: Vec<u32>,
    pub tier: u8,
    pub source: String,
}

impl RegisterChainRequest {
    pub fn new(symbol: String, sides: Vec<u32>, source: impl Into<String>) -> Self {
        let tier = if sides.len() > 1 { 1 } else { 0 };
        Self {
            symbol,
            sides,
            tier,
            source: source.into(),
        }
    }
}

/// Catalog answer to a chain registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterChainResponse {
    pub id: String,
    pub symbol: String,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldAngleResponse {
    pub fold_angle: f64,
}

/// Authoritative primitive geometry served by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveGeometry {
    pub sides: u32,
    pub circumradius: f64,
    pub vertices: Vec<[f64; 3]>,
}

impl PrimitiveGeometry {
    pub fn from_kernel(sides: u32) -> Result<Self> {
        let ring = geometry::vertex_ring(sides)?;
        Ok(Self {
            sides,
            circumradius: geometry::circumradius(sides)?,
            vertices: geometry::ring_to_arrays(&ring),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<T>(val: &T)
    where
        T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug,
    {
        let json = serde_json::to_string(val).unwrap();
        let back: T = serde_json::from_str(&json).unwrap();
        assert_eq!(*val, back);
    }

    #[test]
    fn test_attachment_data_from_parts() {
        let data = AttachmentData::from_parts(vec![3, 3, 3], vec![2.0, 2.0], FoldSource::Fallback)
            .unwrap();
        assert_eq!(data.symbol, "A3");
        assert_eq!(data.length, 3);
        assert_eq!(data.class, ChainClass::TriangleCluster);
        assert!(data.applications.contains(&"tetrahedron_corner".to_string()));
        assert!(data.fold_source.is_refreshable());
    }

    #[test]
    fn test_attachment_data_rejects_bad_sides() {
        let err = AttachmentData::from_parts(vec![3, 2], vec![0.0], FoldSource::Fallback)
            .unwrap_err();
        assert_eq!(err, PolyformError::InvalidSideCount(2));
    }

    #[test]
    fn test_attachment_data_serde() {
        let data =
            AttachmentData::from_parts(vec![4, 3], vec![1.0], FoldSource::Authoritative).unwrap();
        roundtrip(&data);
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains(r#""fold_source":"authoritative""#));
        assert!(!json.contains("primitive_ring"));
    }

    #[test]
    fn test_register_request_tier() {
        let chain = RegisterChainRequest::new("AB".into(), vec![3, 4], "workspace");
        assert_eq!(chain.tier, 1);
        let single = RegisterChainRequest::new("B".into(), vec![4], "workspace");
        assert_eq!(single.tier, 0);
        roundtrip(&chain);
    }

    #[test]
    fn test_primitive_geometry_from_kernel() {
        let geom = PrimitiveGeometry::from_kernel(6).unwrap();
        assert_eq!(geom.vertices.len(), 6);
        assert!((geom.circumradius - 1.0).abs() < 1e-12);
        let json = serde_json::to_string(&geom).unwrap();
        let back: PrimitiveGeometry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sides, 6);
        assert!((back.vertices[1][0] - geom.vertices[1][0]).abs() < 1e-12);
    }

    #[test]
    fn test_error_messages() {
        let err = PolyformError::EdgeAlreadyClosed { polygon: 2, edge: 1 };
        assert_eq!(err.to_string(), "edge 1 of polygon 2 is already closed");
        assert!(PolyformError::InvalidSideCount(21).to_string().contains("3..=20"));
    }
}
