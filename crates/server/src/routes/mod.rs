use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use shared::{
    fold_table, geometry, symbol, AttachmentData, FoldAngleResponse, PrimitiveGeometry,
    RegisterChainRequest, RegisterChainResponse,
};

use crate::AppState;

/// Health check
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Authoritative fold angle for a pair of side counts
pub async fn fold_angle(Path((a, b)): Path<(u32, u32)>) -> Result<Json<FoldAngleResponse>, StatusCode> {
    if geometry::check_sides(a).is_err() || geometry::check_sides(b).is_err() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let fold_angle = fold_table::authoritative_fold_angle(a, b).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(FoldAngleResponse { fold_angle }))
}

/// Vertex ring of the unit-edge primitive
pub async fn primitive(Path(sides): Path<u32>) -> Result<Json<PrimitiveGeometry>, StatusCode> {
    PrimitiveGeometry::from_kernel(sides)
        .map(Json)
        .map_err(|_| StatusCode::BAD_REQUEST)
}

/// The reference symbol set, sorted by symbol
pub async fn reference(State(state): State<AppState>) -> Json<Vec<AttachmentData>> {
    let mut entries: Vec<AttachmentData> = state.reference.iter().cloned().collect();
    entries.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Json(entries)
}

/// Register a chain built by a workspace
pub async fn register_chain(
    State(state): State<AppState>,
    Json(request): Json<RegisterChainRequest>,
) -> Result<(StatusCode, Json<RegisterChainResponse>), StatusCode> {
    match symbol::decode(&request.symbol) {
        Ok(sides) if sides == request.sides => {}
        Ok(_) => {
            tracing::warn!(symbol = %request.symbol, "chain sides do not match symbol");
            return Err(StatusCode::BAD_REQUEST);
        }
        Err(e) => {
            tracing::warn!("Rejected chain: {e}");
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let response = state.chains.register(request).await;
    let status = if response.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

/// Registered chains
pub async fn list_chains(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "chains": state.chains.list().await }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[tokio::test]
    async fn test_fold_angle_known_pair() {
        let Json(body) = fold_angle(Path((4, 4))).await.unwrap();
        assert!((body.fold_angle - FRAC_PI_2).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_fold_angle_status_codes() {
        assert_eq!(fold_angle(Path((3, 2))).await.unwrap_err(), StatusCode::BAD_REQUEST);
        assert_eq!(fold_angle(Path((19, 20))).await.unwrap_err(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_primitive_ring_has_unit_edges() {
        let Json(body) = primitive(Path(7)).await.unwrap();
        assert_eq!(body.vertices.len(), 7);
        let ring = geometry::ring_from_arrays(&body.vertices);
        assert!(geometry::ring_has_unit_edges(&ring));
        assert_eq!(primitive(Path(21)).await.unwrap_err(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reference_is_sorted_and_complete() {
        let state = AppState::default();
        let Json(entries) = reference(State(state.clone())).await;
        assert_eq!(entries.len(), state.reference.len());
        assert!(entries.windows(2).all(|w| w[0].symbol < w[1].symbol));
    }

    #[tokio::test]
    async fn test_register_chain_created_then_ok() {
        let state = AppState::default();
        let request = RegisterChainRequest::new("AB2".to_string(), vec![3, 4, 4], "test");

        let (status, Json(first)) = register_chain(State(state.clone()), Json(request.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        let (status, Json(second)) = register_chain(State(state.clone()), Json(request))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first.id, second.id);

        let Json(list) = list_chains(State(state)).await;
        assert_eq!(list["chains"][0]["symbol"], "AB2");
    }

    #[tokio::test]
    async fn test_register_chain_rejects_mismatch() {
        let state = AppState::default();
        let wrong = RegisterChainRequest::new("AB".to_string(), vec![4, 3], "test");
        let bad = RegisterChainRequest::new("AA".to_string(), vec![3, 3], "test");
        for request in [wrong, bad] {
            let err = register_chain(State(state.clone()), Json(request)).await.unwrap_err();
            assert_eq!(err, StatusCode::BAD_REQUEST);
        }
        assert!(state.chains.list().await.is_empty());
    }
}
