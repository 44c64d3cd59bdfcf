//! Client side of the catalog service.
//!
//! The catalog answers authoritative fold angles and primitive rings and
//! records chains the workspace has built. Every call may be slow or fail;
//! callers treat an error as "use the local value".

use std::future::Future;
use std::time::Duration;

use shared::{
    FoldAngleResponse, PolyformError, PrimitiveGeometry, RegisterChainRequest,
    RegisterChainResponse, Result,
};

/// Persistence/catalog collaborator
pub trait Catalog: Send + Sync + 'static {
    /// Whether calls can succeed at all. Offline catalogs are never asked.
    fn is_online(&self) -> bool {
        true
    }

    fn fold_angle(&self, a: u32, b: u32) -> impl Future<Output = Result<f64>> + Send;

    fn primitive_geometry(
        &self,
        sides: u32,
    ) -> impl Future<Output = Result<PrimitiveGeometry>> + Send;

    fn register_chain(
        &self,
        request: RegisterChainRequest,
    ) -> impl Future<Output = Result<RegisterChainResponse>> + Send;
}

fn unavailable(context: &str, err: impl std::fmt::Display) -> PolyformError {
    PolyformError::CollaboratorUnavailable(format!("{context}: {err}"))
}

/// Catalog reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| unavailable("client setup", e))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(path, e))?;
        if !response.status().is_success() {
            return Err(unavailable(path, response.status()));
        }
        response.json().await.map_err(|e| unavailable(path, e))
    }
}

impl Catalog for HttpCatalog {
    async fn fold_angle(&self, a: u32, b: u32) -> Result<f64> {
        let body: FoldAngleResponse = self.get_json(&format!("/api/fold-angle/{a}/{b}")).await?;
        Ok(body.fold_angle)
    }

    async fn primitive_geometry(&self, sides: u32) -> Result<PrimitiveGeometry> {
        self.get_json(&format!("/api/primitive/{sides}")).await
    }

    async fn register_chain(&self, request: RegisterChainRequest) -> Result<RegisterChainResponse> {
        let url = format!("{}/api/chains", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| unavailable("/api/chains", e))?;
        if !response.status().is_success() {
            return Err(unavailable("/api/chains", response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| unavailable("/api/chains", e))
    }
}

/// Stand-in used when no catalog URL is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineCatalog;

impl Catalog for OfflineCatalog {
    fn is_online(&self) -> bool {
        false
    }

    fn fold_angle(&self, _a: u32, _b: u32) -> impl Future<Output = Result<f64>> + Send {
        std::future::ready(Err(PolyformError::CollaboratorUnavailable(
            "offline".to_string(),
        )))
    }

    fn primitive_geometry(
        &self,
        _sides: u32,
    ) -> impl Future<Output = Result<PrimitiveGeometry>> + Send {
        std::future::ready(Err(PolyformError::CollaboratorUnavailable(
            "offline".to_string(),
        )))
    }

    fn register_chain(
        &self,
        _request: RegisterChainRequest,
    ) -> impl Future<Output = Result<RegisterChainResponse>> + Send {
        std::future::ready(Err(PolyformError::CollaboratorUnavailable(
            "offline".to_string(),
        )))
    }
}
