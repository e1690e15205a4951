//! handler for the `/version` endpoint

use axum::Json;
use serde::{Deserialize, Serialize};

/// response for the `/version` endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    /// server version string
    pub version: String,
}

/// GET /version - return the server version
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
