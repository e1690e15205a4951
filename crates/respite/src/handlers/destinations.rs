//! handler for the blocked-destination listing.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// response body for `GET /gate/destinations`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DestinationsResponse {
    /// the configured blocked destinations, verbatim.
    pub destinations: Vec<String>,
}

/// GET /gate/destinations - list the destinations the gate controls.
///
/// for ui display; the gate itself never interprets these.
pub async fn destinations(State(state): State<AppState>) -> Json<DestinationsResponse> {
    Json(DestinationsResponse {
        destinations: state.config.blocked_destinations.clone(),
    })
}
