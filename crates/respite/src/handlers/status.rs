//! handler for the gate status query.

use axum::{Json, extract::State};
use respite_gate::{GateState, GateStatus};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::AppState;

/// response body for `GET /gate/status`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// blocked or granted.
    pub state: GateState,

    /// whole seconds left on the active grant; absent when blocked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,

    /// original length of the active grant, for progress display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant_duration_seconds: Option<i64>,

    /// free grants left in the current quota window.
    pub quota_remaining: u32,

    /// whole seconds left on the privileged-grant cooldown; absent when
    /// no cooldown is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_remaining_seconds: Option<i64>,
}

impl From<GateStatus> for StatusResponse {
    fn from(status: GateStatus) -> Self {
        Self {
            state: status.state,
            remaining_seconds: status.remaining_seconds,
            grant_duration_seconds: status.grant_duration_secs,
            quota_remaining: status.quota_remaining,
            cooldown_remaining_seconds: status.cooldown_remaining_seconds,
        }
    }
}

/// GET /gate/status - a point-in-time snapshot of the gate.
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.gate.status().await?;
    Ok(Json(status.into()))
}
