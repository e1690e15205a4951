//! handlers for starting and ending grants.

use axum::{Json, extract::State};
use chrono::{DateTime, Duration, Utc};
use respite_gate::StartOutcome;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::AppState;

/// request body for `POST /gate/free`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartFreeRequest {
    /// requested grant length in seconds. must be positive.
    pub duration_seconds: i64,
}

/// request body for `POST /gate/code`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCodeRequest {
    /// requested grant length in seconds. must be positive. the ledger
    /// may override it with the duration the code was sold for.
    pub duration_seconds: i64,

    /// the grant code to redeem.
    pub code: String,
}

/// response body for grant requests.
///
/// quota exhaustion, cooldown and bad codes are expected outcomes and
/// come back as `granted: false` with a reason, not as http errors.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantResponse {
    /// whether the grant is now active.
    pub granted: bool,

    /// when the grant ends; only present when granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<DateTime<Utc>>,

    /// why the grant was refused; only present when not granted.
    /// one of `quota_exceeded`, `in_cooldown`, `invalid_code`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GrantResponse {
    fn from_outcome(outcome: StartOutcome) -> Self {
        match outcome {
            StartOutcome::Granted { expiry } => Self {
                granted: true,
                expiry_time: Some(expiry),
                reason: None,
            },
            StartOutcome::QuotaExceeded => Self::refused("quota_exceeded"),
            StartOutcome::InCooldown { .. } => Self::refused("in_cooldown"),
            StartOutcome::InvalidCode => Self::refused("invalid_code"),
        }
    }

    fn refused(reason: &str) -> Self {
        Self {
            granted: false,
            expiry_time: None,
            reason: Some(reason.to_string()),
        }
    }
}

/// response body for `POST /gate/expire`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExpireResponse {
    /// always true; force-expire is unconditional.
    pub ok: bool,
}

/// POST /gate/free - start a free grant out of the daily quota.
pub async fn start_free(
    State(state): State<AppState>,
    Json(req): Json<StartFreeRequest>,
) -> Result<Json<GrantResponse>, ApiError> {
    if req.duration_seconds <= 0 {
        return Err(ApiError::bad_request("durationSeconds must be positive"));
    }

    let outcome = state
        .gate
        .start_free(Duration::seconds(req.duration_seconds))
        .await?;
    Ok(Json(GrantResponse::from_outcome(outcome)))
}

/// POST /gate/code - start a grant by redeeming a code.
pub async fn apply_code(
    State(state): State<AppState>,
    Json(req): Json<StartCodeRequest>,
) -> Result<Json<GrantResponse>, ApiError> {
    if req.duration_seconds <= 0 {
        return Err(ApiError::bad_request("durationSeconds must be positive"));
    }
    if req.code.is_empty() {
        return Err(ApiError::bad_request("code must not be empty"));
    }

    let outcome = state
        .gate
        .start_paid(Duration::seconds(req.duration_seconds), req.code)
        .await?;
    Ok(Json(GrantResponse::from_outcome(outcome)))
}

/// POST /gate/expire - end the current grant immediately.
///
/// unconditional and idempotent.
pub async fn force_expire(
    State(state): State<AppState>,
) -> Result<Json<ExpireResponse>, ApiError> {
    state.gate.force_expire().await?;
    Ok(Json(ExpireResponse { ok: true }))
}
