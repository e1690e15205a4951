//! http handlers for the gate protocol.
//!
//! a stateless translation layer: each request maps to one access gate
//! call and each gate result maps back to a response value. every
//! request gets a reply.

mod destinations;
mod error;
mod grant;
mod health;
mod status;
mod version;

pub use destinations::{DestinationsResponse, destinations};
pub use error::{ApiError, ErrorBody, ResultExt};
pub use grant::{
    ExpireResponse, GrantResponse, StartCodeRequest, StartFreeRequest, apply_code, force_expire,
    start_free,
};
pub use health::health;
pub use status::{StatusResponse, status};
pub use version::{VersionResponse, version};

use axum::Json;
use axum::http::{StatusCode, Uri};

/// fallback handler for unrecognized request paths.
///
/// answers with an explicit "unsupported" result rather than silence.
pub async fn unsupported(uri: Uri) -> (StatusCode, Json<ErrorBody>) {
    tracing::debug!(%uri, "unsupported request");
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "unsupported request".to_string(),
        }),
    )
}
