//! rule gateway trait.
//!
//! the rule gateway is the external mechanism that actually blocks or
//! unblocks the configured destinations. the gate only ever asks it to
//! flip one way or the other; concrete backends live in the server crate.

use thiserror::Error;

/// errors from rule gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// failed to run a backend command.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// the backend reported failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// trait for blocking backends.
///
/// takes owned values to avoid lifetime issues with dynamic dispatch.
pub trait RuleGateway: Send + Sync {
    /// enable or disable blocking of the configured destinations.
    ///
    /// must be idempotent: enabling blocking that is already enabled
    /// (or vice versa) is a no-op for the backend.
    fn set_blocking(
        &self,
        enabled: bool,
    ) -> impl std::future::Future<Output = Result<(), GatewayError>> + Send;
}

/// object-safe wrapper for [`RuleGateway`], used for dynamic dispatch.
pub trait RuleGatewayBoxed: Send + Sync {
    /// enable or disable blocking.
    fn set_blocking(
        &self,
        enabled: bool,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), GatewayError>> + Send + '_>>;
}

impl<T: RuleGateway> RuleGatewayBoxed for T {
    fn set_blocking(
        &self,
        enabled: bool,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), GatewayError>> + Send + '_>>
    {
        Box::pin(RuleGateway::set_blocking(self, enabled))
    }
}
