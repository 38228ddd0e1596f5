pub mod sts;

use crate::types::{Credentials, SessionRequest};

/// Trades a validated assertion plus a chosen role for temporary credentials.
/// Implementations own duration bounds, throttling and retries; callers never
/// retry a failed exchange.
pub trait ExchangeCredentials {
    type Error: std::error::Error + Send + Sync + 'static;
    async fn exchange(&self, request: &SessionRequest) -> Result<Credentials, Self::Error>;
}
