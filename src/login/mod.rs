pub mod google;

/// Runs the identity provider sign-in and yields the base64 encoded SAML
/// response destined for the AWS sign-in endpoint.
pub trait ProvideAssertion {
    type Error: std::error::Error + Send + Sync + 'static;
    async fn login(&self) -> Result<String, Self::Error>;
}
