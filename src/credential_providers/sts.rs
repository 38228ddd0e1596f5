use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::operation::assume_role_with_saml::AssumeRoleWithSAMLError;
use aws_sdk_sts::Client as StsClient;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use chrono::DateTime;
use tracing::{debug, info};

use super::ExchangeCredentials;
use crate::types::{Credentials, SessionRequest};

const DEFAULT_STS_REGION: &str = "us-east-1";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unable to assume role {role_arn}: {source}")]
    AssumeRole {
        role_arn: String,
        source: SdkError<AssumeRoleWithSAMLError, Response>,
    },
    #[error("STS returned no credentials for {0}")]
    MissingCredentials(String),
    #[error("STS returned an out of range expiration for {0}")]
    InvalidExpiration(String),
}

pub struct StsCredentialExchanger {
    client: StsClient,
}

impl StsCredentialExchanger {
    pub fn new(client: StsClient) -> Self {
        Self { client }
    }

    /// Builds a client for `region`, falling back to the default region chain
    /// and finally to `us-east-1`. AssumeRoleWithSAML is an unsigned call so
    /// no credentials are loaded.
    pub async fn from_region(region: Option<String>) -> Self {
        let region_provider = RegionProviderChain::first_try(region.map(Region::new))
            .or_default_provider()
            .or_else(Region::new(DEFAULT_STS_REGION));
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .no_credentials()
            .load()
            .await;
        debug!("Using STS region {:?}", sdk_config.region());
        Self::new(StsClient::new(&sdk_config))
    }
}

impl ExchangeCredentials for StsCredentialExchanger {
    type Error = Error;

    async fn exchange(&self, request: &SessionRequest) -> Result<Credentials, Self::Error> {
        info!("Calling AWS STS AssumeRoleWithSAML for {}", request.role_arn);
        debug!("Principal ARN: {}", request.principal_arn);
        debug!("Duration: {} seconds", request.duration_seconds);

        let output = self
            .client
            .assume_role_with_saml()
            .role_arn(&request.role_arn)
            .principal_arn(&request.principal_arn)
            .saml_assertion(&request.assertion)
            .duration_seconds(request.duration_seconds)
            .send()
            .await
            .map_err(|source| Error::AssumeRole {
                role_arn: request.role_arn.clone(),
                source,
            })?;

        let sts_creds = output
            .credentials()
            .ok_or_else(|| Error::MissingCredentials(request.role_arn.clone()))?;
        let expiration = sts_creds.expiration();
        let expiration = DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos())
            .ok_or_else(|| Error::InvalidExpiration(request.role_arn.clone()))?;

        Ok(Credentials {
            access_key_id: sts_creds.access_key_id().to_string(),
            secret_access_key: sts_creds.secret_access_key().to_string(),
            session_token: sts_creds.session_token().to_string(),
            expiration,
        })
    }
}
