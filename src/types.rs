use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ROLE_ATTRIBUTE: &str = "https://aws.amazon.com/SAML/Attributes/Role";
pub const ROLE_SESSION_NAME_ATTRIBUTE: &str =
    "https://aws.amazon.com/SAML/Attributes/RoleSessionName";
pub const SESSION_DURATION_ATTRIBUTE: &str =
    "https://aws.amazon.com/SAML/Attributes/SessionDuration";

/// Session duration in seconds used when neither the command line nor the
/// config file provide one.
pub const DEFAULT_SESSION_DURATION: i32 = 3600;

/// A role the authenticated identity may assume, together with the SAML
/// provider that trusts the assertion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Role {
    pub role_arn: String,
    pub principal_arn: String,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.role_arn)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub assertion: String,
    pub role_arn: String,
    pub principal_arn: String,
    pub duration_seconds: i32,
}

impl SessionRequest {
    pub fn new(assertion: impl Into<String>, role: &Role, duration_seconds: i32) -> Self {
        Self {
            assertion: assertion.into(),
            role_arn: role.role_arn.clone(),
            principal_arn: role.principal_arn.clone(),
            duration_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime<Utc>,
}

/// One line of batch output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountCredentials {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub account_id: String,
    pub role_arn: String,
}
