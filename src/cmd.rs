use clap::{builder::RangedU64ValueParser, ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::validate_account_id;

/// Acquire temporary AWS credentials via Google SSO (SAML v2)
#[derive(Parser)]
#[command(about, version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Optional config directory holding `config.json`.
    /// Defaults to `$HOME/.aws-saml-auth`
    #[arg(short = 'C', long, global = true, env = "AWS_SAML_AUTH_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for single role credentials
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialFormat {
    /// Shell `export` lines, suitable for `eval`
    Export,
    /// One JSON object
    Json,
}

impl std::fmt::Display for CredentialFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialFormat::Export => write!(f, "export"),
            CredentialFormat::Json => write!(f, "json"),
        }
    }
}

/// Output format for listings
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListFormat {
    /// JSON formatted output
    Json,
    /// Plain text formatted output
    Text,
}

impl std::fmt::Display for ListFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListFormat::Json => write!(f, "json"),
            ListFormat::Text => write!(f, "text"),
        }
    }
}

/// Arguments controlling how the SAML assertion is obtained
#[derive(Args, Clone, Debug)]
pub struct LoginArgs {
    /// Google SSO identity provider identifier
    #[arg(short = 'i', long, env = "GOOGLE_IDP_ID")]
    pub idp_id: Option<String>,

    /// Google SSO service provider identifier
    #[arg(short = 's', long, env = "GOOGLE_SP_ID")]
    pub sp_id: Option<String>,

    /// Alternate name of `--idp-id`, read when it is absent
    #[arg(long, env = "IDENTITY_PROVIDER_ID", hide = true)]
    pub identity_provider_id: Option<String>,

    /// Alternate name of `--sp-id`, read when it is absent
    #[arg(long, env = "SERVICE_PROVIDER_ID", hide = true)]
    pub service_provider_id: Option<String>,

    /// Session duration in seconds used to assume roles. Defaults to 3600
    #[arg(short = 'd', long)]
    pub duration: Option<i32>,

    /// Path of the file caching the SAML assertion.
    /// Defaults to `~/.awssaml_cache.cfg`
    #[arg(long)]
    pub saml_file: Option<PathBuf>,

    /// Force to re-authenticate even if the cached assertion is still valid
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    /// AWS region of the STS endpoint
    #[arg(short = 'R', long)]
    pub region: Option<String>,

    /// Seconds to wait for the browser sign-in to finish. Defaults to 300
    #[arg(long)]
    pub login_timeout: Option<u64>,

    /// Browser profile directory keeping the Google session between logins.
    /// Defaults to `<config-dir>/browser-profile`
    #[arg(long)]
    pub browser_profile_dir: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct FormatCommonArgs {
    /// Format for the output list
    #[arg(short = 'o', long, default_value_t = ListFormat::Json)]
    pub output: ListFormat,
    /// Flag to omit headers in text output
    #[arg(short = 'H', long, default_value_t = false)]
    pub no_headers: bool,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// The `Assume` subcommand assumes a single role and prints its credentials.
    /// Without `--role-arn` the only available role is used, or a prompt lets
    /// you pick one when several are available.
    Assume {
        #[clap(flatten)]
        login: LoginArgs,

        /// AWS role ARN to assume
        #[arg(short = 'r', long)]
        role_arn: Option<String>,

        /// Output format of the credentials
        #[arg(short = 'o', long, default_value_t = CredentialFormat::Export)]
        output: CredentialFormat,

        /// Fail instead of prompting when several roles are available
        #[arg(long, default_value_t = false)]
        no_prompt: bool,
    },

    /// The `ListRoles` subcommand lists the roles associated with the authenticated user.
    ListRoles {
        #[clap(flatten)]
        login: LoginArgs,

        /// Only list role ARNs, without principal ARNs
        #[arg(long, default_value_t = false)]
        arns_only: bool,

        #[clap(flatten)]
        formatting: FormatCommonArgs,
    },

    /// The `Batch` subcommand assumes the same role name in several accounts
    /// and prints one JSON line of credentials per account, in the given order.
    /// Stops at the first account that fails.
    Batch {
        #[clap(flatten)]
        login: LoginArgs,

        /// AWS account ids (repeat the flag or separate with commas)
        #[arg(short = 'a', long, required = true, num_args = 1.., value_delimiter = ',', value_parser = validate_account_id)]
        account_ids: Vec<String>,

        /// IAM role name assumed in every account
        #[arg(short = 'r', long)]
        role_name: String,

        /// ARN partition used to build role ARNs
        #[arg(long, default_value = "aws")]
        partition: String,

        /// Number of concurrent exchanges (defaults to 1)
        #[arg(short = 'p', long, default_value_t = 1, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
        parallel: usize,
    },

    /// The `Assertion` subcommand prints the raw SAML assertion.
    Assertion {
        #[clap(flatten)]
        login: LoginArgs,
    },
}

impl Commands {
    pub fn get_login_args(&self) -> &LoginArgs {
        match self {
            Commands::Assume { login, .. } => login,
            Commands::ListRoles { login, .. } => login,
            Commands::Batch { login, .. } => login,
            Commands::Assertion { login } => login,
        }
    }
}
