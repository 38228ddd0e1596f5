mod assertion;
mod assume;
mod batch;
mod list_roles;

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use assume::ExecAssumeInputs;
use batch::ExecBatchInputs;
use list_roles::ExecListRolesInputs;

use crate::{
    cache::{self, CacheManager, DEFAULT_CACHE_PATH},
    cmd::{Cli, Commands, LoginArgs},
    config::{self, SamlAuthConfig},
    credential_providers::sts::StsCredentialExchanger,
    login::{
        google::{GoogleSamlLogin, DEFAULT_LOGIN_TIMEOUT},
        ProvideAssertion,
    },
    roles::{
        self,
        select::{NonInteractiveSelector, SelectRole, TerminalSelector},
    },
    saml::{self, SamlResponse},
    types::DEFAULT_SESSION_DURATION,
    utils::{formatters, resolve_config_dir},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    Cache(#[from] cache::Error),
    #[error("Login failed: {0}")]
    Login(#[source] BoxError),
    #[error(transparent)]
    Assertion(#[from] saml::Error),
    #[error("The identity provider returned an assertion that has already expired")]
    AssertionExpired,
    #[error(transparent)]
    Roles(#[from] roles::Error),
    #[error("Credential exchange failed: {0}")]
    Exchange(#[source] BoxError),
    #[error(transparent)]
    Render(#[from] formatters::Error),
}

/// Login settings after merging flags and environment variables over
/// `config.json` over built-in defaults.
#[derive(Debug, PartialEq, Eq)]
pub struct LoginSettings {
    pub idp_id: String,
    pub sp_id: String,
    pub duration_seconds: i32,
    pub saml_file: PathBuf,
    pub no_cache: bool,
    pub region: Option<String>,
    pub login_timeout: Duration,
    pub browser_profile_dir: PathBuf,
}

impl LoginSettings {
    pub fn resolve(
        args: &LoginArgs,
        config: SamlAuthConfig,
        config_dir: &Path,
    ) -> config::Result<Self> {
        Ok(LoginSettings {
            idp_id: config::required(
                args.idp_id.clone().or_else(|| args.identity_provider_id.clone()),
                config.idp_id,
                "identity provider id (--idp-id)",
            )?,
            sp_id: config::required(
                args.sp_id.clone().or_else(|| args.service_provider_id.clone()),
                config.sp_id,
                "service provider id (--sp-id)",
            )?,
            duration_seconds: args
                .duration
                .or(config.duration_seconds)
                .unwrap_or(DEFAULT_SESSION_DURATION),
            saml_file: args
                .saml_file
                .clone()
                .or(config.saml_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH)),
            no_cache: args.no_cache,
            region: args.region.clone().or(config.region),
            login_timeout: args
                .login_timeout
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_LOGIN_TIMEOUT),
            browser_profile_dir: args
                .browser_profile_dir
                .clone()
                .unwrap_or_else(|| config_dir.join("browser-profile")),
        })
    }
}

/// Returns an assertion ready for exchange. A cached assertion is reused only
/// inside its validity window, otherwise the provider is asked exactly once
/// and the result cached unless it has already expired.
pub async fn resolve_assertion<P: ProvideAssertion>(
    provider: &P,
    cache: &CacheManager,
    no_cache: bool,
) -> Result<String, Error> {
    if no_cache {
        info!("Cache disabled, signing in");
    } else {
        match cache.read() {
            Ok(cached) => match saml::is_valid(&cached) {
                Ok(true) => {
                    info!("Using cached assertion from {}", cache.cache_path().display());
                    return Ok(cached);
                }
                Ok(false) => info!("Cached assertion expired, signing in"),
                Err(err) => warn!("Ignoring unreadable cached assertion: {err}"),
            },
            Err(cache::Error::NotFound(_)) => info!("No cached assertion, signing in"),
            Err(err) => return Err(err.into()),
        }
    }

    let assertion = provider
        .login()
        .await
        .map_err(|err| Error::Login(Box::new(err)))?;
    // NotBefore is not checked here, the local clock may lag the identity provider
    if saml::is_expired(&assertion)? {
        return Err(Error::AssertionExpired);
    }
    cache.write(&assertion)?;
    Ok(assertion)
}

/// Parses the assertion and reports its session attributes. The duration
/// check only runs for commands that request a session.
fn open_assertion(assertion: &str, duration_seconds: Option<i32>) -> Result<SamlResponse, Error> {
    let response = SamlResponse::from_base64(assertion)?;
    if let Some(session_name) = response.role_session_name()? {
        info!("Role session name: {session_name}");
    }
    if let Some(max) = duration_over_limit(&response, duration_seconds)? {
        warn!(
            "Requested duration of {}s exceeds the {max}s allowed by the identity provider",
            duration_seconds.unwrap_or_default()
        );
    }
    Ok(response)
}

/// The identity provider's SessionDuration when `requested` exceeds it.
fn duration_over_limit(
    response: &SamlResponse,
    requested: Option<i32>,
) -> Result<Option<i32>, Error> {
    let Some(requested) = requested else {
        return Ok(None);
    };
    let allowed = response.session_duration()?;
    if let Some(max) = allowed {
        debug!("Identity provider allows sessions of up to {max}s");
    }
    Ok(allowed.filter(|max| requested > *max))
}

fn pick_selector(no_prompt: bool) -> Box<dyn SelectRole> {
    if no_prompt || !io::stderr().is_terminal() {
        Box::new(NonInteractiveSelector)
    } else {
        Box::new(TerminalSelector::new())
    }
}

pub async fn exec(cli: Cli) -> Result<(), Error> {
    let config_dir = resolve_config_dir(cli.config_dir.as_deref());
    let config = SamlAuthConfig::load_config(cli.config_dir.as_deref())?;
    let settings = LoginSettings::resolve(cli.command.get_login_args(), config, &config_dir)?;
    debug!("Resolved login settings: {settings:?}");

    let provider = GoogleSamlLogin::new(&settings.idp_id, &settings.sp_id)
        .with_user_data_dir(settings.browser_profile_dir.clone())
        .with_timeout(settings.login_timeout);
    let cache = CacheManager::new(&settings.saml_file);
    let assertion = resolve_assertion(&provider, &cache, settings.no_cache).await?;

    let mut stdout = io::stdout().lock();
    match cli.command {
        Commands::Assume {
            role_arn,
            output,
            no_prompt,
            ..
        } => {
            let exchanger = StsCredentialExchanger::from_region(settings.region).await;
            let selector = pick_selector(no_prompt);
            assume::exec_assume(
                &assertion,
                ExecAssumeInputs {
                    role_arn: role_arn.as_deref(),
                    duration_seconds: settings.duration_seconds,
                    output,
                },
                &exchanger,
                selector.as_ref(),
                &mut stdout,
            )
            .await
        }
        Commands::ListRoles {
            arns_only,
            formatting,
            ..
        } => list_roles::exec_list_roles(
            &assertion,
            ExecListRolesInputs {
                arns_only,
                output: formatting.output,
                no_headers: formatting.no_headers,
            },
            &mut stdout,
        ),
        Commands::Batch {
            account_ids,
            role_name,
            partition,
            parallel,
            ..
        } => {
            let exchanger = StsCredentialExchanger::from_region(settings.region).await;
            batch::exec_batch(
                &assertion,
                ExecBatchInputs {
                    account_ids: &account_ids,
                    role_name: &role_name,
                    partition: &partition,
                    parallel,
                    duration_seconds: settings.duration_seconds,
                },
                &exchanger,
                &mut stdout,
            )
            .await
        }
        Commands::Assertion { .. } => assertion::exec_assertion(&assertion, &mut stdout),
    }
}
