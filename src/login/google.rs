use base64::{engine::general_purpose::STANDARD, Engine as _};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventRequestWillBeSent};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};
use url::{form_urlencoded, Url};

use super::ProvideAssertion;

const GOOGLE_SAML_INIT_URL: &str = "https://accounts.google.com/o/saml2/initsso";
const AWS_SAML_ENDPOINT: &str = "https://signin.aws.amazon.com/saml";
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not configure browser: {0}")]
    BrowserConfig(String),
    #[error("Could not create browser profile directory: {0}")]
    ProfileDir(#[from] std::io::Error),
    #[error("Browser error: {0}")]
    Browser(#[from] CdpError),
    #[error("Invalid login URL: {0}")]
    LoginUrl(#[from] url::ParseError),
    #[error("Timed out after {0:?} waiting for the SAML response")]
    Timeout(Duration),
    #[error("Browser closed before a SAML response was posted")]
    Closed,
}

/// Google Workspace acting as SAML identity provider for AWS.
pub struct GoogleSamlLogin {
    idp_id: String,
    sp_id: String,
    user_data_dir: Option<PathBuf>,
    timeout: Duration,
}

impl GoogleSamlLogin {
    pub fn new(idp_id: impl Into<String>, sp_id: impl Into<String>) -> Self {
        Self {
            idp_id: idp_id.into(),
            sp_id: sp_id.into(),
            user_data_dir: None,
            timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }

    /// Keeps browser state (Google session cookies) between logins.
    pub fn with_user_data_dir(mut self, user_data_dir: PathBuf) -> Self {
        self.user_data_dir = Some(user_data_dir);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn login_url(&self) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            GOOGLE_SAML_INIT_URL,
            &[
                ("idpid", self.idp_id.as_str()),
                ("spid", self.sp_id.as_str()),
                ("forceauthn", "false"),
            ],
        )
    }

    async fn launch_browser(&self) -> Result<Browser, Error> {
        let mut builder = BrowserConfig::builder()
            .with_head()
            .viewport(None)
            .args(vec!["--no-first-run", "--no-default-browser-check"]);
        if let Some(dir) = &self.user_data_dir {
            std::fs::create_dir_all(dir)?;
            builder = builder.user_data_dir(dir);
        }
        let config = builder.build().map_err(Error::BrowserConfig)?;

        let (browser, mut handler) = Browser::launch(config).await?;
        tokio::spawn(async move { while handler.next().await.is_some() {} });
        Ok(browser)
    }

    async fn capture_saml_response(&self, browser: &Browser) -> Result<String, Error> {
        let page = browser.new_page("about:blank").await?;
        page.execute(EnableParams::default()).await?;

        let (tx, rx) = oneshot::channel();
        let mut events = page.event_listener::<EventRequestWillBeSent>().await?;
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Some(saml) = extract_saml(&event) {
                    let _ = tx.send(saml);
                    return;
                }
            }
        });

        let login_url = self.login_url()?;
        debug!("Navigating to {login_url}");
        page.goto(login_url.as_str()).await?;
        info!("Please complete the Google sign-in in the browser window");

        rx.await.map_err(|_| Error::Closed)
    }
}

impl ProvideAssertion for GoogleSamlLogin {
    type Error = Error;

    async fn login(&self) -> Result<String, Self::Error> {
        info!("Starting browser authentication flow");
        let mut browser = self.launch_browser().await?;

        let result = tokio::time::timeout(self.timeout, self.capture_saml_response(&browser))
            .await
            .map_err(|_| Error::Timeout(self.timeout))
            .and_then(|captured| captured);

        browser.close().await.ok();
        browser.wait().await.ok();
        result
    }
}

fn extract_saml(event: &Arc<EventRequestWillBeSent>) -> Option<String> {
    let request = &event.request;
    if request.url != AWS_SAML_ENDPOINT || !request.has_post_data.unwrap_or(false) {
        return None;
    }
    let chunks: Vec<&str> = request
        .post_data_entries
        .as_ref()?
        .iter()
        .filter_map(|entry| entry.bytes.as_ref())
        .map(AsRef::<str>::as_ref)
        .collect();
    saml_from_post_chunks(&chunks)
}

/// Chrome reports the form body as base64 chunks, each padded on its own.
/// Plain form text is accepted too.
fn saml_from_post_chunks(chunks: &[&str]) -> Option<String> {
    decode_chunks(chunks)
        .and_then(|body| saml_response_field(&body))
        .or_else(|| saml_response_field(chunks.concat().as_bytes()))
}

fn decode_chunks(chunks: &[&str]) -> Option<Vec<u8>> {
    chunks.iter().try_fold(Vec::new(), |mut body, chunk| {
        body.extend(STANDARD.decode(chunk).ok()?);
        Some(body)
    })
}

fn saml_response_field(body: &[u8]) -> Option<String> {
    form_urlencoded::parse(body)
        .find(|(key, _)| key == "SAMLResponse")
        .map(|(_, value)| value.into_owned())
}
