//! Hand-off of a payload file to the workflow dispatch endpoint.
//!
//! Two deliverers share one contract: [`HttpDispatcher`] POSTs the file,
//! [`Preview`] renders the equivalent `curl` line and sends nothing.

use crate::error::{EssdevError, Result};
use reqwest::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const TOKEN_VAR: &str = "GH_DISPATCH_TOKEN";
pub const URL_VAR: &str = "GH_DISPATCH_URL";

pub const DRY_RUN_TOKEN: &str = "DRY_RUN_TOKEN";
pub const PLACEHOLDER_URL: &str = "https://api.github.com/repos/OWNER/REPO/dispatches";

pub const ACCEPT: &str = "application/vnd.github+json";
pub const GITHUB_API_VERSION: &str = "2022-11-28";
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("instance-params/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Settings and request description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub token: Option<String>,
    pub url: Option<String>,
    pub timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            token: None,
            url: None,
            timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }
}

impl DispatchSettings {
    /// Token and URL, or placeholders when `dry_run` allows them.
    fn credentials(&self, dry_run: bool) -> Result<(String, String)> {
        let token = self.token.as_deref().filter(|s| !s.is_empty());
        let url = self.url.as_deref().filter(|s| !s.is_empty());
        match (token, url) {
            (Some(token), Some(url)) => Ok((token.to_string(), url.to_string())),
            _ if dry_run => Ok((
                token.unwrap_or(DRY_RUN_TOKEN).to_string(),
                url.unwrap_or(PLACEHOLDER_URL).to_string(),
            )),
            _ => {
                let missing: Vec<&str> = [(TOKEN_VAR, token), (URL_VAR, url)]
                    .into_iter()
                    .filter(|(_, value)| value.is_none())
                    .map(|(name, _)| name)
                    .collect();
                Err(EssdevError::MissingDispatchConfig {
                    missing: missing.join(" and "),
                })
            }
        }
    }
}

/// Everything needed to issue (or show) the dispatch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body_path: PathBuf,
}

pub fn build_request(
    payload: &Path,
    settings: &DispatchSettings,
    dry_run: bool,
) -> Result<DispatchRequest> {
    let (token, url) = settings.credentials(dry_run)?;
    Ok(DispatchRequest {
        method: "POST",
        url,
        headers: vec![
            ("Accept", ACCEPT.to_string()),
            ("Authorization", format!("Bearer {token}")),
            ("X-GitHub-Api-Version", GITHUB_API_VERSION.to_string()),
        ],
        body_path: payload.to_path_buf(),
    })
}

impl DispatchRequest {
    /// A single-line `curl` invocation equivalent to this request.
    pub fn to_curl(&self) -> String {
        let mut parts = vec![
            "curl".to_string(),
            "-sS".to_string(),
            "-X".to_string(),
            self.method.to_string(),
        ];
        for (name, value) in &self.headers {
            parts.push("-H".to_string());
            parts.push(shell_quote(&format!("{name}: {value}")));
        }
        parts.push(shell_quote(&self.url));
        parts.push("-d".to_string());
        parts.push(shell_quote(&format!("@{}", self.body_path.display())));
        parts.join(" ")
    }
}

fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

// ---------------------------------------------------------------------------
// Deliverers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent { status: u16 },
    Previewed { command: String },
}

pub trait Deliver {
    fn deliver(&self, payload: &Path) -> Result<Delivery>;
}

/// Pick the deliverer for a run. Missing configuration fails here, before
/// anything is written, unless this is a dry run.
pub fn deliverer(settings: &DispatchSettings, dry_run: bool) -> Result<Box<dyn Deliver>> {
    if dry_run {
        Ok(Box::new(Preview::new(settings.clone())))
    } else {
        Ok(Box::new(HttpDispatcher::new(settings.clone())?))
    }
}

pub struct HttpDispatcher {
    settings: DispatchSettings,
    client: reqwest::blocking::Client,
}

impl HttpDispatcher {
    pub fn new(settings: DispatchSettings) -> Result<Self> {
        settings.credentials(false)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { settings, client })
    }
}

impl Deliver for HttpDispatcher {
    fn deliver(&self, payload: &Path) -> Result<Delivery> {
        let request = build_request(payload, &self.settings, false)?;
        let body = std::fs::read(&request.body_path)?;

        let mut builder = self
            .client
            .post(&request.url)
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        let resp = builder.body(body).send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(EssdevError::DispatchFailed {
                url: request.url,
                status: status.as_u16(),
                body,
            });
        }
        info!(url = %request.url, status = status.as_u16(), "payload dispatched");
        Ok(Delivery::Sent {
            status: status.as_u16(),
        })
    }
}

pub struct Preview {
    settings: DispatchSettings,
}

impl Preview {
    pub fn new(settings: DispatchSettings) -> Self {
        Self { settings }
    }
}

impl Deliver for Preview {
    fn deliver(&self, payload: &Path) -> Result<Delivery> {
        let request = build_request(payload, &self.settings, true)?;
        Ok(Delivery::Previewed {
            command: request.to_curl(),
        })
    }
}
