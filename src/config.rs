use crate::browser::{BrowserConfig, ConsentOverlay, Locator, LoginForm};
use crate::error::{Result, ScrapeError};
use crate::http_client::HttpClientConfig;
use crate::models::ClientHeaders;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const LOGIN_ENV: &str = "SCALABLE_LOGIN";
pub const PASSWORD_ENV: &str = "SCALABLE_PASSWORD";

/// How the session is established and the holdings fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Form POST + cookie jar, then the JSON data endpoint
    #[default]
    Http,
    /// Remote Chrome session, then the rendered holdings table
    Browser,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PortalConfig {
    /// Form endpoint for the HTTP strategy
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Sign-in page opened by the browser strategy
    #[serde(default = "default_login_page_url")]
    pub login_page_url: String,

    /// Host whose cookies make up the session
    #[serde(default = "default_target_host")]
    pub target_host: String,

    /// JSON endpoint fetched after an HTTP login
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Rendered holdings page for the browser strategy
    #[serde(default = "default_holdings_url")]
    pub holdings_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Referer sent with the login POST
    #[serde(default = "default_login_referer")]
    pub login_referer: String,

    /// Referer replayed with the session on later requests
    #[serde(default = "default_session_referer")]
    pub session_referer: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_true")]
    pub enable_compression: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    #[serde(default = "default_element_timeout")]
    pub element_timeout_secs: u64,

    #[serde(default = "default_consent_timeout")]
    pub consent_timeout_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,

    #[serde(default = "default_scroll_cycles")]
    pub scroll_cycles: u32,

    #[serde(default = "default_scroll_pause")]
    pub scroll_pause_ms: u64,

    #[serde(default = "default_username_locator")]
    pub username: Locator,

    #[serde(default = "default_password_locator")]
    pub password: Locator,

    #[serde(default = "default_submit_locator")]
    pub submit: Locator,

    #[serde(default = "default_consent_host")]
    pub consent_shadow_host: String,

    #[serde(default = "default_consent_button")]
    pub consent_accept_button: String,
}

/// CSS selectors for the rendered holdings table
///
/// `name` and `isin_link` are matched across the whole page; the rest are
/// matched inside the n-th `row`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SelectorConfig {
    #[serde(default = "default_row_selector")]
    pub row: String,
    #[serde(default = "default_name_selector")]
    pub name: String,
    #[serde(default = "default_isin_link_selector")]
    pub isin_link: String,
    #[serde(default = "default_value_selector")]
    pub value: String,
    #[serde(default = "default_shares_selector")]
    pub shares: String,
    #[serde(default = "default_price_selector")]
    pub price: String,
    #[serde(default = "default_savings_plan_selector")]
    pub savings_plan: String,
}

fn default_true() -> bool { true }
fn default_login_url() -> String { "https://secure.scalable.capital/u/login".to_string() }
fn default_login_page_url() -> String { "https://secure.scalable.capital/u/login".to_string() }
fn default_target_host() -> String { "secure.scalable.capital".to_string() }
fn default_api_url() -> String { "https://de.scalable.capital/broker/api/data".to_string() }
fn default_holdings_url() -> String { "https://de.scalable.capital/broker/portfolio".to_string() }
fn default_user_agent() -> String { "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string() }
fn default_login_referer() -> String { "https://secure.scalable.capital/login".to_string() }
fn default_session_referer() -> String { "https://secure.scalable.capital".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_debug_port() -> u16 { 9222 }
fn default_element_timeout() -> u64 { 20 }
fn default_consent_timeout() -> u64 { 10 }
fn default_poll_interval() -> u64 { 250 }
fn default_settle_delay() -> u64 { 5 }
fn default_scroll_cycles() -> u32 { 3 }
fn default_scroll_pause() -> u64 { 1500 }
fn default_username_locator() -> Locator { LoginForm::default().username }
fn default_password_locator() -> Locator { LoginForm::default().password }
fn default_submit_locator() -> Locator { LoginForm::default().submit }
fn default_consent_host() -> String { ConsentOverlay::default().shadow_host }
fn default_consent_button() -> String { ConsentOverlay::default().accept_button }
fn default_row_selector() -> String { "div[data-testid='portfolio-item']".to_string() }
fn default_name_selector() -> String { "div[data-testid='portfolio-item'] div[aria-label='Security name']".to_string() }
fn default_isin_link_selector() -> String { "div[data-testid='portfolio-item'] a[href*='isin=']".to_string() }
fn default_value_selector() -> String { "span[aria-label='Position value']".to_string() }
fn default_shares_selector() -> String { "span[aria-label='Number of shares']".to_string() }
fn default_price_selector() -> String { "span[aria-label='Current price']".to_string() }
fn default_savings_plan_selector() -> String { "[aria-label='Savings plan active']".to_string() }

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            login_page_url: default_login_page_url(),
            target_host: default_target_host(),
            api_url: default_api_url(),
            holdings_url: default_holdings_url(),
            user_agent: default_user_agent(),
            login_referer: default_login_referer(),
            session_referer: default_session_referer(),
            timeout_secs: default_timeout(),
            enable_compression: true,
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            debug_port: default_debug_port(),
            element_timeout_secs: default_element_timeout(),
            consent_timeout_secs: default_consent_timeout(),
            poll_interval_ms: default_poll_interval(),
            settle_delay_secs: default_settle_delay(),
            scroll_cycles: default_scroll_cycles(),
            scroll_pause_ms: default_scroll_pause(),
            username: default_username_locator(),
            password: default_password_locator(),
            submit: default_submit_locator(),
            consent_shadow_host: default_consent_host(),
            consent_accept_button: default_consent_button(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            row: default_row_selector(),
            name: default_name_selector(),
            isin_link: default_isin_link_selector(),
            value: default_value_selector(),
            shares: default_shares_selector(),
            price: default_price_selector(),
            savings_plan: default_savings_plan_selector(),
        }
    }
}

impl Config {
    /// Read `path`, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ScrapeError::Configuration(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
            .map_err(|e| ScrapeError::Configuration(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

impl PortalConfig {
    /// HTTP client settings for the session establisher
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
            login_referer: self.login_referer.clone(),
            session_referer: self.session_referer.clone(),
            enable_gzip: self.enable_compression,
        }
    }

    /// Headers a browser-established session replays
    pub fn client_headers(&self) -> ClientHeaders {
        ClientHeaders {
            user_agent: self.user_agent.clone(),
            referer: self.session_referer.clone(),
        }
    }
}

impl BrowserSettings {
    pub fn browser_config(&self) -> BrowserConfig {
        BrowserConfig {
            debug_port: self.debug_port,
            element_timeout: Duration::from_secs(self.element_timeout_secs),
            consent_timeout: Duration::from_secs(self.consent_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            settle_delay: Duration::from_secs(self.settle_delay_secs),
            scroll_cycles: self.scroll_cycles,
            scroll_pause: Duration::from_millis(self.scroll_pause_ms),
            login_form: LoginForm {
                username: self.username.clone(),
                password: self.password.clone(),
                submit: self.submit.clone(),
            },
            consent: ConsentOverlay {
                shadow_host: self.consent_shadow_host.clone(),
                accept_button: self.consent_accept_button.clone(),
            },
            ..BrowserConfig::default()
        }
    }
}

/// Portal login, read from the environment
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read `SCALABLE_LOGIN` and `SCALABLE_PASSWORD`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ScrapeError::Configuration(format!("{} is not set", key)))
        };

        Ok(Self::new(read(LOGIN_ENV)?, read(PASSWORD_ENV)?))
    }
}

/// Load variables from a `.env` file, if there is one
///
/// Returns `Ok(false)` when the file does not exist. A file that exists but
/// cannot be read or parsed is a configuration error.
pub fn load_env_file(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(ScrapeError::Configuration(format!(
            "Cannot load {}: {}",
            path.display(),
            e
        ))),
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
