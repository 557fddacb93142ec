use crate::config::Credentials;
use crate::error::{Result, ScrapeError};
use crate::models::{ClientHeaders, Cookie, FetchedContent, Session};
use chrono::{DateTime, Utc};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, Url};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the portal HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Referer for the login POST
    pub login_referer: String,
    /// Referer replayed with the session afterwards
    pub session_referer: String,
    pub enable_gzip: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string(),
            login_referer: "https://secure.scalable.capital/login".to_string(),
            session_referer: "https://secure.scalable.capital".to_string(),
            enable_gzip: true,
        }
    }
}

/// HTTP client that logs into the portal and replays its session cookies
pub struct PortalHttpClient {
    client: Client,
    jar: Arc<Jar>,
    config: HttpClientConfig,
}

impl PortalHttpClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        let jar = Arc::new(Jar::default());

        // Default headers that mimic a real browser
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("de-DE,de;q=0.9,en;q=0.8"),
        );

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .cookie_provider(Arc::clone(&jar))
            .gzip(config.enable_gzip)
            .brotli(config.enable_gzip)
            .redirect(reqwest::redirect::Policy::limited(10))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            jar,
            config,
        })
    }

    /// POST the credentials as a form and collect the resulting session
    ///
    /// The login counts as successful only when the final response is 2xx
    /// and the jar holds at least one cookie for `target_host`.
    pub async fn login(
        &self,
        login_url: &str,
        target_host: &str,
        credentials: &Credentials,
    ) -> Result<Session> {
        log::info!("Logging in at {} as {}", login_url, credentials.username);

        let login = Url::parse(login_url)
            .map_err(|e| ScrapeError::Configuration(format!("Bad login URL {}: {}", login_url, e)))?;

        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];

        let response = self
            .client
            .post(login.clone())
            .header(header::REFERER, &self.config.login_referer)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        log::debug!("Login response {} from {}", status, response.url());

        let set_cookies: HashMap<String, Cookie> = response
            .cookies()
            .map(|c| {
                let cookie = Cookie {
                    name: c.name().to_string(),
                    value: c.value().to_string(),
                    domain: c.domain().unwrap_or(target_host).to_string(),
                    path: c.path().unwrap_or("/").to_string(),
                    expires: c.expires().map(DateTime::<Utc>::from),
                };
                (cookie.name.clone(), cookie)
            })
            .collect();

        if !status.is_success() {
            return Err(ScrapeError::Authentication(format!(
                "login returned HTTP {}",
                status
            )));
        }

        let target = Url::parse(&format!("{}://{}/", login.scheme(), target_host))
            .map_err(|e| ScrapeError::Configuration(format!("Bad target host {}: {}", target_host, e)))?;
        let cookies = self.jar_cookies(&target, target_host, &set_cookies);

        let session = Session::establish(target_host, cookies, self.client_headers())?;
        log::info!(
            "Login successful, {} session cookie(s) stored",
            session.cookies().len()
        );
        Ok(session)
    }

    /// Cookies the jar would send to `target`, enriched with attributes
    /// from the login response where it set them
    fn jar_cookies(
        &self,
        target: &Url,
        target_host: &str,
        set_cookies: &HashMap<String, Cookie>,
    ) -> Vec<Cookie> {
        let Some(header) = self.jar.cookies(target) else {
            return Vec::new();
        };
        let Ok(header) = header.to_str() else {
            log::warn!("Session cookie header is not valid ASCII");
            return Vec::new();
        };

        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .map(|(name, value)| match set_cookies.get(name) {
                Some(cookie) if cookie.value == value => cookie.clone(),
                _ => Cookie::host_only(name, value, target_host),
            })
            .collect()
    }

    /// Authenticated GET of a JSON endpoint
    ///
    /// Cookies are attached explicitly since the endpoint may live on a
    /// different host than the one that issued them.
    pub async fn fetch_api(&self, session: &Session, url: &str) -> Result<FetchedContent> {
        log::info!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .header(header::COOKIE, session.cookie_header())
            .header(header::USER_AGENT, &session.headers().user_agent)
            .header(header::REFERER, &session.headers().referer)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Response(format!(
                "GET {} returned HTTP {}",
                url, status
            )));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        log::info!(
            "Response Content-Type: {}",
            content_type.as_deref().unwrap_or("<none>")
        );

        let body = response.text().await?;
        log::debug!("Response body: {}", body);

        Ok(FetchedContent {
            url: url.to_string(),
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    fn client_headers(&self) -> ClientHeaders {
        ClientHeaders {
            user_agent: self.config.user_agent.clone(),
            referer: self.config.session_referer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = PortalHttpClient::new();
        assert!(client.is_ok());
    }

    #[test]
    fn test_jar_cookies_scoped_to_target() {
        let client = PortalHttpClient::new().unwrap();
        let secure = Url::parse("https://secure.scalable.capital/u/login").unwrap();
        let other = Url::parse("https://tracker.example.com/").unwrap();
        client.jar.add_cookie_str("session=abc123; Path=/", &secure);
        client.jar.add_cookie_str("tracking=1; Path=/", &other);

        let target = Url::parse("https://secure.scalable.capital/").unwrap();
        let cookies = client.jar_cookies(&target, "secure.scalable.capital", &HashMap::new());
        assert_eq!(
            cookies,
            vec![Cookie::host_only("session", "abc123", "secure.scalable.capital")]
        );
    }

    #[test]
    fn test_jar_cookies_enriched_from_response() {
        let client = PortalHttpClient::new().unwrap();
        let secure = Url::parse("https://secure.scalable.capital/").unwrap();
        client.jar.add_cookie_str("session=abc123; Path=/", &secure);

        let expires = DateTime::from_timestamp(1_900_000_000, 0);
        let mut set_cookies = HashMap::new();
        set_cookies.insert(
            "session".to_string(),
            Cookie {
                name: "session".to_string(),
                value: "abc123".to_string(),
                domain: ".scalable.capital".to_string(),
                path: "/".to_string(),
                expires,
            },
        );

        let cookies = client.jar_cookies(&secure, "secure.scalable.capital", &set_cookies);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].domain, ".scalable.capital");
        assert_eq!(cookies[0].expires, expires);
    }

    #[test]
    fn test_jar_empty_for_unknown_host() {
        let client = PortalHttpClient::new().unwrap();
        let target = Url::parse("https://secure.scalable.capital/").unwrap();
        assert!(client
            .jar_cookies(&target, "secure.scalable.capital", &HashMap::new())
            .is_empty());
    }
}
