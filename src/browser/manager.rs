use super::config::BrowserConfig;
use headless_chrome::{Browser, Tab};
use serde::Deserialize;
use std::sync::Arc;

/// Subset of the DevTools `/json/version` response
#[derive(Debug, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "Browser", default)]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// Handle on an already-running Chrome instance
///
/// The browser is never launched or shut down from here; dropping the
/// manager only closes the websocket.
pub struct BrowserManager {
    browser: Browser,
}

impl BrowserManager {
    /// Ask the DevTools endpoint for the browser websocket URL
    pub async fn discover(config: &BrowserConfig) -> Result<VersionInfo, BrowserError> {
        let endpoint = config.version_endpoint();
        log::info!("Querying DevTools endpoint {}", endpoint);

        let client = reqwest::Client::builder()
            .timeout(config.idle_timeout)
            .build()
            .map_err(|e| BrowserError::ConnectionError(e.to_string()))?;

        let response = client
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| discovery_error(&endpoint, e))?;

        let info = response
            .json::<VersionInfo>()
            .await
            .map_err(|e| discovery_error(&endpoint, e))?;

        log::info!("Found {} at {}", info.browser, info.web_socket_debugger_url);
        Ok(info)
    }

    /// Attach to the browser behind `ws_url`
    pub fn connect(ws_url: &str, config: &BrowserConfig) -> Result<Self, BrowserError> {
        let browser = Browser::connect_with_timeout(ws_url.to_string(), config.idle_timeout)
            .map_err(|e| BrowserError::ConnectionError(format!("{}: {}", ws_url, e)))?;

        Ok(Self { browser })
    }

    /// Open a fresh tab for the login flow
    pub fn new_tab(&self) -> Result<Arc<Tab>, BrowserError> {
        self.browser
            .new_tab()
            .map_err(|e| BrowserError::TabCreationError(e.to_string()))
    }
}

fn discovery_error(endpoint: &str, e: reqwest::Error) -> BrowserError {
    if e.is_timeout() {
        BrowserError::Timeout(format!("DevTools endpoint {}", endpoint))
    } else {
        BrowserError::ConnectionError(format!("{}: {}", endpoint, e))
    }
}

/// Errors that can occur during browser operations
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Browser connection failed: {0}")]
    ConnectionError(String),

    #[error("Tab creation failed: {0}")]
    TabCreationError(String),

    #[error("Tab close failed: {0}")]
    TabCloseError(String),

    #[error("Navigation error: {0}")]
    NavigationError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("JavaScript execution error: {0}")]
    JavaScriptError(String),

    #[error("Cookie retrieval failed: {0}")]
    CookieError(String),

    #[error("HTML extraction error: {0}")]
    HtmlExtractionError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{ChromePage, PageController};
    use std::time::Duration;

    #[test]
    fn test_version_info_parsing() {
        let body = r#"{
            "Browser": "Chrome/121.0.6167.85",
            "Protocol-Version": "1.3",
            "User-Agent": "Mozilla/5.0",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/5b1c"
        }"#;
        let info: VersionInfo = serde_json::from_str(body).unwrap();
        assert_eq!(info.browser, "Chrome/121.0.6167.85");
        assert_eq!(
            info.web_socket_debugger_url,
            "ws://127.0.0.1:9222/devtools/browser/5b1c"
        );
    }

    #[tokio::test]
    async fn test_discover_fails_without_browser() {
        // nothing listens on port 1
        let config = BrowserConfig {
            debug_port: 1,
            ..BrowserConfig::default()
        };
        let err = BrowserManager::discover(&config).await.unwrap_err();
        assert!(matches!(err, BrowserError::ConnectionError(_)));
    }

    #[tokio::test]
    async fn test_discover_gives_up_on_silent_endpoint() {
        // accepts the connection, never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = BrowserConfig {
            debug_host: "127.0.0.1".to_string(),
            debug_port: listener.local_addr().unwrap().port(),
            idle_timeout: Duration::from_millis(200),
            ..BrowserConfig::default()
        };

        let err = BrowserManager::discover(&config).await.unwrap_err();
        assert!(matches!(err, BrowserError::Timeout(ref what) if what.contains("json/version")), "got {:?}", err);
        drop(listener);
    }

    #[test]
    #[ignore] // Requires Chrome running with --remote-debugging-port=9222
    fn test_connect_to_running_browser() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let config = BrowserConfig::default();
        let info = rt.block_on(BrowserManager::discover(&config)).unwrap();
        let manager = BrowserManager::connect(&info.web_socket_debugger_url, &config).unwrap();
        let page = ChromePage::new(manager.new_tab().unwrap());
        assert!(page.close().is_ok());
    }
}
