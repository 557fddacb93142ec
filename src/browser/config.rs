use super::controller::Locator;
use std::time::Duration;

/// Login form controls on the portal's sign-in page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub username: Locator,
    pub password: Locator,
    pub submit: Locator,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            username: Locator::Css("input[name='username']".to_string()),
            password: Locator::Css("input[name='password']".to_string()),
            submit: Locator::XPath("//button[@type='submit']".to_string()),
        }
    }
}

/// Cookie consent overlay rendered inside a shadow root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentOverlay {
    /// Element that owns the shadow root
    pub shadow_host: String,
    /// Accept control, queried inside the shadow root
    pub accept_button: String,
}

impl Default for ConsentOverlay {
    fn default() -> Self {
        Self {
            shadow_host: "#usercentrics-root".to_string(),
            accept_button: "button[data-testid='uc-accept-all-button']".to_string(),
        }
    }
}

/// Configuration for the remote browser session
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Host of the already-running Chrome DevTools endpoint
    pub debug_host: String,

    /// Fixed remote debugging port
    pub debug_port: u16,

    /// Idle timeout for the DevTools websocket
    pub idle_timeout: Duration,

    /// Upper bound for a required control to appear
    pub element_timeout: Duration,

    /// Upper bound for the consent overlay to appear
    pub consent_timeout: Duration,

    /// Delay between polls while waiting
    pub poll_interval: Duration,

    /// Fixed wait after submitting the login form
    pub settle_delay: Duration,

    /// Scroll-and-wait cycles before snapshotting the holdings page
    pub scroll_cycles: u32,

    pub scroll_pause: Duration,

    pub login_form: LoginForm,

    pub consent: ConsentOverlay,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            debug_host: "127.0.0.1".to_string(),
            debug_port: 9222,
            idle_timeout: Duration::from_secs(120),
            element_timeout: Duration::from_secs(20),
            consent_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            settle_delay: Duration::from_secs(5),
            scroll_cycles: 3,
            scroll_pause: Duration::from_millis(1500),
            login_form: LoginForm::default(),
            consent: ConsentOverlay::default(),
        }
    }
}

impl BrowserConfig {
    /// Zero-delay configuration, for driving a fake page in tests
    pub fn instant() -> Self {
        Self {
            element_timeout: Duration::from_millis(50),
            consent_timeout: Duration::from_millis(30),
            poll_interval: Duration::from_millis(10),
            settle_delay: Duration::ZERO,
            scroll_pause: Duration::ZERO,
            ..Self::default()
        }
    }

    /// DevTools endpoint that reports the browser websocket URL
    pub fn version_endpoint(&self) -> String {
        format!("http://{}:{}/json/version", self.debug_host, self.debug_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert_eq!(config.debug_port, 9222);
        assert_eq!(config.scroll_cycles, 3);
        assert!(config.element_timeout > config.poll_interval);
    }

    #[test]
    fn test_version_endpoint() {
        let config = BrowserConfig {
            debug_port: 9333,
            ..BrowserConfig::default()
        };
        assert_eq!(config.version_endpoint(), "http://127.0.0.1:9333/json/version");
    }

    #[test]
    fn test_instant_mode() {
        let config = BrowserConfig::instant();
        assert_eq!(config.settle_delay, Duration::ZERO);
        assert!(config.element_timeout >= config.poll_interval);
    }
}
