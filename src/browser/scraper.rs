use super::controller::{Locator, PageController};
use super::manager::BrowserError;
use crate::models::Cookie;
use chrono::DateTime;
use headless_chrome::{Element, Tab};
use std::sync::Arc;
use std::time::Duration;

/// Hides the most common automation markers from page scripts
const STEALTH_SCRIPT: &str = r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined
    });
    Object.defineProperty(navigator, 'languages', {
        get: () => ['de-DE', 'de', 'en-US', 'en']
    });
    true
"#;

/// `PageController` backed by a Chrome tab
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    /// Override the tab's user agent and accepted languages
    pub fn set_user_agent(&self, user_agent: &str) -> Result<(), BrowserError> {
        self.tab
            .set_user_agent(user_agent, Some("de-DE,de;q=0.9,en;q=0.8"), None)
            .map_err(|e| BrowserError::JavaScriptError(format!("User agent override failed: {}", e)))
    }

    fn element(&self, locator: &Locator) -> Result<Element<'_>, BrowserError> {
        let found = match locator {
            Locator::Css(selector) => self.tab.find_element(selector),
            Locator::XPath(query) => self.tab.find_element_by_xpath(query),
        };
        found.map_err(|e| BrowserError::ElementNotFound(format!("{}: {}", locator, e)))
    }
}

/// JavaScript expression counting matches for `locator`
pub(crate) fn count_script(locator: &Locator) -> String {
    // serde_json gives a correctly escaped JS string literal
    match locator {
        Locator::Css(selector) => format!(
            "document.querySelectorAll({}).length",
            serde_json::Value::from(selector.as_str())
        ),
        Locator::XPath(query) => format!(
            "document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength",
            serde_json::Value::from(query.as_str())
        ),
    }
}

impl PageController for ChromePage {
    fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        log::info!("Browser navigating to: {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| BrowserError::NavigationError(format!("Failed to navigate to {}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| BrowserError::NavigationError(format!("Navigation timeout for {}: {}", url, e)))?;

        self.run_script(STEALTH_SCRIPT)?;
        Ok(())
    }

    fn count(&self, locator: &Locator) -> Result<usize, BrowserError> {
        let value = self.run_script(&count_script(locator))?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    fn click(&self, locator: &Locator) -> Result<(), BrowserError> {
        self.element(locator)?
            .click()
            .map_err(|e| BrowserError::JavaScriptError(format!("Click on {} failed: {}", locator, e)))?;
        Ok(())
    }

    fn type_into(&self, locator: &Locator, text: &str) -> Result<(), BrowserError> {
        let element = self.element(locator)?;
        element
            .click()
            .map_err(|e| BrowserError::JavaScriptError(format!("Focus on {} failed: {}", locator, e)))?;
        element
            .type_into(text)
            .map_err(|e| BrowserError::JavaScriptError(format!("Typing into {} failed: {}", locator, e)))?;
        Ok(())
    }

    fn run_script(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    fn cookies(&self) -> Result<Vec<Cookie>, BrowserError> {
        let cookies = self
            .tab
            .get_cookies()
            .map_err(|e| BrowserError::CookieError(e.to_string()))?;

        Ok(cookies
            .into_iter()
            .map(|c| Cookie {
                expires: if c.session || c.expires <= 0.0 {
                    None
                } else {
                    DateTime::from_timestamp(c.expires as i64, 0)
                },
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
            })
            .collect())
    }

    fn content(&self) -> Result<String, BrowserError> {
        self.tab
            .get_content()
            .map_err(|e| BrowserError::HtmlExtractionError(e.to_string()))
    }

    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn close(&self) -> Result<(), BrowserError> {
        self.tab
            .close(true)
            .map_err(|e| BrowserError::TabCloseError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_script_escapes_selector() {
        let script = count_script(&Locator::Css("input[name='username']".to_string()));
        assert_eq!(
            script,
            r#"document.querySelectorAll("input[name='username']").length"#
        );

        let script = count_script(&Locator::XPath(r#"//button[@type="submit"]"#.to_string()));
        assert!(script.starts_with(r#"document.evaluate("//button[@type=\"submit\"]""#));
        assert!(script.ends_with(".snapshotLength"));
    }

    #[test]
    #[ignore] // Requires Chrome running with --remote-debugging-port=9222
    fn test_chrome_page_navigation() {
        use crate::browser::{BrowserConfig, BrowserManager};

        let rt = tokio::runtime::Runtime::new().unwrap();
        let config = BrowserConfig::default();
        let info = rt.block_on(BrowserManager::discover(&config)).unwrap();
        let manager = BrowserManager::connect(&info.web_socket_debugger_url, &config).unwrap();
        let page = ChromePage::new(manager.new_tab().unwrap());

        page.navigate("https://example.com").unwrap();
        assert!(page.find_element(&Locator::Css("h1".to_string())).unwrap());
        assert!(page.content().unwrap().contains("Example"));
        page.close().unwrap();
    }
}
