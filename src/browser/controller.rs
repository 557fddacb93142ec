use super::manager::BrowserError;
use crate::models::Cookie;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How to find an element on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locator {
    #[serde(rename = "css")]
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css `{}`", s),
            Locator::XPath(s) => write!(f, "xpath `{}`", s),
        }
    }
}

/// Everything the login flow needs from a browser page
///
/// The production implementation drives a Chrome tab; tests substitute a
/// scripted fake so the login flow runs without a browser.
pub trait PageController {
    fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Number of elements currently matching `locator`
    fn count(&self, locator: &Locator) -> Result<usize, BrowserError>;

    /// Click the first element matching `locator`
    fn click(&self, locator: &Locator) -> Result<(), BrowserError>;

    /// Focus the first element matching `locator` and type `text` into it
    fn type_into(&self, locator: &Locator, text: &str) -> Result<(), BrowserError>;

    /// Evaluate a JavaScript expression and return its JSON value
    fn run_script(&self, script: &str) -> Result<serde_json::Value, BrowserError>;

    /// Cookies visible to the current page
    fn cookies(&self) -> Result<Vec<Cookie>, BrowserError>;

    /// Serialized DOM of the current page
    fn content(&self) -> Result<String, BrowserError>;

    fn pause(&self, duration: Duration);

    /// Release the page once the run is over
    fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }

    fn find_element(&self, locator: &Locator) -> Result<bool, BrowserError> {
        Ok(self.count(locator)? > 0)
    }

    /// Poll `predicate` every `poll` until it returns true
    ///
    /// Gives up after `timeout / poll` attempts. Errors from the predicate
    /// count as "not yet".
    fn wait_for<F>(
        &self,
        what: &str,
        timeout: Duration,
        poll: Duration,
        mut predicate: F,
    ) -> Result<(), BrowserError>
    where
        Self: Sized,
        F: FnMut(&Self) -> Result<bool, BrowserError>,
    {
        let attempts = (timeout.as_millis() / poll.as_millis().max(1)).max(1);

        for attempt in 1..=attempts {
            match predicate(self) {
                Ok(true) => {
                    log::debug!("{} ready after {} attempt(s)", what, attempt);
                    return Ok(());
                }
                Ok(false) => {}
                Err(e) => log::debug!("Polling {} failed: {}", what, e),
            }
            if attempt < attempts {
                self.pause(poll);
            }
        }

        Err(BrowserError::Timeout(what.to_string()))
    }

    /// Wait until an element matching `locator` is present
    fn wait_for_element(
        &self,
        locator: &Locator,
        timeout: Duration,
        poll: Duration,
    ) -> Result<(), BrowserError>
    where
        Self: Sized,
    {
        self.wait_for(&locator.to_string(), timeout, poll, |page| {
            page.find_element(locator)
        })
    }

    /// Scroll to the bottom of the page
    fn scroll_to_bottom(&self) -> Result<(), BrowserError> {
        self.run_script("window.scrollTo(0, document.body.scrollHeight); true")
            .map(|_| ())
    }
}
