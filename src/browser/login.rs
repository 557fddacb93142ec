use super::config::{BrowserConfig, ConsentOverlay};
use super::controller::{Locator, PageController};
use super::manager::BrowserError;
use crate::config::{Credentials, PortalConfig};
use crate::error::Result;
use crate::models::{ClientHeaders, Session};

/// Script that clicks the consent accept control inside its shadow root
///
/// Evaluates to `true` once the control was found and clicked.
pub fn consent_script(consent: &ConsentOverlay) -> String {
    format!(
        r#"(() => {{
    const host = document.querySelector({host});
    const root = host && host.shadowRoot;
    const button = root && root.querySelector({button});
    if (!button) return false;
    button.click();
    return true;
}})()"#,
        host = serde_json::Value::from(consent.shadow_host.as_str()),
        button = serde_json::Value::from(consent.accept_button.as_str()),
    )
}

/// Browser-driven session establisher
pub struct BrowserLogin<P: PageController> {
    page: P,
    config: BrowserConfig,
    login_url: String,
    target_host: String,
    headers: ClientHeaders,
    credentials: Credentials,
}

impl<P: PageController> BrowserLogin<P> {
    pub fn new(page: P, config: BrowserConfig, portal: &PortalConfig, credentials: Credentials) -> Self {
        Self {
            page,
            config,
            login_url: portal.login_page_url.clone(),
            target_host: portal.target_host.clone(),
            headers: portal.client_headers(),
            credentials,
        }
    }

    /// Open the login page, sign in and collect the session cookies
    pub fn establish(&self) -> Result<Session> {
        self.page.navigate(&self.login_url)?;

        if !self.dismiss_consent() {
            log::warn!("No consent overlay found, continuing");
        }

        let form = &self.config.login_form;
        self.wait_for_control("username field", &form.username)?;
        self.wait_for_control("password field", &form.password)?;
        self.wait_for_control("submit button", &form.submit)?;

        log::info!("Submitting login form as {}", self.credentials.username);
        self.page.type_into(&form.username, &self.credentials.username)?;
        self.page.type_into(&form.password, &self.credentials.password)?;
        self.page.click(&form.submit)?;

        log::info!("Waiting {:?} for the login to settle", self.config.settle_delay);
        self.page.pause(self.config.settle_delay);

        let cookies = self.page.cookies()?;
        let session = Session::establish(&self.target_host, cookies, self.headers.clone())?;
        log::info!(
            "Browser login successful, {} session cookie(s)",
            session.cookies().len()
        );
        Ok(session)
    }

    /// Click through the consent overlay if it shows up in time
    pub fn dismiss_consent(&self) -> bool {
        let script = consent_script(&self.config.consent);
        let accepted = self.page.wait_for(
            "consent overlay",
            self.config.consent_timeout,
            self.config.poll_interval,
            |page| Ok(page.run_script(&script)?.as_bool() == Some(true)),
        );

        match accepted {
            Ok(()) => {
                log::info!("Consent overlay dismissed");
                true
            }
            Err(e) => {
                log::debug!("Consent overlay not dismissed: {}", e);
                false
            }
        }
    }

    fn wait_for_control(&self, what: &str, locator: &Locator) -> Result<()> {
        self.page
            .wait_for_element(locator, self.config.element_timeout, self.config.poll_interval)
            .map_err(|e| match e {
                BrowserError::Timeout(_) => BrowserError::Timeout(format!("{} ({})", what, locator)),
                other => other,
            })?;
        Ok(())
    }

    /// Load the holdings page, scroll to trigger lazy loading, return the DOM
    pub fn render_holdings(&self, url: &str) -> Result<String> {
        self.page.navigate(url)?;

        for cycle in 1..=self.config.scroll_cycles {
            log::debug!("Scroll cycle {}/{}", cycle, self.config.scroll_cycles);
            self.page.scroll_to_bottom()?;
            self.page.pause(self.config.scroll_pause);
        }

        Ok(self.page.content()?)
    }

    pub fn page(&self) -> &P {
        &self.page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consent_script_pierces_shadow_root() {
        let script = consent_script(&ConsentOverlay::default());
        assert!(script.contains(r##"document.querySelector("#usercentrics-root")"##));
        assert!(script.contains("host.shadowRoot"));
        assert!(script.contains(r#"root.querySelector("button[data-testid='uc-accept-all-button']")"#));
    }
}
