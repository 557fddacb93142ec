//! One linear run: credentials, session, fetch, extract, report
//!
//! Every step either succeeds or ends the run; nothing is retried.

use crate::browser::{BrowserError, BrowserLogin, BrowserManager, ChromePage, PageController};
use crate::config::{Config, Credentials, Strategy};
use crate::error::Result;
use crate::extractor::{decode_json, HoldingsExtractor};
use crate::http_client::PortalHttpClient;
use crate::models::PortfolioLine;
use crate::reporter::Reporter;
use serde_json::{Map, Value};
use std::io::Write;

/// HTTP strategy: form login, then the JSON data endpoint
///
/// Returns the decoded object, or `None` when the endpoint did not answer
/// with JSON.
pub async fn run_http<W: Write>(
    config: &Config,
    credentials: &Credentials,
    reporter: &mut Reporter<W>,
) -> Result<Option<Map<String, Value>>> {
    let portal = &config.portal;
    let client = PortalHttpClient::with_config(portal.http_client_config())?;

    let session = client
        .login(&portal.login_url, &portal.target_host, credentials)
        .await?;
    let content = client.fetch_api(&session, &portal.api_url).await?;

    let data = decode_json(&content)?;
    if let Some(data) = &data {
        reporter.report_json(data)?;
    }
    Ok(data)
}

/// Browser strategy on an already opened page: login, render, extract
pub fn run_browser_on<P: PageController, W: Write>(
    page: P,
    config: &Config,
    credentials: Credentials,
    reporter: &mut Reporter<W>,
) -> Result<Vec<PortfolioLine>> {
    // Compile selectors before touching the portal
    let extractor =
        HoldingsExtractor::new(&config.selectors)?.with_base_url(&config.portal.holdings_url)?;

    let login = BrowserLogin::new(
        page,
        config.browser.browser_config(),
        &config.portal,
        credentials,
    );
    let scraped = scrape_holdings(&login, &extractor, &config.portal.holdings_url);
    close_page(login.page());

    let lines = scraped?;
    reporter.report_lines(&lines)?;
    Ok(lines)
}

fn scrape_holdings<P: PageController>(
    login: &BrowserLogin<P>,
    extractor: &HoldingsExtractor,
    holdings_url: &str,
) -> Result<Vec<PortfolioLine>> {
    login.establish()?;
    let html = login.render_holdings(holdings_url)?;
    extractor.extract(&html)
}

/// The tab lives in the user's browser; never leave it behind
fn close_page<P: PageController>(page: &P) {
    if let Err(e) = page.close() {
        log::warn!("Failed to close browser tab: {}", e);
    }
}

/// Browser strategy against the Chrome instance on the configured debug port
pub async fn run_browser<W: Write + Send + 'static>(
    config: &Config,
    credentials: Credentials,
    mut reporter: Reporter<W>,
) -> Result<Vec<PortfolioLine>> {
    let browser_config = config.browser.browser_config();
    let info = BrowserManager::discover(&browser_config).await?;

    let config = config.clone();
    let ws_url = info.web_socket_debugger_url;

    // headless_chrome blocks; keep it off the async workers
    tokio::task::spawn_blocking(move || -> Result<Vec<PortfolioLine>> {
        let manager = BrowserManager::connect(&ws_url, &browser_config)?;
        let page = ChromePage::new(manager.new_tab()?);
        if let Err(e) = page.set_user_agent(&config.portal.user_agent) {
            close_page(&page);
            return Err(e.into());
        }
        run_browser_on(page, &config, credentials, &mut reporter)
    })
    .await
    .map_err(|e| BrowserError::ConnectionError(format!("browser task failed: {}", e)))?
}

/// Run the configured strategy, reporting to stdout
pub async fn run(config: &Config, strategy: Strategy, credentials: Credentials) -> Result<()> {
    log::info!("Running {:?} strategy", strategy);
    match strategy {
        Strategy::Http => {
            let mut reporter = Reporter::stdout();
            run_http(config, &credentials, &mut reporter).await?;
        }
        Strategy::Browser => {
            run_browser(config, credentials, Reporter::stdout()).await?;
        }
    }
    Ok(())
}
