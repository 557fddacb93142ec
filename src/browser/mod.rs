//! Browser automation for the portal login
//!
//! Connects to a Chrome instance that is already running with remote
//! debugging enabled, signs in through the login form and snapshots the
//! rendered holdings page. All page interaction goes through
//! [`PageController`], so the login flow can run against a fake page.
//!
//! # Example
//!
//! ```no_run
//! use portfolio_scraper::browser::{BrowserConfig, BrowserManager, ChromePage, PageController};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BrowserConfig::default();
//! let info = BrowserManager::discover(&config).await?;
//!
//! let manager = BrowserManager::connect(&info.web_socket_debugger_url, &config)?;
//! let page = ChromePage::new(manager.new_tab()?);
//!
//! page.navigate("https://example.com")?;
//! println!("Extracted {} bytes of HTML", page.content()?.len());
//! page.close()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod login;
pub mod manager;
pub mod scraper;

pub use config::{BrowserConfig, ConsentOverlay, LoginForm};
pub use controller::{Locator, PageController};
pub use login::BrowserLogin;
pub use manager::{BrowserError, BrowserManager};
pub use scraper::ChromePage;
