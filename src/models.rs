use crate::error::{Result, ScrapeError};
use crate::helpers::domain_matches;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static ISIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}[A-Z0-9]{9}[0-9]$").expect("static ISIN pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: Option<DateTime<Utc>>,
}

impl Cookie {
    /// Cookie with the host as domain, root path and no expiry
    pub fn host_only(name: &str, value: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: host.to_string(),
            path: "/".to_string(),
            expires: None,
        }
    }
}

/// Headers sent with every request so the portal sees a regular browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHeaders {
    pub user_agent: String,
    pub referer: String,
}

/// Authenticated request context for one run
///
/// Only constructible with at least one cookie scoped to `target_host`.
#[derive(Debug, Clone)]
pub struct Session {
    target_host: String,
    cookies: Vec<Cookie>,
    headers: ClientHeaders,
}

impl Session {
    /// Keep the cookies that belong to `target_host`; fail if none do.
    pub fn establish(
        target_host: &str,
        cookies: Vec<Cookie>,
        headers: ClientHeaders,
    ) -> Result<Self> {
        let total = cookies.len();
        let cookies: Vec<Cookie> = cookies
            .into_iter()
            .filter(|c| domain_matches(&c.domain, target_host))
            .collect();

        if cookies.is_empty() {
            return Err(ScrapeError::Authentication(format!(
                "no session cookies for {} ({} cookies seen for other domains)",
                target_host, total
            )));
        }

        Ok(Self {
            target_host: target_host.to_string(),
            cookies,
            headers,
        })
    }

    pub fn target_host(&self) -> &str {
        &self.target_host
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn headers(&self) -> &ClientHeaders {
        &self.headers
    }

    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    /// Value for an explicit `Cookie:` request header
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// International Securities Identification Number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isin(String);

impl Isin {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn country_code(&self) -> &str {
        &self.0[..2]
    }
}

impl FromStr for Isin {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase();
        if ISIN_RE.is_match(&normalized) {
            Ok(Isin(normalized))
        } else {
            Err(ScrapeError::InvalidIsin(s.to_string()))
        }
    }
}

impl TryFrom<String> for Isin {
    type Error = ScrapeError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Isin> for String {
    fn from(isin: Isin) -> Self {
        isin.0
    }
}

impl fmt::Display for Isin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One holding from the portfolio table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioLine {
    pub name: String,
    pub isin: Isin,
    /// Position value in the portal's local formatting, e.g. "1.234,56 €"
    pub value: Option<String>,
    pub shares: Option<String>,
    pub price: Option<String>,
    pub savings_plan: Option<bool>,
}

/// Raw result of the authenticated API call
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> ClientHeaders {
        ClientHeaders {
            user_agent: "test-agent".to_string(),
            referer: "https://secure.scalable.capital/login".to_string(),
        }
    }

    #[test]
    fn test_isin_parsing() {
        let isin: Isin = "DE0001234567".parse().unwrap();
        assert_eq!(isin.as_str(), "DE0001234567");
        assert_eq!(isin.country_code(), "DE");

        let isin: Isin = " ie00b4l5y983 ".parse().unwrap();
        assert_eq!(isin.as_str(), "IE00B4L5Y983");
    }

    #[test]
    fn test_isin_rejects_malformed() {
        assert!("DE000123456".parse::<Isin>().is_err()); // 11 chars
        assert!("DE000123456X".parse::<Isin>().is_err()); // non-digit check char
        assert!("1E0001234567".parse::<Isin>().is_err());
        assert!("".parse::<Isin>().is_err());
    }

    #[test]
    fn test_session_requires_target_cookie() {
        let cookies = vec![Cookie::host_only("tracking", "x", "ads.example.com")];
        let err = Session::establish("secure.scalable.capital", cookies, headers()).unwrap_err();
        assert!(matches!(err, ScrapeError::Authentication(_)));

        let err = Session::establish("secure.scalable.capital", vec![], headers()).unwrap_err();
        assert!(matches!(err, ScrapeError::Authentication(_)));
    }

    #[test]
    fn test_session_keeps_only_matching_cookies() {
        let cookies = vec![
            Cookie::host_only("session", "abc123", "secure.scalable.capital"),
            Cookie::host_only("consent", "1", ".scalable.capital"),
            Cookie::host_only("tracking", "x", "ads.example.com"),
        ];
        let session = Session::establish("secure.scalable.capital", cookies, headers()).unwrap();
        assert_eq!(session.cookies().len(), 2);
        assert_eq!(session.cookie_header(), "session=abc123; consent=1");
        assert!(session.cookie("tracking").is_none());
    }

    #[test]
    fn test_portfolio_line_serializes_isin_as_string() {
        let line = PortfolioLine {
            name: "Vanguard FTSE All-World".to_string(),
            isin: "IE00BK5BQT80".parse().unwrap(),
            value: None,
            shares: Some("12,5".to_string()),
            price: None,
            savings_plan: Some(true),
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["isin"], "IE00BK5BQT80");
        assert!(json["value"].is_null());
    }
}
