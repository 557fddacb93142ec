//! Helper functions shared by the HTTP and browser paths
//!
//! - Recovering an ISIN from a holding's detail link
//! - Cookie domain matching
//! - Content-type and text normalization
//!
//! # Examples
//!
//! ```
//! use portfolio_scraper::helpers::{isin_from_link, normalize_text};
//!
//! let isin = isin_from_link("https://de.scalable.capital/broker/security?isin=DE0001234567&other=x", None);
//! assert_eq!(isin.as_deref(), Some("DE0001234567"));
//!
//! assert_eq!(normalize_text("  iShares \n Core  MSCI "), "iShares Core MSCI");
//! ```

use reqwest::Url;

/// Read the `isin` query parameter from a link
///
/// Relative links are resolved against `base` when one is given. Returns
/// `None` when the link cannot be parsed or has no non-empty `isin` parameter.
pub fn isin_from_link(link: &str, base: Option<&Url>) -> Option<String> {
    let url = match base {
        Some(base) => base.join(link).ok()?,
        None => Url::parse(link).ok()?,
    };

    url.query_pairs()
        .find(|(key, _)| key.eq_ignore_ascii_case("isin"))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// RFC 6265 style domain match; a leading dot on the cookie domain is ignored
pub fn domain_matches(cookie_domain: &str, host: &str) -> bool {
    let domain = cookie_domain.trim_start_matches('.').to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// True for `application/json` and `application/*+json`, parameters ignored
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Collapse runs of whitespace and trim
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isin_from_absolute_link() {
        let link = "https://de.scalable.capital/broker/security?isin=DE0001234567&other=x";
        assert_eq!(isin_from_link(link, None).as_deref(), Some("DE0001234567"));
    }

    #[test]
    fn test_isin_parameter_order_does_not_matter() {
        let link = "https://de.scalable.capital/broker/security?other=x&isin=IE00B4L5Y983";
        assert_eq!(isin_from_link(link, None).as_deref(), Some("IE00B4L5Y983"));
    }

    #[test]
    fn test_isin_from_relative_link() {
        let base = Url::parse("https://de.scalable.capital/broker/portfolio").unwrap();
        let link = "/broker/security?isin=US0378331005";
        assert_eq!(
            isin_from_link(link, Some(&base)).as_deref(),
            Some("US0378331005")
        );
        // relative link without a base cannot be resolved
        assert_eq!(isin_from_link(link, None), None);
    }

    #[test]
    fn test_isin_missing_parameter() {
        assert_eq!(
            isin_from_link("https://de.scalable.capital/broker/security?id=42", None),
            None
        );
        assert_eq!(
            isin_from_link("https://de.scalable.capital/broker/security?isin=", None),
            None
        );
    }

    #[test]
    fn test_domain_matches() {
        assert!(domain_matches("secure.scalable.capital", "secure.scalable.capital"));
        assert!(domain_matches(".scalable.capital", "secure.scalable.capital"));
        assert!(domain_matches("scalable.capital", "de.scalable.capital"));
        assert!(!domain_matches("scalable.capital.evil.com", "secure.scalable.capital"));
        assert!(!domain_matches("notscalable.capital", "scalable.capital"));
        assert!(!domain_matches("", "scalable.capital"));
    }

    #[test]
    fn test_json_content_type() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(!is_json_content_type("text/html; charset=utf-8"));
        assert!(!is_json_content_type(""));
    }
}
