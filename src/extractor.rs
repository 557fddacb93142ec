//! Turns fetched content into portfolio data
//!
//! Two paths, matching the two fetch strategies:
//!
//! - [`decode_json`] decodes the API response into a generic JSON object,
//!   without mapping it onto any schema.
//! - [`HoldingsExtractor`] queries a rendered holdings page with CSS
//!   selectors and builds [`PortfolioLine`]s.
//!
//! Names and ISIN links are collected as two parallel lists, which must have
//! equal length. Value, shares, price and the savings-plan flag are looked up
//! in the row holding each name and may be absent without failing the run.
//! Rows are paired with names by position, so their count must match too.

use crate::config::SelectorConfig;
use crate::error::{Result, ScrapeError};
use crate::helpers::{is_json_content_type, isin_from_link, normalize_text};
use crate::models::{FetchedContent, Isin, PortfolioLine};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

/// Decode a JSON API response
///
/// Returns `Ok(None)` with a logged advisory when the content type is not
/// JSON; the body is not decoded in that case.
pub fn decode_json(content: &FetchedContent) -> Result<Option<Map<String, Value>>> {
    let content_type = content.content_type.as_deref().unwrap_or("");
    if !is_json_content_type(content_type) {
        log::warn!(
            "Response from {} is not JSON ({}), check the body for errors",
            content.url,
            if content_type.is_empty() { "no content type" } else { content_type }
        );
        return Ok(None);
    }

    let data: Map<String, Value> = serde_json::from_str(&content.body)?;
    log::info!("Decoded JSON object with {} top-level keys", data.len());
    Ok(Some(data))
}

fn parse_selector(field: &str, css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ScrapeError::Configuration(format!("Invalid {} selector `{}`: {}", field, css, e)))
}

/// Compiled holdings-table selectors
#[derive(Debug, Clone)]
pub struct HoldingsExtractor {
    row: Selector,
    name: Selector,
    isin_link: Selector,
    value: Selector,
    shares: Selector,
    price: Selector,
    savings_plan: Selector,
    base_url: Option<Url>,
}

impl HoldingsExtractor {
    pub fn new(selectors: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            row: parse_selector("row", &selectors.row)?,
            name: parse_selector("name", &selectors.name)?,
            isin_link: parse_selector("isin_link", &selectors.isin_link)?,
            value: parse_selector("value", &selectors.value)?,
            shares: parse_selector("shares", &selectors.shares)?,
            price: parse_selector("price", &selectors.price)?,
            savings_plan: parse_selector("savings_plan", &selectors.savings_plan)?,
            base_url: None,
        })
    }

    /// Resolve relative ISIN links against the page they came from
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        let url = Url::parse(base)
            .map_err(|e| ScrapeError::Configuration(format!("Bad page URL {}: {}", base, e)))?;
        self.base_url = Some(url);
        Ok(self)
    }

    /// Extract every holding from an HTML snapshot, in document order
    pub fn extract(&self, html: &str) -> Result<Vec<PortfolioLine>> {
        let document = Html::parse_document(html);

        let names: Vec<String> = document
            .select(&self.name)
            .map(|e| normalize_text(&e.text().collect::<String>()))
            .collect();
        let links: Vec<Option<String>> = document
            .select(&self.isin_link)
            .map(|e| e.value().attr("href").map(|s| s.to_string()))
            .collect();

        if names.len() != links.len() {
            return Err(ScrapeError::CardinalityMismatch {
                names: names.len(),
                identifiers: links.len(),
            });
        }

        // Rows without a name (cash, headers, pending orders) are not holdings
        let (rows, skipped): (Vec<ElementRef>, Vec<ElementRef>) = document
            .select(&self.row)
            .partition(|r| r.select(&self.name).next().is_some());
        if !skipped.is_empty() {
            log::debug!("Skipped {} rows without a security name", skipped.len());
        }
        if rows.is_empty() && !names.is_empty() {
            log::warn!("No holding rows found; detail fields will be missing");
        } else if rows.len() != names.len() {
            return Err(ScrapeError::RowMismatch {
                names: names.len(),
                rows: rows.len(),
            });
        }

        let mut lines = Vec::with_capacity(names.len());
        for (index, (name, link)) in names.into_iter().zip(links).enumerate() {
            let isin = self.isin(link.as_deref().unwrap_or(""))?;
            let row = rows.get(index).copied();

            let line = PortfolioLine {
                value: self.row_text(row, &self.value, "value", &name),
                shares: self.row_text(row, &self.shares, "shares", &name),
                price: self.row_text(row, &self.price, "price", &name),
                savings_plan: row.map(|r| r.select(&self.savings_plan).next().is_some()),
                name,
                isin,
            };
            lines.push(line);
        }

        log::info!("Extracted {} portfolio lines", lines.len());
        Ok(lines)
    }

    fn isin(&self, link: &str) -> Result<Isin> {
        let raw = isin_from_link(link, self.base_url.as_ref()).ok_or_else(|| {
            ScrapeError::MissingIsin {
                link: link.to_string(),
            }
        })?;
        raw.parse()
    }

    fn row_text(
        &self,
        row: Option<ElementRef<'_>>,
        selector: &Selector,
        field: &str,
        name: &str,
    ) -> Option<String> {
        let text = row
            .and_then(|r| r.select(selector).next())
            .map(|e| normalize_text(&e.text().collect::<String>()))
            .filter(|t| !t.is_empty());

        if text.is_none() {
            log::warn!("No {} found for {}", field, name);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetched(content_type: Option<&str>, body: &str) -> FetchedContent {
        FetchedContent {
            url: "https://de.scalable.capital/broker/api/data".to_string(),
            status: 200,
            content_type: content_type.map(|s| s.to_string()),
            body: body.to_string(),
        }
    }

    fn selectors() -> SelectorConfig {
        SelectorConfig {
            row: "tr.holding".to_string(),
            name: "tr.holding td.name".to_string(),
            isin_link: "tr.holding a.detail".to_string(),
            value: "td.value".to_string(),
            shares: "td.shares".to_string(),
            price: "td.price".to_string(),
            savings_plan: "span.plan".to_string(),
        }
    }

    #[test]
    fn test_decode_json_object() {
        let content = fetched(
            Some("application/json; charset=utf-8"),
            r#"{"portfolio": {"value": 1234.5}, "currency": "EUR"}"#,
        );
        let data = decode_json(&content).unwrap().unwrap();
        assert_eq!(data["currency"], "EUR");
        assert_eq!(data["portfolio"]["value"], 1234.5);
    }

    #[test]
    fn test_non_json_content_type_is_advisory() {
        // body would not decode; it must not be attempted
        let content = fetched(Some("text/html"), "<html>Please log in</html>");
        assert!(decode_json(&content).unwrap().is_none());

        let content = fetched(None, "{}");
        assert!(decode_json(&content).unwrap().is_none());
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let content = fetched(Some("application/json"), "{\"truncated\": ");
        assert!(matches!(decode_json(&content), Err(ScrapeError::Decode(_))));
    }

    #[test]
    fn test_invalid_selector_is_configuration_error() {
        let mut config = selectors();
        config.price = "td[".to_string();
        let err = HoldingsExtractor::new(&config).unwrap_err();
        assert!(matches!(err, ScrapeError::Configuration(ref m) if m.contains("price")));
    }

    #[test]
    fn test_link_without_href_is_missing_isin() {
        let html = r#"<table><tr class="holding"><td class="name">X</td><td><a class="detail">x</a></td></tr></table>"#;
        let extractor = HoldingsExtractor::new(&selectors()).unwrap();
        let err = extractor.extract(html).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingIsin { ref link } if link.is_empty()));
    }

    #[test]
    fn test_nameless_row_does_not_shift_details() {
        let html = r#"<table>
            <tr class="holding"><td class="value">500,00 € CASH</td></tr>
            <tr class="holding"><td class="name">Apple Inc.</td>
                <td><a class="detail" href="https://x.test/s?isin=US0378331005">x</a></td>
                <td class="value">603,30 €</td></tr>
        </table>"#;
        let extractor = HoldingsExtractor::new(&selectors()).unwrap();
        let lines = extractor.extract(html).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].value.as_deref(), Some("603,30 €"));
    }

    #[test]
    fn test_row_holding_two_names_is_row_mismatch() {
        let html = r#"<table>
            <tr class="holding">
                <td class="name">A</td><td><a class="detail" href="https://x.test/s?isin=US0378331005">a</a></td>
                <td class="name">B</td><td><a class="detail" href="https://x.test/s?isin=IE00BK5BQT80">b</a></td>
            </tr>
        </table>"#;
        let extractor = HoldingsExtractor::new(&selectors()).unwrap();
        let err = extractor.extract(html).unwrap_err();
        assert!(matches!(err, ScrapeError::RowMismatch { names: 2, rows: 1 }), "got {:?}", err);
    }

    #[test]
    fn test_empty_page_yields_no_lines() {
        let extractor = HoldingsExtractor::new(&selectors()).unwrap();
        assert!(extractor.extract("<html><body></body></html>").unwrap().is_empty());
    }
}
