//! Upstream source of daily currency rates.
//!
//! [`CbrFeed`] reads the Central Bank of Russia daily XML
//! (`XML_daily.asp?date_req=dd/mm/yyyy`), which quotes every currency in
//! roubles with a comma decimal separator.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;

use crate::{EngineError, ResultEngine};

/// One quote as published by the feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuotedRate {
    /// ISO 4217 code as the feed spells it.
    pub code: String,
    /// Base minor units per one major unit of the quoted currency.
    pub value: i64,
}

#[async_trait]
pub trait RateFeed: Send + Sync {
    /// Every rate the feed publishes for `date`.
    async fn fetch(&self, date: NaiveDate) -> ResultEngine<Vec<QuotedRate>>;
}

pub struct CbrFeed {
    url: String,
    http: reqwest::Client,
    valute: Regex,
    char_code: Regex,
    nominal: Regex,
    value: Regex,
}

impl CbrFeed {
    /// `url` is the feed address up to, and including, `date_req=`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> ResultEngine<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let compile =
            |pattern: &str| Regex::new(pattern).map_err(|e| EngineError::Upstream(e.to_string()));

        Ok(Self {
            url: url.into(),
            http,
            valute: compile(r"(?s)<Valute[^>]*>(.*?)</Valute>")?,
            char_code: compile(r"<CharCode>\s*([A-Z]{3})\s*</CharCode>")?,
            nominal: compile(r"<Nominal>\s*(\d+)\s*</Nominal>")?,
            value: compile(r"<Value>\s*([\d.,]+)\s*</Value>")?,
        })
    }

    fn parse(&self, body: &str) -> ResultEngine<Vec<QuotedRate>> {
        let mut quotes = Vec::new();
        for block in self.valute.captures_iter(body) {
            let block = &block[1];
            let (Some(code), Some(value)) =
                (self.char_code.captures(block), self.value.captures(block))
            else {
                continue;
            };
            let nominal = match self.nominal.captures(block) {
                Some(n) => n[1]
                    .parse::<i64>()
                    .map_err(|e| EngineError::Upstream(format!("bad nominal: {e}")))?,
                None => 1,
            };
            if nominal <= 0 {
                return Err(EngineError::Upstream(format!(
                    "non-positive nominal for {}",
                    &code[1]
                )));
            }

            quotes.push(QuotedRate {
                code: code[1].to_string(),
                value: parse_comma_rate(&value[1])? / nominal,
            });
        }

        if quotes.is_empty() {
            return Err(EngineError::Upstream(
                "feed response holds no quotes".to_string(),
            ));
        }
        Ok(quotes)
    }
}

#[async_trait]
impl RateFeed for CbrFeed {
    async fn fetch(&self, date: NaiveDate) -> ResultEngine<Vec<QuotedRate>> {
        let url = format!("{}{}", self.url, date.format("%d/%m/%Y"));
        tracing::debug!(%url, "fetching currency rates");

        let response = self.http.get(&url).send().await?.error_for_status()?;
        // The feed is windows-1251; only the ASCII tags matter here.
        let bytes = response.bytes().await?;
        self.parse(&String::from_utf8_lossy(&bytes))
    }
}

/// Converts a comma decimal such as `"92,5012"` to minor units (`9250`).
///
/// Fraction digits past the second are truncated.
pub fn parse_comma_rate(value: &str) -> ResultEngine<i64> {
    let invalid = || EngineError::Upstream(format!("malformed rate value: {value:?}"));
    let normalized = value.trim().replace('.', ",");
    let (major, fraction) = normalized.split_once(',').unwrap_or((&normalized, ""));

    if major.is_empty() || !major.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let cents: String = fraction.chars().chain("00".chars()).take(2).collect();
    major
        .parse::<i64>()
        .ok()
        .and_then(|m| m.checked_mul(100))
        .and_then(|m| m.checked_add(cents.parse::<i64>().ok()?))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="windows-1251"?>
<ValCurs Date="19.10.2026" name="Foreign Currency Market">
<Valute ID="R01235"><NumCode>840</NumCode><CharCode>USD</CharCode><Nominal>1</Nominal><Name>Dollar</Name><Value>92,5012</Value></Valute>
<Valute ID="R01375"><NumCode>156</NumCode><CharCode>CNY</CharCode><Nominal>10</Nominal><Name>Yuan</Name><Value>127,3400</Value></Valute>
<Valute ID="R01239"><NumCode>978</NumCode><CharCode>EUR</CharCode><Nominal>1</Nominal><Name>Euro</Name><Value>100,1</Value></Valute>
</ValCurs>"#;

    #[test]
    fn comma_rates_truncate_to_minor_units() {
        assert_eq!(parse_comma_rate("92,5012").unwrap(), 9250);
        assert_eq!(parse_comma_rate("100,1").unwrap(), 10010);
        assert_eq!(parse_comma_rate("7").unwrap(), 700);
        assert_eq!(parse_comma_rate("0,0199").unwrap(), 1);
    }

    #[test]
    fn malformed_rates_are_upstream_errors() {
        for bad in ["", ",5", "abc", "12,3x", "1,2,3"] {
            assert!(
                matches!(parse_comma_rate(bad), Err(EngineError::Upstream(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn parses_daily_xml() {
        let feed = CbrFeed::new("http://localhost/?date_req=", Duration::from_secs(1)).unwrap();
        let quotes = feed.parse(SAMPLE).unwrap();
        assert_eq!(
            quotes,
            vec![
                QuotedRate {
                    code: "USD".to_string(),
                    value: 9250
                },
                QuotedRate {
                    code: "CNY".to_string(),
                    value: 1273
                },
                QuotedRate {
                    code: "EUR".to_string(),
                    value: 10010
                },
            ]
        );
    }

    #[test]
    fn empty_document_is_an_error() {
        let feed = CbrFeed::new("http://localhost/?date_req=", Duration::from_secs(1)).unwrap();
        assert!(feed.parse("<ValCurs></ValCurs>").is_err());
    }
}
