use crate::Ticker;
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Current market quote for one ticker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct Quote {
    pub ticker: Ticker,
    pub company_name: String,
    /// Latest close / last traded price.
    pub price: Decimal,
}

/// Raw quote payload shape produced by the market tool provider.
///
/// Numeric fields arrive as JSON numbers or numeric strings depending on the provider
/// version; [`RawQuote::price`] normalises both.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawQuote {
    #[serde(alias = "symbol")]
    pub ticker: Option<String>,
    #[serde(alias = "name", alias = "company")]
    pub company_name: Option<String>,
    #[serde(alias = "close", alias = "last_price", alias = "current_price")]
    pub price: Option<serde_json::Value>,
}

impl RawQuote {
    pub(crate) fn price(&self) -> Option<Decimal> {
        match self.price.as_ref()? {
            serde_json::Value::String(s) => s.trim().parse().ok(),
            serde_json::Value::Number(n) => n.to_string().parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_raw_quote_price_from_number_and_string() {
        let raw: RawQuote =
            serde_json::from_value(serde_json::json!({"ticker": "2330", "close": 512.5})).unwrap();
        assert_eq!(raw.price(), Some(dec!(512.5)));

        let raw: RawQuote =
            serde_json::from_value(serde_json::json!({"ticker": "2330", "close": "512.5"}))
                .unwrap();
        assert_eq!(raw.price(), Some(dec!(512.5)));
    }

    #[test]
    fn test_raw_quote_price_missing() {
        let raw: RawQuote = serde_json::from_value(serde_json::json!({"ticker": "2330"})).unwrap();
        assert_eq!(raw.price(), None);
    }
}
