use crate::{
    MarketData, Ticker,
    error::MarketError,
    quote::{Quote, RawQuote},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use formosa_integration::{
    ToolContent,
    client::ToolProcessClient,
    process::ToolProcessConfig,
    retry::RetryPolicy,
};
use std::time::Duration;
use tracing::debug;

/// Market data gateway backed by an external tool provider subprocess.
///
/// Tool names follow the provider's catalog (`get_taiwan_stock_price`,
/// `check_trading_day`, ...). When `skip_market_check` is set the trading-day gate always
/// reports an open market, which keeps local development useful on weekends.
#[derive(Debug, Clone)]
pub struct McpMarketGateway {
    client: ToolProcessClient,
    skip_market_check: bool,
}

impl McpMarketGateway {
    pub fn spawn(
        config: &ToolProcessConfig,
        call_timeout: Duration,
        retry: RetryPolicy,
        skip_market_check: bool,
    ) -> Result<Self, MarketError> {
        Ok(Self {
            client: ToolProcessClient::spawn(config, call_timeout, retry)?,
            skip_market_check,
        })
    }

    async fn call_value(
        &self,
        tool: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, MarketError> {
        let content = self.client.call_tool(tool, arguments).await?;
        Ok(content.into_value())
    }
}

#[async_trait]
impl MarketData for McpMarketGateway {
    async fn stock_price(&self, ticker: &Ticker) -> Result<Quote, MarketError> {
        let content = self
            .client
            .call_tool(
                "get_taiwan_stock_price",
                serde_json::json!({"ticker": ticker.as_str()}),
            )
            .await?;

        let payload = match content {
            ToolContent::Json(value) => value,
            ToolContent::Text { text, .. } => return Err(MarketError::Unusable(text)),
        };

        let raw: RawQuote = serde_json::from_value(payload.clone())
            .map_err(|_| MarketError::Unusable(payload.to_string()))?;

        let price = raw.price().ok_or_else(|| MarketError::MalformedQuote {
            ticker: ticker.clone(),
            field: "close",
            payload: payload.to_string(),
        })?;

        Ok(Quote {
            ticker: raw
                .ticker
                .map(Ticker::new)
                .unwrap_or_else(|| ticker.clone()),
            company_name: raw.company_name.unwrap_or_default(),
            price,
        })
    }

    async fn company_financials(
        &self,
        ticker: &Ticker,
    ) -> Result<serde_json::Value, MarketError> {
        self.call_value(
            "get_company_financials",
            serde_json::json!({"ticker": ticker.as_str()}),
        )
        .await
    }

    async fn is_trading_day(&self, date: NaiveDate) -> Result<bool, MarketError> {
        if self.skip_market_check {
            debug!(%date, "market check skipped via configuration");
            return Ok(true);
        }

        let value = self
            .call_value(
                "check_trading_day",
                serde_json::json!({"date": date.to_string()}),
            )
            .await?;

        value
            .get("is_trading_day")
            .and_then(serde_json::Value::as_bool)
            .ok_or_else(|| MarketError::Unusable(value.to_string()))
    }

    async fn holiday_info(&self, date: NaiveDate) -> Result<serde_json::Value, MarketError> {
        self.call_value(
            "get_holiday_info",
            serde_json::json!({"date": date.to_string()}),
        )
        .await
    }

    async fn margin_info(&self, ticker: &Ticker) -> Result<serde_json::Value, MarketError> {
        self.call_value(
            "get_margin_info",
            serde_json::json!({"ticker": ticker.as_str()}),
        )
        .await
    }

    async fn foreign_flows(&self, ticker: &Ticker) -> Result<serde_json::Value, MarketError> {
        self.call_value(
            "get_foreign_flows",
            serde_json::json!({"ticker": ticker.as_str()}),
        )
        .await
    }

    async fn dividends(&self, ticker: &Ticker) -> Result<serde_json::Value, MarketError> {
        self.call_value(
            "get_dividends",
            serde_json::json!({"ticker": ticker.as_str()}),
        )
        .await
    }
}
