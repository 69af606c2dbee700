use crate::core::config::RatesConfig;
use crate::core::currency::{RateSource, RateTable};
use crate::core::error::RateError;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Client for a date-versioned currency API serving one JSON document per base
/// currency and day, shaped as `{"<base>": {"<code>": <rate>, ...}}`.
///
/// The service has no data after `cutoff`; later (or unspecified) dates are
/// requested as the cutoff date.
pub struct CurrencyApiClient {
    url_template: String,
    cutoff: NaiveDate,
    client: reqwest::Client,
}

impl CurrencyApiClient {
    pub fn new(url_template: &str, cutoff: NaiveDate, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxledger/1.0")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            url_template: url_template.to_string(),
            cutoff,
            client,
        })
    }

    pub fn from_config(config: &RatesConfig) -> Result<Self> {
        Self::new(
            &config.url_template,
            config.cutoff_date,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn cutoff(&self) -> NaiveDate {
        self.cutoff
    }

    fn url_for(&self, base: &str, date: NaiveDate) -> String {
        self.url_template
            .replace("{date}", &date.format("%Y-%m-%d").to_string())
            .replace("{base}", base)
    }
}

#[async_trait]
impl RateSource for CurrencyApiClient {
    fn effective_date(&self, requested: Option<NaiveDate>) -> NaiveDate {
        match requested {
            Some(date) if date <= self.cutoff => date,
            _ => self.cutoff,
        }
    }

    #[instrument(name = "CurrencyApiFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(
        &self,
        base: &str,
        date: Option<NaiveDate>,
    ) -> Result<RateTable, RateError> {
        let base = base.to_lowercase();
        let url = self.url_for(&base, self.effective_date(date));
        debug!("Requesting exchange rates from {}", url);

        let unavailable = |source: reqwest::Error| {
            error!(error = %source, %url, "Error fetching exchange rates");
            RateError::UpstreamUnavailable {
                url: url.clone(),
                source,
            }
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(unavailable)?;

        let mut body: HashMap<String, Value> = response.json().await.map_err(unavailable)?;

        let inner = body.remove(&base).ok_or_else(|| {
            error!(%url, "Rate service response has no '{}' table", base);
            RateError::UpstreamFormat(format!("missing '{base}' rate table in response"))
        })?;

        let rates: RateTable = serde_json::from_value(inner).map_err(|e| {
            error!(error = %e, %url, "Malformed rate table");
            RateError::UpstreamFormat(format!("malformed '{base}' rate table: {e}"))
        })?;

        if rates.is_empty() {
            return Err(RateError::UpstreamFormat(format!(
                "empty '{base}' rate table in response"
            )));
        }

        debug!(count = rates.len(), "Received exchange rates");
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cutoff() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    fn client_for(server: &MockServer) -> CurrencyApiClient {
        let template = format!("{}/{{date}}/currencies/{{base}}.json", server.uri());
        CurrencyApiClient::new(&template, cutoff(), Duration::from_secs(2)).unwrap()
    }

    async fn mount(server: &MockServer, request_path: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(response)
            .mount(server)
            .await;
    }

    const EUR_BODY: &str = r#"{
        "date": "2024-03-01",
        "eur": {"usd": 1.0835, "rub": 98.71, "ton": 0.31}
    }"#;

    #[test]
    fn test_effective_date_clamps_to_cutoff() {
        let client =
            CurrencyApiClient::new("http://localhost/{date}/{base}", cutoff(), Duration::from_secs(1))
                .unwrap();
        let before = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let after = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        assert_eq!(client.effective_date(Some(before)), before);
        assert_eq!(client.effective_date(Some(cutoff())), cutoff());
        assert_eq!(client.effective_date(Some(after)), cutoff());
        assert_eq!(client.effective_date(None), cutoff());
    }

    #[test]
    fn test_url_for_fills_template() {
        let client = CurrencyApiClient::new(
            "https://cdn.example/@{date}/v1/currencies/{base}.json",
            cutoff(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.url_for("eur", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            "https://cdn.example/@2024-03-01/v1/currencies/eur.json"
        );
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/2024-03-01/currencies/eur.json",
            ResponseTemplate::new(200).set_body_string(EUR_BODY),
        )
        .await;

        let client = client_for(&server);
        let rates = client
            .fetch_rates("EUR", NaiveDate::from_ymd_opt(2024, 3, 1))
            .await
            .unwrap();

        assert_eq!(rates.len(), 3);
        assert_eq!(rates.get("usd"), Some(&1.0835));
        assert_eq!(rates.get("ton"), Some(&0.31));
    }

    #[tokio::test]
    async fn test_fetch_after_cutoff_requests_cutoff_date() {
        let server = MockServer::start().await;
        let body = r#"{"usd": {"eur": 0.92}}"#;
        Mock::given(method("GET"))
            .and(path("/2024-04-01/currencies/usd.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let late = client
            .fetch_rates("usd", NaiveDate::from_ymd_opt(2025, 6, 30))
            .await
            .unwrap();
        let latest = client.fetch_rates("usd", None).await.unwrap();
        assert_eq!(late, latest);
    }

    #[tokio::test]
    async fn test_missing_base_key_is_format_error() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/2024-03-01/currencies/eur.json",
            ResponseTemplate::new(200).set_body_string(r#"{"usd": {"eur": 0.92}}"#),
        )
        .await;

        let client = client_for(&server);
        let err = client
            .fetch_rates("eur", NaiveDate::from_ymd_opt(2024, 3, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, RateError::UpstreamFormat(_)));
        assert!(err.to_string().contains("missing 'eur' rate table"));
    }

    #[tokio::test]
    async fn test_non_numeric_rates_are_format_error() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/2024-03-01/currencies/eur.json",
            ResponseTemplate::new(200).set_body_string(r#"{"eur": {"usd": "1.08"}}"#),
        )
        .await;

        let client = client_for(&server);
        let err = client
            .fetch_rates("eur", NaiveDate::from_ymd_opt(2024, 3, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, RateError::UpstreamFormat(_)));
    }

    #[tokio::test]
    async fn test_empty_rate_table_is_format_error() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/2024-03-01/currencies/eur.json",
            ResponseTemplate::new(200).set_body_string(r#"{"eur": {}}"#),
        )
        .await;

        let client = client_for(&server);
        let err = client
            .fetch_rates("eur", NaiveDate::from_ymd_opt(2024, 3, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, RateError::UpstreamFormat(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/2024-03-01/currencies/eur.json",
            ResponseTemplate::new(500),
        )
        .await;

        let client = client_for(&server);
        let err = client
            .fetch_rates("eur", NaiveDate::from_ymd_opt(2024, 3, 1))
            .await
            .unwrap_err();
        match err {
            RateError::UpstreamUnavailable { url, source } => {
                assert!(url.ends_with("/2024-03-01/currencies/eur.json"));
                assert_eq!(source.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
            }
            other => panic!("Expected UpstreamUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_unavailable() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/2024-03-01/currencies/eur.json",
            ResponseTemplate::new(200).set_body_string("<html>not json</html>"),
        )
        .await;

        let client = client_for(&server);
        let err = client
            .fetch_rates("eur", NaiveDate::from_ymd_opt(2024, 3, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, RateError::UpstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/2024-03-01/currencies/eur.json",
            ResponseTemplate::new(200)
                .set_body_string(EUR_BODY)
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let template = format!("{}/{{date}}/currencies/{{base}}.json", server.uri());
        let client =
            CurrencyApiClient::new(&template, cutoff(), Duration::from_millis(100)).unwrap();
        let err = client
            .fetch_rates("eur", NaiveDate::from_ymd_opt(2024, 3, 1))
            .await
            .unwrap_err();
        match err {
            RateError::UpstreamUnavailable { source, .. } => assert!(source.is_timeout()),
            other => panic!("Expected UpstreamUnavailable, got {other:?}"),
        }
    }
}
