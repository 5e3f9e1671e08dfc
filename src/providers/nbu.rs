use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::rate::ReferenceRateProvider;

/// Official exchange rates published daily by the National Bank of Ukraine.
pub struct NbuRateProvider {
    base_url: String,
    currency: String,
}

impl NbuRateProvider {
    pub fn new(base_url: &str, currency: &str) -> Self {
        NbuRateProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            currency: currency.to_uppercase(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NbuRateEntry {
    rate: f64,
    #[serde(default)]
    cc: Option<String>,
    #[serde(default, alias = "exchangedate")]
    exchange_date: Option<String>,
}

#[async_trait]
impl ReferenceRateProvider for NbuRateProvider {
    fn currency(&self) -> &str {
        &self.currency
    }

    #[instrument(name = "NbuRateFetch", skip(self), fields(currency = %self.currency))]
    async fn fetch_rate(&self) -> Result<f64> {
        let url = format!(
            "{}/NBUStatService/v1/statdirectory/exchange?valcode={}&json",
            self.base_url, self.currency
        );
        debug!("Requesting reference rate from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("dealrate/0.1")
            .build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency: {}", e, self.currency))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency: {}",
                response.status(),
                self.currency
            ));
        }

        let text = response.text().await?;
        let entries: Vec<NbuRateEntry> = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", self.currency, e))?;

        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No rate data found for currency: {}", self.currency))?;

        debug!(
            rate = entry.rate,
            cc = ?entry.cc,
            date = ?entry.exchange_date,
            "Received NBU rate"
        );
        Ok(entry.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EXCHANGE_PATH: &str = "/NBUStatService/v1/statdirectory/exchange";

    async fn create_mock_server(currency: &str, template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(EXCHANGE_PATH))
            .and(query_param("valcode", currency))
            .respond_with(template)
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_response = r#"[
            {
                "r030": 840,
                "txt": "Долар США",
                "rate": 39.5,
                "cc": "USD",
                "exchangedate": "20.10.2026"
            }
        ]"#;
        let mock_server = create_mock_server(
            "USD",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let provider = NbuRateProvider::new(&mock_server.uri(), "usd");
        assert_eq!(provider.currency(), "USD");

        let rate = provider.fetch_rate().await.expect("Failed to get rate");
        assert_eq!(rate, 39.5);
    }

    #[tokio::test]
    async fn test_first_entry_is_used() {
        let mock_response = r#"[
            {"rate": 42.1, "cc": "EUR"},
            {"rate": 99.9, "cc": "EUR"}
        ]"#;
        let mock_server = create_mock_server(
            "EUR",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let provider = NbuRateProvider::new(&format!("{}/", mock_server.uri()), "EUR");
        assert_eq!(provider.fetch_rate().await.unwrap(), 42.1);
    }

    #[tokio::test]
    async fn test_no_rate_found() {
        let mock_server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string("[]")).await;

        let provider = NbuRateProvider::new(&mock_server.uri(), "USD");
        let result = provider.fetch_rate().await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "No rate data found for currency: USD"
        );
    }

    #[tokio::test]
    async fn test_api_error_response() {
        let mock_server = create_mock_server("USD", ResponseTemplate::new(500)).await;

        let provider = NbuRateProvider::new(&mock_server.uri(), "USD");
        let result = provider.fetch_rate().await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for currency: USD"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = create_mock_server(
            "USD",
            ResponseTemplate::new(200).set_body_string(r#"[{"rate": "not a number"}]"#),
        )
        .await;

        let provider = NbuRateProvider::new(&mock_server.uri(), "USD");
        let result = provider.fetch_rate().await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for USD")
        );
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Nothing listens on the discard port
        let provider = NbuRateProvider::new("http://127.0.0.1:9", "USD");
        let result = provider.fetch_rate().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().starts_with("Request error"));
    }
}
