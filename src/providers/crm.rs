use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::core::record::{Record, RecordResponse, RecordStore, UpdateResponse};

/// Record store backed by the CRM REST API (v2 resource layout).
pub struct CrmRecordStore {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl CrmRecordStore {
    pub fn new(base_url: &str, access_token: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("dealrate/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.map(str::to_string),
            client,
        })
    }

    fn record_url(&self, entity: &str, record_id: &str) -> String {
        format!("{}/crm/v2/{}/{}", self.base_url, entity, record_id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.header("Authorization", format!("Zoho-oauthtoken {token}")),
            None => request,
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdateRequest {
    data: Vec<Record>,
}

#[async_trait]
impl RecordStore for CrmRecordStore {
    #[instrument(name = "CrmGetRecord", skip(self))]
    async fn get_record(&self, entity: &str, record_id: &str) -> Result<RecordResponse> {
        let url = self.record_url(entity, record_id);
        debug!("Requesting record from {}", url);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for record: {}", e, record_id))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            debug!("Record {} not found", record_id);
            return Ok(RecordResponse::default());
        }
        if !status.is_success() {
            return Err(anyhow!("HTTP error: {} for record: {}", status, record_id));
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", record_id, e))
    }

    #[instrument(name = "CrmUpdateRecord", skip(self, fields))]
    async fn update_record(
        &self,
        entity: &str,
        record_id: &str,
        fields: Record,
    ) -> Result<UpdateResponse> {
        let url = self.record_url(entity, record_id);
        debug!(?fields, "Updating record at {}", url);

        let body = UpdateRequest { data: vec![fields] };
        let response = self
            .authorize(self.client.put(&url).json(&body))
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for record: {}", e, record_id))?;

        let status = response.status();
        let text = response.text().await?;
        debug!(%status, response = %text, "Received update response");

        // Rejections still carry a per-record status in the body
        match serde_json::from_str::<UpdateResponse>(&text) {
            Ok(parsed) if !parsed.data.is_empty() => Ok(parsed),
            _ if !status.is_success() => {
                Err(anyhow!("HTTP error: {} for record: {}", status, record_id))
            }
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(anyhow!(
                "Failed to parse JSON response for {}: {}",
                record_id,
                e
            )),
        }
    }
}
