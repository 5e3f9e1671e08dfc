//! Host record store abstractions

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordResponse {
    #[serde(default)]
    pub data: Vec<Record>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatus {
    pub status: String,
    pub code: Option<String>,
    pub message: Option<String>,
}

impl UpdateStatus {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateResponse {
    #[serde(default)]
    pub data: Vec<UpdateStatus>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_record(&self, entity: &str, record_id: &str) -> Result<RecordResponse>;

    async fn update_record(
        &self,
        entity: &str,
        record_id: &str,
        fields: Record,
    ) -> Result<UpdateResponse>;
}
