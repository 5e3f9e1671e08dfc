//! Rate reconciliation: compares a record's stored exchange rate with the
//! reference rate and writes the reference rate back on request.
//!
//! All session-scoped values live in [`Session`], created by
//! [`Reconciler::on_page_load`] and passed to every later operation.

use crate::core::cache::KeyValueCollection;
use crate::core::config::AppConfig;
use crate::core::error::{ReconcileError, Result};
use crate::core::notify::Notifier;
use crate::core::rate::{RateSource, ReferenceRate, ReferenceRateProvider};
use crate::core::record::{Record, RecordStore};
use anyhow::anyhow;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

pub const ACTION_THRESHOLD: f64 = 5.0;
pub const RATE_CACHE_PREFIX: &str = "last_nbu_rate";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Percent, rounded to one decimal place
    pub divergence: f64,
    pub show_action: bool,
}

fn round1(value: f64) -> f64 {
    // Adding zero turns -0.0 into 0.0
    (value * 10.0).round() / 10.0 + 0.0
}

fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// Parses user or storage text as a finite decimal number.
pub fn parse_rate(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn evaluate(current: f64, reference: f64, threshold: f64) -> Evaluation {
    let divergence = round1((current / reference - 1.0) * 100.0);
    Evaluation {
        divergence,
        show_action: divergence.abs() >= threshold,
    }
}

/// `None` is the idle state: no divergence to show and no action offered.
pub fn evaluate_input(text: &str, reference: f64, threshold: f64) -> Option<Evaluation> {
    parse_rate(text).map(|current| evaluate(current, reference, threshold))
}

pub fn format_rate(rate: f64) -> String {
    format!("{rate:.2}")
}

/// Entity id as delivered by the host: one id or a list of ids.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    One(String),
    Many(Vec<String>),
}

impl EntityId {
    /// Only the first id of a list is used.
    pub fn first(&self) -> Option<&str> {
        let id = match self {
            EntityId::One(id) => Some(id.as_str()),
            EntityId::Many(ids) => {
                if ids.len() > 1 {
                    warn!(
                        count = ids.len(),
                        "Multiple entity ids supplied, only the first is used"
                    );
                }
                ids.first().map(String::as_str)
            }
        };
        id.map(str::trim).filter(|id| !id.is_empty())
    }
}

/// Context payload of the host's page-load event.
#[derive(Debug, Clone, Deserialize)]
pub struct PageLoad {
    #[serde(rename = "Entity", default)]
    pub entity: Option<String>,
    #[serde(rename = "EntityId", default)]
    pub entity_id: Option<EntityId>,
}

impl PageLoad {
    pub fn new(entity: Option<String>, ids: Vec<String>) -> Self {
        Self {
            entity,
            entity_id: Some(EntityId::Many(ids)),
        }
    }

    pub fn record_id(&self) -> Option<&str> {
        self.entity_id.as_ref().and_then(EntityId::first)
    }
}

#[derive(Debug)]
struct SessionState {
    record_rate: Option<f64>,
    input: String,
    /// Parsed value of `input`, or the exact rate when set programmatically
    current: Option<f64>,
}

impl SessionState {
    fn set_rate(&mut self, rate: Option<f64>) {
        self.record_rate = rate;
        self.current = rate;
        self.input = rate.map(format_rate).unwrap_or_default();
    }
}

/// Per-session values for the one record in focus.
#[derive(Debug)]
pub struct Session {
    record_id: String,
    reference: ReferenceRate,
    threshold: f64,
    state: Mutex<SessionState>,
    committing: AtomicBool,
}

impl Session {
    fn new(
        record_id: &str,
        reference: ReferenceRate,
        record_rate: Option<f64>,
        threshold: f64,
    ) -> Self {
        let mut state = SessionState {
            record_rate: None,
            input: String::new(),
            current: None,
        };
        state.set_rate(record_rate);
        Self {
            record_id: record_id.to_string(),
            reference,
            threshold,
            state: Mutex::new(state),
            committing: AtomicBool::new(false),
        }
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn reference(&self) -> ReferenceRate {
        self.reference
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub async fn record_rate(&self) -> Option<f64> {
        self.state.lock().await.record_rate
    }

    pub async fn input(&self) -> String {
        self.state.lock().await.input.clone()
    }

    /// Evaluation of the current input against the reference rate.
    pub async fn evaluation(&self) -> Option<Evaluation> {
        let state = self.state.lock().await;
        state
            .current
            .map(|current| evaluate(current, self.reference.value, self.threshold))
    }

    /// Replaces the input text and returns its evaluation. Does not touch the
    /// stored record rate.
    pub async fn edit_input(&self, text: &str) -> Option<Evaluation> {
        let mut state = self.state.lock().await;
        state.input = text.to_string();
        state.current = parse_rate(text);
        evaluate_input(text, self.reference.value, self.threshold)
    }

    /// True while a commit is in flight; the update trigger is disabled.
    pub fn is_committing(&self) -> bool {
        self.committing.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateResult {
    pub rate: f64,
    pub evaluation: Evaluation,
}

/// Clears the in-progress indicator and re-enables the trigger on every exit
/// path of a commit.
struct CommitGuard<'a> {
    committing: &'a AtomicBool,
    notifier: &'a dyn Notifier,
}

impl<'a> CommitGuard<'a> {
    fn acquire(
        committing: &'a AtomicBool,
        notifier: &'a dyn Notifier,
        rate: f64,
    ) -> Option<Self> {
        if committing.swap(true, Ordering::SeqCst) {
            return None;
        }
        notifier.update_started(rate);
        Some(Self {
            committing,
            notifier,
        })
    }
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        self.notifier.update_finished();
        self.committing.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub entity: String,
    pub rate_field: String,
    pub threshold: f64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            entity: "Deals".to_string(),
            rate_field: "currency_rate".to_string(),
            threshold: ACTION_THRESHOLD,
        }
    }
}

impl From<&AppConfig> for ReconcileSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            entity: config.crm.entity.clone(),
            rate_field: config.crm.rate_field.clone(),
            threshold: config.threshold,
        }
    }
}

pub struct Reconciler {
    rates: Arc<dyn ReferenceRateProvider>,
    records: Arc<dyn RecordStore>,
    storage: Arc<dyn KeyValueCollection>,
    notifier: Arc<dyn Notifier>,
    settings: ReconcileSettings,
}

impl Reconciler {
    pub fn new(
        rates: Arc<dyn ReferenceRateProvider>,
        records: Arc<dyn RecordStore>,
        storage: Arc<dyn KeyValueCollection>,
        notifier: Arc<dyn Notifier>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            rates,
            records,
            storage,
            notifier,
            settings,
        }
    }

    /// Signals the host that page-load events can be delivered.
    pub fn ready(&self) {
        info!(entity = %self.settings.entity, "Rate reconciler ready");
    }

    fn cache_key(&self) -> String {
        format!(
            "{RATE_CACHE_PREFIX}.{}",
            self.rates.currency().to_uppercase()
        )
    }

    /// Fetches the reference rate, falling back to the last cached value.
    #[instrument(name = "AcquireReferenceRate", skip(self))]
    pub async fn acquire_reference_rate(&self) -> Result<ReferenceRate> {
        let key = self.cache_key();

        match self.rates.fetch_rate().await {
            Ok(rate) if is_valid_rate(rate) => {
                self.storage.put(&key, rate.to_string()).await;
                self.notifier
                    .log_action(&format!("Fetched NBU rate: {}", format_rate(rate)));
                return Ok(ReferenceRate {
                    value: rate,
                    source: RateSource::Remote,
                });
            }
            Ok(rate) => warn!(rate, "Reference source returned an invalid rate"),
            Err(e) => warn!(error = %e, "Reference rate fetch failed"),
        }

        let cached = self
            .storage
            .get(&key)
            .await
            .as_deref()
            .and_then(parse_rate)
            .filter(|rate| is_valid_rate(*rate));

        match cached {
            Some(rate) => {
                debug!(rate, key = %key, "Using cached reference rate");
                self.notifier
                    .show_warning("Failed to fetch NBU rate. Using the last saved value.");
                self.notifier
                    .log_action("Using cached NBU rate due to fetch failure.");
                Ok(ReferenceRate {
                    value: rate,
                    source: RateSource::Cached,
                })
            }
            None => {
                self.notifier
                    .show_error("NBU rate is unavailable and no cached value was found.");
                Err(ReconcileError::RateUnavailable)
            }
        }
    }

    /// Reads the record's stored rate. An absent or unparseable field is not
    /// an error.
    #[instrument(name = "AcquireRecordRate", skip(self))]
    pub async fn acquire_record_rate(&self, record_id: &str) -> Result<Option<f64>> {
        if record_id.trim().is_empty() {
            return Err(ReconcileError::RecordUnavailable {
                record_id: record_id.to_string(),
                reason: "empty record id".to_string(),
            });
        }

        let response = match self
            .records
            .get_record(&self.settings.entity, record_id)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Record request failed");
                self.notifier
                    .show_error("Unable to retrieve deal from the CRM.");
                return Err(ReconcileError::RecordUnavailable {
                    record_id: record_id.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let Some(record) = response.data.into_iter().next() else {
            self.notifier.show_error("Failed to load deal data.");
            return Err(ReconcileError::RecordUnavailable {
                record_id: record_id.to_string(),
                reason: "no data returned".to_string(),
            });
        };

        self.notifier
            .log_action(&format!("Loaded deal data (ID: {record_id})"));

        let rate = extract_rate(&record, &self.settings.rate_field);
        debug!(?rate, field = %self.settings.rate_field, "Extracted record rate");
        Ok(rate)
    }

    /// Host entry point. Returns `Ok(None)` when the payload carries no record.
    pub async fn on_page_load(&self, payload: PageLoad) -> Result<Option<Session>> {
        let Some(record_id) = payload.record_id() else {
            debug!("Page load without a record id, nothing to do");
            return Ok(None);
        };

        match self.initialize(payload.entity.as_deref(), record_id).await {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                error!(error = %e, "Initialization failed");
                self.notifier
                    .show_error("Unexpected error during initialization.");
                Err(e)
            }
        }
    }

    async fn initialize(&self, entity: Option<&str>, record_id: &str) -> Result<Session> {
        if let Some(entity) = entity {
            if !entity.eq_ignore_ascii_case(&self.settings.entity) {
                return Err(ReconcileError::UnexpectedInit(anyhow!(
                    "page loaded for entity {entity}, expected {}",
                    self.settings.entity
                )));
            }
        }

        let reference = self.acquire_reference_rate().await?;
        let record_rate = self.acquire_record_rate(record_id).await?;

        let session = Session::new(record_id, reference, record_rate, self.settings.threshold);
        if let Some(evaluation) = session.evaluation().await {
            self.log_evaluation(&evaluation);
        }
        Ok(session)
    }

    /// Applies a user edit of the record-rate input.
    pub async fn edit_input(&self, session: &Session, text: &str) -> Option<Evaluation> {
        let evaluation = session.edit_input(text).await;
        if let Some(evaluation) = &evaluation {
            self.log_evaluation(evaluation);
        }
        evaluation
    }

    fn log_evaluation(&self, evaluation: &Evaluation) {
        self.notifier.log_action(&format!(
            "Calculated difference: {:.1}%",
            evaluation.divergence
        ));
    }

    /// Writes the session's reference rate into the loaded record.
    #[instrument(name = "CommitUpdate", skip(self, session), fields(record_id = %session.record_id))]
    pub async fn commit_update(&self, session: &Session) -> Result<UpdateResult> {
        let rate = session.reference.value;
        let record_id = session.record_id.as_str();

        let Some(_guard) = CommitGuard::acquire(&session.committing, self.notifier.as_ref(), rate)
        else {
            return Err(ReconcileError::UpdateInProgress(record_id.to_string()));
        };

        self.notifier.log_action(&format!(
            "Update clicked. Sending rate: {}",
            format_rate(rate)
        ));

        let mut fields = Record::new();
        fields.insert("id".to_string(), Value::String(record_id.to_string()));
        fields.insert(self.settings.rate_field.clone(), Value::from(rate));

        let response = match self
            .records
            .update_record(&self.settings.entity, record_id, fields)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Update request failed");
                self.notifier
                    .show_error("Unexpected error occurred while updating the rate.");
                self.notifier.log_action("Update failed due to exception.");
                return Err(ReconcileError::UpdateFailed {
                    record_id: record_id.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        match response.data.first() {
            Some(status) if status.is_success() => {}
            other => {
                let reason = other.map_or_else(
                    || "empty response".to_string(),
                    |s| format!("status {}", s.status),
                );
                debug!(%reason, "Update rejected");
                self.notifier
                    .show_error("Failed to update rate in CRM. Please try again.");
                self.notifier.log_action("Update returned error status.");
                return Err(ReconcileError::UpdateFailed {
                    record_id: record_id.to_string(),
                    reason,
                });
            }
        }

        self.notifier.show_success("Rate has been updated in the deal.");
        self.notifier.log_action(&format!(
            "Updated deal ID {record_id} with NBU rate: {}",
            format_rate(rate)
        ));

        session.state.lock().await.set_rate(Some(rate));
        let evaluation = evaluate(rate, rate, session.threshold);
        self.log_evaluation(&evaluation);

        Ok(UpdateResult { rate, evaluation })
    }
}

fn extract_rate(record: &Record, field: &str) -> Option<f64> {
    let rate = match record.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_rate(s),
        _ => None,
    };
    rate.filter(|rate| is_valid_rate(*rate))
}
