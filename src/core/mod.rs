//! Core business logic abstractions

pub mod activity;
pub mod cache;
pub mod config;
pub mod error;
pub mod log;
pub mod notify;
pub mod rate;
pub mod reconcile;
pub mod record;

// Re-export main types for cleaner imports
pub use cache::KeyValueCollection;
pub use error::ReconcileError;
pub use notify::Notifier;
pub use rate::{RateSource, ReferenceRate, ReferenceRateProvider};
pub use reconcile::{Evaluation, Reconciler, Session, UpdateResult, evaluate, evaluate_input};
pub use record::{Record, RecordResponse, RecordStore, UpdateResponse, UpdateStatus};
