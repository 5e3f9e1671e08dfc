pub mod notify;
pub mod reconcile;
pub mod setup;
pub mod ui;
