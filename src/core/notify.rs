//! User-facing notification sink

/// Fire-and-forget notifications. Nothing returned here is consumed by the
/// reconciler.
pub trait Notifier: Send + Sync {
    fn show_success(&self, text: &str);

    /// Degraded success: the flow continues.
    fn show_warning(&self, text: &str);

    fn show_error(&self, text: &str);

    /// Appends a timestamped entry to the activity log.
    fn log_action(&self, text: &str);

    fn update_started(&self, _rate: f64) {}

    fn update_finished(&self) {}
}
