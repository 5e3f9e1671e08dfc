use super::ui::{self, StyleType};
use crate::core::activity::ActivityLog;
use crate::core::notify::Notifier;
use crate::core::reconcile::format_rate;
use indicatif::ProgressBar;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Prints notifications to stderr and records them in the activity log.
pub struct ConsoleNotifier {
    log: Arc<ActivityLog>,
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleNotifier {
    pub fn new(log: Arc<ActivityLog>) -> Self {
        Self {
            log,
            spinner: Mutex::new(None),
        }
    }

    /// Prints above the spinner when one is ticking, so its line stays intact.
    fn print(&self, text: &str, style: StyleType) {
        let styled = ui::style_text(text, style);
        let spinner = self.spinner.lock().ok().and_then(|slot| slot.clone());
        match spinner {
            Some(spinner) => spinner.suspend(|| eprintln!("{styled}")),
            None => eprintln!("{styled}"),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn show_success(&self, text: &str) {
        info!("{text}");
        self.print(text, StyleType::Success);
        self.log.push(text);
    }

    fn show_warning(&self, text: &str) {
        warn!("{text}");
        self.print(text, StyleType::Warning);
        self.log.push(text);
    }

    fn show_error(&self, text: &str) {
        error!("{text}");
        self.print(text, StyleType::Error);
        self.log.push(text);
    }

    fn log_action(&self, text: &str) {
        info!("{text}");
        self.log.push(text);
    }

    fn update_started(&self, rate: f64) {
        let spinner = ui::new_spinner(format!("Updating deal rate to {}...", format_rate(rate)));
        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(spinner);
        }
    }

    fn update_finished(&self) {
        if let Some(spinner) = self.spinner.lock().ok().and_then(|mut slot| slot.take()) {
            spinner.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_reach_activity_log() {
        let log = Arc::new(ActivityLog::new());
        let notifier = ConsoleNotifier::new(Arc::clone(&log));

        notifier.log_action("Fetched NBU rate: 39.50");
        notifier.show_warning("Failed to fetch NBU rate. Using the last saved value.");
        notifier.show_success("Rate has been updated in the deal.");

        assert_eq!(
            log.messages(),
            vec![
                "Rate has been updated in the deal.",
                "Failed to fetch NBU rate. Using the last saved value.",
                "Fetched NBU rate: 39.50",
            ]
        );
    }

    #[test]
    fn test_spinner_is_cleared() {
        let notifier = ConsoleNotifier::new(Arc::new(ActivityLog::new()));
        notifier.update_started(39.5);
        assert!(notifier.spinner.lock().unwrap().is_some());
        notifier.update_finished();
        assert!(notifier.spinner.lock().unwrap().is_none());
        // A second finish is harmless
        notifier.update_finished();
    }

    #[test]
    fn test_messages_during_update_keep_spinner() {
        let log = Arc::new(ActivityLog::new());
        let notifier = ConsoleNotifier::new(Arc::clone(&log));
        notifier.update_started(39.5);

        notifier.show_error("Unexpected error occurred while updating the rate.");
        notifier.show_success("Rate has been updated in the deal.");

        assert!(notifier.spinner.lock().unwrap().is_some());
        assert_eq!(log.len(), 2);
        notifier.update_finished();
        assert!(notifier.spinner.lock().unwrap().is_none());
    }
}
