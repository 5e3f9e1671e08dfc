use super::ui;
use crate::core::activity::ActivityLog;
use crate::core::error::ReconcileError;
use crate::core::rate::ReferenceRate;
use crate::core::reconcile::{Evaluation, PageLoad, Reconciler, Session, format_rate};
use anyhow::Result;
use comfy_table::Cell;

/// Point-in-time copy of a session, for display.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub record_id: String,
    pub reference: ReferenceRate,
    pub record_rate: Option<f64>,
    pub input: String,
    pub evaluation: Option<Evaluation>,
    pub threshold: f64,
}

impl SessionView {
    pub async fn capture(session: &Session) -> Self {
        Self {
            record_id: session.record_id().to_string(),
            reference: session.reference(),
            record_rate: session.record_rate().await,
            input: session.input().await,
            evaluation: session.evaluation().await,
            threshold: session.threshold(),
        }
    }

    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.add_row(vec![
            ui::label_cell("NBU rate"),
            Cell::new(format!(
                "{} ({})",
                format_rate(self.reference.value),
                self.reference.source
            )),
        ]);
        table.add_row(vec![
            ui::label_cell("Deal rate"),
            ui::format_optional_cell(self.record_rate, format_rate),
        ]);
        if self.record_rate.map(format_rate).unwrap_or_default() != self.input {
            table.add_row(vec![ui::label_cell("Entered rate"), Cell::new(&self.input)]);
        }
        table.add_row(vec![
            ui::label_cell("Difference"),
            match &self.evaluation {
                Some(evaluation) => ui::divergence_cell(evaluation.divergence, self.threshold),
                None => ui::format_optional_cell(None::<f64>, format_rate),
            },
        ]);

        let advice = if self.show_action() {
            ui::style_text(
                &format!(
                    "Update advised: run `dealrate update {}`",
                    self.record_id
                ),
                ui::StyleType::Warning,
            )
        } else {
            ui::style_text("Deal rate is within the threshold", ui::StyleType::Subtle)
        };

        format!(
            "Deal: {}\n\n{}\n\n{}",
            ui::style_text(&self.record_id, ui::StyleType::Title),
            table,
            advice
        )
    }

    pub fn show_action(&self) -> bool {
        self.evaluation.is_some_and(|e| e.show_action)
    }
}

/// Renders the activity log, newest first.
pub fn display_activity(log: &ActivityLog) -> String {
    let mut output = ui::style_text("Activity", ui::StyleType::Label);
    for entry in log.entries() {
        output.push('\n');
        output.push_str(&ui::style_text(&entry.to_string(), ui::StyleType::Subtle));
    }
    output
}

/// Message to show the user for a failed run. Reconcile failures were
/// already reported through the notifier, so they yield `None`; anything
/// else shows its outermost context only.
pub fn failure_message(err: &anyhow::Error) -> Option<String> {
    if err.downcast_ref::<ReconcileError>().is_some() {
        return None;
    }
    Some(err.to_string())
}

/// Loads the record and reports its divergence. `input` stands in for an
/// edit of the deal rate before deciding.
pub async fn check(reconciler: &Reconciler, payload: PageLoad, input: Option<&str>) -> Result<()> {
    let Some(session) = reconciler.on_page_load(payload).await? else {
        println!("No record id supplied, nothing to check.");
        return Ok(());
    };

    if let Some(text) = input {
        reconciler.edit_input(&session, text).await;
    }

    println!("{}", SessionView::capture(&session).await.display_as_table());
    Ok(())
}

/// Loads the record and writes the NBU rate into it when the divergence
/// reaches the threshold, or unconditionally with `force`.
pub async fn update(reconciler: &Reconciler, payload: PageLoad, force: bool) -> Result<()> {
    let Some(session) = reconciler.on_page_load(payload).await? else {
        println!("No record id supplied, nothing to update.");
        return Ok(());
    };

    let before = SessionView::capture(&session).await;
    if !before.show_action() && !force {
        println!("{}", before.display_as_table());
        return Ok(());
    }

    reconciler.commit_update(&session).await?;
    println!("{}", SessionView::capture(&session).await.display_as_table());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate::RateSource;

    fn view(record_rate: Option<f64>, evaluation: Option<Evaluation>) -> SessionView {
        SessionView {
            record_id: "4242".to_string(),
            reference: ReferenceRate {
                value: 39.5,
                source: RateSource::Cached,
            },
            record_rate,
            input: record_rate.map(format_rate).unwrap_or_default(),
            evaluation,
            threshold: 5.0,
        }
    }

    #[test]
    fn test_display_with_action() {
        let output = view(
            Some(41.8),
            Some(Evaluation {
                divergence: 5.8,
                show_action: true,
            }),
        )
        .display_as_table();

        assert!(output.contains("4242"));
        assert!(output.contains("39.50 (cached)"));
        assert!(output.contains("41.80"));
        assert!(output.contains("+5.8%"));
        assert!(output.contains("dealrate update 4242"));
        assert!(!output.contains("Entered rate"));
    }

    #[test]
    fn test_display_without_record_rate() {
        let session = view(None, None);
        assert!(!session.show_action());

        let output = session.display_as_table();
        assert!(output.contains("—"));
        assert!(output.contains("within the threshold"));
    }

    #[test]
    fn test_display_shows_edited_input() {
        let mut session = view(
            Some(41.8),
            Some(Evaluation {
                divergence: 1.3,
                show_action: false,
            }),
        );
        session.input = "40.00".to_string();

        let output = session.display_as_table();
        assert!(output.contains("Entered rate"));
        assert!(output.contains("40.00"));
    }

    #[test]
    fn test_failure_message_hides_reconcile_errors() {
        let err = anyhow::Error::from(ReconcileError::RecordUnavailable {
            record_id: "4242".to_string(),
            reason: "Request error: connection refused for record: 4242".to_string(),
        });
        assert_eq!(failure_message(&err), None);
    }

    #[test]
    fn test_failure_message_shows_outer_context_only() {
        let err = anyhow::anyhow!("No such file or directory")
            .context("Failed to read config file: /nowhere/config.yaml");
        assert_eq!(
            failure_message(&err).as_deref(),
            Some("Failed to read config file: /nowhere/config.yaml")
        );
    }

    #[test]
    fn test_display_activity_is_newest_first() {
        let log = ActivityLog::new();
        log.push("Fetched NBU rate: 39.50");
        log.push("Loaded deal data (ID: 4242)");

        let output = display_activity(&log);
        let fetched = output.find("Fetched NBU rate").unwrap();
        let loaded = output.find("Loaded deal data").unwrap();
        assert!(loaded < fetched);
    }
}
