pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::notify::ConsoleNotifier;
use crate::core::activity::ActivityLog;
use crate::core::config::AppConfig;
use crate::core::reconcile::{PageLoad, ReconcileSettings, Reconciler};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Check {
        entity_ids: Vec<String>,
        rate: Option<String>,
    },
    Update {
        entity_ids: Vec<String>,
        force: bool,
    },
}

fn build_reconciler(config: &AppConfig, notifier: Arc<ConsoleNotifier>) -> Result<Reconciler> {
    let nbu = &config.providers.nbu;
    let rates = providers::NbuRateProvider::new(&nbu.base_url, &nbu.currency);
    let records =
        providers::CrmRecordStore::new(&config.crm.base_url, config.crm.access_token.as_deref())?;
    let data_path = config.default_data_path().ok();
    let storage = store::open_collection(data_path.as_deref(), store::RATES_COLLECTION);

    Ok(Reconciler::new(
        Arc::new(rates),
        Arc::new(records),
        storage,
        notifier,
        ReconcileSettings::from(config),
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    run_with_activity(command, config_path, Arc::new(ActivityLog::new())).await
}

/// Runs a command, recording every notification in `activity`.
pub async fn run_with_activity(
    command: AppCommand,
    config_path: Option<&str>,
    activity: Arc<ActivityLog>,
) -> Result<()> {
    info!("Deal rate reconciler starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let notifier = Arc::new(ConsoleNotifier::new(Arc::clone(&activity)));
    let reconciler = build_reconciler(&config, notifier)?;
    reconciler.ready();

    let entity = Some(config.crm.entity.clone());
    let result = match command {
        AppCommand::Check { entity_ids, rate } => {
            cli::reconcile::check(
                &reconciler,
                PageLoad::new(entity, entity_ids),
                rate.as_deref(),
            )
            .await
        }
        AppCommand::Update { entity_ids, force } => {
            cli::reconcile::update(&reconciler, PageLoad::new(entity, entity_ids), force).await
        }
    };

    if !activity.is_empty() {
        cli::ui::print_separator();
        println!("{}", cli::reconcile::display_activity(&activity));
    }
    result
}
