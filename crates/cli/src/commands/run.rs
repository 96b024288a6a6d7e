//! The batch run.
//!
//! Anything that stops the batch before the first form starts is a
//! batch-level failure: one notification, non-zero exit. Per-form failures are
//! handled inside the runner and never change the exit code.

use std::sync::Arc;
use std::time::Duration;

use formsync_core::constants::DEFAULT_HTTP_TIMEOUT_SECS;
use formsync_core::{FormRegistry, NotifyConfig, RunConfig};
use formsync_service::{
    BatchReport, BatchRunner, BatchSettings, FormState, LogNotifier, Notification, Notifier,
    notifier_from_config, send_best_effort,
};
use formsync_upstream::SessionsClient;
use formsync_warehouse::WarehouseBackend;

struct Prepared {
    runner: BatchRunner,
    registry: FormRegistry,
}

pub(crate) async fn run(
    days_back: Option<u32>,
    forms: &[String],
    dry_run: bool,
) -> anyhow::Result<()> {
    let notify = NotifyConfig::from_env();

    let prepared = match prepare(days_back, forms, dry_run).await {
        Ok(prepared) => prepared,
        Err(err) => {
            tracing::error!(error = %err, "batch aborted");
            let notifier = fallback_notifier(&notify);
            let notification = Notification::batch_failure(&notify.tag, &err);
            send_best_effort(notifier.as_ref(), &notification).await;
            return Err(err);
        },
    };

    let report = prepared.runner.run(&prepared.registry).await;
    log_summary(&report);
    Ok(())
}

async fn prepare(
    days_back: Option<u32>,
    forms: &[String],
    dry_run: bool,
) -> anyhow::Result<Prepared> {
    let override_days = days_back.map(|d| d.to_string());
    let config = RunConfig::from_lookup(|var| match (var, &override_days) {
        ("DAYS_BACK", Some(days)) => Some(days.clone()),
        _ => std::env::var(var).ok(),
    })?;
    tracing::debug!(?config, "configuration loaded");
    let database_url = if dry_run { None } else { Some(config.require_database_url()?) };

    let registry = FormRegistry::load(&config.forms_file)?.select(forms)?;
    if registry.is_empty() {
        tracing::warn!(path = %config.forms_file.display(), "form registry is empty");
    }

    let source = SessionsClient::new(config.api_key.clone(), &config.api_url, config.http_timeout)?;
    let warehouse = match database_url {
        Some(url) => WarehouseBackend::new_postgres(url).await?,
        None => {
            tracing::info!("dry run: loading into an in-memory warehouse");
            WarehouseBackend::new_memory()
        },
    };
    let notifier = notifier_from_config(&config.notify, config.http_timeout)?;

    let runner = BatchRunner::new(
        Arc::new(source),
        Arc::new(warehouse),
        notifier,
        BatchSettings::from_config(&config),
    );
    Ok(Prepared { runner, registry })
}

fn fallback_notifier(config: &NotifyConfig) -> Arc<dyn Notifier> {
    let timeout = Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS);
    notifier_from_config(config, timeout).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "notifier unavailable, logging only");
        Arc::new(LogNotifier::new(config.recipients.clone()))
    })
}

fn log_summary(report: &BatchReport) {
    for form in &report.forms {
        match &form.state {
            FormState::Done => tracing::info!(
                form = %form.form,
                fetched = form.fetched,
                inserted = form.inserted,
                "form done"
            ),
            FormState::Failed { stage, error } => {
                tracing::error!(form = %form.form, %stage, error = %error, "form failed");
            },
            FormState::Pending | FormState::Running(_) => {
                tracing::warn!(form = %form.form, state = ?form.state, "form did not finish");
            },
        }
    }
    tracing::info!(
        forms = report.forms.len(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        fetched = report.total_fetched(),
        inserted = report.total_inserted(),
        "summary"
    );
}
