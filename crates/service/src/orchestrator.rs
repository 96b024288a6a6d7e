//! Per-form batch orchestration.
//!
//! Forms run strictly one after another. Each form walks
//! `Pending → Fetching → Exporting → Loading → Done`; any failure moves it to
//! `Failed`, sends a notification and the batch continues with the next form.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use formsync_core::{
    FlatRecord, FormRegistry, FormTarget, RunConfig, TimeWindow, flatten_session,
};
use formsync_upstream::SessionSource;
use formsync_warehouse::Warehouse;
use tracing::{debug, error, info};

use crate::error::ServiceError;
use crate::export::ExportWorkspace;
use crate::loader::{LoadOutcome, Loader};
use crate::notify::{Notification, Notifier, send_best_effort};

/// Work phase a form can fail in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Exporting,
    Loading,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Fetching => "fetching",
            Self::Exporting => "exporting",
            Self::Loading => "loading",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    Pending,
    Running(Stage),
    Done,
    Failed { stage: Stage, error: String },
}

/// Final record of one form's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormReport {
    pub form: String,
    pub state: FormState,
    pub fetched: usize,
    pub inserted: usize,
    pub outcome: Option<LoadOutcome>,
}

impl FormReport {
    fn new(form: &FormTarget) -> Self {
        Self {
            form: form.name.clone(),
            state: FormState::Pending,
            fetched: 0,
            inserted: 0,
            outcome: None,
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(form = %self.form, %stage, "stage");
        self.state = FormState::Running(stage);
    }

    fn fail(&mut self, err: &ServiceError) {
        let stage = match self.state {
            FormState::Running(stage) => stage,
            FormState::Pending | FormState::Done | FormState::Failed { .. } => Stage::Fetching,
        };
        self.state = FormState::Failed { stage, error: err.to_string() };
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.state, FormState::Done)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub forms: Vec<FormReport>,
}

impl BatchReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.forms.iter().filter(|f| f.is_done()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.forms.len() - self.succeeded()
    }

    #[must_use]
    pub fn total_fetched(&self) -> usize {
        self.forms.iter().map(|f| f.fetched).sum()
    }

    #[must_use]
    pub fn total_inserted(&self) -> usize {
        self.forms.iter().map(|f| f.inserted).sum()
    }

    #[must_use]
    pub fn form(&self, name: &str) -> Option<&FormReport> {
        self.forms.iter().find(|f| f.form == name)
    }
}

/// The slice of [`RunConfig`] the batch itself needs.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub days_back: u32,
    pub dataset: String,
    pub export_dir: PathBuf,
    pub notify_tag: String,
}

impl BatchSettings {
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            days_back: config.days_back,
            dataset: config.dataset.clone(),
            export_dir: config.export_dir.clone(),
            notify_tag: config.notify.tag.clone(),
        }
    }
}

pub struct BatchRunner {
    source: Arc<dyn SessionSource>,
    loader: Loader,
    exports: ExportWorkspace,
    notifier: Arc<dyn Notifier>,
    days_back: u32,
    notify_tag: String,
}

impl BatchRunner {
    #[must_use]
    pub fn new(
        source: Arc<dyn SessionSource>,
        warehouse: Arc<dyn Warehouse>,
        notifier: Arc<dyn Notifier>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            source,
            loader: Loader::new(warehouse, settings.dataset),
            exports: ExportWorkspace::new(settings.export_dir),
            notifier,
            days_back: settings.days_back,
            notify_tag: settings.notify_tag,
        }
    }

    /// Run every form of the registry once over the trailing day window.
    pub async fn run(&self, registry: &FormRegistry) -> BatchReport {
        let window = TimeWindow::last_days(self.days_back, Utc::now());
        info!(
            forms = registry.len(),
            from = %window.from_param(),
            to = %window.to_param(),
            "starting batch"
        );

        self.exports.purge_all(registry.forms());
        let mut report = BatchReport::default();
        for form in registry.forms() {
            report.forms.push(self.run_form(form, &window).await);
            self.exports.purge_all(registry.forms());
        }
        self.exports.purge_all(registry.forms());

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            inserted = report.total_inserted(),
            "batch finished"
        );
        report
    }

    async fn run_form(&self, form: &FormTarget, window: &TimeWindow) -> FormReport {
        let mut report = FormReport::new(form);
        match self.process(form, window, &mut report).await {
            Ok(()) => report.state = FormState::Done,
            Err(err) => {
                report.fail(&err);
                error!(form = %form.name, error = %err, "form failed");
                let notification = Notification::form_failure(&self.notify_tag, &form.name, &err);
                send_best_effort(self.notifier.as_ref(), &notification).await;
            },
        }
        report
    }

    async fn process(
        &self,
        form: &FormTarget,
        window: &TimeWindow,
        report: &mut FormReport,
    ) -> Result<(), ServiceError> {
        report.enter(Stage::Fetching);
        let sessions = self.source.fetch_sessions(form, window).await?;
        report.fetched = sessions.len();
        info!(form = %form.name, count = sessions.len(), "fetched {} sessions", sessions.len());

        report.enter(Stage::Exporting);
        let records: Vec<FlatRecord> = sessions.iter().map(flatten_session).collect();
        let _export = self.exports.export(&form.name, &records)?;

        report.enter(Stage::Loading);
        let path = self.exports.export_path(&form.name);
        let outcome = self.loader.load_form(&form.name, &path).await?;
        report.inserted = outcome.inserted();
        report.outcome = Some(outcome);
        Ok(())
    }
}
