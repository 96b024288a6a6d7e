//! End-to-end batch runs against a scripted session source and the in-memory
//! warehouse.

#![allow(clippy::unwrap_used, reason = "test code")]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use formsync_core::{
    FlatRecord, FormRegistry, FormTarget, RowBatch, SchemaVariant, Session, TableSchema,
    TimeWindow, flatten_session,
};
use formsync_upstream::{SessionSource, UpstreamError};
use formsync_warehouse::{MemoryWarehouse, TableRef, Warehouse, WarehouseError};
use serde_json::json;

use crate::export::ExportWorkspace;
use crate::notify::{Notification, Notifier};
use crate::orchestrator::{BatchRunner, BatchSettings, FormState, Stage};
use crate::ServiceError;

const DATASET: &str = "zuko_data";

/// Returns canned sessions per form uuid; an uuid without an entry fails
/// with HTTP 503.
#[derive(Default)]
struct ScriptedSource {
    sessions: HashMap<String, Vec<Session>>,
}

impl ScriptedSource {
    fn with(mut self, uuid: &str, sessions: Vec<Session>) -> Self {
        self.sessions.insert(uuid.to_owned(), sessions);
        self
    }
}

#[async_trait]
impl SessionSource for ScriptedSource {
    async fn fetch_sessions(
        &self,
        form: &FormTarget,
        _window: &TimeWindow,
    ) -> Result<Vec<Session>, UpstreamError> {
        self.sessions.get(&form.uuid).cloned().ok_or_else(|| UpstreamError::HttpStatus {
            code: 503,
            body: "unavailable".to_owned(),
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), ServiceError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Memory warehouse whose inserts into one table always fail.
struct RejectingLoads {
    inner: Arc<MemoryWarehouse>,
    table: String,
}

#[async_trait]
impl Warehouse for RejectingLoads {
    async fn table_exists(&self, table: &TableRef) -> Result<bool, WarehouseError> {
        self.inner.table_exists(table).await
    }

    async fn create_table(
        &self,
        table: &TableRef,
        schema: &TableSchema,
    ) -> Result<(), WarehouseError> {
        self.inner.create_table(table, schema).await
    }

    async fn table_columns(&self, table: &TableRef) -> Result<Vec<String>, WarehouseError> {
        self.inner.table_columns(table).await
    }

    async fn existing_ids(
        &self,
        table: &TableRef,
        candidates: &[String],
    ) -> Result<HashSet<String>, WarehouseError> {
        self.inner.existing_ids(table, candidates).await
    }

    async fn load_rows(
        &self,
        table: &TableRef,
        batch: &RowBatch,
    ) -> Result<usize, WarehouseError> {
        if table.name == self.table {
            return Err(WarehouseError::Poisoned);
        }
        self.inner.load_rows(table, batch).await
    }
}

struct Harness {
    warehouse: Arc<MemoryWarehouse>,
    notifier: Arc<RecordingNotifier>,
    dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        Self {
            warehouse: Arc::new(MemoryWarehouse::new()),
            notifier: Arc::new(RecordingNotifier::default()),
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn runner(&self, source: ScriptedSource) -> BatchRunner {
        self.runner_over(source, self.warehouse.clone())
    }

    fn runner_over(&self, source: ScriptedSource, warehouse: Arc<dyn Warehouse>) -> BatchRunner {
        BatchRunner::new(
            Arc::new(source),
            warehouse,
            self.notifier.clone(),
            BatchSettings {
                days_back: 1,
                dataset: DATASET.to_owned(),
                export_dir: self.dir.path().to_path_buf(),
                notify_tag: "test".to_owned(),
            },
        )
    }

    fn export_dir(&self) -> &Path {
        self.dir.path()
    }
}

fn table(form: &str) -> TableRef {
    TableRef::new(DATASET, form).unwrap()
}

fn registry(forms: &[(&str, &str)]) -> FormRegistry {
    FormRegistry::new(forms.iter().map(|(name, uuid)| FormTarget::new(*name, *uuid)).collect())
        .unwrap()
}

fn session(value: serde_json::Value) -> Session {
    serde_json::from_value(value).unwrap()
}

fn csv_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "csv"))
                .count()
        })
        .unwrap_or(0)
}

async fn seed(warehouse: &MemoryWarehouse, form: &str, ids: &[&str]) {
    let table = table(form);
    warehouse.create_table(&table, &SchemaVariant::Base.schema()).await.unwrap();
    let batch = RowBatch {
        columns: vec!["id".to_owned()],
        rows: ids.iter().map(|id| vec![(*id).to_owned()]).collect(),
    };
    warehouse.load_rows(&table, &batch).await.unwrap();
}

#[tokio::test]
async fn device_and_event_sessions_flatten_export_and_load() {
    let sessions = vec![
        session(json!({
            "id": "s1",
            "attributes": {"deviceType": "mobile"},
            "events": [{"type": "focus"}],
        })),
        session(json!({"id": "s2", "fields": [{"name": "email"}]})),
    ];

    let records: Vec<FlatRecord> = sessions.iter().map(flatten_session).collect();
    let scratch = tempfile::tempdir().unwrap();
    let file =
        ExportWorkspace::new(scratch.path()).export("CDL", &records).unwrap().unwrap();
    let text = std::fs::read_to_string(file.path()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        r#""attributes_deviceType","events_count","events_json","fields_count","fields_json","id""#
    );
    assert_eq!(lines[1], r#""mobile","1","[{""type"":""focus""}]","0","[]","s1""#);
    assert_eq!(lines[2], r#""","0","[]","1","[{""name"":""email""}]","s2""#);
    drop(file);

    let harness = Harness::new();
    let source = ScriptedSource::default().with("u-cdl", sessions);
    let report = harness.runner(source).run(&registry(&[("CDL", "u-cdl")])).await;

    assert_eq!(report.form("CDL").unwrap().inserted, 2);
    let rows = harness.warehouse.rows(&table("CDL"));
    assert_eq!(rows[0]["attributes_deviceType"], Some("mobile".to_owned()));
    assert_eq!(rows[0]["events_count"], Some("1".to_owned()));
    assert_eq!(rows[0]["fields_count"], Some("0".to_owned()));
    assert_eq!(rows[1]["attributes_deviceType"], None);
    assert_eq!(rows[1]["events_count"], Some("0".to_owned()));
    assert_eq!(rows[1]["fields_count"], Some("1".to_owned()));
}

#[tokio::test]
async fn two_sessions_land_in_a_new_base_table() {
    let harness = Harness::new();
    let source = ScriptedSource::default().with(
        "u-cdl",
        vec![
            session(json!({
                "id": "s1",
                "attributes": {"Visitor Type": "new"},
                "fields": [{"n": 1}, {"n": 2}],
            })),
            session(json!({"id": "s2", "completed": true})),
        ],
    );

    let report = harness.runner(source).run(&registry(&[("CDL", "u-cdl")])).await;

    let form = report.form("CDL").unwrap();
    assert_eq!(form.state, FormState::Done);
    assert_eq!((form.fetched, form.inserted), (2, 2));
    assert_eq!(harness.warehouse.variant_of(&table("CDL")), Some(SchemaVariant::Base));

    let rows = harness.warehouse.rows(&table("CDL"));
    assert_eq!(rows[0]["id"], Some("s1".to_owned()));
    assert_eq!(rows[0]["attributes_Visitor_Type"], Some("new".to_owned()));
    assert_eq!(rows[0]["fields_count"], Some("2".to_owned()));
    assert_eq!(rows[0]["completed"], None);
    assert_eq!(rows[1]["completed"], Some("true".to_owned()));
    assert_eq!(rows[1]["attributes_Visitor_Type"], None);
}

#[tokio::test]
async fn checkbox_attributes_select_extended_schema() {
    let harness = Harness::new();
    let source = ScriptedSource::default().with(
        "u-agd",
        vec![session(json!({
            "id": "s1",
            "attributes": {"checkbox_tematica_terror": "true"},
        }))],
    );

    let report = harness.runner(source).run(&registry(&[("AGD", "u-agd")])).await;

    assert_eq!(report.succeeded(), 1);
    assert_eq!(
        harness.warehouse.variant_of(&table("AGD")),
        Some(SchemaVariant::CheckboxExtended)
    );
    let rows = harness.warehouse.rows(&table("AGD"));
    assert_eq!(rows[0]["attributes_checkbox_tematica_terror"], Some("true".to_owned()));
}

#[tokio::test]
async fn only_unseen_ids_are_appended_and_reruns_insert_nothing() {
    let harness = Harness::new();
    harness
        .warehouse
        .create_table(&table("CDL"), &SchemaVariant::Base.schema())
        .await
        .unwrap();
    let seed = formsync_core::RowBatch {
        columns: vec!["id".to_owned()],
        rows: vec![vec!["a".to_owned()], vec!["b".to_owned()]],
    };
    harness.warehouse.load_rows(&table("CDL"), &seed).await.unwrap();

    let forms = registry(&[("CDL", "u-cdl")]);
    let fetched = vec![session(json!({"id": "a"})), session(json!({"id": "c"}))];

    let first = harness
        .runner(ScriptedSource::default().with("u-cdl", fetched.clone()))
        .run(&forms)
        .await;
    assert_eq!(first.total_inserted(), 1);
    assert_eq!(harness.warehouse.ids(&table("CDL")), ["a", "b", "c"]);

    let second =
        harness.runner(ScriptedSource::default().with("u-cdl", fetched)).run(&forms).await;
    assert_eq!(second.form("CDL").unwrap().state, FormState::Done);
    assert_eq!(second.total_inserted(), 0);
    assert_eq!(harness.warehouse.rows(&table("CDL")).len(), 3);
}

#[tokio::test]
async fn failing_form_is_isolated_and_reported() {
    let harness = Harness::new();
    let source = ScriptedSource::default().with("u-good", vec![session(json!({"id": "g1"}))]);

    let report = harness
        .runner(source)
        .run(&registry(&[("Broken", "u-broken"), ("Good", "u-good")]))
        .await;

    assert_eq!((report.succeeded(), report.failed()), (1, 1));
    let broken = report.form("Broken").unwrap();
    assert!(matches!(
        &broken.state,
        FormState::Failed { stage: Stage::Fetching, error } if error.contains("503")
    ));
    assert!(!harness.warehouse.table_exists(&table("Broken")).await.unwrap());
    assert_eq!(harness.warehouse.ids(&table("Good")), ["g1"]);

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.starts_with("[test] Error in form Broken:"));
}

#[tokio::test]
async fn load_failure_leaves_existing_table_untouched() {
    let harness = Harness::new();
    seed(&harness.warehouse, "Broken", &["a", "b"]).await;
    let before = harness.warehouse.rows(&table("Broken"));

    let warehouse = Arc::new(RejectingLoads {
        inner: harness.warehouse.clone(),
        table: "Broken".to_owned(),
    });
    let source = ScriptedSource::default()
        .with("u-broken", vec![session(json!({"id": "a"})), session(json!({"id": "c"}))])
        .with("u-good", vec![session(json!({"id": "g1"}))]);

    let report = harness
        .runner_over(source, warehouse)
        .run(&registry(&[("Broken", "u-broken"), ("Good", "u-good")]))
        .await;

    let broken = report.form("Broken").unwrap();
    assert!(matches!(broken.state, FormState::Failed { stage: Stage::Loading, .. }));
    assert_eq!(broken.fetched, 2);
    assert_eq!(harness.warehouse.rows(&table("Broken")), before);
    assert_eq!(harness.warehouse.ids(&table("Broken")), ["a", "b"]);

    assert_eq!(report.form("Good").unwrap().state, FormState::Done);
    assert_eq!(harness.warehouse.ids(&table("Good")), ["g1"]);

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("Broken"));
    assert_eq!(csv_files(harness.export_dir()), 0);
}

#[tokio::test]
async fn zero_sessions_is_not_a_failure() {
    let harness = Harness::new();
    let source = ScriptedSource::default().with("u-cdl", Vec::new());

    let report = harness.runner(source).run(&registry(&[("CDL", "u-cdl")])).await;

    assert_eq!(report.form("CDL").unwrap().state, FormState::Done);
    assert_eq!(harness.warehouse.table_count(), 0);
    assert!(harness.notifier.sent().is_empty());
}

#[tokio::test]
async fn export_files_never_outlive_the_batch() {
    let harness = Harness::new();
    let stale = harness.export_dir().join("sessions_CDL.csv");
    std::fs::write(stale, "\"id\"\n\"stale\"\n").unwrap();
    let source = ScriptedSource::default().with("u-cdl", vec![session(json!({"id": "s1"}))]);

    let report = harness
        .runner(source)
        .run(&registry(&[("CDL", "u-cdl"), ("Down", "u-down")]))
        .await;

    assert_eq!(report.failed(), 1);
    assert_eq!(harness.warehouse.ids(&table("CDL")), ["s1"]);
    assert_eq!(csv_files(harness.export_dir()), 0);
}
