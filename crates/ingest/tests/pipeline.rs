//! End-to-end tests: sheet export → watcher → store → scenario dispatch,
//! plus the direct submission path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use linea_core::config::{StorageConfig, WatcherConfig};
use linea_core::{EventRecord, StoredEvent};
use linea_ingest::scenario::ScenarioError;
use linea_ingest::source::CsvSource;
use linea_ingest::{Ingestor, Scenario, ScenarioDispatcher, ScenarioHandler, SourceWatcher};
use linea_storage::{group_by_origin, EventStore};

// ============================================================================
// Test Helpers
// ============================================================================

const HEADER: &str = "Planta,Periodo,Fecha de inicio,Fecha de termino,Material,\
Descripcion del material,Batch,Vendedor,Complain Qty,Tiempo de parada,\
Se rechazo la materia prima?,Se rechazo la masa?,Se rechazo el packaging?";

fn sheet_line(batch: &str, raw: &str, dough: &str, packaging: &str) -> String {
    format!("Lima,2025-06,2025-06-14,2025-06-15,M1,Harina,{batch},Molinos,2,30,{raw},{dough},{packaging}")
}

fn write_sheet(path: &std::path::Path, lines: &[String]) {
    let mut text = String::from(HEADER);
    for line in lines {
        text.push('\n');
        text.push_str(line);
    }
    text.push('\n');
    // Replace atomically so a concurrent poll never sees a half-written file.
    let staging = path.with_extension("csv.tmp");
    std::fs::write(&staging, text).unwrap();
    std::fs::rename(&staging, path).unwrap();
}

fn form_record(consequence: &str) -> EventRecord {
    EventRecord {
        usuario: "ana".to_string(),
        planta: "Lima".to_string(),
        periodo: "2025-06".to_string(),
        fecha_de_inicio: "2025-06-14".to_string(),
        material: "M1".to_string(),
        descripcion_del_material: "Harina".to_string(),
        batch: "B100".to_string(),
        vendedor: "Molinos".to_string(),
        complain_qty: "2".to_string(),
        tiempo_de_parada: "30".to_string(),
        consecuencia: consequence.to_string(),
        ..Default::default()
    }
}

struct CountingHandler {
    count: Arc<AtomicUsize>,
    should_fail: bool,
}

#[async_trait]
impl ScenarioHandler for CountingHandler {
    async fn handle(&self, _event: &StoredEvent) -> Result<(), ScenarioError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(ScenarioError::Handler {
                scenario: Scenario::DoughRejection,
                handler: "counting".to_string(),
                reason: "downstream unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

async fn open_store(dir: &tempfile::TempDir) -> EventStore {
    EventStore::open(&StorageConfig::in_dir(dir.path())).await.unwrap()
}

fn watcher_config(dir: &tempfile::TempDir) -> WatcherConfig {
    WatcherConfig {
        source_path: dir.path().join("input.csv"),
        poll_interval_ms: 20,
        ..WatcherConfig::default()
    }
}

// ============================================================================
// Watcher
// ============================================================================

#[tokio::test]
async fn complete_rows_flow_to_store_and_handlers() {
    let dir = tempfile::tempdir().unwrap();
    let config = watcher_config(&dir);
    write_sheet(
        &config.source_path,
        &[sheet_line("B1", "no", "si", "no"), sheet_line("B2", "no", "no", "no")],
    );

    let dough = Arc::new(AtomicUsize::new(0));
    let dispatcher = ScenarioDispatcher::new().with_handler(
        Scenario::DoughRejection,
        Arc::new(CountingHandler { count: dough.clone(), should_fail: false }),
    );
    let store = open_store(&dir).await;
    let watcher = SourceWatcher::new(
        Arc::new(CsvSource::new(&config.source_path)),
        Ingestor::new(store.clone(), dispatcher),
        &config,
    );

    let report = watcher.poll_once().await;
    assert_eq!(report.rows, 2);
    assert_eq!(report.ingested, 2);
    assert_eq!(dough.load(Ordering::SeqCst), 1);

    let events = store.fetch_all().await.unwrap();
    assert_eq!(events.len(), 2);
    for event in &events {
        assert_eq!(event.record.usuario, "maintenance");
        assert_eq!(event.record.tiempo_de_parada, "30");
        assert_eq!(event.record.id_origen, None);
    }
    let b1 = events.iter().find(|e| e.record.batch == "B1").unwrap();
    assert_eq!(b1.record.consecuencia, "Se rechazo la masa?");
    assert_eq!(b1.record.fecha_de_termino, "2025-06-15");
}

#[tokio::test]
async fn incomplete_row_is_consumed_on_first_sight() {
    let dir = tempfile::tempdir().unwrap();
    let config = watcher_config(&dir);
    write_sheet(&config.source_path, &[sheet_line("", "no", "si", "no")]);

    let store = open_store(&dir).await;
    let watcher = SourceWatcher::new(
        Arc::new(CsvSource::new(&config.source_path)),
        Ingestor::new(store.clone(), ScenarioDispatcher::new()),
        &config,
    );

    let first = watcher.poll_once().await;
    assert_eq!(first.incomplete, 1);
    assert_eq!(store.count().await.unwrap(), 0);

    let second = watcher.poll_once().await;
    assert_eq!(second.duplicates, 1);
    assert_eq!(second.incomplete, 0);
    assert_eq!(store.count().await.unwrap(), 0);

    // Filling in the batch yields different required values, hence a new
    // fingerprint: the completed row is ingested once.
    write_sheet(&config.source_path, &[sheet_line("B100", "no", "si", "no")]);
    let third = watcher.poll_once().await;
    assert_eq!(third.ingested, 1);
    assert_eq!(watcher.poll_once().await.ingested, 0);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn failed_insert_does_not_stop_the_poll() {
    let dir = tempfile::tempdir().unwrap();
    let config = watcher_config(&dir);
    let store = open_store(&dir).await;

    // Reject one batch at the database so its insert errors.
    let db_path = StorageConfig::in_dir(dir.path()).database_path;
    let raw = sqlx::SqlitePool::connect(&format!("sqlite://{}", db_path.display()))
        .await
        .unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_bad_batch BEFORE INSERT ON events \
         WHEN NEW.Batch = 'BAD' BEGIN SELECT RAISE(ABORT, 'batch rejected'); END",
    )
    .execute(&raw)
    .await
    .unwrap();
    raw.close().await;

    write_sheet(
        &config.source_path,
        &[sheet_line("BAD", "no", "si", "no"), sheet_line("B1", "no", "si", "no")],
    );
    let watcher = SourceWatcher::new(
        Arc::new(CsvSource::new(&config.source_path)),
        Ingestor::new(store.clone(), ScenarioDispatcher::new()),
        &config,
    );

    let first = watcher.poll_once().await;
    assert_eq!(first.failed, 1);
    assert_eq!(first.ingested, 1);
    assert_eq!(store.count().await.unwrap(), 1);

    write_sheet(
        &config.source_path,
        &[
            sheet_line("BAD", "no", "si", "no"),
            sheet_line("B1", "no", "si", "no"),
            sheet_line("B2", "no", "si", "no"),
        ],
    );
    let second = watcher.poll_once().await;
    assert_eq!(second.duplicates, 2);
    assert_eq!(second.ingested, 1);

    let stats = watcher.stats();
    assert_eq!(stats.cycles, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.ingested, 2);
}

#[tokio::test]
async fn unreadable_source_counts_as_empty_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = watcher_config(&dir);

    let store = open_store(&dir).await;
    let watcher = SourceWatcher::new(
        Arc::new(CsvSource::new(&config.source_path)),
        Ingestor::new(store, ScenarioDispatcher::new()),
        &config,
    );

    let report = watcher.poll_once().await;
    assert!(report.read_failed);
    assert_eq!(report.rows, 0);
    assert_eq!(watcher.stats().read_failures, 1);
}

#[tokio::test]
async fn background_loop_picks_up_appended_rows() {
    let dir = tempfile::tempdir().unwrap();
    let config = watcher_config(&dir);
    write_sheet(&config.source_path, &[sheet_line("B1", "no", "no", "si")]);

    let store = open_store(&dir).await;
    let watcher = SourceWatcher::new(
        Arc::new(CsvSource::new(&config.source_path)),
        Ingestor::new(store.clone(), ScenarioDispatcher::new()),
        &config,
    );
    watcher.start().unwrap();

    wait_for_count(&store, 1).await;
    write_sheet(
        &config.source_path,
        &[sheet_line("B1", "no", "no", "si"), sheet_line("B2", "si", "no", "no")],
    );
    wait_for_count(&store, 2).await;

    watcher.stop().await;
    let cycles = watcher.stats().cycles;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(watcher.stats().cycles, cycles);
    assert_eq!(store.count().await.unwrap(), 2);
}

async fn wait_for_count(store: &EventStore, expected: i64) {
    for _ in 0..250 {
        if store.count().await.unwrap() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("store never reached {expected} events");
}

// ============================================================================
// Direct submission
// ============================================================================

#[tokio::test]
async fn direct_submission_is_stored_and_dispatched() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let ingestor = Ingestor::new(store.clone(), ScenarioDispatcher::new());

    let receipt = ingestor.ingest_direct(form_record("Se rechazo la masa?")).await.unwrap();
    assert_eq!(receipt.scenario, Some(Scenario::DoughRejection));

    let stored = store.fetch_by_id(receipt.id).await.unwrap().unwrap();
    assert_eq!(stored.record.usuario, "ana");
    assert_eq!(stored.record.consecuencia, "Se rechazo la masa?");
}

#[tokio::test]
async fn dispatch_failure_keeps_the_event() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let count = Arc::new(AtomicUsize::new(0));
    let dispatcher = ScenarioDispatcher::new().with_handler(
        Scenario::DoughRejection,
        Arc::new(CountingHandler { count: count.clone(), should_fail: true }),
    );
    let ingestor = Ingestor::new(store.clone(), dispatcher);

    let receipt = ingestor.ingest_direct(form_record("Se rechazo la masa?")).await.unwrap();
    assert!(receipt.scenario.is_none());
    assert!(receipt.dispatch_error.is_some());
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(store.fetch_by_id(receipt.id).await.unwrap().is_some());
}

#[tokio::test]
async fn edits_of_edits_share_one_lineage() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let ingestor = Ingestor::new(store.clone(), ScenarioDispatcher::new());

    let original = ingestor.ingest_direct(form_record("")).await.unwrap().id;
    let edit = ingestor
        .ingest_direct(form_record("").with_origin(Some(original)))
        .await
        .unwrap()
        .id;
    let template = store.edit_template(edit).await.unwrap().unwrap();
    let second_edit = ingestor.ingest_direct(template).await.unwrap().id;

    assert_eq!(store.origin_of(second_edit).await.unwrap(), Some(Some(original)));

    let grouped = group_by_origin(store.fetch_by_user("ana").await.unwrap());
    assert_eq!(grouped.len(), 1);
    let ids: Vec<_> = grouped[&original].iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![second_edit, edit, original]);
}
