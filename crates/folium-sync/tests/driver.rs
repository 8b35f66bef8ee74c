use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use folium_core::{
    AppEvent, EventBus, EventBusConfig, EventCategory, PartId, Point, PrimitiveKey, RemoteError,
    SyncEvent,
};
use folium_editor::{
    DocumentPart, EditorCommand, FieldChange, FieldValue, LayerId, PartCards, PartModel, Polygon,
    PrimitiveUpdate, TranscriptionPayload,
};
use folium_sync::{
    FileStore, PartApi, RemoteOperation, RemoteRequest, RemoteResponse, SyncDriver, SyncScope,
};
use tempfile::TempDir;

/// Answers every write after `delay`, creates with increasing ids.
struct SlowApi {
    delay: Duration,
}

#[async_trait]
impl PartApi for SlowApi {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse, RemoteError> {
        tokio::time::sleep(self.delay).await;
        Ok(if request.operation.is_create() {
            RemoteResponse::created(100 + request.id)
        } else {
            RemoteResponse::ok()
        })
    }

    async fn fetch_part(&self, _part: PartId) -> Result<DocumentPart, RemoteError> {
        Err(RemoteError::NotFound)
    }

    async fn fetch_transcriptions(
        &self,
        _part: PartId,
        _layer: LayerId,
    ) -> Result<Vec<TranscriptionPayload>, RemoteError> {
        Ok(Vec::new())
    }
}

/// Dies while handling creates.
struct CrashingApi;

#[async_trait]
impl PartApi for CrashingApi {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse, RemoteError> {
        if request.operation.is_create() {
            panic!("connection pool poisoned");
        }
        Ok(RemoteResponse::ok())
    }

    async fn fetch_part(&self, _part: PartId) -> Result<DocumentPart, RemoteError> {
        Err(RemoteError::NotFound)
    }

    async fn fetch_transcriptions(
        &self,
        _part: PartId,
        _layer: LayerId,
    ) -> Result<Vec<TranscriptionPayload>, RemoteError> {
        Ok(Vec::new())
    }
}

fn recording_bus() -> Arc<EventBus> {
    Arc::new(EventBus::with_config(EventBusConfig {
        history_size: 64,
        ..EventBusConfig::default()
    }))
}

fn create_line(model: &mut PartModel, y: f64) -> EditorCommand {
    let id = model.create_line(Point::new(0.0, y));
    model.append_point(id, Point::new(100.0, y));
    let line = model.line(id).unwrap();
    EditorCommand::CreateLine {
        key: id,
        baseline: line.baseline.clone(),
        mask: None,
        region: None,
        order: line.order,
    }
}

const PART: &str = r#"{
    "pk": 1,
    "title": "f. 1r",
    "image": {"uri": "images/f1r.jpg", "width": 2000, "height": 3000},
    "regions": [{"pk": 10, "box": [[0, 0], [1000, 0], [1000, 1000], [0, 1000]]}],
    "lines": [
        {"pk": 11, "baseline": [[10, 100], [900, 100]], "region": 10, "order": 0},
        {"pk": 12, "baseline": [[10, 200], [900, 200]], "region": 10, "order": 1}
    ]
}"#;

fn store_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("part-1.json"), PART).unwrap();
    std::fs::write(
        dir.path().join("part-2.json"),
        r#"{"pk": 2, "title": "f. 1v", "image": {"uri": "images/f1v.jpg", "width": 2000, "height": 3000}}"#,
    )
    .unwrap();
    dir
}

#[tokio::test]
async fn test_settle_persists_creates() {
    let bus = recording_bus();
    let mut driver = SyncDriver::new(
        Arc::new(SlowApi {
            delay: Duration::from_millis(5),
        }),
        Duration::from_secs(1),
        bus.clone(),
    );
    let mut model = PartModel::for_part(1);
    let mut cards = PartCards::default();
    let mut scope = SyncScope {
        model: &mut model,
        cards: &mut cards,
    };

    for y in [10.0, 20.0, 30.0] {
        let command = create_line(scope.model, y);
        driver.dispatch(command, &mut scope);
    }
    assert_eq!(driver.pending(), 3);
    assert_eq!(driver.settle(&mut scope).await, 3);
    assert!(driver.adapter().is_idle());

    assert!(model.lines().all(|l| l.pk.is_some()));
    let persisted = bus
        .history_of(EventCategory::Sync)
        .into_iter()
        .filter(|e| matches!(e, AppEvent::Sync(SyncEvent::Persisted { .. })))
        .count();
    assert_eq!(persisted, 3);
}

#[tokio::test]
async fn test_slow_request_times_out_and_rolls_back() {
    let bus = recording_bus();
    let mut driver = SyncDriver::new(
        Arc::new(SlowApi {
            delay: Duration::from_millis(500),
        }),
        Duration::from_millis(20),
        bus.clone(),
    );
    let mut model = PartModel::for_part(1);
    let mut cards = PartCards::default();
    let mut scope = SyncScope {
        model: &mut model,
        cards: &mut cards,
    };

    let command = create_line(scope.model, 10.0);
    driver.dispatch(command, &mut scope);
    driver.settle(&mut scope).await;

    assert_eq!(model.line_count(), 0);
    let history = bus.history();
    assert!(history.iter().any(|e| matches!(
        e,
        AppEvent::Sync(SyncEvent::RequestFailed { reason, .. }) if reason.contains("20")
    )));
    assert!(history.iter().any(|e| matches!(e, AppEvent::Alert(_))));
}

#[tokio::test]
async fn test_parked_update_follows_create() {
    let bus = recording_bus();
    let mut driver = SyncDriver::new(
        Arc::new(SlowApi {
            delay: Duration::from_millis(5),
        }),
        Duration::from_secs(1),
        bus.clone(),
    );
    let mut model = PartModel::for_part(1);
    let mut cards = PartCards::default();
    let mut scope = SyncScope {
        model: &mut model,
        cards: &mut cards,
    };

    let command = create_line(scope.model, 10.0);
    let EditorCommand::CreateLine { key, .. } = command else {
        unreachable!()
    };
    driver.dispatch(command, &mut scope);
    driver.dispatch(
        EditorCommand::UpdateLine(PrimitiveUpdate {
            key,
            pk: None,
            changes: vec![FieldChange::new(
                FieldValue::Typology(None),
                FieldValue::Typology(Some("Main".to_string())),
            )],
        }),
        &mut scope,
    );
    assert_eq!(driver.pending(), 1);
    assert_eq!(driver.settle(&mut scope).await, 2);

    let issued: Vec<String> = bus
        .history_of(EventCategory::Sync)
        .into_iter()
        .filter_map(|e| match e {
            AppEvent::Sync(SyncEvent::RequestIssued { operation, .. }) => Some(operation),
            _ => None,
        })
        .collect();
    assert_eq!(issued, vec!["create_line", "update_line"]);
    assert!(model.line(key).unwrap().pk.is_some());
}

#[tokio::test]
async fn test_file_store_round_trip() {
    let dir = store_dir();
    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    assert_eq!(store.part_order(), vec![1, 2]);

    let part = store.fetch_part(1).await.unwrap();
    assert_eq!(part.next, Some(2));
    let mut model = part.to_model();
    assert_eq!(model.line_count(), 2);

    let bus = Arc::new(EventBus::new());
    let mut driver = SyncDriver::new(store.clone(), Duration::from_secs(1), bus);
    let mut cards = PartCards::default();
    let mut scope = SyncScope {
        model: &mut model,
        cards: &mut cards,
    };

    let command = create_line(scope.model, 300.0);
    driver.dispatch(command, &mut scope);

    let first = scope.model.line_by_remote(11).unwrap();
    let key = PrimitiveKey::Line(first);
    let shifted = Polygon::new(vec![Point::new(10.0, 110.0), Point::new(900.0, 110.0)]);
    let previous = scope.model.line(first).unwrap().baseline.clone();
    FieldValue::Baseline(Some(shifted.clone())).apply(scope.model, key);
    driver.dispatch(
        EditorCommand::UpdateLine(PrimitiveUpdate {
            key: first,
            pk: Some(11),
            changes: vec![FieldChange::new(
                FieldValue::Baseline(previous),
                FieldValue::Baseline(Some(shifted)),
            )],
        }),
        &mut scope,
    );
    driver.settle(&mut scope).await;
    store.save().unwrap();

    let reopened = FileStore::open(dir.path()).unwrap();
    let saved = reopened.part(1).unwrap();
    assert_eq!(saved.lines.len(), 3);
    let line = saved.lines.iter().find(|l| l.pk == 11).unwrap();
    assert_eq!(
        line.baseline,
        Some(vec![Point::new(10.0, 110.0), Point::new(900.0, 110.0)])
    );
    assert!(model.lines().all(|l| l.pk.is_some()));
}

#[tokio::test]
async fn test_file_store_rejects_unknown_targets() {
    let dir = store_dir();
    let store = FileStore::open(dir.path()).unwrap();

    let missing = store
        .send(&RemoteRequest {
            id: 1,
            operation: RemoteOperation::DeleteLine { pk: 999 },
        })
        .await;
    assert_eq!(missing, Err(RemoteError::NotFound));

    let mut fields = folium_sync::Fields::new();
    fields.insert("colour".to_string(), serde_json::json!("red"));
    let bad = store
        .send(&RemoteRequest {
            id: 2,
            operation: RemoteOperation::UpdateLine { pk: 11, fields },
        })
        .await;
    assert!(matches!(bad, Err(RemoteError::Status { status: 400, .. })));
    assert_eq!(store.requests().len(), 2);
}

#[tokio::test]
async fn test_file_store_region_delete_unlinks_lines() {
    let dir = store_dir();
    let store = FileStore::open(dir.path()).unwrap();
    store
        .send(&RemoteRequest {
            id: 1,
            operation: RemoteOperation::DeleteRegion { pk: 10 },
        })
        .await
        .unwrap();
    let part = store.part(1).unwrap();
    assert!(part.regions.is_empty());
    assert!(part.lines.iter().all(|l| l.region.is_none()));
}

#[tokio::test]
async fn test_file_store_part_moves() {
    let dir = store_dir();
    let store = FileStore::open(dir.path()).unwrap();
    store
        .send(&RemoteRequest {
            id: 1,
            operation: RemoteOperation::MovePart { pk: 2, index: 0 },
        })
        .await
        .unwrap();
    assert_eq!(store.part_order(), vec![2, 1]);
    let part = store.fetch_part(1).await.unwrap();
    assert_eq!((part.previous, part.next), (Some(2), None));
}

#[tokio::test]
async fn test_aborted_request_rolls_back() {
    let bus = recording_bus();
    let mut driver = SyncDriver::new(Arc::new(CrashingApi), Duration::from_secs(1), bus.clone());
    let mut model = PartModel::for_part(1);
    let mut cards = PartCards::default();
    let mut scope = SyncScope {
        model: &mut model,
        cards: &mut cards,
    };

    let command = create_line(scope.model, 10.0);
    let key = command.key().unwrap();
    driver.dispatch(command, &mut scope);
    assert!(driver.adapter().is_creating(key));

    assert_eq!(driver.settle(&mut scope).await, 1);
    assert!(driver.adapter().is_idle());
    assert!(!driver.adapter().is_creating(key));
    assert_eq!(model.line_count(), 0);
    assert_eq!(bus.history_of(EventCategory::Alert).len(), 1);
}
