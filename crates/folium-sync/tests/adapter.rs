use folium_core::{LocalId, Point, PrimitiveKey, RemoteError, SyncEvent};
use folium_editor::{
    command_channel, EditorCommand, FieldChange, FieldValue, PartCard, PartCards, PartModel,
    Polygon, PrimitiveUpdate, Removed,
};
use folium_sync::{RemoteOperation, RemoteRequest, RemoteResponse, SyncAdapter, SyncScope};

struct Fixture {
    model: PartModel,
    cards: PartCards,
    adapter: SyncAdapter,
}

impl Fixture {
    fn new() -> Self {
        Self {
            model: PartModel::for_part(1),
            cards: PartCards::new((1..=6).map(|pk| PartCard::new(pk, format!("f. {pk}"))).collect()),
            adapter: SyncAdapter::new(),
        }
    }

    fn handle(&mut self, command: EditorCommand) -> Vec<RemoteRequest> {
        let mut scope = SyncScope {
            model: &mut self.model,
            cards: &mut self.cards,
        };
        self.adapter.handle(command, &mut scope)
    }

    fn complete(
        &mut self,
        request: &RemoteRequest,
        result: Result<RemoteResponse, RemoteError>,
    ) -> folium_sync::Completion {
        let mut scope = SyncScope {
            model: &mut self.model,
            cards: &mut self.cards,
        };
        self.adapter.complete(request.id, result, &mut scope)
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64)) -> LocalId {
        let id = self.model.create_line(Point::new(from.0, from.1));
        self.model.append_point(id, Point::new(to.0, to.1));
        id
    }

    fn saved_line(&mut self, pk: u64, y: f64) -> LocalId {
        let id = self.line((0.0, y), (100.0, y));
        self.model.set_remote_id(PrimitiveKey::Line(id), pk);
        id
    }

    fn create_command(&self, id: LocalId) -> EditorCommand {
        let line = self.model.line(id).unwrap();
        EditorCommand::CreateLine {
            key: id,
            baseline: line.baseline.clone(),
            mask: line.mask.clone(),
            region: line.region,
            order: line.order,
        }
    }

    /// Applies a new baseline locally and returns the matching command.
    fn move_baseline(&mut self, id: LocalId, to: Polygon) -> EditorCommand {
        let key = PrimitiveKey::Line(id);
        let previous = self.model.line(id).unwrap().baseline.clone();
        FieldValue::Baseline(Some(to.clone())).apply(&mut self.model, key);
        EditorCommand::UpdateLine(PrimitiveUpdate {
            key: id,
            pk: self.model.remote_id(key),
            changes: vec![FieldChange::new(
                FieldValue::Baseline(previous),
                FieldValue::Baseline(Some(to)),
            )],
        })
    }
}

fn flat(y: f64) -> Polygon {
    Polygon::new(vec![Point::new(0.0, y), Point::new(100.0, y)])
}

fn server_error() -> RemoteError {
    RemoteError::Status {
        status: 500,
        message: "internal error".to_string(),
    }
}

fn rolled_back(events: &[SyncEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::RolledBack { fields, .. } => Some(fields.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

#[test]
fn test_update_waits_for_create() {
    let mut fx = Fixture::new();
    let id = fx.line((0.0, 10.0), (100.0, 10.0));
    let create = fx.handle(fx.create_command(id));
    assert_eq!(create.len(), 1);
    assert!(matches!(
        create[0].operation,
        RemoteOperation::CreateLine { part: 1, .. }
    ));
    assert!(fx.adapter.is_creating(PrimitiveKey::Line(id)));

    let update = fx.move_baseline(id, flat(20.0));
    assert!(fx.handle(update).is_empty());

    let done = fx.complete(&create[0], Ok(RemoteResponse::created(40)));
    assert!(done.events.contains(&SyncEvent::Persisted {
        key: PrimitiveKey::Line(id),
        remote_id: 40,
    }));
    assert_eq!(done.requests.len(), 1);
    match &done.requests[0].operation {
        RemoteOperation::UpdateLine { pk, fields } => {
            assert_eq!(*pk, 40);
            assert_eq!(fields["baseline"], serde_json::json!([[0.0, 20.0], [100.0, 20.0]]));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(fx.model.remote_id(PrimitiveKey::Line(id)), Some(40));
}

#[test]
fn test_failed_update_restores_only_its_fields() {
    let mut fx = Fixture::new();
    let id = fx.saved_line(7, 10.0);
    let key = PrimitiveKey::Line(id);
    let old_baseline = fx.model.line(id).unwrap().baseline.clone();

    FieldValue::Baseline(Some(flat(30.0))).apply(&mut fx.model, key);
    FieldValue::Typology(Some("Main".to_string())).apply(&mut fx.model, key);
    let update = EditorCommand::UpdateLine(PrimitiveUpdate {
        key: id,
        pk: Some(7),
        changes: vec![
            FieldChange::new(
                FieldValue::Baseline(old_baseline.clone()),
                FieldValue::Baseline(Some(flat(30.0))),
            ),
            FieldChange::new(
                FieldValue::Typology(None),
                FieldValue::Typology(Some("Main".to_string())),
            ),
        ],
    });
    let sent = fx.handle(update);
    assert_eq!(sent.len(), 1);

    // Edited locally while the update was in flight, never sent.
    let mask = Polygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(100.0, 0.0),
        Point::new(100.0, 20.0),
    ]);
    FieldValue::Mask(Some(mask.clone())).apply(&mut fx.model, key);

    let done = fx.complete(&sent[0], Err(server_error()));
    let line = fx.model.line(id).unwrap();
    assert_eq!(line.baseline, old_baseline);
    assert_eq!(line.typology, None);
    assert_eq!(line.mask, Some(mask));
    assert_eq!(rolled_back(&done.events), vec!["baseline", "typology"]);
    let alert = done.alert.expect("one alert for the failed save");
    assert!(alert.message.ends_with("Please try again."));
}

#[test]
fn test_rollback_uses_last_confirmed_value() {
    let mut fx = Fixture::new();
    let id = fx.saved_line(7, 10.0);

    let first = fx.move_baseline(id, flat(20.0));
    let sent = fx.handle(first);
    fx.complete(&sent[0], Ok(RemoteResponse::ok()));

    let second = fx.move_baseline(id, flat(30.0));
    let sent = fx.handle(second);
    fx.complete(&sent[0], Err(server_error()));

    assert_eq!(fx.model.line(id).unwrap().baseline, Some(flat(20.0)));
}

#[test]
fn test_queued_update_supersedes_failed_one() {
    let mut fx = Fixture::new();
    let id = fx.saved_line(7, 10.0);

    let first = fx.move_baseline(id, flat(20.0));
    let in_flight = fx.handle(first);
    assert_eq!(in_flight.len(), 1);
    let second = fx.move_baseline(id, flat(30.0));
    assert!(fx.handle(second).is_empty());

    let done = fx.complete(&in_flight[0], Err(server_error()));
    assert_eq!(fx.model.line(id).unwrap().baseline, Some(flat(30.0)));
    assert!(rolled_back(&done.events).is_empty());
    assert_eq!(done.requests.len(), 1);

    // The newer edit now carries the last good value.
    fx.complete(&done.requests[0], Err(server_error()));
    assert_eq!(fx.model.line(id).unwrap().baseline, Some(flat(10.0)));
    assert!(fx.adapter.is_idle());
}

#[test]
fn test_failed_create_removes_primitive_and_parked_edits() {
    let mut fx = Fixture::new();
    let id = fx.line((0.0, 10.0), (100.0, 10.0));
    let create = fx.handle(fx.create_command(id));
    let update = fx.move_baseline(id, flat(20.0));
    fx.handle(update);

    let done = fx.complete(
        &create[0],
        Err(RemoteError::Network {
            reason: "connection reset".to_string(),
        }),
    );
    assert!(!fx.model.contains(PrimitiveKey::Line(id)));
    assert!(done.requests.is_empty());
    assert_eq!(rolled_back(&done.events), vec!["created"]);
    assert!(done.alert.is_some());
    assert!(fx.adapter.is_idle());
}

#[test]
fn test_create_without_id_counts_as_failure() {
    let mut fx = Fixture::new();
    let id = fx.line((0.0, 10.0), (100.0, 10.0));
    let create = fx.handle(fx.create_command(id));
    let done = fx.complete(&create[0], Ok(RemoteResponse::ok()));
    assert!(!fx.model.contains(PrimitiveKey::Line(id)));
    assert!(matches!(done.events[0], SyncEvent::RequestFailed { .. }));
}

#[test]
fn test_failed_delete_restores_line_and_region_link() {
    let mut fx = Fixture::new();
    let region = fx
        .model
        .create_region(Polygon::rectangle(Point::new(0.0, 0.0), Point::new(200.0, 200.0)));
    fx.model.set_remote_id(PrimitiveKey::Region(region), 3);
    let id = fx.saved_line(7, 10.0);
    fx.model.assign_region(id, Some(region));

    let Some(Removed::Line(snapshot)) = fx.model.remove(PrimitiveKey::Line(id)) else {
        panic!("line not removed");
    };
    let sent = fx.handle(EditorCommand::DeleteLine {
        key: id,
        pk: Some(7),
        snapshot,
    });
    assert_eq!(sent[0].operation, RemoteOperation::DeleteLine { pk: 7 });

    let done = fx.complete(&sent[0], Err(server_error()));
    assert_eq!(fx.model.line(id).unwrap().region, Some(region));
    assert_eq!(rolled_back(&done.events), vec!["deleted"]);
    assert!(done.alert.is_some());
}

#[test]
fn test_restored_line_drops_link_to_deleted_region() {
    let mut fx = Fixture::new();
    let region = fx
        .model
        .create_region(Polygon::rectangle(Point::new(0.0, 0.0), Point::new(200.0, 200.0)));
    fx.model.set_remote_id(PrimitiveKey::Region(region), 3);
    let id = fx.saved_line(7, 10.0);
    fx.model.assign_region(id, Some(region));

    let Some(Removed::Line(snapshot)) = fx.model.remove(PrimitiveKey::Line(id)) else {
        panic!("line not removed");
    };
    let line_delete = fx.handle(EditorCommand::DeleteLine {
        key: id,
        pk: Some(7),
        snapshot,
    });
    let Some(Removed::Region { region: snapshot, detached }) =
        fx.model.remove(PrimitiveKey::Region(region))
    else {
        panic!("region not removed");
    };
    let region_delete = fx.handle(EditorCommand::DeleteRegion {
        key: region,
        pk: Some(3),
        snapshot,
        detached,
    });
    fx.complete(&region_delete[0], Ok(RemoteResponse::ok()));
    fx.complete(&line_delete[0], Err(server_error()));

    let line = fx.model.line(id).unwrap();
    assert_eq!(line.region, None);
}

#[test]
fn test_failed_region_delete_relinks_lines() {
    let mut fx = Fixture::new();
    let region = fx
        .model
        .create_region(Polygon::rectangle(Point::new(0.0, 0.0), Point::new(200.0, 200.0)));
    fx.model.set_remote_id(PrimitiveKey::Region(region), 3);
    let a = fx.saved_line(7, 10.0);
    let b = fx.saved_line(8, 20.0);
    fx.model.assign_region(a, Some(region));
    fx.model.assign_region(b, Some(region));

    let Some(Removed::Region { region: snapshot, detached }) =
        fx.model.remove(PrimitiveKey::Region(region))
    else {
        panic!("region not removed");
    };
    assert_eq!(detached.len(), 2);
    let sent = fx.handle(EditorCommand::DeleteRegion {
        key: region,
        pk: Some(3),
        snapshot,
        detached,
    });
    fx.complete(&sent[0], Err(RemoteError::NotFound));

    assert!(fx.model.contains(PrimitiveKey::Region(region)));
    assert_eq!(fx.model.line(a).unwrap().region, Some(region));
    assert_eq!(fx.model.line(b).unwrap().region, Some(region));
}

#[test]
fn test_unsaved_delete_sends_nothing() {
    let mut fx = Fixture::new();
    let id = fx.line((0.0, 10.0), (100.0, 10.0));
    let Some(Removed::Line(snapshot)) = fx.model.remove(PrimitiveKey::Line(id)) else {
        panic!("line not removed");
    };
    let sent = fx.handle(EditorCommand::DeleteLine {
        key: id,
        pk: None,
        snapshot,
    });
    assert!(sent.is_empty());
    assert!(fx.adapter.is_idle());
}

#[test]
fn test_delete_waits_for_create_and_uses_its_id() {
    let mut fx = Fixture::new();
    let id = fx.line((0.0, 10.0), (100.0, 10.0));
    let create = fx.handle(fx.create_command(id));
    let Some(Removed::Line(snapshot)) = fx.model.remove(PrimitiveKey::Line(id)) else {
        panic!("line not removed");
    };
    assert!(fx
        .handle(EditorCommand::DeleteLine {
            key: id,
            pk: None,
            snapshot,
        })
        .is_empty());

    let done = fx.complete(&create[0], Ok(RemoteResponse::created(41)));
    assert!(done
        .events
        .iter()
        .any(|e| matches!(e, SyncEvent::StaleResponseDiscarded { .. })));
    assert_eq!(done.requests.len(), 1);
    assert_eq!(done.requests[0].operation, RemoteOperation::DeleteLine { pk: 41 });
}

#[test]
fn test_failed_part_move_puts_card_back() {
    let mut fx = Fixture::new();
    let (tx, mut rx) = command_channel();
    let session = fx.cards.begin_drag(3).unwrap();
    assert_eq!(session.from, 2);
    assert!(fx.cards.drop(session, 5, &tx));
    assert_eq!(fx.cards.index_of(3), Some(5));

    let command = rx.try_recv().unwrap();
    let sent = fx.handle(command);
    assert_eq!(sent[0].operation, RemoteOperation::MovePart { pk: 3, index: 5 });

    let done = fx.complete(&sent[0], Err(server_error()));
    assert_eq!(fx.cards.index_of(3), Some(2));
    assert_eq!(fx.cards.order(), vec![1, 2, 3, 4, 5, 6]);
    assert!(done.alert.is_some());
}

#[test]
fn test_failed_line_move_restores_order() {
    let mut fx = Fixture::new();
    let first = fx.saved_line(7, 10.0);
    fx.saved_line(8, 20.0);
    fx.saved_line(9, 30.0);

    let from = fx.model.move_line(first, 2).unwrap();
    let sent = fx.handle(EditorCommand::MoveLine {
        key: first,
        pk: Some(7),
        from,
        to: 2,
    });
    assert_eq!(sent[0].operation, RemoteOperation::MoveLine { pk: 7, index: 2 });

    let done = fx.complete(&sent[0], Err(server_error()));
    assert_eq!(fx.model.line_index(first), Some(0));
    assert_eq!(rolled_back(&done.events), vec!["order"]);
}

#[test]
fn test_line_create_waits_for_its_region() {
    let mut fx = Fixture::new();
    let outline = Polygon::rectangle(Point::new(0.0, 0.0), Point::new(200.0, 200.0));
    let region = fx.model.create_region(outline.clone());
    let region_create = fx.handle(EditorCommand::CreateRegion {
        key: region,
        outline,
        typology: None,
    });
    assert_eq!(region_create.len(), 1);

    let id = fx.line((0.0, 10.0), (100.0, 10.0));
    fx.model.assign_region(id, Some(region));
    assert!(fx.handle(fx.create_command(id)).is_empty());

    let done = fx.complete(&region_create[0], Ok(RemoteResponse::created(5)));
    assert_eq!(done.requests.len(), 1);
    match &done.requests[0].operation {
        RemoteOperation::CreateLine { fields, .. } => {
            assert_eq!(fields["region"], serde_json::json!(5));
        }
        other => panic!("unexpected {other:?}"),
    }
}

/// Region create in flight, line create parked behind it.
fn line_in_unsaved_region(fx: &mut Fixture) -> (LocalId, RemoteRequest) {
    let outline = Polygon::rectangle(Point::new(0.0, 0.0), Point::new(200.0, 200.0));
    let region = fx.model.create_region(outline.clone());
    let mut region_create = fx.handle(EditorCommand::CreateRegion {
        key: region,
        outline,
        typology: None,
    });
    let id = fx.line((0.0, 10.0), (100.0, 10.0));
    fx.model.assign_region(id, Some(region));
    assert!(fx.handle(fx.create_command(id)).is_empty());
    assert!(fx.adapter.is_creating(PrimitiveKey::Line(id)));
    (id, region_create.remove(0))
}

#[test]
fn test_edit_of_parked_line_follows_its_create() {
    let mut fx = Fixture::new();
    let (id, region_create) = line_in_unsaved_region(&mut fx);

    let update = fx.move_baseline(id, flat(50.0));
    assert!(fx.handle(update).is_empty());

    let done = fx.complete(&region_create, Ok(RemoteResponse::created(5)));
    assert_eq!(done.requests.len(), 1);
    let line_create = &done.requests[0];
    assert!(matches!(line_create.operation, RemoteOperation::CreateLine { .. }));

    let done = fx.complete(line_create, Ok(RemoteResponse::created(60)));
    assert_eq!(done.requests.len(), 1);
    match &done.requests[0].operation {
        RemoteOperation::UpdateLine { pk, fields } => {
            assert_eq!(*pk, 60);
            assert_eq!(fields["baseline"], serde_json::json!([[0.0, 50.0], [100.0, 50.0]]));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_deleting_parked_line_cancels_its_create() {
    let mut fx = Fixture::new();
    let (id, region_create) = line_in_unsaved_region(&mut fx);
    let update = fx.move_baseline(id, flat(50.0));
    assert!(fx.handle(update).is_empty());

    let Some(Removed::Line(snapshot)) = fx.model.remove(PrimitiveKey::Line(id)) else {
        panic!("line not removed");
    };
    assert!(fx
        .handle(EditorCommand::DeleteLine {
            key: id,
            pk: None,
            snapshot,
        })
        .is_empty());
    assert!(!fx.adapter.is_creating(PrimitiveKey::Line(id)));

    let done = fx.complete(&region_create, Ok(RemoteResponse::created(5)));
    assert!(done.requests.is_empty());
    assert!(fx.adapter.is_idle());
}

#[test]
fn test_line_moves_are_sent_one_at_a_time() {
    let mut fx = Fixture::new();
    let line = fx.saved_line(7, 10.0);
    for (pk, y) in [(8, 20.0), (9, 30.0), (10, 40.0), (11, 50.0)] {
        fx.saved_line(pk, y);
    }

    let from = fx.model.move_line(line, 2).unwrap();
    let first = fx.handle(EditorCommand::MoveLine {
        key: line,
        pk: Some(7),
        from,
        to: 2,
    });
    let from = fx.model.move_line(line, 4).unwrap();
    assert!(fx
        .handle(EditorCommand::MoveLine {
            key: line,
            pk: Some(7),
            from,
            to: 4,
        })
        .is_empty());
    assert_eq!(fx.adapter.in_flight(), 1);

    let done = fx.complete(&first[0], Err(server_error()));
    assert!(rolled_back(&done.events).is_empty());
    assert_eq!(fx.model.line_index(line), Some(4));
    assert_eq!(done.requests.len(), 1);
    assert_eq!(done.requests[0].operation, RemoteOperation::MoveLine { pk: 7, index: 4 });

    fx.complete(&done.requests[0], Ok(RemoteResponse::ok()));
    assert_eq!(fx.model.line_index(line), Some(4));
    assert!(fx.adapter.is_idle());
}

#[test]
fn test_failed_queued_move_returns_to_acknowledged_position() {
    let mut fx = Fixture::new();
    let line = fx.saved_line(7, 10.0);
    for (pk, y) in [(8, 20.0), (9, 30.0), (10, 40.0), (11, 50.0)] {
        fx.saved_line(pk, y);
    }

    let from = fx.model.move_line(line, 2).unwrap();
    let first = fx.handle(EditorCommand::MoveLine {
        key: line,
        pk: Some(7),
        from,
        to: 2,
    });
    let from = fx.model.move_line(line, 4).unwrap();
    fx.handle(EditorCommand::MoveLine {
        key: line,
        pk: Some(7),
        from,
        to: 4,
    });

    let done = fx.complete(&first[0], Ok(RemoteResponse::ok()));
    assert_eq!(done.requests[0].operation, RemoteOperation::MoveLine { pk: 7, index: 4 });
    let done = fx.complete(&done.requests[0], Err(server_error()));
    assert_eq!(fx.model.line_index(line), Some(2));
    assert_eq!(rolled_back(&done.events), vec!["order"]);
    assert!(done.alert.is_some());
}

#[test]
fn test_page_moves_are_sent_one_at_a_time() {
    let mut fx = Fixture::new();
    let (tx, mut rx) = command_channel();
    let drag = fx.cards.begin_drag(3).unwrap();
    assert!(fx.cards.drop(drag, 5, &tx));
    let first = fx.handle(rx.try_recv().unwrap());
    let drag = fx.cards.begin_drag(3).unwrap();
    assert!(fx.cards.drop(drag, 0, &tx));
    assert!(fx.handle(rx.try_recv().unwrap()).is_empty());

    let done = fx.complete(&first[0], Err(server_error()));
    assert_eq!(fx.cards.index_of(3), Some(0));
    assert_eq!(done.requests[0].operation, RemoteOperation::MovePart { pk: 3, index: 0 });
}

#[test]
fn test_response_for_removed_line_is_discarded() {
    let mut fx = Fixture::new();
    let id = fx.saved_line(7, 10.0);
    let update = fx.move_baseline(id, flat(20.0));
    let sent = fx.handle(update);
    fx.model.remove(PrimitiveKey::Line(id));

    let done = fx.complete(&sent[0], Err(server_error()));
    assert!(done
        .events
        .iter()
        .any(|e| matches!(e, SyncEvent::StaleResponseDiscarded { .. })));
    assert!(done.alert.is_none());
    assert!(rolled_back(&done.events).is_empty());
}

#[test]
fn test_bulk_update_splits_unsaved_lines() {
    let mut fx = Fixture::new();
    let saved = fx.saved_line(7, 10.0);
    let fresh = fx.line((0.0, 20.0), (100.0, 20.0));
    let create = fx.handle(fx.create_command(fresh));

    let updates = [saved, fresh]
        .into_iter()
        .map(|id| {
            let key = PrimitiveKey::Line(id);
            let previous = fx.model.line(id).unwrap().order;
            PrimitiveUpdate {
                key: id,
                pk: fx.model.remote_id(key),
                changes: vec![FieldChange::new(
                    FieldValue::Order(previous),
                    FieldValue::Order(previous),
                )],
            }
        })
        .collect();
    let sent = fx.handle(EditorCommand::BulkUpdateLines(updates));
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        sent[0].operation,
        RemoteOperation::UpdateLine { pk: 7, .. }
    ));

    let done = fx.complete(&create[0], Ok(RemoteResponse::created(50)));
    assert!(matches!(
        done.requests[0].operation,
        RemoteOperation::UpdateLine { pk: 50, .. }
    ));
}

#[test]
fn test_failed_transcription_restores_previous_text() {
    let mut fx = Fixture::new();
    let id = fx.saved_line(7, 10.0);
    let key = PrimitiveKey::Line(id);
    FieldValue::Content {
        layer: 2,
        content: "dominus".to_string(),
    }
    .apply(&mut fx.model, key);

    FieldValue::Content {
        layer: 2,
        content: "dominus uobiscum".to_string(),
    }
    .apply(&mut fx.model, key);
    let sent = fx.handle(EditorCommand::SaveTranscription {
        line: id,
        layer: 2,
        previous: "dominus".to_string(),
        content: "dominus uobiscum".to_string(),
    });
    match &sent[0].operation {
        RemoteOperation::SaveTranscription { pk, line, layer, .. } => {
            assert_eq!((*pk, *line, *layer), (None, 7, 2));
        }
        other => panic!("unexpected {other:?}"),
    }

    let done = fx.complete(&sent[0], Err(server_error()));
    assert_eq!(fx.model.line(id).unwrap().content(2), Some("dominus"));
    assert_eq!(rolled_back(&done.events), vec!["content[2]"]);
}

#[test]
fn test_saved_transcription_records_its_id() {
    let mut fx = Fixture::new();
    let id = fx.saved_line(7, 10.0);
    let sent = fx.handle(EditorCommand::SaveTranscription {
        line: id,
        layer: 2,
        previous: String::new(),
        content: "amen".to_string(),
    });
    fx.complete(&sent[0], Ok(RemoteResponse::created(90)));
    assert_eq!(
        fx.model.line(id).unwrap().transcriptions.get(&2).unwrap().pk,
        Some(90)
    );
}
