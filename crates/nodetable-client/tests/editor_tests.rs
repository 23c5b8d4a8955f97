use std::sync::Arc;

use pretty_assertions::assert_eq;

use nodetable_client::{CacheConfig, GraphSession, Mutation, QueryKey, TableEditor};
use nodetable_core::{
    ColumnDefinition, ColumnId, Direction, Filter, GraphError, PredicateId, TableDefinition, Triple,
};
use nodetable_test_utils::fixtures::{self, ACME, ALICE, BOB, CAROL, KNOWS, PEOPLE_TABLE, WORKS_AT};
use nodetable_test_utils::{InMemoryGraphApi, RecordingGraphApi};

struct TestContext {
    backend: InMemoryGraphApi,
    recorder: RecordingGraphApi,
    session: GraphSession,
    editor: TableEditor,
}

impl TestContext {
    fn new() -> Self {
        let backend = fixtures::sample_graph();
        let recorder = RecordingGraphApi::new(Arc::new(backend.clone()));
        let session = GraphSession::new(Arc::new(recorder.clone()), CacheConfig::default());
        let editor = TableEditor::new(session.clone(), PEOPLE_TABLE);
        Self {
            backend,
            recorder,
            session,
            editor,
        }
    }

    fn stored(&self) -> TableDefinition {
        self.backend
            .table_definition(PEOPLE_TABLE)
            .expect("people table exists")
    }
}

#[tokio::test]
async fn test_add_column_persists_with_fresh_id() {
    let ctx = TestContext::new();

    let id = ctx.editor.add_column(None, Direction::In).await.unwrap();

    assert_eq!(id, ColumnId(3));
    let stored = ctx.stored();
    assert_eq!(stored.columns.len(), 3);
    assert_eq!(stored.columns[2], ColumnDefinition::new(ColumnId(3), None, Direction::In));
}

#[tokio::test]
async fn test_column_ids_do_not_collide_after_removal() {
    let ctx = TestContext::new();

    ctx.editor.remove_column(ColumnId(1)).await.unwrap();
    let id = ctx.editor.add_column(Some(KNOWS), Direction::In).await.unwrap();

    let ids: Vec<ColumnId> = ctx.stored().columns.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![ColumnId(2), id]);
    assert_ne!(id, ColumnId(2));
}

#[tokio::test]
async fn test_removing_highest_column_does_not_free_its_id() {
    let ctx = TestContext::new();

    ctx.editor.remove_column(ColumnId(2)).await.unwrap();
    let id = ctx.editor.add_column(Some(KNOWS), Direction::In).await.unwrap();

    assert_eq!(id, ColumnId(3));
    let ids: Vec<ColumnId> = ctx.stored().columns.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![ColumnId(1), ColumnId(3)]);

    // Clones of the editor share the counter
    ctx.editor.remove_column(ColumnId(3)).await.unwrap();
    let id = ctx.editor.clone().add_column(None, Direction::Out).await.unwrap();
    assert_eq!(id, ColumnId(4));
}

#[tokio::test]
async fn test_change_column_updates_only_given_fields() {
    let ctx = TestContext::new();

    let rows = ctx
        .editor
        .change_column(ColumnId(1), None, Some(Direction::In))
        .await
        .unwrap();

    let stored = ctx.stored();
    assert_eq!(
        stored.columns[0],
        ColumnDefinition::new(ColumnId(1), Some(KNOWS), Direction::In)
    );
    assert_eq!(stored.columns[1], fixtures::people_table().columns[1]);

    // Bob is known by Alice
    let bob = rows.iter().find(|r| r.node_id == BOB).unwrap();
    assert_eq!(bob.cell(ColumnId(1)).unwrap().values, vec![ALICE]);
}

#[tokio::test]
async fn test_unknown_column_is_rejected_without_write() {
    let ctx = TestContext::new();

    let error = ctx
        .editor
        .change_column(ColumnId(9), Some(WORKS_AT), None)
        .await
        .unwrap_err();

    assert_eq!(error.mutation, Mutation::UpdateTable(PEOPLE_TABLE));
    assert!(error.source.is_not_found());
    assert_eq!(ctx.recorder.call_count("update_table"), 0);
}

#[tokio::test]
async fn test_set_filter_and_rename() {
    let ctx = TestContext::new();
    let employees = Filter {
        predicate: Some(WORKS_AT),
        direction: Direction::Out,
        another_node: Some(ACME),
    };

    let rows = ctx.editor.set_filter(employees).await.unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.node_id).collect();
    assert_eq!(ids, vec![ALICE, CAROL]);

    ctx.editor.rename("Employees").await.unwrap();

    let stored = ctx.stored();
    assert_eq!(stored.label, "Employees");
    assert_eq!(Filter::from(stored.filter), employees);
}

#[tokio::test]
async fn test_empty_label_is_rejected() {
    let ctx = TestContext::new();

    let error = ctx.editor.rename("   ").await.unwrap_err();

    assert!(matches!(error.source, GraphError::Validation(_)));
    assert!(ctx.recorder.calls().is_empty());
    assert_eq!(ctx.stored().label, "People");
}

#[tokio::test]
async fn test_edits_start_from_backend_state() {
    let ctx = TestContext::new();

    // Warm the cache, then change the table behind the session's back
    ctx.session.table(PEOPLE_TABLE).await;
    let mut external = fixtures::people_table();
    external.label = "Renamed elsewhere".to_string();
    ctx.backend.insert_table(PEOPLE_TABLE, external);

    ctx.editor.add_column(Some(KNOWS), Direction::In).await.unwrap();

    let stored = ctx.stored();
    assert_eq!(stored.label, "Renamed elsewhere");
    assert_eq!(stored.columns.len(), 3);
    assert_eq!(ctx.recorder.call_count("get_table"), 2);
}

#[tokio::test]
async fn test_update_invalidates_table_and_rows() {
    let ctx = TestContext::new();

    ctx.session.table(PEOPLE_TABLE).await;
    ctx.session.tables().await;

    ctx.editor.remove_column(ColumnId(2)).await.unwrap();

    assert!(ctx.session.cache().is_stale(&QueryKey::Table(PEOPLE_TABLE)));
    assert!(ctx.session.cache().is_stale(&QueryKey::Tables));
    let table = ctx.session.table(PEOPLE_TABLE).await.into_result().unwrap();
    assert_eq!(table.def.columns.len(), 1);
}

#[tokio::test]
async fn test_failed_save_keeps_cached_table() {
    let ctx = TestContext::new();

    ctx.session.table(PEOPLE_TABLE).await;
    ctx.recorder.fail_next(
        "update_table",
        GraphError::Http {
            status: 500,
            body: "boom".to_string(),
        },
    );

    let error = ctx.editor.rename("Staff").await.unwrap_err();

    assert_eq!(error.user_message(), "An error has occurred: HTTP error 500: boom");
    assert_eq!(ctx.stored().label, "People");
    let cached = ctx.session.cache().inspect(&QueryKey::Table(PEOPLE_TABLE));
    assert!(cached.value.is_some());
    assert!(cached.error.is_none());
}

#[tokio::test]
async fn test_create_table_uses_default_label() {
    let ctx = TestContext::new();

    let rows = TableEditor::create_table(&ctx.session, Some("  ")).await.unwrap();
    assert_eq!(rows.len(), 4);
    TableEditor::create_table(&ctx.session, Some("Companies")).await.unwrap();

    let tables = ctx.session.tables().await.into_result().unwrap();
    let labels: Vec<_> = tables.iter().map(|t| t.def.label.as_str()).collect();
    assert_eq!(labels, vec!["People", TableDefinition::DEFAULT_LABEL, "Companies"]);
}

#[tokio::test]
async fn test_delete_table() {
    let ctx = TestContext::new();

    ctx.session.tables().await;
    ctx.editor.clone().delete_table().await.unwrap();

    assert!(ctx.session.tables().await.into_result().unwrap().is_empty());
    let snapshot = ctx.session.table(PEOPLE_TABLE).await;
    assert!(snapshot.error().map_or(false, GraphError::is_not_found));

    // Deleting again reports the missing table
    let error = TableEditor::new(ctx.session.clone(), PEOPLE_TABLE)
        .delete_table()
        .await
        .unwrap_err();
    assert_eq!(error.mutation, Mutation::DeleteTable(PEOPLE_TABLE));
}

#[tokio::test]
async fn test_link_and_unlink_follow_column_direction() {
    let ctx = TestContext::new();
    let known_by = ColumnDefinition::new(ColumnId(5), Some(KNOWS), Direction::In);

    // "Acme is known by Bob" is the triple Bob -knows-> Acme
    ctx.editor.link(&known_by, ACME, BOB).await.unwrap();
    assert!(ctx.backend.triples().contains(&Triple::new(BOB, KNOWS, ACME)));

    let works_at = fixtures::people_table().columns[1].clone();
    ctx.editor.unlink(&works_at, ALICE, ACME).await.unwrap();
    assert!(!ctx.backend.triples().contains(&Triple::new(ALICE, WORKS_AT, ACME)));
}

#[tokio::test]
async fn test_link_requires_directed_column_with_predicate() {
    let ctx = TestContext::new();
    let undirected = ColumnDefinition::new(ColumnId(1), Some(KNOWS), Direction::Any);
    let unset = ColumnDefinition::new(ColumnId(2), None, Direction::Out);

    for column in [undirected, unset] {
        let error = ctx.editor.link(&column, ALICE, BOB).await.unwrap_err();
        assert!(matches!(error.source, GraphError::Validation(_)));
    }
    assert_eq!(ctx.recorder.call_count("create_triple"), 0);
}

#[tokio::test]
async fn test_saved_definition_round_trips() {
    let ctx = TestContext::new();
    let definition = TableDefinition {
        label: "Reverse".to_string(),
        filter: Filter::any().into(),
        columns: vec![ColumnDefinition::new(
            ColumnId(1),
            Some(PredicateId(3)),
            Direction::In,
        )],
    };

    ctx.session
        .update_table(PEOPLE_TABLE, &definition)
        .await
        .unwrap();
    let reloaded = ctx.editor.definition().await.unwrap();

    assert_eq!(reloaded, definition);
}

#[tokio::test]
async fn test_unfiltered_table_without_columns_lists_every_node() {
    let ctx = TestContext::new();

    ctx.editor.set_filter(Filter::any()).await.unwrap();
    ctx.editor.remove_column(ColumnId(1)).await.unwrap();
    ctx.editor.remove_column(ColumnId(2)).await.unwrap();

    let table = ctx.session.table(PEOPLE_TABLE).await.into_result().unwrap();
    let ids: Vec<_> = table.rows.iter().map(|r| r.node_id).collect();
    assert_eq!(ids, vec![ALICE, BOB, CAROL, ACME]);
    assert!(table.rows.iter().all(|r| r.columns.is_empty()));
}
