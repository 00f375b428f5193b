use std::collections::BTreeSet;

use sqldoc::{
    bson::{Bson, Document, doc},
    connector::SqlValue,
    document::{self, Metadata},
    prelude::*,
    stamp,
    statement::Statement,
};

use crate::common::{scalar, store, stored_rows};

fn keys(document: &sqldoc::bson::Document) -> BTreeSet<&str> {
    document.keys().map(String::as_str).collect()
}

#[test]
fn test_insert_then_get_round_trips() {
    let store = store();
    let people = store.collection("people").unwrap();

    let stored = people
        .insert(doc! { "name": "ada", "age": 30, "tags": ["math", "engines"] })
        .unwrap();
    let id = stored.get_str("id").unwrap();

    let fetched = people.get(id).unwrap().unwrap();

    assert_eq!(fetched, stored);
    assert_eq!(
        keys(&fetched),
        BTreeSet::from(["name", "age", "tags", "id", "revision", "updated", "origin"])
    );
    assert_eq!(fetched.get_array("tags").unwrap().len(), 2);
}

#[test]
fn test_insert_stamps_metadata() {
    let store = store();
    let people = store.collection("people").unwrap();

    let ada = people.insert(doc! { "name": "ada", "age": 30 }).unwrap();

    let id = ada.get_str("id").unwrap();
    assert_eq!(id.len(), 32);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

    let revision = ada.get_i64("revision").unwrap();
    assert!((1_000_000..=9_999_999).contains(&revision));

    assert_eq!(ada.get_str("updated").unwrap(), ada.get_str("origin").unwrap());
}

#[test]
fn test_update_keeps_origin_and_changes_revision() {
    let store = store();
    let people = store.collection("people").unwrap();

    let ada = people.insert(doc! { "name": "ada", "age": 30 }).unwrap();
    let id = ada.get_str("id").unwrap();

    let birthday = people.update(id, doc! { "name": "ada", "age": 31 }).unwrap();

    assert_eq!(birthday.get_str("id").unwrap(), id);
    assert_eq!(birthday.get_str("origin").unwrap(), ada.get_str("origin").unwrap());
    assert_ne!(birthday.get_i64("revision").unwrap(), ada.get_i64("revision").unwrap());
    assert!(birthday.get_str("updated").unwrap() > ada.get_str("updated").unwrap());

    let current = people.get(id).unwrap().unwrap();
    assert_eq!(current.get_i32("age").unwrap(), 31);
    assert_eq!(people.count(Selector::All).unwrap(), 1);
}

#[test]
fn test_many_updates_keep_invariants() {
    let store = store();
    let people = store.collection("people").unwrap();

    let first = people.insert(doc! { "n": 0 }).unwrap();
    let id = first.get_str("id").unwrap().to_string();
    let origin = first.get_str("origin").unwrap().to_string();

    let mut revision = first.get_i64("revision").unwrap();
    let mut updated = first.get_str("updated").unwrap().to_string();

    for n in 1..20 {
        let written = people.update(&id, doc! { "n": n }).unwrap();

        assert_eq!(written.get_str("origin").unwrap(), origin);
        assert!(written.get_str("updated").unwrap() > updated.as_str());
        updated = written.get_str("updated").unwrap().to_string();

        assert_ne!(written.get_i64("revision").unwrap(), revision);
        revision = written.get_i64("revision").unwrap();
    }

    assert_eq!(people.get(&id).unwrap().unwrap().get_i32("n").unwrap(), 19);
}

#[test]
fn test_update_of_unknown_id_creates_it() {
    let store = store();
    let people = store.collection("people").unwrap();

    let created = people.update("grace", doc! { "name": "grace" }).unwrap();

    assert_eq!(created.get_str("id").unwrap(), "grace");
    assert_eq!(created.get_str("origin").unwrap(), created.get_str("updated").unwrap());
    assert!(people.get("grace").unwrap().is_some());
}

#[test]
fn test_insert_rejects_caller_id() {
    let store = store();
    let people = store.collection("people").unwrap();

    let err = people.insert(doc! { "id": "mine", "name": "ada" }).unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    assert_eq!(stored_rows(&store, "people", "mine"), 0);
}

#[test]
fn test_update_rejects_empty_id() {
    let store = store();
    let people = store.collection("people").unwrap();

    assert!(matches!(
        people.update("", doc! { "name": "ada" }),
        Err(DocumentStoreError::InvalidDocument(_))
    ));
}

#[test]
fn test_pruning_keeps_single_revision() {
    let store = store();
    let people = store.collection("people").unwrap();

    let id = people.insert(doc! { "v": 1 }).unwrap().get_str("id").unwrap().to_string();
    people.update(&id, doc! { "v": 2 }).unwrap();
    let latest = people.update(&id, doc! { "v": 3 }).unwrap();

    assert_eq!(stored_rows(&store, "people", &id), 1);
    assert_eq!(people.revisions(&id).unwrap(), vec![latest.get_i64("revision").unwrap()]);
}

#[test]
fn test_version_tracking_keeps_every_revision() {
    let store = store();
    let people = store
        .collection_with_options("people", CollectionOptions::new().with_version_tracking(true))
        .unwrap();

    let first = people.insert(doc! { "v": 1 }).unwrap();
    let id = first.get_str("id").unwrap();
    let second = people.update(id, doc! { "v": 2 }).unwrap();
    let third = people.update(id, doc! { "v": 3 }).unwrap();

    assert_eq!(stored_rows(&store, "people", id), 3);
    assert_eq!(
        people.revisions(id).unwrap(),
        vec![
            third.get_i64("revision").unwrap(),
            second.get_i64("revision").unwrap(),
            first.get_i64("revision").unwrap(),
        ]
    );

    let distinct: BTreeSet<_> = people.revisions(id).unwrap().into_iter().collect();
    assert_eq!(distinct.len(), 3);

    assert_eq!(people.get(id).unwrap().unwrap().get_i32("v").unwrap(), 3);
    assert_eq!(people.count(Selector::All).unwrap(), 1);
    assert_eq!(
        people
            .find(Query::builder().filter(Filter::gt("v", 0)).build())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_index_rows_cover_indexable_properties() {
    let store = store();
    let people = store.collection("people").unwrap();

    let stored = people
        .insert(doc! {
            "a": "x",
            "b": 1,
            "c": true,
            "d": Bson::Null,
            "e": { "nested": 1 },
            "f": [1, 2],
        })
        .unwrap();
    let id = stored.get_str("id").unwrap();

    let rows = store
        .connector()
        .query(
            &Statement::new(
                "SELECT type, property, value, origin FROM \"people_index\" \
                 WHERE id = ? ORDER BY type DESC, property",
            )
            .bind(id),
        )
        .unwrap()
        .map(|row| row.into_values())
        .collect::<Vec<_>>();

    let origin = SqlValue::from(stored.get_str("origin").unwrap());
    let value_row = |property: &str, value: SqlValue| {
        vec![SqlValue::from("value"), SqlValue::from(property), value, origin.clone()]
    };

    assert_eq!(
        rows,
        vec![
            value_row("a", SqlValue::from("x")),
            value_row("b", SqlValue::Integer(1)),
            value_row("c", SqlValue::Integer(1)),
            value_row("d", SqlValue::Null),
            vec![SqlValue::from("registry"), SqlValue::Null, SqlValue::Null, origin.clone()],
        ]
    );
}

#[test]
fn test_update_replaces_index_rows() {
    let store = store();
    let people = store.collection("people").unwrap();

    let id = people
        .insert(doc! { "a": "x", "b": 1 })
        .unwrap()
        .get_str("id")
        .unwrap()
        .to_string();
    people.update(&id, doc! { "a": "y" }).unwrap();

    let index_rows = |property: &str| {
        scalar(
            &store,
            Statement::new("SELECT COUNT(*) FROM \"people_index\" WHERE id = ? AND property = ?")
                .bind(id.as_str())
                .bind(property),
        )
    };

    assert_eq!(index_rows("a"), 1);
    assert_eq!(index_rows("b"), 0);
    assert!(
        people
            .find(Query::builder().filter(Filter::eq("a", "x")).build())
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        people
            .find(Query::builder().filter(Filter::eq("a", "y")).build())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_delete_removes_revisions_and_index_rows() {
    let store = store();
    let people = store
        .collection_with_options("people", CollectionOptions::new().with_version_tracking(true))
        .unwrap();

    let id = people.insert(doc! { "a": "x" }).unwrap().get_str("id").unwrap().to_string();
    people.update(&id, doc! { "a": "x" }).unwrap();
    let other = people.insert(doc! { "a": "x" }).unwrap();

    assert_eq!(people.count(Selector::All).unwrap(), 2);

    people.delete(&id).unwrap();

    assert!(people.get(&id).unwrap().is_none());
    assert!(people.find(id.as_str()).unwrap().is_empty());
    assert_eq!(people.count(Selector::All).unwrap(), 1);
    assert_eq!(people.count(id.as_str()).unwrap(), 0);
    assert_eq!(stored_rows(&store, "people", &id), 0);
    assert_eq!(
        scalar(
            &store,
            Statement::new("SELECT COUNT(*) FROM \"people_index\" WHERE id = ?").bind(id.as_str()),
        ),
        0
    );

    let remaining = people
        .find(Query::builder().filter(Filter::eq("a", "x")).build())
        .unwrap();
    assert_eq!(remaining, vec![other]);
}

/// Writes a revision row left uncommitted, as an interrupted write would.
fn stage_uncommitted(
    store: &DocumentStore<SqliteConnector>,
    metadata: &Metadata,
    mut document: Document,
) {
    metadata.attach(&mut document);
    store
        .connector()
        .execute(
            &Statement::new(
                "INSERT INTO \"people\" (id, revision, committed, updated, origin, document) \
                 VALUES (?, ?, 0, ?, ?, ?)",
            )
            .bind(metadata.id.as_str())
            .bind(metadata.revision)
            .bind(metadata.updated.as_str())
            .bind(metadata.origin.as_str())
            .bind(document::encode(&document).unwrap()),
        )
        .unwrap();
}

fn stage_index_row(store: &DocumentStore<SqliteConnector>, id: &str, property: Option<&str>) {
    let (kind, value) = match property {
        Some(_) => ("value", SqlValue::from("x")),
        None => ("registry", SqlValue::Null),
    };

    store
        .connector()
        .execute(
            &Statement::new(
                "INSERT INTO \"people_index\" (id, type, property, value, origin) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(kind)
            .bind(property)
            .bind(value)
            .bind(stamp::now()),
        )
        .unwrap();
}

#[test]
fn test_uncommitted_revisions_are_invisible() {
    let store = store();
    let people = store.collection("people").unwrap();

    let ada = people.insert(doc! { "a": "x", "name": "ada" }).unwrap();
    let id = ada.get_str("id").unwrap();

    // A newer revision of a committed document.
    stage_uncommitted(
        &store,
        &Metadata {
            id: id.to_string(),
            revision: 1_234_567,
            updated: "9999-12-31 23:59:59.999999".into(),
            origin: ada.get_str("origin").unwrap().into(),
        },
        doc! { "a": "x", "name": "ada lovelace" },
    );

    // An id that was never committed at all, with its index rows in place.
    let now = stamp::now();
    stage_uncommitted(
        &store,
        &Metadata {
            id: "ghost".into(),
            revision: 7_654_321,
            updated: now.clone(),
            origin: now,
        },
        doc! { "a": "x", "name": "ghost" },
    );
    stage_index_row(&store, "ghost", Some("a"));
    stage_index_row(&store, "ghost", None);

    let by_a = || Query::builder().filter(Filter::eq("a", "x")).build();

    assert_eq!(people.get(id).unwrap().unwrap(), ada);
    assert!(people.get("ghost").unwrap().is_none());
    assert_eq!(people.find(by_a()).unwrap(), vec![ada.clone()]);
    assert_eq!(people.find(Query::new()).unwrap(), vec![ada]);
    assert_eq!(people.count(Selector::All).unwrap(), 1);
    assert_eq!(people.count(by_a()).unwrap(), 1);
    assert_eq!(people.count(Query::new()).unwrap(), 1);
    assert_eq!(people.count("ghost").unwrap(), 0);
}

#[test]
fn test_delete_absent_id_is_not_an_error() {
    let store = store();
    let people = store.collection("people").unwrap();

    people.delete("nobody").unwrap();

    assert_eq!(people.count(Selector::All).unwrap(), 0);
}

#[test]
fn test_count_all_counts_distinct_ids() {
    let store = store();
    let people = store
        .collection_with_options("people", CollectionOptions::new().with_version_tracking(true))
        .unwrap();

    for n in 0..4 {
        let id = people.insert(doc! { "n": n }).unwrap().get_str("id").unwrap().to_string();
        people.update(&id, doc! { "n": n + 10 }).unwrap();
    }

    assert_eq!(people.count(Selector::All).unwrap(), 4);
    assert!(people.find(Selector::All).unwrap().is_empty());
}

#[test]
fn test_failed_write_leaves_nothing_behind() {
    let store = store();
    let people = store.collection("people").unwrap();
    let ada = people.insert(doc! { "name": "ada" }).unwrap();
    let id = ada.get_str("id").unwrap();

    store
        .connector()
        .execute(&Statement::new("DROP TABLE \"people_index\""))
        .unwrap();

    let err = people.update(id, doc! { "name": "ada lovelace" }).unwrap_err();
    assert!(matches!(err, DocumentStoreError::Backend(_)));

    assert_eq!(stored_rows(&store, "people", id), 1);
    assert_eq!(people.get(id).unwrap().unwrap(), ada);
}

#[test]
fn test_drop_collection_discards_documents() {
    let store = store();
    {
        let people = store.collection("people").unwrap();
        people.insert(doc! { "name": "ada" }).unwrap();
    }

    store.drop_collection("people").unwrap();
    store.drop_collection("people").unwrap();

    let people = store.collection("people").unwrap();
    assert_eq!(people.count(Selector::All).unwrap(), 0);
}

#[test]
fn test_collections_are_isolated() {
    let store = store();
    let people = store.collection("people").unwrap();
    let pets = store.collection("pets").unwrap();

    people.insert(doc! { "name": "ada" }).unwrap();

    assert_eq!(people.count(Selector::All).unwrap(), 1);
    assert_eq!(pets.count(Selector::All).unwrap(), 0);
    assert!(
        pets.find(Query::builder().filter(Filter::eq("name", "ada")).build())
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_dyn_store_and_file_backend() {
    let path = std::env::temp_dir().join(format!("sqldoc-write-{}.db", std::process::id()));
    let id = {
        let store = DocumentStore::new(SqliteConnector::open(&path).unwrap()).into_dyn();
        let people = store.collection("people").unwrap();
        people.insert(doc! { "name": "ada" }).unwrap().get_str("id").unwrap().to_string()
    };

    let store = DocumentStore::new(SqliteConnector::open(&path).unwrap());
    let people = store.collection("people").unwrap();
    assert_eq!(people.get(&id).unwrap().unwrap().get_str("name").unwrap(), "ada");

    drop(people);
    drop(store);
    let _ = std::fs::remove_file(&path);
}
