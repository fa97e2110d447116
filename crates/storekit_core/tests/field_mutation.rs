mod common;

use common::{open_store, seed_notes, Note, Task};
use storekit_core::{FieldKind, MutationFailure, StoreError};

#[test]
fn update_all_by_field_rewrites_every_match() {
    let store = open_store();
    seed_notes(&store);

    let changed = store
        .update_all_by_field::<Note>("name", "a", "z")
        .unwrap();

    assert_eq!(changed, 2);
    assert_eq!(
        store.query_all::<Note>().unwrap(),
        vec![Note::new(1, "z"), Note::new(2, "b"), Note::new(3, "z")]
    );
    assert!(store
        .query_by_field_all::<Note>("name", "a")
        .unwrap()
        .is_empty());
}

#[test]
fn update_first_by_field_touches_only_earliest_match() {
    let store = open_store();
    seed_notes(&store);

    let changed = store
        .update_first_by_field::<Note>("name", "a", "z")
        .unwrap();

    assert_eq!(changed, 1);
    assert_eq!(
        store.query_all::<Note>().unwrap(),
        vec![Note::new(1, "z"), Note::new(2, "b"), Note::new(3, "a")]
    );
}

#[test]
fn integer_fields_update_through_integer_setters() {
    let store = open_store();
    store
        .add_all(&[
            Task::new("one", 1, false),
            Task::new("two", 1, false),
            Task::new("three", 2, false),
        ])
        .unwrap();

    assert_eq!(
        store.update_all_by_field::<Task>("priority", 1, 9).unwrap(),
        2
    );

    let priorities: Vec<i64> = store
        .query_all::<Task>()
        .unwrap()
        .into_iter()
        .map(|task| task.priority)
        .collect();
    assert_eq!(priorities, vec![9, 9, 2]);
}

#[test]
fn no_match_changes_nothing() {
    let store = open_store();
    seed_notes(&store);

    assert_eq!(
        store
            .update_first_by_field::<Note>("name", "missing", "z")
            .unwrap(),
        0
    );
    assert_eq!(
        store
            .update_all_by_field::<Note>("name", "missing", "z")
            .unwrap(),
        0
    );
}

#[test]
fn unknown_field_fails_before_any_change() {
    let store = open_store();
    seed_notes(&store);

    let err = store
        .update_all_by_field::<Note>("title", "a", "z")
        .unwrap_err();
    assert!(matches!(err, StoreError::FieldNotFound { .. }));
}

#[test]
fn value_kind_without_setter_is_a_mutation_invocation_error() {
    let store = open_store();
    seed_notes(&store);

    let err = store
        .update_all_by_field::<Note>("name", "a", 5)
        .unwrap_err();
    match err {
        StoreError::MutationInvocation {
            entity,
            field,
            cause,
        } => {
            assert_eq!(entity, "notes");
            assert_eq!(field, "name");
            assert_eq!(
                cause,
                MutationFailure::SetterUnresolved {
                    field_kind: FieldKind::Text,
                    value_kind: FieldKind::Integer,
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.query_by_field_all::<Note>("name", "a").unwrap().len(), 2);
}

#[test]
fn setter_rejection_mid_batch_rolls_back_every_change() {
    let store = open_store();
    store
        .add_all(&[
            Task::new("draft", 1, false),
            Task::new("draft", 2, true),
            Task::new("draft", 3, false),
        ])
        .unwrap();

    let err = store
        .update_all_by_field::<Task>("title", "draft", "final")
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::MutationInvocation {
            field: "title",
            cause: MutationFailure::Rejected(_),
            ..
        }
    ));
    assert!(std::error::Error::source(&err).is_some());

    let titles: Vec<String> = store
        .query_all::<Task>()
        .unwrap()
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(titles, vec!["draft", "draft", "draft"]);
}

#[test]
fn setter_rejection_on_first_match_leaves_record_unchanged() {
    let store = open_store();
    store.add(&Task::new("todo", 4, false)).unwrap();

    let err = store
        .update_first_by_field::<Task>("priority", 4, -1)
        .unwrap_err();
    assert!(matches!(err, StoreError::MutationInvocation { .. }));

    assert_eq!(
        store.query_all::<Task>().unwrap(),
        vec![Task::new("todo", 4, false)]
    );
}

#[test]
fn primary_key_collision_during_update_rolls_back() {
    let store = open_store();
    seed_notes(&store);

    let err = store.update_all_by_field::<Note>("id", 1, 2).unwrap_err();
    assert!(matches!(err, StoreError::Db(_)));

    assert_eq!(
        store.query_all::<Note>().unwrap(),
        vec![Note::new(1, "a"), Note::new(2, "b"), Note::new(3, "a")]
    );
}
