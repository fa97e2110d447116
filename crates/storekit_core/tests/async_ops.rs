mod common;

use common::{ids, open_store, seed_notes, Note};
use std::time::{Duration, Instant};
use storekit_core::StoreError;

#[test]
fn add_async_is_visible_after_wait() {
    let store = open_store();

    let task = store
        .add_async(vec![Note::new(1, "a"), Note::new(2, "b")])
        .unwrap();
    assert_eq!(task.operation(), "add_async");
    task.wait().unwrap();

    assert_eq!(ids(&store.query_all::<Note>().unwrap()), vec![1, 2]);
}

#[test]
fn async_jobs_apply_in_submission_order() {
    let store = open_store();

    let _ = store.add_async(vec![Note::new(3, "c")]).unwrap();
    let _ = store.add_async(vec![Note::new(1, "a")]).unwrap();
    let last = store.add_async(vec![Note::new(2, "b")]).unwrap();

    last.wait().unwrap();

    assert_eq!(ids(&store.query_all::<Note>().unwrap()), vec![3, 1, 2]);
}

#[test]
fn delete_all_async_removes_records_present_at_call_time() {
    let store = open_store();
    seed_notes(&store);

    store.delete_all_async::<Note>().unwrap().wait().unwrap();

    assert!(store.query_all::<Note>().unwrap().is_empty());
}

#[test]
fn delete_all_async_spares_records_added_after_the_call() {
    let store = open_store();
    seed_notes(&store);

    let clear = store.delete_all_async::<Note>().unwrap();
    store.add(&Note::new(4, "late")).unwrap();
    let queued = store.add_async(vec![Note::new(5, "queued")]).unwrap();

    clear.wait().unwrap();
    queued.wait().unwrap();

    assert_eq!(ids(&store.query_all::<Note>().unwrap()), vec![4, 5]);
}

#[test]
fn add_queued_after_delete_all_async_survives() {
    let store = open_store();
    seed_notes(&store);

    let clear = store.delete_all_async::<Note>().unwrap();
    let refill = store.add_async(vec![Note::new(1, "a")]).unwrap();
    refill.wait().unwrap();
    clear.wait().unwrap();

    assert_eq!(store.query_all::<Note>().unwrap(), vec![Note::new(1, "a")]);
}

#[test]
fn failed_async_add_reports_error_and_stores_nothing() {
    let store = open_store();

    let task = store
        .add_async(vec![Note::new(1, "a"), Note::new(1, "dup")])
        .unwrap();
    assert!(matches!(task.wait(), Err(StoreError::Db(_))));

    assert!(store.query_all::<Note>().unwrap().is_empty());
}

#[test]
fn poll_reports_completion_once() {
    let store = open_store();
    let mut task = store.add_async(vec![Note::new(1, "a")]).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let outcome = loop {
        if let Some(outcome) = task.poll() {
            break outcome;
        }
        assert!(Instant::now() < deadline, "async add did not finish");
        std::thread::sleep(Duration::from_millis(5));
    };
    outcome.unwrap();
    assert!(task.poll().is_none());
}

#[test]
fn live_results_observe_async_writes() {
    let store = open_store();
    let live = store.query_all_async::<Note>().unwrap();

    store
        .add_async(vec![Note::new(5, "e")])
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(live.len().unwrap(), 1);
}

#[test]
fn close_drains_fire_and_forget_work() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drain.db");

    {
        let mut store = storekit_core::Store::open_path(&path).unwrap();
        store.register::<Note>().unwrap();
        let _ = store.add_async(vec![Note::new(1, "a"), Note::new(2, "b")]);
        store.close().unwrap();
    }

    let mut reopened = storekit_core::Store::open_path(&path).unwrap();
    reopened.register::<Note>().unwrap();
    assert_eq!(reopened.count::<Note>().unwrap(), 2);
}
