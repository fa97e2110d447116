mod common;

use common::{open_store, Note};
use std::panic::{self, AssertUnwindSafe};
use storekit_core::{Entity, SchemaBuilder, Store, StoreError};

/// Entity whose accessors panic on the value `boom`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Fragile {
    name: String,
}

impl Fragile {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Entity for Fragile {
    const ENTITY_NAME: &'static str = "fragile";

    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema.text(
            "name",
            |f| {
                assert_ne!(f.name, "boom", "getter exploded");
                f.name.clone()
            },
            |f, v| {
                assert_ne!(v, "boom", "setter exploded");
                f.name = v;
                Ok(())
            },
        )
    }
}

fn open_fragile_store() -> Store {
    let mut store = open_store();
    store.register::<Fragile>().unwrap();
    store
}

#[test]
fn panicking_setter_rolls_back_and_store_stays_usable() {
    let store = open_fragile_store();
    store
        .add_all(&[Fragile::new("x"), Fragile::new("x")])
        .unwrap();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        store.update_all_by_field::<Fragile>("name", "x", "boom")
    }));
    assert!(outcome.is_err());

    assert_eq!(
        store.query_all::<Fragile>().unwrap(),
        vec![Fragile::new("x"), Fragile::new("x")]
    );
    store.add(&Note::new(1, "a")).unwrap();
    assert_eq!(store.query_all::<Note>().unwrap(), vec![Note::new(1, "a")]);
}

#[test]
fn panicking_async_job_fails_its_ticket_only() {
    let store = open_fragile_store();

    let failed = store
        .add_async(vec![Fragile::new("ok"), Fragile::new("boom")])
        .unwrap();
    assert!(matches!(
        failed.wait(),
        Err(StoreError::OperationPanicked { op: "add_async" })
    ));
    assert!(store.query_all::<Fragile>().unwrap().is_empty());

    store
        .add_async(vec![Fragile::new("ok")])
        .unwrap()
        .wait()
        .unwrap();
    assert_eq!(
        store.query_all::<Fragile>().unwrap(),
        vec![Fragile::new("ok")]
    );
}
