#![allow(dead_code)]

use storekit_core::{Entity, SchemaBuilder, Store};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Note {
    pub id: i64,
    pub name: String,
}

impl Note {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

impl Entity for Note {
    const ENTITY_NAME: &'static str = "notes";

    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .integer("id", |n| n.id, |n, v| {
                n.id = v;
                Ok(())
            })
            .text("name", |n| n.name.clone(), |n, v| {
                n.name = v;
                Ok(())
            })
            .primary_key("id")
    }
}

/// Entity whose `title` setter refuses changes on locked records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Task {
    pub title: String,
    pub priority: i64,
    pub locked: i64,
}

impl Task {
    pub fn new(title: &str, priority: i64, locked: bool) -> Self {
        Self {
            title: title.to_string(),
            priority,
            locked: i64::from(locked),
        }
    }
}

impl Entity for Task {
    const ENTITY_NAME: &'static str = "tasks";

    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .text("title", |t| t.title.clone(), |t, v| {
                if t.locked == 1 {
                    return Err(format!("task `{}` is locked", t.title));
                }
                t.title = v;
                Ok(())
            })
            .integer("priority", |t| t.priority, |t, v| {
                if v < 0 {
                    return Err("priority must not be negative".to_string());
                }
                t.priority = v;
                Ok(())
            })
            // Declared last so rows decode before the lock takes effect.
            .integer("locked", |t| t.locked, |t, v| {
                t.locked = v;
                Ok(())
            })
    }
}

pub fn open_store() -> Store {
    let mut store = Store::open_in_memory().unwrap();
    store.register::<Note>().unwrap();
    store.register::<Task>().unwrap();
    store
}

pub fn seed_notes(store: &Store) {
    store
        .add_all(&[Note::new(1, "a"), Note::new(2, "b"), Note::new(3, "a")])
        .unwrap();
}

pub fn ids(notes: &[Note]) -> Vec<i64> {
    notes.iter().map(|note| note.id).collect()
}
