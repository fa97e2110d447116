//! CLI demo entry point.
//!
//! # Responsibility
//! - Provide a small executable that exercises `storekit_core` end to end.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `storekit_cli [DB_PATH]`. Without a path the store lives in memory.
//! Set `STOREKIT_LOG_DIR` to an absolute directory to enable file logging.

use log::info;
use std::error::Error;
use std::process::ExitCode;
use storekit_core::{
    default_log_level, init_logging, Entity, LogConfig, SchemaBuilder, SortOrder, Store,
    StoreConfig,
};

#[derive(Debug, Clone, Default)]
struct Note {
    id: i64,
    name: String,
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

fn print_notes(label: &str, notes: &[Note]) {
    let rendered = notes
        .iter()
        .map(|note| format!("{}:{}", note.id, note.name))
        .collect::<Vec<_>>();
    println!("{label} [{}]", rendered.join(", "));
}

fn run() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var("STOREKIT_LOG_DIR") {
        init_logging(&LogConfig::new(default_log_level(), log_dir))?;
    }

    let config = match std::env::args().nth(1) {
        Some(path) => StoreConfig::file(path),
        None => StoreConfig::in_memory(),
    };
    let mut store = Store::open(&config)?;
    store.register::<Note>()?;
    info!(
        "event=cli_start module=cli status=ok mode={}",
        config.location.mode()
    );

    println!("storekit_core version={}", storekit_core::core_version());

    store.delete_all::<Note>()?;
    store.add_all(&[
        Note {
            id: 3,
            name: "a".to_string(),
        },
        Note {
            id: 1,
            name: "b".to_string(),
        },
    ])?;
    store
        .add_async(vec![Note {
            id: 2,
            name: "a".to_string(),
        }])?
        .wait()?;
    print_notes("all", &store.query_all::<Note>()?);
    print_notes(
        "by_name_desc",
        &store.query_all_sorted::<Note>("name", SortOrder::Descending)?,
    );

    let changed = store.update_all_by_field::<Note>("name", "a", "z")?;
    println!("updated={changed}");
    print_notes("name=z", &store.query_by_field_all::<Note>("name", "z")?);

    store.delete_first::<Note>()?;
    print_notes("after_delete_first", &store.query_all::<Note>()?);
    println!("count={}", store.count::<Note>()?);

    store.close()?;
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("storekit_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}
