//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `stowage_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use stowage_core::db::open_db_in_memory;
use stowage_core::{GridSchema, GridService};

fn main() {
    println!("stowage_core version={}", stowage_core::core_version());

    // In-memory round trip: migrations plus a full grid initialization.
    let outcome = open_db_in_memory()
        .map_err(|err| err.to_string())
        .and_then(|mut conn| {
            GridService::new(&mut conn)
                .initialize(&GridSchema::default())
                .map_err(|err| err.to_string())
        });

    match outcome {
        Ok(slots) => println!("grid initialized slots={slots}"),
        Err(err) => {
            eprintln!("smoke check failed: {err}");
            std::process::exit(1);
        }
    }
}
