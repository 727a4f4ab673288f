//! # CharChat State
//!
//! Persistence backends for versioned state snapshots, the migration
//! chain that upgrades them, and the startup reload path.

pub mod file_store;
pub mod in_memory;
pub mod migrations;
pub mod reload;

pub use file_store::FileStore;
pub use in_memory::InMemoryStore;
pub use migrations::{Migration, MigrationFailure, Migrator};
pub use reload::{
    ReloadOutcome, delete_state, dispatch_reload_state, load_app_state, reload_state,
    save_app_state,
};
