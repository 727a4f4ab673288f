//! `charchat migrate`: run the startup reload path and report the result.

use charchat_config::AppConfig;
use charchat_core::state::{CURRENT_VERSION, StateStore};
use charchat_state::{FileStore, ReloadOutcome, delete_state, reload_state};

pub async fn run(delete: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = FileStore::new(&config.data_dir);

    if delete {
        delete_state(&store).await?;
        println!("🗑️  Deleted stored state at {}", config.data_dir.display());
        return Ok(());
    }

    let before = store.current_version().await?;
    println!("🔄 Migrating stored state...");
    println!("   Store:   {}", config.data_dir.display());
    println!("   From:    {}", before.as_deref().unwrap_or("none"));
    println!("   Target:  {CURRENT_VERSION}");

    match reload_state(&store, &config.settings).await? {
        ReloadOutcome::Fresh(_) => {
            println!("\n✅ No usable state found, initialised version {CURRENT_VERSION}");
        }
        ReloadOutcome::Loaded(state) => {
            println!(
                "\n✅ State is at version {} with {} contacts",
                state.version,
                state.contacts.len()
            );
        }
        ReloadOutcome::Failed(state) => {
            println!("\n❌ {}", state.volatile_state.error_message);
            println!("   Run `charchat migrate --delete` to start over.");
            return Err("Migration failed".into());
        }
    }

    Ok(())
}
