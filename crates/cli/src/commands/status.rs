//! `charchat status`: show configuration and stored state.

use std::time::Duration;

use charchat_config::AppConfig;
use charchat_core::contact::Contact;
use charchat_core::provider::{Provider, TextProvider};
use charchat_core::state::{CURRENT_VERSION, StateStore};
use charchat_providers::OpenAiProvider;
use charchat_state::FileStore;

use crate::runtime::Runtime;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = FileStore::new(&config.data_dir);
    let stored_version = store.current_version().await?;

    println!("💬 CharChat Status");
    println!("==================");
    println!("  Config dir:     {}", AppConfig::config_dir().display());
    println!("  Data dir:       {}", config.data_dir.display());
    println!("  Schema:         {}", CURRENT_VERSION);
    println!(
        "  Stored schema:  {}",
        stored_version.as_deref().unwrap_or("none")
    );
    println!("  Word budget:    {}", config.word_budget);

    let current = CURRENT_VERSION.to_string();
    if stored_version.as_deref() != Some(current.as_str()) {
        println!("\n  ⚠️  Stored state is not at the current schema, run `charchat migrate`");
        return Ok(());
    }

    let runtime = Runtime::open_with(config).await?;
    let state = runtime.state();
    let settings = &state.settings;
    println!("  Chat provider:  {}", settings.chat_response);
    println!("  Profiles:       {}", settings.profile_generation);
    println!(
        "  OpenAI key:     {}",
        if settings.open_ai_key.is_empty() { "missing" } else { "set" }
    );
    println!(
        "  Gemini key:     {}",
        if settings.gemini_key.is_empty() { "missing" } else { "set" }
    );

    if !settings.open_ai_key.is_empty() {
        let openai = OpenAiProvider::new(
            &runtime.config.openai_url,
            &settings.open_ai_key,
            settings.chat_response.model(),
        )
        .with_timeout(Duration::from_secs(runtime.config.request_timeout_secs));
        match openai.list_models().await {
            Ok(models) => {
                let offered: Vec<&str> = TextProvider::ALL
                    .iter()
                    .map(TextProvider::model)
                    .filter(|m| models.iter().any(|id| id == m))
                    .collect();
                println!("  OpenAI models:  {} available ({})", models.len(), offered.join(", "));
            }
            Err(e) => println!("  OpenAI models:  unreachable ({e})"),
        }
    }

    println!("\n  Contacts ({}):", state.contacts.len());
    for (id, contact) in &state.contacts {
        let kind = match contact {
            Contact::Bot(_) => "bot",
            Contact::Group(_) => "group",
            Contact::Loading(_) => "loading",
        };
        println!(
            "    {id:<14} {kind:<8} {:<24} {} messages",
            contact.display_name(),
            contact.chats().len()
        );
    }

    Ok(())
}
