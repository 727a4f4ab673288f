//! `charchat create-group`: start a group chat between existing characters.

use crate::runtime::Runtime;

pub async fn run(
    name: String,
    description: String,
    contacts: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::open().await?;
    let settings = runtime.state().settings;

    let group = runtime
        .dispatcher()
        .create_group_chat(&settings, &name, &description, &contacts)
        .await?;
    runtime.save().await?;

    println!("✅ Created group {} ({})", group.meta.name, group.id);
    for bot in &group.contacts {
        println!("   • {} ({})", bot.meta.name, bot.id);
    }
    let missing: Vec<&String> = contacts
        .iter()
        .filter(|id| group.find_bot(id).is_none())
        .collect();
    if !missing.is_empty() {
        println!("   ⚠️  Skipped unknown or non-character ids: {missing:?}");
    }
    println!("\n   Continue with: charchat chat --contact {}", group.id);
    Ok(())
}
