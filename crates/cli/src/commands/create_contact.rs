//! `charchat create-contact`: generate a character from a description.

use crate::runtime::Runtime;

pub async fn run(description: String) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::open().await?;
    let settings = runtime.state().settings;

    println!("✨ Generating a character for: {description}");
    let contact = runtime
        .dispatcher()
        .create_contact(&settings, &description)
        .await
        .map_err(|e| format!("Character generation failed: {e}"))?;
    runtime.save().await?;

    println!("\n✅ Created {} ({})", contact.meta.name, contact.id);
    if !contact.meta.user_profile.is_empty() {
        println!("   {}", contact.meta.user_profile);
    }
    if contact.avatar_meta.prompt.is_empty() {
        println!("   No avatar prompt was returned");
    }
    println!("\n   Chat with: charchat chat --contact {} -m \"Hello!\"", contact.id);
    Ok(())
}
