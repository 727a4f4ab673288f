//! `charchat chat`: talk to a character or move a group chat forward.

use charchat_chat::dispatch::USER_CONTACT_ID;
use charchat_core::contact::{Contact, GroupChatContact};
use charchat_core::event::{StoreAction, StoreDispatch};
use charchat_core::message::{ChatMessage, ChatMessageContent, Role};

use crate::runtime::Runtime;

pub async fn run(
    contact_id: String,
    message: Option<String>,
    bot: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::open().await?;
    let state = runtime.state();
    let contact = state
        .contact(&contact_id)
        .cloned()
        .ok_or_else(|| format!("No contact with id {contact_id}"))?;

    runtime.app.open_chat(&contact_id);
    let dispatcher = runtime.dispatcher();
    let settings = state.settings.clone();

    let reply = match contact {
        Contact::Bot(bot_contact) => {
            let Some(text) = message else {
                print_history(contact_id.as_str(), &bot_contact.chats);
                return Ok(());
            };
            dispatcher
                .send_message(
                    &bot_contact,
                    &settings,
                    &bot_contact.chats,
                    ChatMessageContent::new(settings.user_name.as_str(), text),
                    &bot_contact.context_template,
                    None,
                )
                .await
        }
        Contact::Group(group) => {
            if let Some(text) = message {
                runtime.app.dispatch(StoreAction::AddMessage(ChatMessage::new(
                    USER_CONTACT_ID,
                    Role::User,
                    ChatMessageContent::new(settings.user_name.as_str(), text),
                )));
            }
            let previous = runtime
                .state()
                .contact(&contact_id)
                .map(|c| c.chats().to_vec())
                .unwrap_or_default();
            let speaker = match bot {
                Some(id) => id,
                None => next_speaker(&group, &previous)
                    .ok_or_else(|| format!("Group {contact_id} has no participants"))?,
            };
            dispatcher
                .ask_bot_to_message(
                    &speaker,
                    &group,
                    &settings,
                    &previous,
                    &group.context_template,
                    Some(&group.meta),
                )
                .await?
        }
        Contact::Loading(_) => {
            return Err(format!("Contact {contact_id} is still being generated").into());
        }
    };

    runtime.save().await?;
    print_entry(&reply);
    if reply.role == Role::Error {
        return Err("The provider request failed".into());
    }
    Ok(())
}

/// The participant after whoever spoke last, wrapping around.
fn next_speaker(group: &GroupChatContact, previous: &[ChatMessage]) -> Option<String> {
    let last_name = previous
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .map(|m| m.content().name.as_str());
    let position = last_name
        .and_then(|name| group.contacts.iter().position(|c| c.meta.name == name))
        .map(|i| i + 1)
        .unwrap_or(0);
    group
        .contacts
        .get(position % group.contacts.len().max(1))
        .map(|c| c.id.clone())
}

fn print_entry(entry: &ChatMessage) {
    let content = entry.content();
    match entry.role {
        Role::Error => {
            println!("❌ {}: {}", content.name, content.message);
            if let Some(plan) = &content.plan {
                println!("   {plan}");
            }
        }
        _ => println!("{}: {}", content.name, content.message),
    }
}

fn print_history(contact_id: &str, chats: &[ChatMessage]) {
    if chats.is_empty() {
        println!("No messages with {contact_id} yet. Send one with -m.");
    }
    for entry in chats {
        print_entry(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charchat_core::contact::BotContact;
    use charchat_core::profile::{AvatarMeta, GroupMeta, MetaFromAI};

    fn bot(id: &str, name: &str) -> BotContact {
        BotContact {
            id: id.into(),
            meta: MetaFromAI {
                name: name.into(),
                ..MetaFromAI::default()
            },
            avatar_meta: AvatarMeta::default(),
            chats: Vec::new(),
            loaded: true,
            status: String::new(),
            contact_system_entry_template: String::new(),
            context_template: String::new(),
        }
    }

    fn group() -> GroupChatContact {
        GroupChatContact {
            id: "9groupChat".into(),
            meta: GroupMeta::default(),
            avatar_meta: AvatarMeta::default(),
            chats: Vec::new(),
            contacts: vec![bot("1bot", "Eve"), bot("2bot", "Max")],
            context_template: String::new(),
            status: String::new(),
        }
    }

    fn said(name: &str, role: Role) -> ChatMessage {
        ChatMessage::at("9groupChat", role, ChatMessageContent::new(name, "hi"), 1)
    }

    #[test]
    fn first_participant_opens_the_group() {
        assert_eq!(next_speaker(&group(), &[]).as_deref(), Some("1bot"));
    }

    #[test]
    fn speakers_rotate_after_the_last_reply() {
        let previous = vec![said("Eve", Role::Assistant), said("Sam", Role::User)];
        assert_eq!(next_speaker(&group(), &previous).as_deref(), Some("2bot"));

        let previous = vec![said("Max", Role::Assistant)];
        assert_eq!(next_speaker(&group(), &previous).as_deref(), Some("1bot"));
    }

    #[test]
    fn empty_group_has_no_speaker() {
        let mut empty = group();
        empty.contacts.clear();
        assert!(next_speaker(&empty, &[]).is_none());
    }
}
