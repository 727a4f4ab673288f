//! Contacts: single characters, group chats and contacts still being generated.

use serde::{Deserialize, Serialize};

use crate::message::ChatMessage;
use crate::profile::{AvatarMeta, GroupMeta, MetaFromAI};

/// Any entry in the contact list, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Contact {
    Bot(BotContact),
    Group(GroupChatContact),
    Loading(LoadingContact),
}

impl Contact {
    pub fn id(&self) -> &str {
        match self {
            Contact::Bot(c) => &c.id,
            Contact::Group(c) => &c.id,
            Contact::Loading(c) => &c.id,
        }
    }

    pub fn chats(&self) -> &[ChatMessage] {
        match self {
            Contact::Bot(c) => &c.chats,
            Contact::Group(c) => &c.chats,
            Contact::Loading(c) => &c.chats,
        }
    }

    pub fn chats_mut(&mut self) -> &mut Vec<ChatMessage> {
        match self {
            Contact::Bot(c) => &mut c.chats,
            Contact::Group(c) => &mut c.chats,
            Contact::Loading(c) => &mut c.chats,
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        let status = status.into();
        match self {
            Contact::Bot(c) => c.status = status,
            Contact::Group(c) => c.status = status,
            Contact::Loading(c) => c.status = status,
        }
    }

    /// Display name used in listings.
    pub fn display_name(&self) -> &str {
        match self {
            Contact::Bot(c) => &c.meta.name,
            Contact::Group(c) => &c.meta.name,
            Contact::Loading(_) => "(generating)",
        }
    }
}

/// A single AI character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotContact {
    pub id: String,
    pub meta: MetaFromAI,
    pub avatar_meta: AvatarMeta,
    #[serde(default)]
    pub chats: Vec<ChatMessage>,
    #[serde(default)]
    pub loaded: bool,
    #[serde(default)]
    pub status: String,
    /// Character-specific system-entry template; empty means the built-in default.
    #[serde(default)]
    pub contact_system_entry_template: String,
    #[serde(default)]
    pub context_template: String,
}

/// A group chat with copies of its participating characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupChatContact {
    pub id: String,
    pub meta: GroupMeta,
    pub avatar_meta: AvatarMeta,
    #[serde(default)]
    pub chats: Vec<ChatMessage>,
    #[serde(default)]
    pub contacts: Vec<BotContact>,
    #[serde(default)]
    pub context_template: String,
    #[serde(default)]
    pub status: String,
}

impl GroupChatContact {
    pub fn find_bot(&self, bot_id: &str) -> Option<&BotContact> {
        self.contacts.iter().find(|c| c.id == bot_id)
    }
}

/// Placeholder shown while a profile is being generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadingContact {
    pub id: String,
    #[serde(default)]
    pub chats: Vec<ChatMessage>,
    #[serde(default)]
    pub status: String,
}
