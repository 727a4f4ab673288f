//! Chat orchestration: the operations the front end triggers.
//!
//! Each operation emits [`StoreAction`]s in the same grouping the store
//! expects (one batch per visible update) and surfaces provider failures
//! as `error`-role chat entries instead of returning them to the caller.

use std::sync::Arc;

use charchat_core::contact::{BotContact, Contact, GroupChatContact, LoadingContact};
use charchat_core::error::{Error, ProviderError};
use charchat_core::event::{StoreAction, StoreDispatch};
use charchat_core::message::{ChatMessage, ChatMessageContent, Message, Role};
use charchat_core::profile::{AvatarMeta, GroupMeta, MetaFromAI};
use charchat_core::provider::ImageGenerator;
use charchat_core::settings::Settings;
use charchat_core::state::StateStore;
use charchat_providers::dispatch::{BindingResolver, ChatBinding};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::history::{MAX_WORD_BUDGET, clean_and_limit_messages_size};
use crate::prompt::{TemplateTokens, write_system_entry};

/// Contact id of messages the user typed.
pub const USER_CONTACT_ID: &str = "user";

/// Plan attached to replayed group history so every bot reasons first.
pub const HIDDEN_PLAN: &str = "1-AI.2-Analyze.3-Differences.4-Inner monologue.";

pub const GROUP_TYPING_STATUS: &str = "Someone is typing";

/// Display name of error entries that do not belong to a character.
pub const SYSTEM_MESSAGE_NAME: &str = "SystemMessage";

/// Drives chat turns and contact creation.
pub struct ChatDispatcher {
    resolver: Arc<dyn BindingResolver>,
    images: Arc<dyn ImageGenerator>,
    store: Arc<dyn StateStore>,
    actions: Arc<dyn StoreDispatch>,
    word_budget: usize,
}

impl ChatDispatcher {
    pub fn new(
        resolver: Arc<dyn BindingResolver>,
        images: Arc<dyn ImageGenerator>,
        store: Arc<dyn StateStore>,
        actions: Arc<dyn StoreDispatch>,
    ) -> Self {
        Self {
            resolver,
            images,
            store,
            actions,
            word_budget: MAX_WORD_BUDGET,
        }
    }

    pub fn with_word_budget(mut self, word_budget: usize) -> Self {
        self.word_budget = word_budget;
        self
    }

    /// Send a user message to a character and record the reply.
    ///
    /// Returns the entry appended for the reply, which is an `error`-role
    /// entry when the provider call failed.
    pub async fn send_message(
        &self,
        contact: &BotContact,
        settings: &Settings,
        previous: &[ChatMessage],
        new_message: ChatMessageContent,
        context: &str,
        group: Option<&GroupMeta>,
    ) -> ChatMessage {
        let status = new_message.message.clone();
        let user_entry = ChatMessage::new(USER_CONTACT_ID, Role::User, new_message);
        self.actions.batch(vec![
            StoreAction::AddMessage(user_entry.clone()),
            StoreAction::SetStatus(status),
            StoreAction::SetWaitingAnswer(true),
        ]);

        let mut history = previous.to_vec();
        history.push(user_entry);

        let system_entry = system_entry_for(contact, settings, context, group);
        let prompt = clean_and_limit_messages_size(system_entry, &history, self.word_budget);

        let binding = self.resolver.chat(settings);
        info!(contact = %contact.id, provider = binding.provider_name(), messages = prompt.len(), "Sending chat message");

        match binding.complete(prompt).await {
            Ok(reply) => self.add_response_message(&binding, &contact.meta.name, &contact.id, reply),
            Err(e) => {
                warn!(contact = %contact.id, error = %e, "Chat completion failed");
                let entry = ChatMessage::new(
                    contact.id.as_str(),
                    Role::Error,
                    ChatMessageContent::new(contact.meta.name.as_str(), describe_error(&e)),
                );
                self.actions.batch(vec![
                    StoreAction::SetWaitingAnswer(false),
                    StoreAction::AddMessage(entry.clone()),
                ]);
                entry
            }
        }
    }

    /// Ask one bot of a group chat to speak next.
    ///
    /// The reply is recorded under the group's id.
    pub async fn ask_bot_to_message(
        &self,
        bot_id: &str,
        group_chat: &GroupChatContact,
        settings: &Settings,
        previous: &[ChatMessage],
        context: &str,
        group: Option<&GroupMeta>,
    ) -> Result<ChatMessage, Error> {
        let bot = group_chat.find_bot(bot_id).ok_or_else(|| {
            Error::Internal(format!("Bot {bot_id} is not part of group {}", group_chat.id))
        })?;

        let history: Vec<ChatMessage> = previous
            .iter()
            .map(|m| {
                let content = m.content();
                m.with_content(
                    ChatMessageContent::new(content.name.as_str(), content.message.as_str())
                        .with_plan(HIDDEN_PLAN),
                )
            })
            .collect();

        self.actions.batch(vec![
            StoreAction::SetWaitingAnswer(true),
            StoreAction::SetStatus(GROUP_TYPING_STATUS.into()),
        ]);

        let system_entry = system_entry_for(bot, settings, context, group);
        let prompt = clean_and_limit_messages_size(system_entry, &history, self.word_budget);

        let binding = self.resolver.chat(settings);
        info!(group = %group_chat.id, bot = %bot.id, provider = binding.provider_name(), "Asking bot to message");

        match binding.complete(prompt).await {
            Ok(reply) => Ok(self.add_response_message(&binding, &bot.meta.name, &group_chat.id, reply)),
            Err(e) => {
                warn!(group = %group_chat.id, bot = %bot.id, error = %e, "Group completion failed");
                let entry = ChatMessage::new(
                    group_chat.id.as_str(),
                    Role::Error,
                    ChatMessageContent::new(SYSTEM_MESSAGE_NAME, "...").with_plan(e.to_string()),
                );
                self.actions.batch(vec![
                    StoreAction::SetWaitingAnswer(false),
                    StoreAction::AddMessage(entry.clone()),
                ]);
                Ok(entry)
            }
        }
    }

    /// Generate a new character from a free-form description.
    ///
    /// A loading placeholder is shown while the profile is generated and
    /// removed again if generation fails.
    pub async fn create_contact(
        &self,
        settings: &Settings,
        description: &str,
    ) -> Result<BotContact, Error> {
        let id = format!("{}bot", random_id());
        self.actions.dispatch(StoreAction::AddContact(Contact::Loading(LoadingContact {
            id: id.clone(),
            chats: Vec::new(),
            status: description.to_string(),
        })));

        let binding = self.resolver.profile(settings);
        info!(contact = %id, provider = binding.provider_name(), "Generating contact profile");

        let meta = match binding.generate(description).await {
            Ok(reply) => binding.extract(&reply).map_err(Error::from),
            Err(e) => Err(Error::from(e)),
        };
        let meta = match meta {
            Ok(meta) => meta,
            Err(e) => {
                warn!(contact = %id, error = %e, "Profile generation failed");
                self.actions.dispatch(StoreAction::RemoveContact(id));
                return Err(e);
            }
        };

        let image = match self.images.generate(&meta.avatar).await {
            Ok(image) => image,
            Err(e) => {
                warn!(contact = %id, error = %e, "Avatar generation failed, continuing without one");
                String::new()
            }
        };

        let contact = self.bot_contact_from_meta(id, settings, meta, &image).await;
        self.actions.dispatch(StoreAction::AddContact(Contact::Bot(contact.clone())));
        Ok(contact)
    }

    /// Create a group chat from existing characters.
    ///
    /// Participants are copied from the persisted live snapshot
    /// with their chat history emptied. Unknown or non-bot ids are ignored.
    pub async fn create_group_chat(
        &self,
        settings: &Settings,
        name: &str,
        description: &str,
        contact_ids: &[String],
    ) -> Result<GroupChatContact, Error> {
        let id = format!("{}groupChat", random_id());

        let version = self.store.snapshot_version().await?;
        let snapshot = self.store.get(&version.to_string()).await?;
        let contacts: Vec<BotContact> = snapshot
            .as_ref()
            .and_then(|s| s.get("contacts"))
            .and_then(|c| c.as_object())
            .map(|contacts| {
                contacts
                    .values()
                    .filter_map(|value| serde_json::from_value::<Contact>(value.clone()).ok())
                    .filter_map(|contact| match contact {
                        Contact::Bot(bot) if contact_ids.contains(&bot.id) => Some(bot),
                        _ => None,
                    })
                    .map(|mut bot| {
                        bot.chats.clear();
                        bot
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!(group = %id, participants = contacts.len(), requested = contact_ids.len(), "Creating group chat");

        let group = GroupChatContact {
            id,
            meta: GroupMeta {
                name: name.to_string(),
                description: description.to_string(),
            },
            avatar_meta: AvatarMeta::default(),
            chats: Vec::new(),
            contacts,
            context_template: settings.chat_group_system_entry_context.clone(),
            status: description.to_string(),
        };
        self.actions.dispatch(StoreAction::AddContact(Contact::Group(group.clone())));
        Ok(group)
    }

    fn add_response_message(
        &self,
        binding: &ChatBinding,
        name: &str,
        contact_id: &str,
        reply: Message,
    ) -> ChatMessage {
        let content = match binding.extract(&reply) {
            Ok(mut content) => {
                if content.name.is_empty() {
                    content.name = name.to_string();
                }
                content
            }
            Err(e) => {
                warn!(contact = %contact_id, error = %e, "Reply is not structured, showing it verbatim");
                ChatMessageContent::new(name, reply.content.as_str())
            }
        };

        let status = content.message.clone();
        let entry = ChatMessage::new(contact_id, reply.role, content);
        self.actions.batch(vec![
            StoreAction::SetWaitingAnswer(false),
            StoreAction::AddMessage(entry.clone()),
            StoreAction::SetStatus(status),
        ]);
        entry
    }

    async fn bot_contact_from_meta(
        &self,
        id: String,
        settings: &Settings,
        meta: MetaFromAI,
        image: &str,
    ) -> BotContact {
        let avatar_id = format!("{}bot", random_id());
        if let Err(e) = self.store.put_avatar(&avatar_id, image).await {
            warn!(avatar = %avatar_id, error = %e, "Failed to store avatar");
        }

        BotContact {
            id,
            avatar_meta: AvatarMeta {
                prompt: meta.avatar.clone(),
                id: avatar_id,
            },
            chats: Vec::new(),
            loaded: true,
            status: meta.user_profile.clone(),
            contact_system_entry_template: settings.system_entry.clone(),
            context_template: settings.single_bot_system_entry_context.clone(),
            meta,
        }
    }
}

fn system_entry_for(
    bot: &BotContact,
    settings: &Settings,
    context: &str,
    group: Option<&GroupMeta>,
) -> Message {
    let tokens = TemplateTokens::new(
        &bot.meta.name,
        &bot.meta.to_json(),
        group,
        &settings.user_name,
        &settings.user_short_info,
    );
    write_system_entry(&tokens, &bot.contact_system_entry_template, context)
}

/// Pretty JSON of a provider failure, shown as the body of an error entry.
fn describe_error(error: &ProviderError) -> String {
    serde_json::to_string_pretty(error).unwrap_or_else(|_| error.to_string())
}

fn random_id() -> u32 {
    rand::rng().random_range(0..10000)
}
