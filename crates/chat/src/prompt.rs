//! System-entry assembly.
//!
//! A character's system entry is a template with `%TOKEN%` placeholders.
//! The free-form context string (one-to-one or group) is rendered first,
//! then the template is rendered and `%CONTEXT%` replaced with the result.
//!
//! Substitution is literal and sequential in [`TemplateTokens::pairs`]
//! order. A value that itself contains a token literal may be substituted
//! again by a later token; this is a known limitation.

use charchat_core::message::Message;
use charchat_core::profile::GroupMeta;
use charchat_core::templates::DEFAULT_SYSTEM_ENTRY;

pub const NAME: &str = "%NAME%";
pub const USER_NAME: &str = "%USER_NAME%";
pub const USER_INFO: &str = "%USER_INFO%";
pub const META_JSON: &str = "%META_JSON%";
pub const CHAT_GROUP_NAME: &str = "%CHAT_GROUP_NAME%";
pub const CHAT_GROUP_DESCRIPTION: &str = "%CHAT_GROUP_DESCRIPTION%";
pub const DATE: &str = "%DATE%";
pub const CONTEXT: &str = "%CONTEXT%";

/// Values for one system-entry rendering.
#[derive(Debug, Clone)]
pub struct TemplateTokens {
    pub name: String,
    pub user_name: String,
    pub user_info: String,
    pub meta_json: String,
    pub chat_group_name: String,
    pub chat_group_description: String,
    pub date: String,
}

impl TemplateTokens {
    /// Tokens for a character, stamped with the current local time.
    pub fn new(
        name: &str,
        meta_json: &str,
        group: Option<&GroupMeta>,
        user_name: &str,
        user_info: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            user_name: user_name.to_string(),
            user_info: user_info.to_string(),
            meta_json: meta_json.to_string(),
            chat_group_name: group.map(|g| g.name.clone()).unwrap_or_default(),
            chat_group_description: group.map(|g| g.description.clone()).unwrap_or_default(),
            date: chrono::Local::now().to_rfc2822(),
        }
    }

    /// Override the rendered date.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// Token/value pairs in substitution order.
    pub fn pairs(&self) -> [(&'static str, &str); 7] {
        [
            (NAME, self.name.as_str()),
            (USER_NAME, self.user_name.as_str()),
            (USER_INFO, self.user_info.as_str()),
            (META_JSON, self.meta_json.as_str()),
            (CHAT_GROUP_NAME, self.chat_group_name.as_str()),
            (CHAT_GROUP_DESCRIPTION, self.chat_group_description.as_str()),
            (DATE, self.date.as_str()),
        ]
    }
}

/// Replace every occurrence of every token.
pub fn replace_all_tokens(text: &str, tokens: &TemplateTokens) -> String {
    tokens
        .pairs()
        .iter()
        .fold(text.to_string(), |acc, (token, value)| acc.replace(token, value))
}

/// Render a character's system entry.
///
/// An empty `template` falls back to [`DEFAULT_SYSTEM_ENTRY`].
pub fn write_system_entry(tokens: &TemplateTokens, template: &str, context: &str) -> Message {
    let template = if template.is_empty() {
        DEFAULT_SYSTEM_ENTRY
    } else {
        template
    };

    let rendered_context = replace_all_tokens(context, tokens);
    let content = replace_all_tokens(template, tokens).replace(CONTEXT, &rendered_context);

    Message::system(content)
}
