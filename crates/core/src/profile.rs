//! Character profile types.

use serde::{Deserialize, Serialize};

/// A generated character profile.
///
/// Produced once per contact creation by a profile-generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaFromAI {
    #[serde(default)]
    pub user_profile: String,
    pub name: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub current: String,
    #[serde(default)]
    pub appearance: String,
    #[serde(default)]
    pub likes: String,
    #[serde(default)]
    pub dislikes: String,
    #[serde(default)]
    pub chat_characteristics: String,
    /// Textual prompt for the avatar image.
    #[serde(default)]
    pub avatar: String,
}

impl MetaFromAI {
    /// The JSON text substituted for `%META_JSON%`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Group-chat metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMeta {
    pub name: String,
    pub description: String,
}

/// Pointer to a stored avatar blob plus the prompt that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarMeta {
    pub prompt: String,
    pub id: String,
}
