//! Conversation window: fits the system entry plus the most recent
//! history into a fixed word budget.

use charchat_core::message::{ChatMessage, Message, Role};
use tracing::debug;

/// Words sent to a provider per request, system entry included.
pub const MAX_WORD_BUDGET: usize = 2000;

/// Build the prompt `[system] + tail-of-history`.
///
/// Error entries are dropped. The tail is the longest contiguous run of
/// recent entries whose word counts, added to the system entry's, stay
/// strictly under `budget`. If not even the newest entry fits, only the
/// system entry is returned.
pub fn clean_and_limit_messages_size(
    system_entry: Message,
    history: &[ChatMessage],
    budget: usize,
) -> Vec<Message> {
    let replayable: Vec<&ChatMessage> = history.iter().filter(|m| m.role != Role::Error).collect();

    let system_words = system_entry.word_count();
    let mut total_words = system_words;
    let mut start = replayable.len();

    for (i, entry) in replayable.iter().enumerate().rev() {
        if total_words + entry.word_count() >= budget {
            break;
        }
        total_words += entry.word_count();
        start = i;
    }

    debug!(
        system_words,
        total_words,
        retained = replayable.len() - start,
        dropped = start,
        "Limited prompt size"
    );

    let mut prompt = Vec::with_capacity(1 + replayable.len() - start);
    prompt.push(system_entry);
    prompt.extend(replayable[start..].iter().map(|m| m.to_message()));
    prompt
}
