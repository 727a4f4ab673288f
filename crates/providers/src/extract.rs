//! Response extractors: turn a raw provider reply into structured content.
//!
//! Models are asked to answer in JSON but wrap it in all sorts of noise:
//! markdown fences, raw control characters inside strings, a sentence of
//! prose before the object. Each extractor strips what its provider is
//! known to add and then parses. Failures are returned as [`ParseError`];
//! the fallback to a degraded value is the caller's decision.

use charchat_core::error::ParseError;
use charchat_core::message::{ChatMessageContent, Message};
use charchat_core::profile::MetaFromAI;
use serde::de::DeserializeOwned;

/// Extracts a chat reply.
pub type ChatExtractor = fn(&Message) -> Result<ChatMessageContent, ParseError>;

/// Extracts a generated profile.
pub type ProfileExtractor = fn(&Message) -> Result<MetaFromAI, ParseError>;

/// Replace control characters with spaces.
///
/// Raw newlines inside JSON strings are invalid; as whitespace between
/// tokens they are harmless either way.
pub fn remove_special_chars(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Remove a surrounding markdown code fence (```` ```json ... ``` ````).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) up to the first newline or brace
    let body_start = rest
        .find(|c: char| c == '\n' || c == '{' || c == '[')
        .unwrap_or(0);
    let body = &rest[body_start..];
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse JSON, retrying on the outermost `{...}` span if the whole text fails.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let first_error = match serde_json::from_str::<T>(text) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<T>(&text[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(ParseError {
        text: text.to_string(),
        reason: first_error.to_string(),
    })
}

fn openai_clean(content: &str) -> String {
    remove_special_chars(content).trim().to_string()
}

fn gemini_clean(content: &str) -> String {
    // Fences first: they are delimited by the newlines the cleaner removes
    remove_special_chars(strip_code_fences(content))
        .trim()
        .to_string()
}

pub fn extract_chat_response_openai(response: &Message) -> Result<ChatMessageContent, ParseError> {
    parse_structured(&openai_clean(&response.content))
}

pub fn extract_profile_response_openai(response: &Message) -> Result<MetaFromAI, ParseError> {
    parse_structured(&openai_clean(&response.content))
}

pub fn extract_chat_response_gemini(response: &Message) -> Result<ChatMessageContent, ParseError> {
    parse_structured(&gemini_clean(&response.content))
}

pub fn extract_profile_response_gemini(response: &Message) -> Result<MetaFromAI, ParseError> {
    parse_structured(&gemini_clean(&response.content))
}
