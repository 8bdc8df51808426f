//! Helpers for getting usable text and JSON out of chat models.

use anyhow::{anyhow, Result};
use askdocs_core::error::Error;
use askdocs_core::traits::{CompletionRequest, LanguageModel};
use serde::de::DeserializeOwned;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Removes `<think>…</think>` reasoning blocks. An unmatched closing tag
/// drops everything before it.
pub fn strip_reasoning(text: &str) -> String {
    let mut rest = text;
    if !rest.contains(THINK_OPEN) {
        if let Some(end) = rest.rfind(THINK_CLOSE) {
            rest = &rest[end + THINK_CLOSE.len()..];
        }
    }
    let mut out = String::with_capacity(rest.len());
    while let Some(start) = rest.find(THINK_OPEN) {
        match rest[start..].find(THINK_CLOSE) {
            Some(len) => {
                out.push_str(&rest[..start]);
                rest = &rest[start + len + THINK_CLOSE.len()..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// The outermost `{…}` span of `text`, if any.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Free-text completion with reasoning stripped. Blank output is an error.
pub fn invoke_text(model: &dyn LanguageModel, system: &str, user: &str) -> Result<String> {
    let request = CompletionRequest { system: system.to_string(), user: user.to_string(), schema: None };
    let text = strip_reasoning(&model.complete(&request)?);
    if text.is_empty() {
        return Err(Error::collaborator(model.name(), "empty completion").into());
    }
    Ok(text)
}

/// Completion constrained by `schema`, parsed into `T`.
pub fn invoke_structured<T: DeserializeOwned>(
    model: &dyn LanguageModel,
    system: &str,
    user: &str,
    schema: serde_json::Value,
) -> Result<T> {
    let request = CompletionRequest { system: system.to_string(), user: user.to_string(), schema: Some(schema) };
    let raw = model.complete(&request)?;
    let text = strip_reasoning(&raw);
    let json = extract_json_object(&text)
        .ok_or_else(|| Error::collaborator(model.name(), format!("no JSON object in reply: {text:.80}")))?;
    serde_json::from_str(json).map_err(|e| anyhow!("{} replied with unexpected JSON: {e}", model.name()))
}
