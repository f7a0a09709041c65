use log::{debug, warn};
use serde_json::json;
use std::time::Duration;

use crate::core::shared::utils::truncate_chars;
use crate::llm::LLMProvider;

pub const DEFAULT_TITLE: &str = "Maintenance Request";
pub const FALLBACK_TITLE_CHARS: usize = 40;
pub const MAX_TITLE_CHARS: usize = 80;
/// Bodies this short are used as-is without a summarizer call.
pub const MIN_SUMMARY_INPUT_CHARS: usize = 5;

pub fn fallback_title(body: &str) -> String {
    let title = truncate_chars(body.trim(), FALLBACK_TITLE_CHARS);
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title.to_string()
    }
}

/// Strips quoting and markdown the model tends to add; `None` if nothing is left.
pub fn clean_generated_title(raw: &str) -> Option<String> {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '.' | '*'))
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped = truncate_chars(&collapsed, MAX_TITLE_CHARS);
    let capped = capped.trim_end();
    if capped.is_empty() {
        None
    } else {
        Some(capped.to_string())
    }
}

pub fn summary_prompt(body: &str) -> String {
    format!("Summarize this maintenance request into a 3-word title: \"{body}\"")
}

/// Best-effort title: any provider error, timeout or empty output falls back
/// to truncating the body.
pub async fn summarize_title(
    provider: Option<&dyn LLMProvider>,
    body: &str,
    timeout: Duration,
) -> String {
    let Some(provider) = provider else {
        return fallback_title(body);
    };
    if body.chars().count() <= MIN_SUMMARY_INPUT_CHARS {
        return fallback_title(body);
    }

    let prompt = summary_prompt(body);
    let config = json!({ "max_tokens": 32 });
    match tokio::time::timeout(timeout, provider.generate(&prompt, &config)).await {
        Ok(Ok(raw)) => match clean_generated_title(&raw) {
            Some(title) => {
                debug!("Summarized ticket title: {}", title);
                title
            }
            None => {
                warn!("Summarizer returned an empty title");
                fallback_title(body)
            }
        },
        Ok(Err(e)) => {
            warn!("Summarizer failed: {}", e);
            fallback_title(body)
        }
        Err(_) => {
            warn!("Summarizer timed out after {:?}", timeout);
            fallback_title(body)
        }
    }
}
