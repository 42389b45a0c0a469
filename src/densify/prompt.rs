//! Prompt construction and response parsing shared by every provider.

use super::error::DensifyError;
use super::{DensifyOutput, DensifyRequest};

pub const SYSTEM_PROMPT: &str = "You condense text captured from a user's screen into dense, \
factual working notes. Keep names, numbers, identifiers, decisions, open questions and \
anything the user would need to resume the task. Drop interface chrome, navigation labels \
and repeated boilerplate. Do not invent facts. \
Start your reply with one line of the form `TITLE: <short title>` (at most eight words), \
followed by a blank line and then the notes in plain Markdown.";

const TITLE_PREFIX: &str = "TITLE:";

/// Rough token count, four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

pub fn build_user_prompt(request: &DensifyRequest) -> String {
    let mut prompt = format!("Application: {}\n", request.app_name);
    if !request.window_title.trim().is_empty() {
        prompt.push_str(&format!("Window: {}\n", request.window_title.trim()));
    }
    prompt.push_str("\nCaptured text:\n");
    prompt.push_str(&request.text);
    prompt
}

/// Builds the user prompt, refusing input the provider cannot take.
pub fn checked_user_prompt(request: &DensifyRequest) -> Result<String, DensifyError> {
    let prompt = build_user_prompt(request);
    let estimated_tokens = estimate_tokens(SYSTEM_PROMPT) + estimate_tokens(&prompt);
    let limit = request.provider.max_input_tokens();
    if estimated_tokens > limit {
        return Err(DensifyError::InputTooLong {
            estimated_tokens,
            limit,
        });
    }
    Ok(prompt)
}

/// Splits a leading `TITLE:` line off the model's reply.
pub fn parse_output(raw: &str) -> Result<DensifyOutput, DensifyError> {
    let trimmed = raw.trim();
    let (title, content) = match trimmed.split_once('\n') {
        Some((first, rest)) if has_title_prefix(first) => (title_from(first), rest.trim()),
        None if has_title_prefix(trimmed) => (title_from(trimmed), ""),
        _ => (None, trimmed),
    };

    if content.is_empty() {
        return Err(DensifyError::Rejected(
            "the densifier returned an empty response".into(),
        ));
    }

    Ok(DensifyOutput {
        content: content.to_string(),
        title,
    })
}

fn has_title_prefix(line: &str) -> bool {
    line.trim_start()
        .get(..TITLE_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(TITLE_PREFIX))
}

fn title_from(line: &str) -> Option<String> {
    let title = line.trim_start()[TITLE_PREFIX.len()..]
        .trim()
        .trim_matches(|c| c == '"' || c == '*')
        .trim();
    (!title.is_empty()).then(|| title.to_string())
}
