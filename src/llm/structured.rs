//! Structured JSON extraction over a plain-text chat provider.
//!
//! Local models routinely wrap JSON in code fences, prepend prose, or
//! stop mid-array when the context window runs out. [`obtain`] layers a
//! decode pipeline and a bounded feedback-retry loop on top of
//! [`Provider::complete`] so callers only ever see a typed value or a
//! typed failure.

use serde::de::DeserializeOwned;
use thiserror::Error;

use super::traits::Provider;
use crate::utils::text::truncate_chars;

/// Appended to every system instruction handed to [`obtain`].
const STRICT_JSON_DIRECTIVE: &str =
    "\n\nYou MUST respond with VALID JSON only. Do not include markdown, code fences, comments, or any text before or after the JSON.";

/// How much of a rejected reply is echoed back in the repair prompt.
const REPAIR_EXCERPT_CHARS: usize = 2_000;

// ─── errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StructuredOutputError {
    /// The provider call itself failed (network, auth, model missing).
    /// Retrying with prompt feedback cannot fix these, so the loop
    /// surfaces them immediately.
    #[error("provider request failed: {0}")]
    Completion(#[source] anyhow::Error),

    /// Every attempt produced text that would not decode into the
    /// requested type. Carries the final decode error for diagnostics.
    #[error("no valid structured output after {attempts} attempts: {last_error}")]
    Exhausted {
        attempts: u32,
        #[source]
        last_error: serde_json::Error,
    },
}

// ─── protocol ───────────────────────────────────────────────────────────────

/// Ask `provider` for a value of type `T`, retrying with error feedback.
///
/// One initial attempt plus up to `max_retries` repair rounds. Each
/// rejected reply is fed back to the model together with the decode
/// error so it can correct itself instead of guessing again.
pub async fn obtain<T: DeserializeOwned>(
    provider: &dyn Provider,
    system: &str,
    user: &str,
    max_retries: u32,
) -> Result<T, StructuredOutputError> {
    let system = format!("{system}{STRICT_JSON_DIRECTIVE}");
    let mut prompt = user.to_string();
    let mut attempt: u32 = 0;

    loop {
        let raw = provider
            .complete(&system, &prompt)
            .await
            .map_err(StructuredOutputError::Completion)?;

        let error = match decode::<T>(&raw) {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!(provider = provider.name(), attempt, "structured output recovered after retry");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        attempt += 1;
        if attempt > max_retries {
            return Err(StructuredOutputError::Exhausted {
                attempts: attempt,
                last_error: error,
            });
        }

        tracing::warn!(
            provider = provider.name(),
            attempt,
            error = %error,
            "structured output rejected, retrying with feedback"
        );
        prompt = repair_prompt(user, &raw, &error);
    }
}

/// Decode one raw completion into `T`, tolerating the usual model tics.
fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let cleaned = strip_code_fences(raw);
    let candidate = balanced_json_span(cleaned).unwrap_or(cleaned);

    let value: serde_json::Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(parse_error) => {
            // Truncated replies are common when a local model hits its
            // token limit mid-array. Closing the open brackets once is
            // the only repair attempted; anything else is a retry.
            let repaired = close_unbalanced(candidate);
            match serde_json::from_str(&repaired) {
                Ok(value) => value,
                Err(_) => return Err(parse_error),
            }
        }
    };

    serde_json::from_value(value)
}

/// Strip a leading/trailing markdown code fence, if present.
fn strip_code_fences(text: &str) -> &str {
    let mut inner = text.trim();
    if let Some(rest) = inner.strip_prefix("```") {
        inner = match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => rest.trim_start_matches("json"),
        };
        inner = inner.trim();
        if let Some(body) = inner.strip_suffix("```") {
            inner = body.trim();
        }
    }
    inner
}

/// Return the first balanced top-level JSON object or array in `text`.
///
/// Bracket characters inside string literals are skipped, including
/// escaped quotes. Returns `None` when no opener appears or the span
/// never closes.
fn balanced_json_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Close whatever a truncated reply left open: an unterminated string,
/// a dangling comma, and the bracket stack in nesting order.
fn close_unbalanced(text: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut repaired = text.trim_end().to_string();
    if in_string {
        repaired.push('"');
    } else {
        while repaired.ends_with(',') {
            repaired.pop();
            while repaired.ends_with(char::is_whitespace) {
                repaired.pop();
            }
        }
    }
    while let Some(close) = stack.pop() {
        repaired.push(close);
    }
    repaired
}

/// Build the follow-up prompt for a rejected reply.
fn repair_prompt(user: &str, previous: &str, error: &serde_json::Error) -> String {
    format!(
        "{user}\n\nYour previous response was invalid.\n\nERROR:\n{error}\n\nPREVIOUS RESPONSE:\n{}\n\nReturn ONLY valid JSON that matches the schema, without adding or removing items.",
        truncate_chars(previous, REPAIR_EXCERPT_CHARS),
    )
}

// ─── tests ──────────────────────────────────────────────────────────────────
