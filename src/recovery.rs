//! Structured-output recovery
//!
//! The generator is asked for a single JSON document but may wrap it in
//! code fences, surround it with prose, or return something else entirely.
//! Recovery degrades in tiers:
//!
//! 1. strip fences, strict parse
//! 2. parse the slice between the first `{` and the last `}`
//! 3. caller-supplied default (or `RecoveryExhausted` where no default is safe)

use crate::error::PipelineError;
use crate::Result;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{debug, info, warn};

/// Which tier produced the value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairLevel {
    Direct,
    BraceSlice,
    Default,
}

impl fmt::Display for RepairLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RepairLevel::Direct => "direct",
            RepairLevel::BraceSlice => "brace_slice",
            RepairLevel::Default => "default",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct Recovered<T> {
    pub value: T,
    pub level: RepairLevel,
}

/// Remove leading/trailing markdown fences, trimming at each step
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...) on the opening fence line
        text = match rest.find('\n') {
            Some(newline) if rest[..newline].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
                &rest[newline + 1..]
            }
            _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
        text = text.trim();
    }

    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim();
    }

    text
}

/// Slice from the first `{` to the last `}`, if both exist in order
pub fn brace_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse `raw` through the strict and brace-slice tiers.
/// Fails with `RecoveryExhausted` when neither yields a `T`.
pub fn recover<T: DeserializeOwned>(raw: &str, agent: &str) -> Result<Recovered<T>> {
    let cleaned = strip_fences(raw);

    match serde_json::from_str::<T>(cleaned) {
        Ok(value) => {
            debug!(agent, repair_level = %RepairLevel::Direct, "Structured output parsed");
            return Ok(Recovered {
                value,
                level: RepairLevel::Direct,
            });
        }
        Err(e) => debug!(agent, error = %e, "Strict parse failed, trying brace slice"),
    }

    if let Some(slice) = brace_slice(cleaned) {
        match serde_json::from_str::<T>(slice) {
            Ok(value) => {
                info!(agent, repair_level = %RepairLevel::BraceSlice, "Structured output repaired");
                return Ok(Recovered {
                    value,
                    level: RepairLevel::BraceSlice,
                });
            }
            Err(e) => debug!(agent, error = %e, "Brace-slice parse failed"),
        }
    }

    Err(PipelineError::RecoveryExhausted {
        agent: agent.to_string(),
    })
}

/// Like [`recover`], but substitutes `default` instead of failing
pub fn recover_or_default<T: DeserializeOwned>(raw: &str, agent: &str, default: T) -> Recovered<T> {
    recover(raw, agent).unwrap_or_else(|_| {
        warn!(
            agent,
            repair_level = %RepairLevel::Default,
            raw_len = raw.len(),
            "Structured output unrecoverable, using default"
        );
        Recovered {
            value: default,
            level: RepairLevel::Default,
        }
    })
}
