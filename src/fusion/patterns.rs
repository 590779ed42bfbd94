//! Agentic pattern fallback
//!
//! Best-effort keyword heuristic used only when an upstream agent left the
//! pattern label empty. It is not an authoritative classification; it only
//! guarantees that every item carries one of the known labels.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgenticPattern {
    Reflection,
    Planning,
    ToolUse,
    MultiAgentCollaboration,
}

impl AgenticPattern {
    pub const ALL: [AgenticPattern; 4] = [
        AgenticPattern::Reflection,
        AgenticPattern::Planning,
        AgenticPattern::ToolUse,
        AgenticPattern::MultiAgentCollaboration,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgenticPattern::Reflection => "Reflection",
            AgenticPattern::Planning => "Planning",
            AgenticPattern::ToolUse => "Tool Use",
            AgenticPattern::MultiAgentCollaboration => "Multi-Agent Collaboration",
        }
    }
}

impl fmt::Display for AgenticPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Checked in order; first hit wins
const KEYWORD_TABLE: &[(AgenticPattern, &[&str])] = &[
    (AgenticPattern::Reflection, &["draft", "review", "edit", "write"]),
    (AgenticPattern::Planning, &["reason", "analy", "plan", "forecast"]),
    (AgenticPattern::ToolUse, &["tool", "automat", "integrat", "extract"]),
];

pub fn infer_pattern(title: &str) -> AgenticPattern {
    let lowered = title.to_lowercase();

    KEYWORD_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(pattern, _)| *pattern)
        .unwrap_or(AgenticPattern::MultiAgentCollaboration)
}

/// Keep a non-blank upstream label, otherwise infer one from `title`.
/// Returns the label and whether it was inferred.
pub fn resolve_pattern(upstream: Option<&str>, title: &str) -> (String, bool) {
    match upstream.map(str::trim).filter(|p| !p.is_empty()) {
        Some(label) => (label.to_string(), false),
        None => (infer_pattern(title).label().to_string(), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_always_yields_known_label() {
        let titles = [
            "",
            "Contract review assistant",
            "Demand analysis",
            "Invoice automation",
            "Something entirely unrelated",
            "ÜNICODE TITLE",
        ];

        for title in titles {
            let pattern = infer_pattern(title);
            assert!(AgenticPattern::ALL.contains(&pattern), "title: {title}");
        }
    }

    #[test]
    fn test_unmatched_title_uses_catch_all() {
        assert_eq!(
            infer_pattern("Customer onboarding"),
            AgenticPattern::MultiAgentCollaboration
        );
    }

    #[test]
    fn test_upstream_label_is_kept() {
        assert_eq!(
            resolve_pattern(Some(" Orchestrator-Worker "), "Draft review"),
            ("Orchestrator-Worker".to_string(), false)
        );

        let (label, inferred) = resolve_pattern(Some("   "), "anything");
        assert!(inferred);
        assert!(AgenticPattern::ALL.iter().any(|p| p.label() == label));
    }
}
