//! Document intelligence agent
//!
//! Extracts quotable findings and metrics from the uploaded document so the
//! downstream agents can cite evidence instead of inventing it.

use crate::agents::{generate, organization_section, Agent, AgentProfile, DocumentInput};
use crate::config::StageSettings;
use crate::generation::TextGenerator;
use crate::models::{AgentOutput, DocumentIntelligenceData, DocumentOutput};
use crate::prompts::{self, DOCUMENT_SHAPE};
use crate::recovery::recover_or_default;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub const PROFILE: AgentProfile = AgentProfile {
    name: "Document Intelligence Agent",
    role: "Corporate document analyst",
    goal: "Extract verbatim findings, metrics, risks and opportunities from company documents",
};

pub struct DocumentIntelligenceAgent {
    generator: Arc<dyn TextGenerator>,
    settings: StageSettings,
    max_document_chars: usize,
}

impl DocumentIntelligenceAgent {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        settings: StageSettings,
        max_document_chars: usize,
    ) -> Self {
        Self {
            generator,
            settings,
            max_document_chars,
        }
    }

    /// Output used when there is nothing to analyse
    pub fn no_document() -> DocumentOutput {
        AgentOutput {
            agent_name: PROFILE.name.to_string(),
            confidence: 0.0,
            reasoning: "No document was provided for analysis.".to_string(),
            insights: vec![
                "No document uploaded; findings rely on the organization profile alone."
                    .to_string(),
            ],
            structured_data: DocumentIntelligenceData::default(),
        }
    }

    fn fallback() -> DocumentOutput {
        AgentOutput {
            agent_name: PROFILE.name.to_string(),
            confidence: 0.0,
            reasoning: "Document analysis returned no usable structure.".to_string(),
            insights: Vec::new(),
            structured_data: DocumentIntelligenceData::default(),
        }
    }

    fn build_prompt(&self, input: &DocumentInput, text: &str) -> String {
        let (excerpt, truncated) = truncate_chars(text, self.max_document_chars);

        format!(
            "{}\nDOCUMENT: {}{}\n---\n{}\n---\n\nExtract key findings as verbatim quotes, the metrics the document states, \
             strategic implications, risk factors and opportunities relevant to the transformation goal.",
            organization_section(&input.profile),
            input.profile.document_label(),
            if truncated { " (excerpt)" } else { "" },
            excerpt,
        )
    }
}

/// First `max_chars` characters of `text`, and whether anything was cut
fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (&text[..byte_index], true),
        None => (text, false),
    }
}

#[async_trait]
impl Agent for DocumentIntelligenceAgent {
    type Input = DocumentInput;
    type Output = DocumentOutput;

    fn profile(&self) -> &AgentProfile {
        &PROFILE
    }

    async fn execute(&self, input: &DocumentInput) -> Result<DocumentOutput> {
        let Some(text) = input.profile.document_text() else {
            info!(agent = PROFILE.name, "No document content, skipping generation");
            return Ok(Self::no_document());
        };

        let system_prompt = prompts::system_prompt(&PROFILE, DOCUMENT_SHAPE);
        let user_prompt = self.build_prompt(input, text);

        let raw = generate(
            self.generator.as_ref(),
            &PROFILE,
            &self.settings,
            &system_prompt,
            &user_prompt,
        )
        .await?;

        let recovered = recover_or_default(&raw, PROFILE.name, Self::fallback());
        Ok(recovered.value.attributed_to(PROFILE.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::profile;
    use crate::config::CrewSettings;
    use crate::error::ServiceErrorKind;
    use crate::generation::MockGenerator;

    fn agent(generator: Arc<MockGenerator>, max_chars: usize) -> DocumentIntelligenceAgent {
        DocumentIntelligenceAgent::new(generator, CrewSettings::default().document, max_chars)
    }

    #[tokio::test]
    async fn test_empty_document_skips_generator() {
        let generator = Arc::new(MockGenerator::new());

        for document in [None, Some(""), Some("   \n\t")] {
            let input = DocumentInput {
                profile: Arc::new(profile(document)),
            };
            let output = agent(generator.clone(), 1000).execute(&input).await.unwrap();

            assert_eq!(output.confidence, 0.0);
            assert!(output.structured_data.key_findings.is_empty());
            assert_eq!(output.insights.len(), 1);
        }

        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_document_findings_are_recovered() {
        let generator = Arc::new(MockGenerator::new().respond_to(
            PROFILE.name,
            r#"```json
{"confidence": 0.9, "reasoning": "ok", "insights": ["i"],
 "structuredData": {"keyFindings": ["\"Quotes take 3 days\""],
                    "relevantMetrics": [{"name": "Turnaround", "value": "3 days", "context": "avg"}]}}
```"#,
        ));
        let input = DocumentInput {
            profile: Arc::new(profile(Some("Quotes take 3 days on average."))),
        };

        let output = agent(generator.clone(), 1000).execute(&input).await.unwrap();

        assert_eq!(output.agent_name, PROFILE.name);
        assert_eq!(output.confidence, 0.9);
        assert_eq!(output.structured_data.key_findings.len(), 1);
        assert_eq!(output.structured_data.relevant_metrics[0].name, "Turnaround");

        let call = &generator.calls_for(PROFILE.name)[0];
        assert!(call.user_prompt.contains("ops-review.pdf"));
        assert!(call.user_prompt.contains("Quotes take 3 days"));
    }

    #[tokio::test]
    async fn test_malformed_response_uses_default() {
        let generator =
            Arc::new(MockGenerator::new().respond_to(PROFILE.name, "I am unable to comply."));
        let input = DocumentInput {
            profile: Arc::new(profile(Some("Some text"))),
        };

        let output = agent(generator, 1000).execute(&input).await.unwrap();
        assert_eq!(output.confidence, 0.0);
        assert!(output.structured_data.relevant_metrics.is_empty());
    }

    #[tokio::test]
    async fn test_permanent_service_error_propagates() {
        let generator = Arc::new(MockGenerator::new().fail_for(
            PROFILE.name,
            ServiceErrorKind::Permanent,
            "400 invalid argument",
        ));
        let input = DocumentInput {
            profile: Arc::new(profile(Some("Some text"))),
        };

        let result = agent(generator, 1000).execute(&input).await;
        tokio_test::assert_err!(result);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), ("héll", true));
        assert_eq!(truncate_chars("short", 10), ("short", false));
    }
}
