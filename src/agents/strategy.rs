//! Business strategy agent
//!
//! Maps the organization's work into cognitive nodes, filters out tasks that
//! hinge on human capabilities and marks the current automation frontier.

use crate::agents::{generate, organization_section, Agent, AgentProfile, StrategyInput};
use crate::config::StageSettings;
use crate::generation::TextGenerator;
use crate::models::{AgentOutput, BusinessStrategyData, DocumentOutput, StrategyOutput};
use crate::prompts::{self, bullet_section, STRATEGY_SHAPE};
use crate::recovery::recover_or_default;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub const PROFILE: AgentProfile = AgentProfile {
    name: "Business Strategy Agent",
    role: "Transformation strategist",
    goal: "Identify cognitive work nodes, their load and readiness, and which tasks agents can take on today",
};

const EXCERPT_LIMIT: usize = 8;

pub struct BusinessStrategyAgent {
    generator: Arc<dyn TextGenerator>,
    settings: StageSettings,
}

impl BusinessStrategyAgent {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: StageSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    fn fallback() -> StrategyOutput {
        AgentOutput {
            agent_name: PROFILE.name.to_string(),
            confidence: 0.0,
            reasoning: "Strategy analysis returned no usable structure.".to_string(),
            insights: Vec::new(),
            structured_data: BusinessStrategyData::default(),
        }
    }

    fn build_prompt(input: &StrategyInput) -> String {
        format!(
            "{}\n{}\nMap the organization's cognitive work. Cite a document finding as evidence \
             for a node whenever one supports it, quoting it exactly.",
            organization_section(&input.profile),
            document_excerpt(&input.document),
        )
    }
}

/// Findings and opportunities from the document stage, for citation
pub(crate) fn document_excerpt(document: &DocumentOutput) -> String {
    let data = &document.structured_data;
    format!(
        "DOCUMENT EVIDENCE:\n{}{}",
        bullet_section("Key findings", &data.key_findings, EXCERPT_LIMIT),
        bullet_section("Opportunities", &data.opportunities, EXCERPT_LIMIT),
    )
}

#[async_trait]
impl Agent for BusinessStrategyAgent {
    type Input = StrategyInput;
    type Output = StrategyOutput;

    fn profile(&self) -> &AgentProfile {
        &PROFILE
    }

    async fn execute(&self, input: &StrategyInput) -> Result<StrategyOutput> {
        let system_prompt = prompts::system_prompt(&PROFILE, STRATEGY_SHAPE);
        let user_prompt = Self::build_prompt(input);

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
    use crate::agents::test_support::{document_output, profile};
    use crate::config::CrewSettings;
    use crate::generation::MockGenerator;
    use crate::models::LoadLevel;

    fn input() -> StrategyInput {
        StrategyInput {
            profile: Arc::new(profile(None)),
            document: document_output(),
        }
    }

    #[tokio::test]
    async fn test_prompt_carries_document_evidence() {
        let generator = Arc::new(MockGenerator::new().respond_to(
            PROFILE.name,
            r#"Here you go: {"confidence": 0.7, "structuredData": {"cognitiveNodes": [
                {"name": "Rate lookup", "humanLoad": "High", "automationPotential": "85%"}]}}"#,
        ));
        let agent = BusinessStrategyAgent::new(generator.clone(), CrewSettings::default().strategy);

        let output = agent.execute(&input()).await.unwrap();

        let node = &output.structured_data.cognitive_nodes[0];
        assert_eq!(node.name, "Rate lookup");
        assert_eq!(node.human_load, LoadLevel::High);
        assert_eq!(node.automation_potential, 85.0);

        let call = &generator.calls_for(PROFILE.name)[0];
        assert!(call.user_prompt.contains("Northwind Logistics"));
        assert!(call.user_prompt.contains("Quotes take 3.2 days on average"));
        assert!(call.user_prompt.contains("Automate rate lookups"));
        assert_eq!(call.max_output_tokens, CrewSettings::default().strategy.max_output_tokens);
    }

    #[tokio::test]
    async fn test_unrecoverable_output_defaults_to_empty_strategy() {
        let generator = Arc::new(MockGenerator::new().respond_to(PROFILE.name, "{{{{"));
        let agent = BusinessStrategyAgent::new(generator, CrewSettings::default().strategy);

        let output = agent.execute(&input()).await.unwrap();
        assert_eq!(output.agent_name, PROFILE.name);
        assert!(output.structured_data.cognitive_nodes.is_empty());
        assert!(output.structured_data.jagged_frontier.is_empty());
    }
}
