//! Financial analyst agent
//!
//! Prices the transformation as horizon-tagged use cases with trust-tax
//! adjusted savings, ROI and a sensitivity range.

use crate::agents::{generate, organization_section, Agent, AgentProfile, FinancialInput};
use crate::config::StageSettings;
use crate::generation::TextGenerator;
use crate::models::{AgentOutput, FinancialAnalysisData, FinancialOutput, StrategyOutput};
use crate::prompts::{self, bullet_section, FINANCIAL_SHAPE};
use crate::recovery::recover_or_default;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub const PROFILE: AgentProfile = AgentProfile {
    name: "Financial Analyst Agent",
    role: "Transformation finance analyst",
    goal: "Quantify costs, trust tax, savings, payback and ROI for each automation use case",
};

const EXCERPT_LIMIT: usize = 10;

pub struct FinancialAnalystAgent {
    generator: Arc<dyn TextGenerator>,
    settings: StageSettings,
}

impl FinancialAnalystAgent {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: StageSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    fn fallback() -> FinancialOutput {
        AgentOutput {
            agent_name: PROFILE.name.to_string(),
            confidence: 0.0,
            reasoning: "Financial analysis returned no usable structure.".to_string(),
            insights: Vec::new(),
            structured_data: FinancialAnalysisData::default(),
        }
    }

    pub(crate) fn build_prompt(input: &FinancialInput) -> String {
        let data = &input.document.structured_data;
        let metrics: Vec<String> = data.relevant_metrics.iter().map(|m| m.to_string()).collect();

        let mut prompt = organization_section(&input.profile);
        prompt.push('\n');
        prompt.push_str(&bullet_section("DOCUMENT METRICS", &metrics, EXCERPT_LIMIT));
        prompt.push_str(&bullet_section(
            "DOCUMENT FINDINGS",
            &data.key_findings,
            EXCERPT_LIMIT,
        ));

        match &input.strategy {
            Some(strategy) => prompt.push_str(&strategy_excerpt(strategy)),
            None => debug!(agent = PROFILE.name, "No strategy output, pricing from profile only"),
        }

        prompt.push_str(
            "\nPropose use cases across H1 (0-6 months), H2 (6-18 months) and H3 (18+ months). \
             Justify each with a document metric or finding where one applies, quoting it exactly.",
        );
        prompt
    }
}

/// Strategy nodes ranked by automation potential, for the analyst to price
fn strategy_excerpt(strategy: &StrategyOutput) -> String {
    let mut nodes: Vec<_> = strategy.structured_data.cognitive_nodes.iter().collect();
    nodes.sort_by(|a, b| b.automation_potential.total_cmp(&a.automation_potential));

    let lines: Vec<String> = nodes
        .iter()
        .map(|node| {
            let pattern = if node.pattern.trim().is_empty() {
                "unspecified"
            } else {
                node.pattern.as_str()
            };
            format!(
                "{} ({:.0}% automation potential, pattern: {})",
                node.name, node.automation_potential, pattern
            )
        })
        .collect();

    format!(
        "\n{}",
        bullet_section("STRATEGY COGNITIVE NODES", &lines, EXCERPT_LIMIT)
    )
}

#[async_trait]
impl Agent for FinancialAnalystAgent {
    type Input = FinancialInput;
    type Output = FinancialOutput;

    fn profile(&self) -> &AgentProfile {
        &PROFILE
    }

    async fn execute(&self, input: &FinancialInput) -> Result<FinancialOutput> {
        let system_prompt = prompts::system_prompt(&PROFILE, FINANCIAL_SHAPE);
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
    use crate::models::{BusinessStrategyData, CognitiveNode, Horizon};

    fn strategy_with(potentials: &[(&str, f64)]) -> StrategyOutput {
        AgentOutput {
            agent_name: "Business Strategy Agent".to_string(),
            confidence: 0.7,
            reasoning: String::new(),
            insights: Vec::new(),
            structured_data: BusinessStrategyData {
                cognitive_nodes: potentials
                    .iter()
                    .map(|(name, potential)| CognitiveNode {
                        name: name.to_string(),
                        automation_potential: *potential,
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_prompt_includes_every_strategy_node() {
        let generator = Arc::new(MockGenerator::new().respond_to(PROFILE.name, "{}"));
        let agent = FinancialAnalystAgent::new(generator.clone(), CrewSettings::default().financial);
        let input = FinancialInput {
            profile: Arc::new(profile(None)),
            document: document_output(),
            strategy: Some(strategy_with(&[
                ("Rate lookup", 90.0),
                ("Carrier negotiation", 40.0),
                ("Customer escalation", 10.0),
            ])),
        };

        agent.execute(&input).await.unwrap();

        let prompt = &generator.calls_for(PROFILE.name)[0].user_prompt;
        for name in ["Rate lookup", "Carrier negotiation", "Customer escalation"] {
            assert!(prompt.contains(name), "missing node {name}");
        }
        assert!(prompt.contains("Quote turnaround: 3.2 days (FY24 average)"));
    }

    #[test]
    fn test_nodes_ranked_by_automation_potential() {
        let excerpt = strategy_excerpt(&strategy_with(&[("low", 10.0), ("high", 90.0)]));
        assert!(excerpt.find("high").unwrap() < excerpt.find("low").unwrap());
    }

    #[test]
    fn test_prompt_without_strategy_still_builds() {
        let input = FinancialInput {
            profile: Arc::new(profile(None)),
            document: document_output(),
            strategy: None,
        };
        let prompt = FinancialAnalystAgent::build_prompt(&input);
        assert!(!prompt.contains("STRATEGY COGNITIVE NODES"));
        assert!(prompt.contains("DOCUMENT METRICS"));
    }

    #[tokio::test]
    async fn test_use_cases_recovered_from_prose_wrapped_json() {
        let generator = Arc::new(MockGenerator::new().respond_to(
            PROFILE.name,
            r#"Analysis follows.
{"confidence": 0.85, "structuredData": {"useCases": [
  {"title": "Automated rate lookup", "horizon": "H2", "currentCost": 200000, "projectedCost": 80000}
], "roiPercent": 240}}
Hope this helps!"#,
        ));
        let agent = FinancialAnalystAgent::new(generator, CrewSettings::default().financial);
        let input = FinancialInput {
            profile: Arc::new(profile(None)),
            document: document_output(),
            strategy: None,
        };

        let output = agent.execute(&input).await.unwrap();
        let data = &output.structured_data;
        assert_eq!(data.use_cases.len(), 1);
        assert_eq!(data.use_cases[0].horizon, Horizon::H2);
        assert_eq!(data.roi_percent, 240.0);
        assert!(data.sensitivity.is_none());
    }
}
