//! Executive orchestrator agent
//!
//! Writes the final narrative over the three analytical outputs. Unlike the
//! other agents it has no default: a report without its summary is a defect,
//! so unrecoverable output fails the stage.

use crate::agents::{generate, organization_section, Agent, AgentProfile, SynthesisInput};
use crate::config::StageSettings;
use crate::generation::TextGenerator;
use crate::models::{Horizon, SynthesisOutput};
use crate::prompts::{self, bullet_section, SYNTHESIS_SHAPE};
use crate::recovery::recover;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub const PROFILE: AgentProfile = AgentProfile {
    name: "Executive Orchestrator",
    role: "Chief transformation officer",
    goal: "Synthesize evidence, strategy and financials into an executive summary, recommendations and risk assessment",
};

const EXCERPT_LIMIT: usize = 6;

pub struct ExecutiveOrchestratorAgent {
    generator: Arc<dyn TextGenerator>,
    settings: StageSettings,
}

impl ExecutiveOrchestratorAgent {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: StageSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    fn build_prompt(input: &SynthesisInput) -> String {
        let document = &input.document.structured_data;
        let strategy = &input.strategy.structured_data;
        let financial = &input.financial.structured_data;

        let nodes: Vec<String> = strategy
            .cognitive_nodes
            .iter()
            .map(|n| format!("{} ({:.0}% automatable)", n.name, n.automation_potential))
            .collect();

        let use_cases: Vec<String> = financial
            .use_cases
            .iter()
            .map(|u| {
                format!(
                    "[{}] {}: payback {:.0} months, trust tax {:.0}%",
                    u.horizon, u.title, u.payback_months, u.trust_tax_percent
                )
            })
            .collect();

        let horizon_mix: Vec<String> = Horizon::ALL
            .iter()
            .map(|h| {
                let count = financial.use_cases.iter().filter(|u| u.horizon == *h).count();
                format!("{}: {} use case(s)", h, count)
            })
            .collect();

        let mut prompt = organization_section(&input.profile);
        prompt.push('\n');
        prompt.push_str(&bullet_section("KEY FINDINGS", &document.key_findings, EXCERPT_LIMIT));
        prompt.push_str(&bullet_section("RISK FACTORS", &document.risk_factors, EXCERPT_LIMIT));
        prompt.push_str(&bullet_section("COGNITIVE NODES", &nodes, EXCERPT_LIMIT));
        prompt.push_str(&bullet_section(
            "JAGGED FRONTIER",
            &strategy.jagged_frontier,
            EXCERPT_LIMIT,
        ));
        prompt.push_str(&bullet_section("USE CASES", &use_cases, EXCERPT_LIMIT));
        prompt.push_str(&bullet_section("HORIZON MIX", &horizon_mix, Horizon::ALL.len()));
        prompt.push_str(&format!(
            "Overall ROI: {:.0}%\nAnnual savings: {:.0}\n\nWrite the executive synthesis.",
            financial.roi_percent, financial.totals.annual_savings
        ));
        prompt
    }
}

#[async_trait]
impl Agent for ExecutiveOrchestratorAgent {
    type Input = SynthesisInput;
    type Output = SynthesisOutput;

    fn profile(&self) -> &AgentProfile {
        &PROFILE
    }

    async fn execute(&self, input: &SynthesisInput) -> Result<SynthesisOutput> {
        let system_prompt = prompts::system_prompt(&PROFILE, SYNTHESIS_SHAPE);
        let user_prompt = Self::build_prompt(input);

        let raw = generate(
            self.generator.as_ref(),
            &PROFILE,
            &self.settings,
            &system_prompt,
            &user_prompt,
        )
        .await?;

        Ok(recover::<SynthesisOutput>(&raw, PROFILE.name)?.value)
    }
}
