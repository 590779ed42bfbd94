//! Agent trait and implementations
//!
//! Every agent turns a typed slice of the shared context into one
//! structured output via a single generation call. Agents never call each
//! other; the crew hands each one the outputs it depends on.

use crate::config::StageSettings;
use crate::generation::{complete_with_retry, TextGenerator};
use crate::models::{DocumentOutput, FinancialOutput, OrganizationProfile, StrategyOutput};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub mod document;
pub mod executive;
pub mod financial;
pub mod strategy;

pub use document::DocumentIntelligenceAgent;
pub use executive::ExecutiveOrchestratorAgent;
pub use financial::FinancialAnalystAgent;
pub use strategy::BusinessStrategyAgent;

/// Static identity of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentProfile {
    pub name: &'static str,
    pub role: &'static str,
    pub goal: &'static str,
}

/// Trait for one crew member (LLM controlled)
#[async_trait]
pub trait Agent: Send + Sync {
    type Input: Send + Sync;
    type Output: Send;

    fn profile(&self) -> &AgentProfile;

    async fn execute(&self, input: &Self::Input) -> Result<Self::Output>;
}

//
// ================= Stage Inputs =================
//

#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub profile: Arc<OrganizationProfile>,
}

#[derive(Debug, Clone)]
pub struct StrategyInput {
    pub profile: Arc<OrganizationProfile>,
    pub document: DocumentOutput,
}

#[derive(Debug, Clone)]
pub struct FinancialInput {
    pub profile: Arc<OrganizationProfile>,
    pub document: DocumentOutput,
    /// Soft dependency: absent when strategy ran concurrently
    pub strategy: Option<StrategyOutput>,
}

#[derive(Debug, Clone)]
pub struct SynthesisInput {
    pub profile: Arc<OrganizationProfile>,
    pub document: DocumentOutput,
    pub strategy: StrategyOutput,
    pub financial: FinancialOutput,
}

/// Shared generation step: one call with the stage's token and retry ceilings
pub(crate) async fn generate(
    generator: &dyn TextGenerator,
    profile: &AgentProfile,
    settings: &StageSettings,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<String> {
    let start = Instant::now();

    let text = complete_with_retry(
        generator,
        &settings.retry,
        system_prompt,
        user_prompt,
        settings.max_output_tokens,
    )
    .await?;

    info!(
        agent = profile.name,
        prompt_chars = user_prompt.len(),
        response_chars = text.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Agent generation complete"
    );

    Ok(text)
}

/// Profile header shared by every agent's user prompt
pub(crate) fn organization_section(profile: &OrganizationProfile) -> String {
    format!(
        "ORGANIZATION:\nCompany: {}\nIndustry: {}\nTransformation goal: {}\nPain points: {}\nData landscape: {}\n",
        profile.company_name,
        profile.industry,
        profile.goal,
        profile.pain_points,
        profile.data_landscape,
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{
        AgentOutput, DocumentIntelligenceData, DocumentOutput, OrganizationProfile,
        RelevantMetric,
    };

    pub fn profile(document: Option<&str>) -> OrganizationProfile {
        OrganizationProfile {
            company_name: "Northwind Logistics".to_string(),
            industry: "Freight forwarding".to_string(),
            goal: "Cut quote turnaround from days to hours".to_string(),
            pain_points: "Manual rate lookups, email back-and-forth".to_string(),
            data_landscape: "ERP plus spreadsheets".to_string(),
            document_content: document.map(str::to_string),
            document_name: document.map(|_| "ops-review.pdf".to_string()),
        }
    }

    pub fn document_output() -> DocumentOutput {
        AgentOutput {
            agent_name: "Document Intelligence Agent".to_string(),
            confidence: 0.8,
            reasoning: "Ops review analysed".to_string(),
            insights: vec!["Quoting is the bottleneck".to_string()],
            structured_data: DocumentIntelligenceData {
                key_findings: vec!["\"Quotes take 3.2 days on average\"".to_string()],
                relevant_metrics: vec![RelevantMetric {
                    name: "Quote turnaround".to_string(),
                    value: "3.2 days".to_string(),
                    context: "FY24 average".to_string(),
                }],
                opportunities: vec!["Automate rate lookups".to_string()],
                ..Default::default()
            },
        }
    }
}
