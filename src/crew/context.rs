//! Shared state threaded through one pipeline run
//!
//! Only the crew writes to the context, between stages. Agents receive typed
//! inputs built from it; each builder names its hard dependencies and fails
//! with `MissingDependency` if one has not been recorded.

use crate::agents::{DocumentInput, FinancialInput, StrategyInput, SynthesisInput};
use crate::error::PipelineError;
use crate::models::{
    CrewAnalysisResult, DocumentOutput, FinancialOutput, OrganizationProfile, StrategyOutput,
    SynthesisOutput,
};
use crate::Result;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Forward-only pipeline states
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Start,
    DocumentDone,
    AnalysisDone,
    Synthesized,
}

impl PipelineStage {
    pub fn next(self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Start => Some(PipelineStage::DocumentDone),
            PipelineStage::DocumentDone => Some(PipelineStage::AnalysisDone),
            PipelineStage::AnalysisDone => Some(PipelineStage::Synthesized),
            PipelineStage::Synthesized => None,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Start => "START",
            PipelineStage::DocumentDone => "DOCUMENT_DONE",
            PipelineStage::AnalysisDone => "ANALYSIS_DONE",
            PipelineStage::Synthesized => "SYNTHESIZED",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug)]
pub struct AgentContext {
    profile: Arc<OrganizationProfile>,
    stage: PipelineStage,
    document: Option<DocumentOutput>,
    strategy: Option<StrategyOutput>,
    financial: Option<FinancialOutput>,
}

impl AgentContext {
    pub fn new(profile: OrganizationProfile) -> Self {
        Self {
            profile: Arc::new(profile),
            stage: PipelineStage::Start,
            document: None,
            strategy: None,
            financial: None,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn profile(&self) -> &OrganizationProfile {
        &self.profile
    }

    /// Display names of the agents whose output has been recorded, in run order
    pub fn output_names(&self) -> Vec<&str> {
        [
            self.document.as_ref().map(|o| o.agent_name.as_str()),
            self.strategy.as_ref().map(|o| o.agent_name.as_str()),
            self.financial.as_ref().map(|o| o.agent_name.as_str()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn advance(&mut self, next: PipelineStage) {
        debug_assert_eq!(self.stage.next(), Some(next), "pipeline stages are forward-only");
        info!(from = %self.stage, to = %next, "Pipeline stage transition");
        self.stage = next;
    }

    pub fn record_document(&mut self, output: DocumentOutput) {
        self.document = Some(output);
    }

    pub fn record_strategy(&mut self, output: StrategyOutput) {
        self.strategy = Some(output);
    }

    pub fn record_financial(&mut self, output: FinancialOutput) {
        self.financial = Some(output);
    }

    pub fn document_input(&self) -> DocumentInput {
        DocumentInput {
            profile: self.profile.clone(),
        }
    }

    pub fn strategy_input(&self) -> Result<StrategyInput> {
        Ok(StrategyInput {
            profile: self.profile.clone(),
            document: require(&self.document, "strategy", "document")?,
        })
    }

    /// Strategy is passed through only if it has already been recorded
    pub fn financial_input(&self) -> Result<FinancialInput> {
        Ok(FinancialInput {
            profile: self.profile.clone(),
            document: require(&self.document, "financial", "document")?,
            strategy: self.strategy.clone(),
        })
    }

    pub fn synthesis_input(&self) -> Result<SynthesisInput> {
        Ok(SynthesisInput {
            profile: self.profile.clone(),
            document: require(&self.document, "synthesis", "document")?,
            strategy: require(&self.strategy, "synthesis", "strategy")?,
            financial: require(&self.financial, "synthesis", "financial")?,
        })
    }

    /// Consume the context into the terminal result
    pub fn finish(self, synthesis: SynthesisOutput) -> Result<CrewAnalysisResult> {
        Ok(CrewAnalysisResult {
            document: self.document.ok_or(PipelineError::MissingDependency {
                stage: "result",
                dependency: "document",
            })?,
            strategy: self.strategy.ok_or(PipelineError::MissingDependency {
                stage: "result",
                dependency: "strategy",
            })?,
            financial: self.financial.ok_or(PipelineError::MissingDependency {
                stage: "result",
                dependency: "financial",
            })?,
            synthesis,
        })
    }
}

fn require<T: Clone>(
    slot: &Option<T>,
    stage: &'static str,
    dependency: &'static str,
) -> Result<T> {
    slot.clone()
        .ok_or(PipelineError::MissingDependency { stage, dependency })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::{document_output, profile};
    use crate::models::AgentOutput;

    #[test]
    fn test_hard_dependencies_are_enforced() {
        let context = AgentContext::new(profile(None));

        let err = context.strategy_input().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingDependency {
                stage: "strategy",
                dependency: "document"
            }
        ));
        assert!(context.financial_input().is_err());
        assert!(context.synthesis_input().is_err());
    }

    #[test]
    fn test_strategy_is_soft_dependency_of_financial() {
        let mut context = AgentContext::new(profile(None));
        context.record_document(document_output());

        assert!(context.financial_input().unwrap().strategy.is_none());

        context.record_strategy(AgentOutput {
            agent_name: "Business Strategy Agent".to_string(),
            ..Default::default()
        });
        assert!(context.financial_input().unwrap().strategy.is_some());
        assert_eq!(
            context.output_names(),
            vec!["Document Intelligence Agent", "Business Strategy Agent"]
        );
    }

    #[test]
    fn test_stages_move_forward() {
        let mut context = AgentContext::new(profile(None));
        assert_eq!(context.stage(), PipelineStage::Start);
        context.advance(PipelineStage::DocumentDone);
        context.advance(PipelineStage::AnalysisDone);
        context.advance(PipelineStage::Synthesized);
        assert_eq!(context.stage(), PipelineStage::Synthesized);
        assert_eq!(context.stage().next(), None);
    }
}
