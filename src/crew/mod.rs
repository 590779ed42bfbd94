//! Pipeline coordinator
//!
//! START → DOCUMENT_DONE → ANALYSIS_DONE (strategy ∥ financial) → SYNTHESIZED
//!
//! Single-shot: any stage failure aborts the run. Retries belong to the
//! generation layer and malformed output to recovery, never to this layer.

use crate::agents::{
    self, Agent, BusinessStrategyAgent, DocumentInput, DocumentIntelligenceAgent,
    ExecutiveOrchestratorAgent, FinancialAnalystAgent, FinancialInput, StrategyInput,
    SynthesisInput,
};
use crate::config::{CrewSettings, StrategyHandoff};
use crate::error::PipelineError;
use crate::generation::TextGenerator;
use crate::models::{
    CrewAnalysisResult, DocumentOutput, FinancialOutput, OrganizationProfile, StrategyOutput,
    SynthesisOutput,
};
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

pub mod context;
pub use context::{AgentContext, PipelineStage};

pub type DocumentStage = Box<dyn Agent<Input = DocumentInput, Output = DocumentOutput>>;
pub type StrategyStage = Box<dyn Agent<Input = StrategyInput, Output = StrategyOutput>>;
pub type FinancialStage = Box<dyn Agent<Input = FinancialInput, Output = FinancialOutput>>;
pub type SynthesisStage = Box<dyn Agent<Input = SynthesisInput, Output = SynthesisOutput>>;

/// The four agents in run order, plus the strategy → financial handoff policy
pub struct Crew {
    document: DocumentStage,
    strategy: StrategyStage,
    financial: FinancialStage,
    synthesis: SynthesisStage,
    handoff: StrategyHandoff,
}

impl Crew {
    pub fn new(
        document: DocumentStage,
        strategy: StrategyStage,
        financial: FinancialStage,
        synthesis: SynthesisStage,
    ) -> Self {
        Self {
            document,
            strategy,
            financial,
            synthesis,
            handoff: StrategyHandoff::default(),
        }
    }

    /// Production crew: every agent shares one generator
    pub fn from_generator(generator: Arc<dyn TextGenerator>, settings: &CrewSettings) -> Self {
        Self::new(
            Box::new(DocumentIntelligenceAgent::new(
                generator.clone(),
                settings.document.clone(),
                settings.max_document_chars,
            )),
            Box::new(BusinessStrategyAgent::new(
                generator.clone(),
                settings.strategy.clone(),
            )),
            Box::new(FinancialAnalystAgent::new(
                generator.clone(),
                settings.financial.clone(),
            )),
            Box::new(ExecutiveOrchestratorAgent::new(
                generator,
                settings.synthesis.clone(),
            )),
        )
        .with_handoff(settings.handoff)
    }

    pub fn with_handoff(mut self, handoff: StrategyHandoff) -> Self {
        self.handoff = handoff;
        self
    }

    /// Agent display names in run order
    pub fn roster(&self) -> [&'static str; 4] {
        [
            self.document.profile().name,
            self.strategy.profile().name,
            self.financial.profile().name,
            self.synthesis.profile().name,
        ]
    }

    /// Run the whole pipeline under a wall-clock deadline
    pub async fn run_with_deadline(
        &self,
        profile: OrganizationProfile,
        deadline: Duration,
    ) -> Result<CrewAnalysisResult> {
        match tokio::time::timeout(deadline, self.run(profile)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(deadline_secs = deadline.as_secs(), "Pipeline deadline exceeded, aborting run");
                Err(PipelineError::DeadlineExceeded(deadline.as_secs()))
            }
        }
    }

    /// Run the pipeline to completion or the first stage failure
    pub async fn run(&self, profile: OrganizationProfile) -> Result<CrewAnalysisResult> {
        let span = tracing::info_span!(
            "crew_run",
            run_id = %Uuid::new_v4(),
            company = %profile.company_name,
        );

        self.run_stages(profile).instrument(span).await
    }

    async fn run_stages(&self, profile: OrganizationProfile) -> Result<CrewAnalysisResult> {
        let start = Instant::now();
        let mut context = AgentContext::new(profile);

        info!(
            roster = ?self.roster(),
            handoff = ?self.handoff,
            has_document = context.profile().document_text().is_some(),
            "Crew: starting run"
        );

        // === DOCUMENT ===
        let document = self
            .document
            .execute(&context.document_input())
            .await
            .map_err(|e| e.in_stage("document"))?;
        context.record_document(document);
        context.advance(PipelineStage::DocumentDone);

        // === ANALYSIS ===
        match self.handoff {
            StrategyHandoff::Concurrent => {
                let strategy_input = context.strategy_input()?;
                let financial_input = context.financial_input()?;

                let (strategy, financial) = tokio::try_join!(
                    self.run_strategy(&strategy_input),
                    self.run_financial(&financial_input),
                )?;

                context.record_strategy(strategy);
                context.record_financial(financial);
            }
            StrategyHandoff::Sequential => {
                let strategy = self.run_strategy(&context.strategy_input()?).await?;
                context.record_strategy(strategy);

                let financial = self.run_financial(&context.financial_input()?).await?;
                context.record_financial(financial);
            }
        }
        context.advance(PipelineStage::AnalysisDone);

        // === SYNTHESIS ===
        let synthesis = self
            .synthesis
            .execute(&context.synthesis_input()?)
            .await
            .map_err(|e| e.in_stage("synthesis"))?;
        context.advance(PipelineStage::Synthesized);

        info!(
            outputs = ?context.output_names(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Crew: run complete"
        );

        context.finish(synthesis)
    }

    async fn run_strategy(&self, input: &StrategyInput) -> Result<StrategyOutput> {
        self.strategy
            .execute(input)
            .await
            .map_err(|e| e.in_stage("strategy"))
    }

    async fn run_financial(&self, input: &FinancialInput) -> Result<FinancialOutput> {
        self.financial
            .execute(input)
            .await
            .map_err(|e| e.in_stage("financial"))
    }
}

/// Agent display names, for callers that label outputs
pub const AGENT_NAMES: [&str; 4] = [
    agents::document::PROFILE.name,
    agents::strategy::PROFILE.name,
    agents::financial::PROFILE.name,
    agents::executive::PROFILE.name,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::profile;
    use crate::agents::AgentProfile;
    use crate::error::ServiceErrorKind;
    use crate::generation::{MockGenerator, RetryPolicy};
    use crate::models::AgentOutput;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DOCUMENT_JSON: &str = r#"{"confidence": 0.8, "structuredData": {"keyFindings": ["Quotes take 3 days"]}}"#;
    const STRATEGY_JSON: &str = r#"{"confidence": 0.7, "structuredData": {"cognitiveNodes": [
        {"name": "Rate lookup", "automationPotential": 90},
        {"name": "Carrier negotiation", "automationPotential": 40}]}}"#;
    const FINANCIAL_JSON: &str = r#"{"confidence": 0.6, "structuredData": {"useCases": [{"title": "Quote drafting", "horizon": "H1"}]}}"#;
    const SYNTHESIS_JSON: &str = r#"{"executiveSummary": "Start with quoting.", "recommendations": ["Pilot"], "riskAssessment": "Moderate"}"#;

    fn scripted() -> MockGenerator {
        MockGenerator::new()
            .respond_to(agents::document::PROFILE.name, DOCUMENT_JSON)
            .respond_to(agents::strategy::PROFILE.name, STRATEGY_JSON)
            .respond_to(agents::financial::PROFILE.name, FINANCIAL_JSON)
            .respond_to(agents::executive::PROFILE.name, SYNTHESIS_JSON)
    }

    fn no_retry_settings() -> CrewSettings {
        let mut settings = CrewSettings::default();
        for stage in [
            &mut settings.document,
            &mut settings.strategy,
            &mut settings.financial,
            &mut settings.synthesis,
        ] {
            stage.retry = RetryPolicy::none();
        }
        settings
    }

    #[tokio::test]
    async fn test_full_run_concurrent() {
        let generator = Arc::new(scripted());
        let crew = Crew::from_generator(generator.clone(), &no_retry_settings());

        let result = crew.run(profile(Some("Ops review text"))).await.unwrap();

        assert_eq!(result.document.agent_name, agents::document::PROFILE.name);
        assert_eq!(result.strategy.structured_data.cognitive_nodes.len(), 2);
        assert_eq!(result.financial.structured_data.use_cases[0].title, "Quote drafting");
        assert_eq!(result.synthesis.executive_summary, "Start with quoting.");
        assert_eq!(generator.call_count(), 4);

        // Concurrent handoff: financial ran without strategy context
        let financial_prompt = &generator.calls_for(agents::financial::PROFILE.name)[0].user_prompt;
        assert!(!financial_prompt.contains("Rate lookup"));
        assert!(financial_prompt.contains("Quotes take 3 days"));
    }

    #[tokio::test]
    async fn test_sequential_handoff_feeds_strategy_to_financial() {
        let generator = Arc::new(scripted());
        let mut settings = no_retry_settings();
        settings.handoff = StrategyHandoff::Sequential;
        let crew = Crew::from_generator(generator.clone(), &settings);

        crew.run(profile(Some("Ops review text"))).await.unwrap();

        let financial_prompt = &generator.calls_for(agents::financial::PROFILE.name)[0].user_prompt;
        assert!(financial_prompt.contains("Rate lookup"));
        assert!(financial_prompt.contains("Carrier negotiation"));
    }

    #[tokio::test]
    async fn test_run_without_document_skips_document_generation() {
        let generator = Arc::new(scripted());
        let crew = Crew::from_generator(generator.clone(), &no_retry_settings());

        let result = crew.run(profile(None)).await.unwrap();

        assert_eq!(result.document.confidence, 0.0);
        assert!(generator.calls_for(agents::document::PROFILE.name).is_empty());
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_document_failure_aborts_before_analysis() {
        let generator = Arc::new(
            MockGenerator::new()
                .fail_for(agents::document::PROFILE.name, ServiceErrorKind::Permanent, "403")
                .respond_to(agents::strategy::PROFILE.name, STRATEGY_JSON)
                .respond_to(agents::financial::PROFILE.name, FINANCIAL_JSON),
        );
        let crew = Crew::from_generator(generator.clone(), &no_retry_settings());

        let err = crew.run(profile(Some("text"))).await.unwrap_err();

        assert!(matches!(err, PipelineError::Stage { stage: "document", .. }));
        assert!(generator.calls_for(agents::strategy::PROFILE.name).is_empty());
    }

    /// Strategy stand-in that always fails
    struct FailingStrategy;

    #[async_trait]
    impl Agent for FailingStrategy {
        type Input = StrategyInput;
        type Output = StrategyOutput;

        fn profile(&self) -> &AgentProfile {
            &agents::strategy::PROFILE
        }

        async fn execute(&self, _input: &StrategyInput) -> Result<StrategyOutput> {
            // Let the financial stage finish first
            tokio::task::yield_now().await;
            Err(PipelineError::permanent("strategy model rejected the request"))
        }
    }

    /// Financial stand-in that succeeds and counts its runs
    struct CountingFinancial(Arc<AtomicUsize>);

    #[async_trait]
    impl Agent for CountingFinancial {
        type Input = FinancialInput;
        type Output = FinancialOutput;

        fn profile(&self) -> &AgentProfile {
            &agents::financial::PROFILE
        }

        async fn execute(&self, _input: &FinancialInput) -> Result<FinancialOutput> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(AgentOutput::default().attributed_to(agents::financial::PROFILE.name))
        }
    }

    fn crew_with_failing_strategy(
        generator: Arc<MockGenerator>,
        financial_runs: Arc<AtomicUsize>,
    ) -> Crew {
        let settings = no_retry_settings();
        Crew::new(
            Box::new(DocumentIntelligenceAgent::new(
                generator.clone(),
                settings.document.clone(),
                settings.max_document_chars,
            )),
            Box::new(FailingStrategy),
            Box::new(CountingFinancial(financial_runs)),
            Box::new(ExecutiveOrchestratorAgent::new(
                generator,
                settings.synthesis.clone(),
            )),
        )
    }

    #[tokio::test]
    async fn test_strategy_failure_aborts_even_when_financial_succeeds() {
        let generator = Arc::new(scripted());
        let financial_runs = Arc::new(AtomicUsize::new(0));
        let crew = crew_with_failing_strategy(generator.clone(), financial_runs.clone());

        let err = crew.run(profile(Some("text"))).await.unwrap_err();

        assert!(matches!(err, PipelineError::Stage { stage: "strategy", .. }));
        assert!(!err.is_retryable());
        assert_eq!(financial_runs.load(Ordering::SeqCst), 1);
        assert!(generator.calls_for(agents::executive::PROFILE.name).is_empty());
    }

    #[tokio::test]
    async fn test_synthesis_failure_aborts_run() {
        let generator = Arc::new(
            MockGenerator::new()
                .respond_to(agents::document::PROFILE.name, DOCUMENT_JSON)
                .respond_to(agents::strategy::PROFILE.name, STRATEGY_JSON)
                .respond_to(agents::financial::PROFILE.name, FINANCIAL_JSON)
                .respond_to(agents::executive::PROFILE.name, "Summary: all good"),
        );
        let crew = Crew::from_generator(generator, &no_retry_settings());

        let err = crew.run(profile(Some("text"))).await.unwrap_err();
        assert!(matches!(
            err.root(),
            PipelineError::RecoveryExhausted { .. }
        ));
    }

    /// Document stand-in that never finishes in time
    struct SlowDocument;

    #[async_trait]
    impl Agent for SlowDocument {
        type Input = DocumentInput;
        type Output = DocumentOutput;

        fn profile(&self) -> &AgentProfile {
            &agents::document::PROFILE
        }

        async fn execute(&self, _input: &DocumentInput) -> Result<DocumentOutput> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(DocumentIntelligenceAgent::no_document())
        }
    }

    #[tokio::test]
    async fn test_deadline_aborts_run() {
        let generator: Arc<dyn TextGenerator> = Arc::new(scripted());
        let settings = no_retry_settings();
        let crew = Crew::new(
            Box::new(SlowDocument),
            Box::new(BusinessStrategyAgent::new(generator.clone(), settings.strategy.clone())),
            Box::new(FinancialAnalystAgent::new(generator.clone(), settings.financial.clone())),
            Box::new(ExecutiveOrchestratorAgent::new(generator, settings.synthesis.clone())),
        );

        let err = crew
            .run_with_deadline(profile(None), Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::DeadlineExceeded(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_roster_is_run_order() {
        let crew = Crew::from_generator(Arc::new(MockGenerator::new()), &CrewSettings::default());
        assert_eq!(crew.roster(), AGENT_NAMES);
    }
}
