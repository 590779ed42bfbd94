use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use transformation_crew::{
    agents,
    config::{PipelineConfig, StrategyHandoff},
    crew::Crew,
    fusion::normalize,
    generation::{GeminiClient, MockGenerator, RetryPolicy, TextGenerator},
    models::OrganizationProfile,
};

/// Run one transformation analysis and print the fused result as JSON
#[derive(Parser, Debug)]
#[command(name = "crew")]
#[command(version)]
struct Args {
    /// Organization profile as a JSON file (camelCase fields)
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Plain-text document to analyse alongside the profile
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Use canned agent replies instead of the Gemini API
    #[arg(long, action = clap::ArgAction::SetTrue)]
    offline: bool,

    /// Feed the strategy output into the financial agent
    #[arg(long, action = clap::ArgAction::SetTrue)]
    sequential: bool,

    /// Overrides PIPELINE_TIMEOUT_SECS
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = PipelineConfig::from_env()?;

    if args.sequential {
        config.crew.handoff = StrategyHandoff::Sequential;
    }
    if let Some(secs) = args.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }

    let mut profile = match &args.profile {
        Some(path) => serde_json::from_str::<OrganizationProfile>(&std::fs::read_to_string(path)?)?,
        None => demo_profile(),
    };
    if let Some(path) = &args.document {
        profile.document_content = Some(std::fs::read_to_string(path)?);
        profile.document_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
    }

    let generator: Arc<dyn TextGenerator> = if args.offline {
        for stage in [
            &mut config.crew.document,
            &mut config.crew.strategy,
            &mut config.crew.financial,
            &mut config.crew.synthesis,
        ] {
            stage.retry = RetryPolicy::none();
        }
        Arc::new(offline_generator())
    } else {
        Arc::new(GeminiClient::new(
            config.require_api_key()?.to_string(),
            config.gemini_model.clone(),
            config.gemini_base_url.clone(),
        )?)
    };

    info!(
        company = %profile.company_name,
        offline = args.offline,
        handoff = ?config.crew.handoff,
        timeout_secs = config.timeout.as_secs(),
        "Starting transformation analysis"
    );

    let crew = Crew::from_generator(generator, &config.crew);
    let result = crew.run_with_deadline(profile, config.timeout).await?;
    let fused = normalize(&result);

    info!(fingerprint = %fused.fingerprint(), "Analysis complete");
    println!("{}", serde_json::to_string_pretty(&fused)?);

    Ok(())
}

fn demo_profile() -> OrganizationProfile {
    OrganizationProfile {
        company_name: "Northwind Logistics".to_string(),
        industry: "Freight forwarding".to_string(),
        goal: "Cut quote turnaround from days to hours".to_string(),
        pain_points: "Manual rate lookups and long email threads with carriers".to_string(),
        data_landscape: "ERP, carrier rate spreadsheets, shared inbox".to_string(),
        document_content: None,
        document_name: None,
    }
}

const OFFLINE_DOCUMENT: &str = r#"{
  "confidence": 0.75,
  "reasoning": "Operations review covers quoting and dispatch",
  "insights": ["Quoting dominates back-office effort"],
  "structuredData": {
    "keyFindings": ["Quotes take 3.2 days on average"],
    "relevantMetrics": [{"name": "Quote turnaround", "value": "3.2 days", "context": "FY24 average"}],
    "riskFactors": ["Carrier rates change weekly"],
    "opportunities": ["Automate rate lookups"]
  }
}"#;

const OFFLINE_STRATEGY: &str = r#"{
  "confidence": 0.7,
  "insights": ["Rate lookup is rules-based and data-ready"],
  "structuredData": {
    "cognitiveNodes": [
      {"name": "Rate lookup", "humanLoad": "low", "dataReadiness": "high", "pattern": "Tool Use", "automationPotential": 85},
      {"name": "Quote drafting", "humanLoad": "medium", "dataReadiness": "medium", "automationPotential": 60},
      {"name": "Carrier negotiation", "humanLoad": "high", "dataReadiness": "low", "automationPotential": 20}
    ],
    "epochFilter": {"empathy": ["Key account calls"], "opinion": ["Carrier selection for new lanes"]},
    "jaggedFrontier": ["Exception handling on damaged freight"]
  }
}"#;

const OFFLINE_FINANCIAL: &str = r#"{
  "confidence": 0.65,
  "structuredData": {
    "useCases": [
      {"title": "Automated rate lookup", "horizon": "H1", "currentCost": 180000, "projectedCost": 60000, "implementationCost": 45000, "trustTaxPercent": 12},
      {"title": "Quote drafting assistant", "horizon": "H2", "currentCost": 120000, "projectedCost": 70000, "implementationCost": 60000, "trustTaxPercent": 20},
      {"title": "Lane planning", "horizon": "H3", "currentCost": 90000, "projectedCost": 75000, "implementationCost": 80000}
    ],
    "trustTaxBreakdown": {"verificationOverhead": 8, "errorCorrection": 4, "complianceReview": 3, "changeManagement": 5}
  }
}"#;

const OFFLINE_SYNTHESIS: &str = r#"{
  "executiveSummary": "Automate rate lookups first; they are data-ready and pay back within a year.",
  "recommendations": ["Pilot automated rate lookup on top ten lanes", "Keep carrier negotiation human-led"],
  "riskAssessment": "Moderate: carrier data quality drives accuracy"
}"#;

fn offline_generator() -> MockGenerator {
    MockGenerator::new()
        .respond_to(agents::document::PROFILE.name, OFFLINE_DOCUMENT)
        .respond_to(agents::strategy::PROFILE.name, OFFLINE_STRATEGY)
        .respond_to(agents::financial::PROFILE.name, OFFLINE_FINANCIAL)
        .respond_to(agents::executive::PROFILE.name, OFFLINE_SYNTHESIS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_flags() {
        let args = Args::parse_from([
            "crew",
            "--profile",
            "acme.json",
            "--offline",
            "--sequential",
            "--timeout-secs",
            "30",
        ]);

        assert_eq!(args.profile, Some(PathBuf::from("acme.json")));
        assert!(args.offline);
        assert!(args.sequential);
        assert_eq!(args.timeout_secs, Some(30));
        assert!(args.document.is_none());
    }

    #[tokio::test]
    async fn test_offline_run_produces_fused_result() {
        let crew = Crew::from_generator(Arc::new(offline_generator()), &Default::default());
        let mut profile = demo_profile();
        profile.document_content = Some("Ops review".to_string());

        let fused = normalize(&crew.run(profile).await.unwrap());

        assert_eq!(fused.cognitive_nodes.len(), 3);
        assert_eq!(fused.use_cases.len(), 3);
        assert_eq!(fused.use_cases[0].annual_savings, 120000.0);
        assert!(fused.cognitive_nodes.iter().all(|n| n.evidence.is_some()));
    }
}
