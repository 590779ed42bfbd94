//! Core data models for the transformation crew

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

//
// ================= Organization =================
//

/// Business attributes supplied by the caller for one analysis run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationProfile {
    pub company_name: String,
    pub industry: String,
    pub goal: String,
    pub pain_points: String,
    pub data_landscape: String,
    #[serde(default)]
    pub document_content: Option<String>,
    #[serde(default)]
    pub document_name: Option<String>,
}

impl OrganizationProfile {
    /// Uploaded document text, if any non-blank text was supplied
    pub fn document_text(&self) -> Option<&str> {
        self.document_content
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    pub fn document_label(&self) -> &str {
        self.document_name.as_deref().unwrap_or("uploaded document")
    }
}

//
// ================= Agent Output =================
//

/// Result contract every analytical agent satisfies
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct AgentOutput<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub agent_name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reasoning: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub insights: Vec<String>,
    #[serde(default, alias = "structured_data", deserialize_with = "null_as_default")]
    pub structured_data: T,
}

impl<T> AgentOutput<T> {
    /// Stamp the producing agent's display name and bound the confidence
    pub fn attributed_to(mut self, agent_name: &str) -> Self {
        self.agent_name = agent_name.to_string();
        self.confidence = clamp_unit(self.confidence);
        self
    }
}

//
// ================= Document Intelligence =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentIntelligenceData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub key_findings: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relevant_metrics: Vec<RelevantMetric>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub strategic_implications: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub risk_factors: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub opportunities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelevantMetric {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub value: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: String,
}

impl fmt::Display for RelevantMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)?;
        if !self.context.trim().is_empty() {
            write!(f, " ({})", self.context)?;
        }
        Ok(())
    }
}

//
// ================= Business Strategy =================
//

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoadLevel {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CognitiveNode {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, alias = "cognitiveLoad")]
    pub human_load: LoadLevel,
    #[serde(default, alias = "dataReadinessLoad")]
    pub data_readiness: LoadLevel,
    #[serde(default, alias = "agenticPattern", deserialize_with = "null_as_default")]
    pub pattern: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub automation_potential: f64,
    #[serde(default, alias = "documentEvidence", deserialize_with = "null_as_default")]
    pub evidence: Option<String>,
}

/// Tasks bucketed by the human capability that keeps them out of reach of automation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EpochFilter {
    #[serde(default, deserialize_with = "null_as_default")]
    pub empathy: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub presence: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub opinion: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub creativity: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessStrategyData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub cognitive_nodes: Vec<CognitiveNode>,
    #[serde(default, alias = "epoch", deserialize_with = "null_as_default")]
    pub epoch_filter: EpochFilter,
    #[serde(default, deserialize_with = "null_as_default")]
    pub jagged_frontier: Vec<String>,
}

//
// ================= Financial Analysis =================
//

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Horizon {
    #[default]
    H1,
    H2,
    H3,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::H1, Horizon::H2, Horizon::H3];

    /// Parse a horizon tag; anything unrecognized is H1
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim().to_ascii_uppercase();
        let rest = tag
            .strip_prefix("HORIZON")
            .or_else(|| tag.strip_prefix('H'))
            .unwrap_or(tag.as_str())
            .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | ':'));
        match rest {
            t if t.starts_with('2') => Horizon::H2,
            t if t.starts_with('3') => Horizon::H3,
            _ => Horizon::H1,
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Horizon::H1 => "H1",
            Horizon::H2 => "H2",
            Horizon::H3 => "H3",
        };
        write!(f, "{}", s)
    }
}

/// How the process runs today, as far as the analyst could tell
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyProcess {
    #[serde(default, deserialize_with = "null_as_default")]
    pub process_steps: Vec<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub manual_hours_per_week: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub error_rate_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub cycle_time_days: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bottlenecks: Vec<String>,
}

/// The proposed agent-assisted version of the process
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgenticTransformation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub agent_roles: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub human_checkpoints: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tools_required: Vec<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub projected_cycle_time_days: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub automation_level_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UseCase {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub horizon: Horizon,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub projected_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub implementation_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub trust_tax_percent: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cost_per_outcome: f64,
    #[serde(default, alias = "paybackPeriodMonths", deserialize_with = "lenient_f64")]
    pub payback_months: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub document_justification: Option<String>,
    #[serde(default, alias = "pattern", deserialize_with = "null_as_default")]
    pub agentic_pattern: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub legacy_process: Option<LegacyProcess>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub agentic_transformation: Option<AgenticTransformation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTotals {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub projected_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub implementation_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub annual_savings: f64,
}

/// Percent overheads that erode automation savings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrustTaxBreakdown {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub verification_overhead: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub error_correction: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub compliance_review: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub change_management: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub roi_percent: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub annual_savings: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub payback_months: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SensitivityTable {
    #[serde(default, deserialize_with = "null_as_default")]
    pub conservative: Scenario,
    #[serde(default, deserialize_with = "null_as_default")]
    pub base: Scenario,
    #[serde(default, deserialize_with = "null_as_default")]
    pub optimistic: Scenario,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialAnalysisData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub use_cases: Vec<UseCase>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub totals: FinancialTotals,
    #[serde(default, alias = "roi", deserialize_with = "lenient_f64")]
    pub roi_percent: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trust_tax_breakdown: TrustTaxBreakdown,
    #[serde(default, alias = "sensitivityAnalysis", deserialize_with = "null_as_default")]
    pub sensitivity: Option<SensitivityTable>,
}

//
// ================= Synthesis =================
//

/// Final narrative produced by the executive orchestrator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisOutput {
    pub executive_summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub risk_assessment: String,
}

//
// ================= Crew Result =================
//

pub type DocumentOutput = AgentOutput<DocumentIntelligenceData>;
pub type StrategyOutput = AgentOutput<BusinessStrategyData>;
pub type FinancialOutput = AgentOutput<FinancialAnalysisData>;

/// Terminal value of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrewAnalysisResult {
    pub document: DocumentOutput,
    pub strategy: StrategyOutput,
    pub financial: FinancialOutput,
    pub synthesis: SynthesisOutput,
}

//
// ================= Range Helpers =================
//

/// Clamp into `[lo, hi]`, mapping NaN and infinities to `lo`
pub fn clamp_range(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_finite() {
        value.clamp(lo, hi)
    } else {
        lo
    }
}

pub fn clamp_percent(value: f64) -> f64 {
    clamp_range(value, 0.0, 100.0)
}

pub fn clamp_unit(value: f64) -> f64 {
    clamp_range(value, 0.0, 1.0)
}

/// Non-negative and finite
pub fn clamp_non_negative(value: f64) -> f64 {
    clamp_range(value, 0.0, f64::MAX)
}

//
// ================= Lenient Decoding =================
//
// Generated JSON routinely carries nulls, numbers as strings ("45%", "$1,200")
// and labels in arbitrary case. A single bad field must not discard the
// whole document, so these decoders degrade to the field default.

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value).unwrap_or(0.0))
}

fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    })
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse().ok()
        }
        _ => None,
    }
}

impl<'de> Deserialize<'de> for LoadLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let label = value.as_str().unwrap_or_default().to_ascii_lowercase();
        Ok(if label.contains("high") {
            LoadLevel::High
        } else if label.contains("low") {
            LoadLevel::Low
        } else {
            LoadLevel::Medium
        })
    }
}

impl<'de> Deserialize<'de> for Horizon {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(tag) => Horizon::parse(&tag),
            Value::Number(n) => Horizon::parse(&n.to_string()),
            _ => Horizon::H1,
        })
    }
}
