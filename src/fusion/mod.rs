//! Result normalization
//!
//! Folds a `CrewAnalysisResult` into the flat, bounded `FusedResult` that
//! downstream consumers render. Normalization is pure: no I/O, no clock, no
//! randomness and no hash-ordered collections, so the same input always
//! serializes to the same bytes and carries the same fingerprint.

mod evidence;
mod patterns;

pub use evidence::{EvidencePool, EvidenceSource};
pub use patterns::{infer_pattern, resolve_pattern, AgenticPattern};

use crate::models::{
    clamp_non_negative, clamp_percent, clamp_unit, AgenticTransformation, CognitiveNode,
    CrewAnalysisResult, EpochFilter, FinancialTotals, Horizon, LegacyProcess, LoadLevel,
    RelevantMetric, Scenario, SensitivityTable, TrustTaxBreakdown, UseCase,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;

//
// ================= Fused Types =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FusedNode {
    pub name: String,
    pub description: String,
    pub human_load: LoadLevel,
    pub data_readiness: LoadLevel,
    pub pattern: String,
    pub pattern_inferred: bool,
    pub automation_potential: f64,
    pub evidence: Option<String>,
    pub evidence_source: EvidenceSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FusedUseCase {
    pub title: String,
    pub description: String,
    pub horizon: Horizon,
    pub current_cost: f64,
    pub projected_cost: f64,
    pub implementation_cost: f64,
    pub annual_savings: f64,
    pub trust_tax_percent: f64,
    pub cost_per_outcome: f64,
    pub payback_months: f64,
    pub document_justification: Option<String>,
    pub evidence_source: EvidenceSource,
    pub agentic_pattern: String,
    pub pattern_inferred: bool,
    pub legacy_process: Option<LegacyProcess>,
    pub agentic_transformation: Option<AgenticTransformation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HorizonBucket {
    pub horizon: Horizon,
    pub use_case_count: usize,
    pub annual_savings: f64,
    pub implementation_cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceSummary {
    pub document: f64,
    pub strategy: f64,
    pub financial: f64,
    /// Mean of the three agent confidences
    pub overall: f64,
}

/// Flat view of one completed analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FusedResult {
    pub executive_summary: String,
    pub recommendations: Vec<String>,
    pub risk_assessment: String,

    pub key_findings: Vec<String>,
    pub relevant_metrics: Vec<RelevantMetric>,
    pub strategic_implications: Vec<String>,
    pub risk_factors: Vec<String>,
    pub opportunities: Vec<String>,

    pub cognitive_nodes: Vec<FusedNode>,
    pub epoch_filter: EpochFilter,
    pub jagged_frontier: Vec<String>,

    pub use_cases: Vec<FusedUseCase>,
    /// Always H1, H2, H3 in that order
    pub horizons: Vec<HorizonBucket>,
    pub totals: FinancialTotals,
    pub roi_percent: f64,
    pub trust_tax_breakdown: TrustTaxBreakdown,
    pub sensitivity: Option<SensitivityTable>,

    pub insights: Vec<String>,
    pub confidence: ConfidenceSummary,
}

impl FusedResult {
    /// Hex SHA-256 of the serialized result
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();

        // Stream JSON directly into the hasher
        if serde_json::to_writer(&mut HashWriter(&mut hasher), self).is_err() {
            return String::new();
        }

        hex::encode(hasher.finalize())
    }

    pub fn horizon(&self, horizon: Horizon) -> Option<&HorizonBucket> {
        self.horizons.iter().find(|bucket| bucket.horizon == horizon)
    }
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

//
// ================= Normalization =================
//

pub fn normalize(result: &CrewAnalysisResult) -> FusedResult {
    let document = &result.document.structured_data;
    let strategy = &result.strategy.structured_data;
    let financial = &result.financial.structured_data;

    let mut node_pool = EvidencePool::for_nodes(document);
    let cognitive_nodes: Vec<FusedNode> = strategy
        .cognitive_nodes
        .iter()
        .map(|node| fuse_node(node, &mut node_pool))
        .collect();

    let mut use_case_pool = EvidencePool::for_use_cases(document);
    let use_cases: Vec<FusedUseCase> = financial
        .use_cases
        .iter()
        .map(|use_case| fuse_use_case(use_case, &mut use_case_pool))
        .collect();

    let horizons = aggregate_horizons(&use_cases);
    let totals = fuse_totals(&financial.totals, &use_cases);
    let roi_percent = fuse_roi(financial.roi_percent, &totals);

    let confidence = {
        let document = clamp_unit(result.document.confidence);
        let strategy = clamp_unit(result.strategy.confidence);
        let financial = clamp_unit(result.financial.confidence);
        ConfidenceSummary {
            document,
            strategy,
            financial,
            overall: (document + strategy + financial) / 3.0,
        }
    };

    let insights = result
        .document
        .insights
        .iter()
        .chain(result.strategy.insights.iter())
        .chain(result.financial.insights.iter())
        .filter(|insight| !insight.trim().is_empty())
        .cloned()
        .collect();

    FusedResult {
        executive_summary: result.synthesis.executive_summary.trim().to_string(),
        recommendations: non_blank(&result.synthesis.recommendations),
        risk_assessment: result.synthesis.risk_assessment.trim().to_string(),

        key_findings: non_blank(&document.key_findings),
        relevant_metrics: document.relevant_metrics.clone(),
        strategic_implications: non_blank(&document.strategic_implications),
        risk_factors: non_blank(&document.risk_factors),
        opportunities: non_blank(&document.opportunities),

        cognitive_nodes,
        epoch_filter: EpochFilter {
            empathy: non_blank(&strategy.epoch_filter.empathy),
            presence: non_blank(&strategy.epoch_filter.presence),
            opinion: non_blank(&strategy.epoch_filter.opinion),
            creativity: non_blank(&strategy.epoch_filter.creativity),
        },
        jagged_frontier: non_blank(&strategy.jagged_frontier),

        use_cases,
        horizons,
        totals,
        roi_percent,
        trust_tax_breakdown: TrustTaxBreakdown {
            verification_overhead: clamp_percent(financial.trust_tax_breakdown.verification_overhead),
            error_correction: clamp_percent(financial.trust_tax_breakdown.error_correction),
            compliance_review: clamp_percent(financial.trust_tax_breakdown.compliance_review),
            change_management: clamp_percent(financial.trust_tax_breakdown.change_management),
        },
        sensitivity: financial.sensitivity.as_ref().map(|table| SensitivityTable {
            conservative: fuse_scenario(&table.conservative),
            base: fuse_scenario(&table.base),
            optimistic: fuse_scenario(&table.optimistic),
        }),

        insights,
        confidence,
    }
}

fn fuse_node(node: &CognitiveNode, pool: &mut EvidencePool) -> FusedNode {
    let (pattern, pattern_inferred) = resolve_pattern(Some(node.pattern.as_str()), &node.name);
    let (evidence, evidence_source) = pool.cite(node.evidence.as_deref());

    FusedNode {
        name: node.name.trim().to_string(),
        description: node.description.trim().to_string(),
        human_load: node.human_load,
        data_readiness: node.data_readiness,
        pattern,
        pattern_inferred,
        automation_potential: clamp_percent(node.automation_potential),
        evidence,
        evidence_source,
    }
}

fn fuse_use_case(use_case: &UseCase, pool: &mut EvidencePool) -> FusedUseCase {
    let current_cost = clamp_non_negative(use_case.current_cost);
    let projected_cost = clamp_non_negative(use_case.projected_cost);
    let implementation_cost = clamp_non_negative(use_case.implementation_cost);
    let annual_savings = clamp_non_negative(current_cost - projected_cost);

    let mut payback_months = clamp_non_negative(use_case.payback_months);
    if payback_months == 0.0 && annual_savings > 0.0 && implementation_cost > 0.0 {
        // Subnormal savings underflow the monthly rate and divide by zero
        payback_months = clamp_non_negative(round_tenth(
            implementation_cost / (annual_savings / 12.0),
        ));
    }

    let (agentic_pattern, pattern_inferred) =
        resolve_pattern(use_case.agentic_pattern.as_deref(), &use_case.title);
    let (document_justification, evidence_source) =
        pool.cite(use_case.document_justification.as_deref());

    FusedUseCase {
        title: use_case.title.trim().to_string(),
        description: use_case.description.trim().to_string(),
        horizon: use_case.horizon,
        current_cost,
        projected_cost,
        implementation_cost,
        annual_savings,
        trust_tax_percent: clamp_percent(use_case.trust_tax_percent),
        cost_per_outcome: clamp_non_negative(use_case.cost_per_outcome),
        payback_months,
        document_justification,
        evidence_source,
        agentic_pattern,
        pattern_inferred,
        legacy_process: use_case.legacy_process.as_ref().map(fuse_legacy_process),
        agentic_transformation: use_case
            .agentic_transformation
            .as_ref()
            .map(fuse_transformation),
    }
}

fn fuse_legacy_process(process: &LegacyProcess) -> LegacyProcess {
    LegacyProcess {
        process_steps: non_blank(&process.process_steps),
        manual_hours_per_week: process.manual_hours_per_week.map(clamp_non_negative),
        error_rate_percent: process.error_rate_percent.map(clamp_percent),
        cycle_time_days: process.cycle_time_days.map(clamp_non_negative),
        bottlenecks: non_blank(&process.bottlenecks),
    }
}

fn fuse_transformation(transformation: &AgenticTransformation) -> AgenticTransformation {
    AgenticTransformation {
        agent_roles: non_blank(&transformation.agent_roles),
        human_checkpoints: non_blank(&transformation.human_checkpoints),
        tools_required: non_blank(&transformation.tools_required),
        projected_cycle_time_days: transformation
            .projected_cycle_time_days
            .map(clamp_non_negative),
        automation_level_percent: transformation.automation_level_percent.map(clamp_percent),
    }
}

fn aggregate_horizons(use_cases: &[FusedUseCase]) -> Vec<HorizonBucket> {
    Horizon::ALL
        .iter()
        .map(|&horizon| {
            let members = use_cases.iter().filter(|u| u.horizon == horizon);
            let (use_case_count, annual_savings, implementation_cost) = members.fold(
                (0, 0.0, 0.0),
                |(count, savings, cost), u| {
                    (count + 1, savings + u.annual_savings, cost + u.implementation_cost)
                },
            );
            HorizonBucket {
                horizon,
                use_case_count,
                annual_savings: clamp_non_negative(annual_savings),
                implementation_cost: clamp_non_negative(implementation_cost),
            }
        })
        .collect()
}

/// Reported totals win; zero or invalid fields are derived from the use cases
fn fuse_totals(reported: &FinancialTotals, use_cases: &[FusedUseCase]) -> FinancialTotals {
    // Sums of finite costs can still overflow to inf
    let sum = |field: fn(&FusedUseCase) -> f64| -> f64 {
        clamp_non_negative(use_cases.iter().map(field).sum())
    };
    let derived = FinancialTotals {
        current_cost: sum(|u| u.current_cost),
        projected_cost: sum(|u| u.projected_cost),
        implementation_cost: sum(|u| u.implementation_cost),
        annual_savings: sum(|u| u.annual_savings),
    };

    FinancialTotals {
        current_cost: or_derived(reported.current_cost, derived.current_cost),
        projected_cost: or_derived(reported.projected_cost, derived.projected_cost),
        implementation_cost: or_derived(reported.implementation_cost, derived.implementation_cost),
        annual_savings: or_derived(reported.annual_savings, derived.annual_savings),
    }
}

/// First-year ROI when the analyst did not report a usable figure
fn fuse_roi(reported: f64, totals: &FinancialTotals) -> f64 {
    if reported.is_finite() && reported != 0.0 {
        return reported;
    }
    if totals.implementation_cost <= 0.0 {
        return 0.0;
    }
    let roi = round_tenth(
        (totals.annual_savings - totals.implementation_cost) / totals.implementation_cost * 100.0,
    );
    if roi.is_finite() {
        roi
    } else {
        0.0
    }
}

fn fuse_scenario(scenario: &Scenario) -> Scenario {
    Scenario {
        roi_percent: if scenario.roi_percent.is_finite() {
            scenario.roi_percent
        } else {
            0.0
        },
        annual_savings: clamp_non_negative(scenario.annual_savings),
        payback_months: clamp_non_negative(scenario.payback_months),
    }
}

fn or_derived(reported: f64, derived: f64) -> f64 {
    let reported = clamp_non_negative(reported);
    if reported > 0.0 {
        reported
    } else {
        derived
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn non_blank(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
