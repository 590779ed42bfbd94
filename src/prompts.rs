//! System prompts and output contracts for the crew agents
//!
//! Wording is configuration; the pipeline only relies on each system prompt
//! naming its agent and on the JSON shapes requested here.

use crate::agents::AgentProfile;

const JSON_RULES: &str = r#"Rules:
- Return ONLY valid JSON
- No markdown fences, no explanation text
- Use empty arrays instead of omitting list fields"#;

pub const DOCUMENT_SHAPE: &str = r#"{
  "confidence": 0.0,
  "reasoning": "...",
  "insights": ["..."],
  "structuredData": {
    "keyFindings": ["verbatim quote from the document"],
    "relevantMetrics": [{ "name": "...", "value": "...", "context": "..." }],
    "strategicImplications": ["..."],
    "riskFactors": ["..."],
    "opportunities": ["..."]
  }
}"#;

pub const STRATEGY_SHAPE: &str = r#"{
  "confidence": 0.0,
  "reasoning": "...",
  "insights": ["..."],
  "structuredData": {
    "cognitiveNodes": [{
      "name": "...",
      "description": "...",
      "humanLoad": "high|medium|low",
      "dataReadiness": "high|medium|low",
      "pattern": "...",
      "automationPotential": 0,
      "evidence": "quote from the document findings, if any"
    }],
    "epochFilter": { "empathy": [], "presence": [], "opinion": [], "creativity": [] },
    "jaggedFrontier": ["task an agent can already do reliably"]
  }
}"#;

pub const FINANCIAL_SHAPE: &str = r#"{
  "confidence": 0.0,
  "reasoning": "...",
  "insights": ["..."],
  "structuredData": {
    "useCases": [{
      "title": "...",
      "description": "...",
      "horizon": "H1|H2|H3",
      "currentCost": 0,
      "projectedCost": 0,
      "implementationCost": 0,
      "trustTaxPercent": 0,
      "costPerOutcome": 0,
      "paybackMonths": 0,
      "documentJustification": "...",
      "agenticPattern": "...",
      "legacyProcess": { "processSteps": [], "manualHoursPerWeek": 0, "errorRatePercent": 0, "cycleTimeDays": 0, "bottlenecks": [] },
      "agenticTransformation": { "agentRoles": [], "humanCheckpoints": [], "toolsRequired": [], "projectedCycleTimeDays": 0, "automationLevelPercent": 0 }
    }],
    "totals": { "currentCost": 0, "projectedCost": 0, "implementationCost": 0, "annualSavings": 0 },
    "roiPercent": 0,
    "trustTaxBreakdown": { "verificationOverhead": 0, "errorCorrection": 0, "complianceReview": 0, "changeManagement": 0 },
    "sensitivity": {
      "conservative": { "roiPercent": 0, "annualSavings": 0, "paybackMonths": 0 },
      "base": { "roiPercent": 0, "annualSavings": 0, "paybackMonths": 0 },
      "optimistic": { "roiPercent": 0, "annualSavings": 0, "paybackMonths": 0 }
    }
  }
}"#;

pub const SYNTHESIS_SHAPE: &str = r#"{
  "executiveSummary": "...",
  "recommendations": ["..."],
  "riskAssessment": "..."
}"#;

/// Build an agent's system prompt from its profile and output contract
pub fn system_prompt(profile: &AgentProfile, shape: &str) -> String {
    format!(
        "You are the {}.\nRole: {}\nGoal: {}\n\nRespond with a single JSON object in exactly this format:\n\n{}\n\n{}",
        profile.name, profile.role, profile.goal, shape, JSON_RULES
    )
}

/// Render a titled bullet list, capped at `limit` items
pub fn bullet_section(title: &str, items: &[String], limit: usize) -> String {
    if items.is_empty() {
        return format!("{}:\n- none reported\n", title);
    }

    let mut out = format!("{}:\n", title);
    for item in items.iter().take(limit) {
        out.push_str("- ");
        out.push_str(item);
        out.push('\n');
    }
    out
}
