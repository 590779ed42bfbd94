//! Evidence back-fill
//!
//! Items without a citation borrow one from the document agent's output.
//! The n-th uncited item gets `pool[n % pool.len()]`, so the assignment is
//! deterministic and every cited string is verbatim document-agent text.

use crate::models::DocumentIntelligenceData;
use serde::{Deserialize, Serialize};

/// Where an item's citation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceSource {
    /// Supplied by the agent that produced the item
    Agent,
    /// Back-filled from the document pool
    Document,
    None,
}

pub struct EvidencePool {
    entries: Vec<String>,
    next: usize,
}

impl EvidencePool {
    /// Findings first, then opportunities
    pub fn for_nodes(document: &DocumentIntelligenceData) -> Self {
        let entries = document
            .key_findings
            .iter()
            .chain(document.opportunities.iter())
            .cloned()
            .collect();
        Self::new(entries)
    }

    /// Metrics first, then findings
    pub fn for_use_cases(document: &DocumentIntelligenceData) -> Self {
        let entries = document
            .relevant_metrics
            .iter()
            .map(|metric| metric.to_string())
            .chain(document.key_findings.iter().cloned())
            .collect();
        Self::new(entries)
    }

    fn new(entries: Vec<String>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .filter(|entry| !entry.trim().is_empty())
                .collect(),
            next: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep an existing citation or draw the next one from the pool
    pub fn cite(&mut self, existing: Option<&str>) -> (Option<String>, EvidenceSource) {
        if let Some(citation) = existing.map(str::trim).filter(|c| !c.is_empty()) {
            return (Some(citation.to_string()), EvidenceSource::Agent);
        }

        if self.entries.is_empty() {
            return (None, EvidenceSource::None);
        }

        let citation = self.entries[self.next % self.entries.len()].clone();
        self.next += 1;
        (Some(citation), EvidenceSource::Document)
    }
}
