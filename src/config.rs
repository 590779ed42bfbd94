//! Pipeline configuration
//!
//! Loaded from the environment (and `.env` when present).

use crate::error::PipelineError;
use crate::generation::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::generation::RetryPolicy;
use crate::Result;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 90;
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_DOCUMENT_CHARS: usize = 30_000;

/// How the financial stage relates to the strategy stage.
///
/// Strategy output is a soft dependency of the financial analyst: it enriches
/// the prompt with cognitive nodes to cite, but the analyst runs without it.
/// The document stage, by contrast, is a hard dependency of both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StrategyHandoff {
    /// Strategy and financial run concurrently; financial sees no strategy output
    #[default]
    Concurrent,
    /// Financial waits for strategy and receives its output
    Sequential,
}

impl FromStr for StrategyHandoff {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "concurrent" | "parallel" => Ok(StrategyHandoff::Concurrent),
            "sequential" | "serial" => Ok(StrategyHandoff::Sequential),
            other => Err(PipelineError::Config(format!(
                "STRATEGY_HANDOFF must be 'concurrent' or 'sequential', got '{}'",
                other
            ))),
        }
    }
}

/// Token ceiling and retry ceiling for one agent's generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSettings {
    pub max_output_tokens: u32,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewSettings {
    pub document: StageSettings,
    pub strategy: StageSettings,
    pub financial: StageSettings,
    pub synthesis: StageSettings,
    /// Longest document excerpt sent to the document agent
    pub max_document_chars: usize,
    pub handoff: StrategyHandoff,
}

impl Default for CrewSettings {
    fn default() -> Self {
        Self {
            document: StageSettings {
                max_output_tokens: 4096,
                retry: RetryPolicy::light(),
            },
            strategy: StageSettings {
                max_output_tokens: 6144,
                retry: RetryPolicy::light(),
            },
            financial: StageSettings {
                max_output_tokens: 8192,
                retry: RetryPolicy::heavy(),
            },
            synthesis: StageSettings {
                max_output_tokens: 2048,
                retry: RetryPolicy::light(),
            },
            max_document_chars: DEFAULT_MAX_DOCUMENT_CHARS,
            handoff: StrategyHandoff::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Wall-clock deadline for one whole pipeline run
    pub timeout: Duration,
    pub port: u16,
    pub crew: CrewSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            port: DEFAULT_PORT,
            crew: CrewSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Load `.env` (if any) and read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.gemini_api_key = get("GEMINI_API_KEY");

        if let Some(model) = get("GEMINI_MODEL") {
            config.gemini_model = model;
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            config.gemini_base_url = url;
        }
        if let Some(secs) = get("PIPELINE_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse_number("PIPELINE_TIMEOUT_SECS", &secs)?);
        }
        if let Some(port) = get("PORT").or_else(|| get("API_PORT")) {
            config.port = parse_number("PORT", &port)?;
        }
        if let Some(chars) = get("MAX_DOCUMENT_CHARS") {
            config.crew.max_document_chars = parse_number("MAX_DOCUMENT_CHARS", &chars)?;
        }
        if let Some(handoff) = get("STRATEGY_HANDOFF") {
            config.crew.handoff = handoff.parse()?;
        }

        Ok(config)
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.gemini_api_key
            .as_deref()
            .ok_or_else(|| PipelineError::Config("GEMINI_API_KEY not set".to_string()))
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| PipelineError::Config(format!("{} must be a number, got '{}'", key, raw)))
}
