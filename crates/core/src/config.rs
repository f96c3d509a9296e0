use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub triage: TriageSettings,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `ORTHO_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("ORTHO_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
            ollama: OllamaConfig::from_env_profiled(p),
            triage: TriageSettings::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:  {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  llm:     provider={}, configured={}",
            self.llm.provider,
            self.llm.is_configured()
        );
        tracing::info!("  ollama:  url={}", self.ollama.url);
        tracing::info!(
            "  triage:  policy={}, llm_fallback={}, timeout={}s",
            self.triage
                .policy_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built-in)".into()),
            self.triage.llm_fallback_enabled,
            self.triage.external_timeout_secs
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 8000),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── LLM (Groq / OpenAI / Anthropic) ──────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "groq", "openai", "anthropic", "ollama"
    pub provider: String,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub groq_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "groq"),
            groq_api_key: profiled_env_opt(p, "GROQ_API_KEY"),
            groq_model: profiled_env_or(p, "GROQ_MODEL", "llama-3.1-8b-instant"),
            groq_base_url: profiled_env_or(p, "GROQ_BASE_URL", "https://api.groq.com/openai"),
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_model: profiled_env_or(p, "OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: profiled_env_opt(p, "OPENAI_BASE_URL"),
            anthropic_api_key: profiled_env_opt(p, "ANTHROPIC_API_KEY"),
            anthropic_model: profiled_env_or(p, "ANTHROPIC_MODEL", "claude-sonnet-4-5-20250929"),
            temperature: profiled_env_or(p, "LLM_TEMPERATURE", "0.1")
                .parse()
                .unwrap_or(0.1),
            max_tokens: profiled_env_u32(p, "LLM_MAX_TOKENS", 512),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "groq" => self.groq_api_key.is_some(),
            "openai" => self.openai_api_key.is_some(),
            "anthropic" | "claude" => self.anthropic_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            model: profiled_env_or(p, "OLLAMA_MODEL", "llama3.1"),
        }
    }
}

// ── Triage engine ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageSettings {
    /// YAML policy document; built-in policy when absent.
    pub policy_path: Option<PathBuf>,
    /// Consult the external assessment when rule confidence is low.
    pub llm_fallback_enabled: bool,
    /// Upper bound on one external assessment call.
    pub external_timeout_secs: u64,
}

impl TriageSettings {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            policy_path: profiled_env_opt(p, "TRIAGE_POLICY_PATH").map(PathBuf::from),
            llm_fallback_enabled: profiled_env_bool(p, "TRIAGE_LLM_FALLBACK", true),
            external_timeout_secs: profiled_env_u64(p, "TRIAGE_EXTERNAL_TIMEOUT_SECS", 10),
        }
    }
}

impl Default for TriageSettings {
    fn default() -> Self {
        Self {
            policy_path: None,
            llm_fallback_enabled: true,
            external_timeout_secs: 10,
        }
    }
}
