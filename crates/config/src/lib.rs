//! Configuration loading, validation, and management for assistline.
//!
//! Loads configuration from `~/.assistline/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use assistline_core::ConfidenceAggregation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.assistline/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Assist orchestration settings
    #[serde(default)]
    pub assist: AssistConfig,

    /// PII/PHI redaction settings
    #[serde(default)]
    pub redaction: RedactionConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Contact-center webhook settings
    #[serde(default)]
    pub contact_center: ContactCenterConfig,

    /// Text generation backend
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Intent detection backend
    #[serde(default)]
    pub intent: IntentConfig,

    /// CRM backend
    #[serde(default)]
    pub crm: CrmConfig,

    /// Audit recording
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistConfig {
    /// Number of most recent messages handed to the capabilities.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Deadline applied when a request names none.
    #[serde(default = "default_deadline_ms")]
    pub default_deadline_ms: u64,

    /// Upper bound for caller-supplied deadlines.
    #[serde(default = "default_max_deadline_ms")]
    pub max_deadline_ms: u64,

    #[serde(default)]
    pub confidence: ConfidenceAggregation,
}

fn default_history_window() -> usize {
    10
}
fn default_deadline_ms() -> u64 {
    3000
}
fn default_max_deadline_ms() -> u64 {
    30_000
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            default_deadline_ms: default_deadline_ms(),
            max_deadline_ms: default_max_deadline_ms(),
            confidence: ConfidenceAggregation::default(),
        }
    }
}

impl AssistConfig {
    /// Resolve a requested deadline, falling back to the default and
    /// clamping to the configured maximum.
    pub fn effective_deadline_ms(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_deadline_ms)
            .min(self.max_deadline_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Operator-defined categories, applied after the built-ins in order.
    #[serde(default)]
    pub custom_categories: Vec<CustomCategoryConfig>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            custom_categories: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomCategoryConfig {
    pub name: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Allowed CORS origins. Empty means same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            body_limit_bytes: default_body_limit(),
            cors_origins: vec![],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ContactCenterConfig {
    /// Shared secret for webhook signatures. `None` skips verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,

    #[serde(default = "default_signature_header")]
    pub signature_header: String,
}

fn default_signature_header() -> String {
    "X-Contact-Center-Signature".into()
}

impl Default for ContactCenterConfig {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            signature_header: default_signature_header(),
        }
    }
}

impl std::fmt::Debug for ContactCenterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactCenterConfig")
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("signature_header", &self.signature_header)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// `openai` (any OpenAI-compatible endpoint) or `static`.
    #[serde(default = "default_generator_provider")]
    pub provider: String,

    #[serde(default = "default_generator_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Text returned by the `static` provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_text: Option<String>,
}

fn default_generator_provider() -> String {
    "openai".into()
}
fn default_generator_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    512
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_generator_provider(),
            api_url: default_generator_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            static_text: None,
        }
    }
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("static_text", &self.static_text.as_ref().map(|t| t.len()))
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_language_code")]
    pub language_code: String,
}

fn default_language_code() -> String {
    "en-US".into()
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key: None,
            language_code: default_language_code(),
        }
    }
}

impl std::fmt::Debug for IntentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentConfig")
            .field("enabled", &self.enabled)
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("language_code", &self.language_code)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    /// `memory` or `rest`.
    #[serde(default = "default_crm_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_crm_provider() -> String {
    "memory".into()
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            provider: default_crm_provider(),
            endpoint: None,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmConfig")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Forward entries to `tracing` as `AUDIT` events.
    #[serde(default = "default_true")]
    pub tracing_sink: bool,

    #[serde(default = "default_audit_capacity")]
    pub capacity: usize,
}

fn default_audit_capacity() -> usize {
    10_000
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tracing_sink: true,
            capacity: default_audit_capacity(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.assistline/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `ASSISTLINE_API_KEY`, `ASSISTLINE_MODEL`
    /// - `ASSISTLINE_WEBHOOK_SECRET`
    /// - `ASSISTLINE_CRM_PROVIDER`
    /// - `ASSISTLINE_REDACTION` (`true`/`false`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_dir().join("config.toml"))
    }

    /// Load configuration from a specific file path, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ASSISTLINE_API_KEY") {
            self.generator.api_key = Some(key);
        }
        if let Some(model) = lookup("ASSISTLINE_MODEL") {
            self.generator.model = model;
        }
        if let Some(secret) = lookup("ASSISTLINE_WEBHOOK_SECRET") {
            self.contact_center.webhook_secret = Some(secret);
        }
        if let Some(provider) = lookup("ASSISTLINE_CRM_PROVIDER") {
            self.crm.provider = provider;
        }
        if let Some(flag) = lookup("ASSISTLINE_REDACTION") {
            self.redaction.enabled = match flag.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "ASSISTLINE_REDACTION must be true or false, got '{other}'"
                    )));
                }
            };
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".assistline")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assist.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "assist.history_window must be at least 1".into(),
            ));
        }

        if self.assist.default_deadline_ms == 0 {
            return Err(ConfigError::ValidationError(
                "assist.default_deadline_ms must be > 0".into(),
            ));
        }

        if self.assist.max_deadline_ms < self.assist.default_deadline_ms {
            return Err(ConfigError::ValidationError(
                "assist.max_deadline_ms must be >= assist.default_deadline_ms".into(),
            ));
        }

        if let ConfidenceAggregation::Weighted {
            smart_replies,
            knowledge,
        } = self.assist.confidence
            && (smart_replies < 0.0 || knowledge < 0.0 || smart_replies + knowledge <= 0.0)
        {
            return Err(ConfigError::ValidationError(
                "confidence weights must be non-negative and sum to > 0".into(),
            ));
        }

        if self.generator.temperature < 0.0 || self.generator.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "generator.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.intent.enabled && self.intent.endpoint.is_none() {
            return Err(ConfigError::ValidationError(
                "intent.endpoint is required when intent detection is enabled".into(),
            ));
        }

        if self.crm.provider == "rest" && self.crm.endpoint.is_none() {
            return Err(ConfigError::ValidationError(
                "crm.endpoint is required for the rest CRM provider".into(),
            ));
        }

        if self.audit.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "audit.capacity must be at least 1".into(),
            ));
        }

        if self.contact_center.signature_header.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "contact_center.signature_header must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if a generator API key is available.
    pub fn has_api_key(&self) -> bool {
        self.generator.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for assistline_core::Error {
    fn from(err: ConfigError) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}
