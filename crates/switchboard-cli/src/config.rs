use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use switchboard_core::providers::anthropic::AnthropicProvider;
use switchboard_core::providers::core_service::CoreServiceProvider;
use switchboard_core::providers::huggingface::HuggingFaceProvider;
use switchboard_core::providers::openai::OpenAiProvider;
use switchboard_core::providers::types::{ParseMode, Provider};
use switchboard_core::{InferenceRouter, SelectorPolicy};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwitchboardConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// What to do with an unrecognized provider selector
    #[serde(default)]
    pub on_unknown_provider: SelectorPolicy,
    /// How adapters treat success payloads they cannot parse
    #[serde(default)]
    pub parse_mode: ParseMode,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            on_unknown_provider: SelectorPolicy::default(),
            parse_mode: ParseMode::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub anthropic: AnthropicConfig,
    #[serde(default)]
    pub huggingface: HuggingFaceConfig,
    #[serde(default)]
    pub core: CoreConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_max_tokens")]
    pub max_tokens: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            max_tokens: default_openai_max_tokens(),
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_openai_max_tokens() -> u32 {
    1000
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    #[serde(default = "default_anthropic_model")]
    pub model: String,
    #[serde(default = "default_anthropic_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
            max_tokens: default_anthropic_max_tokens(),
        }
    }
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}
fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}
fn default_anthropic_max_tokens() -> u32 {
    1024
}

#[derive(Clone, Serialize, Deserialize)]
pub struct HuggingFaceConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_hf_base_url")]
    pub base_url: String,
    #[serde(default = "default_hf_model")]
    pub model: String,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_hf_base_url(),
            model: default_hf_model(),
        }
    }
}

impl std::fmt::Debug for HuggingFaceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

fn default_hf_base_url() -> String {
    "https://api-inference.huggingface.co".to_string()
}
fn default_hf_model() -> String {
    "mistralai/Mistral-7B-Instruct-v0.2".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// The internal core service needs no credential; the base URL is
    /// its whole configuration
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_core_model")]
    pub model: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            model: default_core_model(),
        }
    }
}

fn default_core_model() -> String {
    "core-default".to_string()
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "<unset>".to_string()
    } else {
        // Take chars, not bytes: slicing could split a multibyte key
        let head: String = secret.chars().take(4).collect();
        format!("{head}...")
    }
}

/// Default config directory (`~/.config/switchboard` on Linux)
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("switchboard")
}

impl SwitchboardConfig {
    /// Load from an explicit path, the default location, or built-in
    /// defaults when no file exists. Environment overrides are
    /// applied afterwards.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        let path = path
            .cloned()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment-style overrides. The lookup is injected so
    /// tests don't have to mutate the process environment.
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(key) = get("OPENAI_API_KEY") {
            self.providers.openai.api_key = key;
        }
        if let Some(key) = get("ANTHROPIC_API_KEY") {
            self.providers.anthropic.api_key = key;
        }
        // HF_TOKEN is the older alias; the explicit name wins
        if let Some(key) = get("HUGGINGFACE_API_KEY").or_else(|| get("HF_TOKEN")) {
            self.providers.huggingface.api_key = key;
        }
        if let Some(url) = get("CORE_URL") {
            self.providers.core.base_url = url;
        }
    }

    /// Build the inference router from this configuration
    pub fn build_router(&self) -> Result<Arc<InferenceRouter>> {
        let timeout = Duration::from_secs(self.router.timeout_secs);
        let parse_mode = self.router.parse_mode;

        let providers: Vec<Box<dyn Provider>> = vec![
            Box::new(OpenAiProvider::new(
                self.providers.openai.api_key.clone(),
                self.providers.openai.model.clone(),
                self.providers.openai.base_url.clone(),
                self.providers.openai.max_tokens,
                timeout,
                parse_mode,
            )),
            Box::new(AnthropicProvider::new(
                self.providers.anthropic.api_key.clone(),
                self.providers.anthropic.model.clone(),
                self.providers.anthropic.base_url.clone(),
                self.providers.anthropic.max_tokens,
                timeout,
                parse_mode,
            )),
            Box::new(HuggingFaceProvider::new(
                self.providers.huggingface.api_key.clone(),
                self.providers.huggingface.model.clone(),
                self.providers.huggingface.base_url.clone(),
                timeout,
                parse_mode,
            )),
            Box::new(CoreServiceProvider::new(
                self.providers.core.base_url.clone(),
                self.providers.core.model.clone(),
                timeout,
            )),
        ];

        let router = InferenceRouter::new(providers, self.router.default_provider.clone())
            .context("Failed to build inference router")?
            .with_policy(self.router.on_unknown_provider);

        Ok(Arc::new(router))
    }
}
