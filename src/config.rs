use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::event::DEFAULT_BUS_CAPACITY;
use crate::llm::{MockProvider, OpenAiConfig, OpenAiProvider, Provider};

pub const DEFAULT_CONFIG_FILE: &str = ".mark.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub ui: UiConfig,

    // This field is not serialized, just used at runtime
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Mock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            seed: Some(1),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
        }
    }
}

fn default_bus_capacity() -> usize {
    DEFAULT_BUS_CAPACITY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    /// Width of the context list, as a percentage of the terminal
    #[serde(default = "default_sidebar_percent")]
    pub sidebar_percent: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            sidebar_percent: default_sidebar_percent(),
        }
    }
}

fn default_sidebar_percent() -> u16 {
    30
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, falling back to defaults when it does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bus.capacity == 0 {
            anyhow::bail!("bus.capacity must be at least 1");
        }
        if !(10..=90).contains(&self.ui.sidebar_percent) {
            anyhow::bail!(
                "ui.sidebar_percent must be between 10 and 90, got {}",
                self.ui.sidebar_percent
            );
        }
        Ok(())
    }
}

impl ProviderConfig {
    /// Build the configured provider, reading the API key from the environment
    pub fn build(&self) -> anyhow::Result<Arc<dyn Provider>> {
        self.build_with(|name| std::env::var(name).ok())
    }

    /// Like [`build`](Self::build), with an explicit variable lookup
    pub fn build_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Arc<dyn Provider>> {
        match self.kind {
            ProviderKind::Mock => Ok(Arc::new(MockProvider::echo())),
            ProviderKind::OpenAi => {
                let api_key = lookup(&self.api_key_env)
                    .filter(|key| !key.is_empty())
                    .with_context(|| {
                        format!(
                            "{} is not set (or use provider.kind = \"mock\")",
                            self.api_key_env
                        )
                    })?;
                Ok(Arc::new(OpenAiProvider::new(OpenAiConfig {
                    api_key,
                    base_url: self.base_url.clone(),
                    model: self.model.clone(),
                    seed: self.seed,
                })))
            }
        }
    }
}
