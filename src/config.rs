//! Configuração do verdict carregada a partir de `verdict.toml`.
//!
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `ANTHROPIC_API_KEY` e `OPENAI_API_KEY` têm
//! precedência sobre o arquivo.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::dispatcher::DispatcherConfig;
use crate::oracle::{Backoff, RetryPolicy};

/// Estratégia de espera entre tentativas de uma chamada ao juiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Configuração de nível superior carregada de `verdict.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerdictConfig {
    /// Chave da API Anthropic.
    #[serde(default)]
    pub api_key: String,

    /// Modelo usado como juiz.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Chave da API OpenAI. Sem ela, requisições com `llmType = "gpt"` falham.
    #[serde(default)]
    pub openai_api_key: String,

    /// Modelo OpenAI usado como juiz.
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Tentativas por chamada ao juiz, incluindo a primeira.
    #[serde(default = "default_attempt_budget")]
    pub attempt_budget: u32,

    #[serde(default = "default_backoff")]
    pub backoff: BackoffKind,

    /// Atraso base em milissegundos entre tentativas.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Número de workers concorrentes.
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Por quanto tempo jobs finalizados são mantidos antes do expurgo.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Limite superior para `repetitions` em uma requisição.
    #[serde(default = "default_max_repetitions")]
    pub max_repetitions: u32,

    /// Banco SQLite onde os jobs são persistidos.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_attempt_budget() -> u32 {
    3
}

fn default_backoff() -> BackoffKind {
    BackoffKind::Fixed
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_workers() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    500
}

// Uma hora, como no expurgo de jobs concluídos.
fn default_retention_secs() -> u64 {
    3600
}

fn default_max_repetitions() -> u32 {
    10
}

fn default_store_path() -> PathBuf {
    PathBuf::from("verdict.db")
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            openai_api_key: String::new(),
            openai_model: default_openai_model(),
            attempt_budget: default_attempt_budget(),
            backoff: default_backoff(),
            base_delay_ms: default_base_delay_ms(),
            workers: default_workers(),
            poll_interval_ms: default_poll_interval_ms(),
            retention_secs: default_retention_secs(),
            max_repetitions: default_max_repetitions(),
            store_path: default_store_path(),
        }
    }
}

impl VerdictConfig {
    /// Carrega `verdict.toml` do diretório atual, ou os defaults se não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("verdict.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<VerdictConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        // Variáveis de ambiente têm precedência sobre o arquivo para as chaves API.
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY")
            && !key.is_empty()
        {
            config.api_key = key;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY")
            && !key.is_empty()
        {
            config.openai_api_key = key;
        }

        Ok(config)
    }

    /// Aplica `--max-retries`: novas tentativas além da primeira chamada.
    pub fn set_max_retries(&mut self, retries: u32) {
        self.attempt_budget = retries.saturating_add(1);
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let base = Duration::from_millis(self.base_delay_ms);
        RetryPolicy {
            attempt_budget: self.attempt_budget,
            backoff: match self.backoff {
                BackoffKind::Fixed => Backoff::Fixed(base),
                BackoffKind::Exponential => Backoff::Exponential { base },
            },
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            workers: self.workers,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}
