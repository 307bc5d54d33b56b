//! Configuration loading
//!
//! Layers, lowest precedence first: built-in defaults, `config/default`,
//! `config/local`, an explicit `--config` file, then `RAG_AUDIT__*`
//! environment variables (`RAG_AUDIT__JUDGE__PRIMARY_MODEL=gpt-4o`).

use anyhow::{Context as _, Result};
use config::{Config as ConfigLoader, Environment, File};
use rag_audit_core::AuditConfig;
use std::collections::HashMap;
use std::path::Path;
use validator::Validate;

pub const ENV_PREFIX: &str = "RAG_AUDIT";
pub const ENV_SEPARATOR: &str = "__";
/// Used as the judge API key when none is configured.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Loads configuration from files and the process environment.
pub fn load(explicit: Option<&Path>) -> Result<AuditConfig> {
    load_with_env(explicit, None)
}

/// Like [`load`], but reads variables from `env` instead of the process
/// environment when given.
pub fn load_with_env(
    explicit: Option<&Path>,
    env: Option<HashMap<String, String>>,
) -> Result<AuditConfig> {
    let defaults =
        ConfigLoader::try_from(&AuditConfig::default()).context("Failed to encode defaults")?;

    let mut builder = ConfigLoader::builder()
        .add_source(defaults)
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false));

    if let Some(path) = explicit {
        builder = builder.add_source(File::from(path).required(true));
    }

    let api_key_fallback = match &env {
        Some(vars) => vars.get(API_KEY_VAR).cloned(),
        None => std::env::var(API_KEY_VAR).ok(),
    };

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(env),
    );

    let mut config: AuditConfig = builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Failed to parse configuration")?;

    if config.judge.api_key.is_none() {
        config.judge.api_key = api_key_fallback.filter(|key| !key.trim().is_empty());
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
