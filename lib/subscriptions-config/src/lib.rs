pub mod execution;
mod env_overrides;
pub mod log;

use config::{Config, File, FileFormat, FileSourceFile};
use envconfig::Envconfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::PathBuf;

use crate::{
    env_overrides::{EnvVarOverrides, EnvVarOverridesError},
    execution::ExecutionConfig,
    log::LoggingConfig,
};

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionsConfig {
    /// The logger configuration.
    ///
    /// By default only important messages, warnings, and errors are printed (`info` level).
    #[serde(default)]
    pub log: LoggingConfig,

    /// Limits applied to every execution pass, including the one that runs per subscription event.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionsConfigError {
    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(#[from] config::ConfigError),
    #[error("Failed to apply configuration overrides: {0}")]
    EnvVarOverridesError(#[from] EnvVarOverridesError),
    #[error("Failed to load the environment variables: {0}")]
    EnvVarLoadError(#[from] envconfig::Error),
    #[error("Failed to parse the configuration file path: {0}")]
    ConfigPathParseError(Infallible),
}

static DEFAULT_FILE_NAMES: &[&str] = &[
    "subscriptions.config.yaml",
    "subscriptions.config.yml",
    "subscriptions.config.json",
    "subscriptions.config.json5",
];

pub fn load_config(
    override_config_path: Option<String>,
) -> Result<SubscriptionsConfig, SubscriptionsConfigError> {
    let env_overrides = EnvVarOverrides::init_from_env()?;
    let mut config = Config::builder();

    if let Some(path_str) = override_config_path {
        let path_buf = path_str
            .parse::<PathBuf>()
            .map_err(SubscriptionsConfigError::ConfigPathParseError)?;
        let as_file: File<FileSourceFile, _> = path_buf.into();

        config = config.add_source(as_file.required(true));
    } else {
        for name in DEFAULT_FILE_NAMES {
            config = config.add_source(File::with_name(name).required(false));
        }
    }

    config = env_overrides.apply_overrides(config)?;

    Ok(config.build()?.try_deserialize::<SubscriptionsConfig>()?)
}

pub fn parse_yaml_config(config_raw: &str) -> Result<SubscriptionsConfig, SubscriptionsConfigError> {
    Config::builder()
        .add_source(File::from_str(config_raw, FileFormat::Yaml))
        .build()?
        .try_deserialize::<SubscriptionsConfig>()
        .map_err(SubscriptionsConfigError::ConfigLoadError)
}
