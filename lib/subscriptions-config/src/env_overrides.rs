use config::{builder::BuilderState, ConfigBuilder, ConfigError};
use envconfig::Envconfig;
use tracing::debug;

use crate::log::{LogFormat, LogLevel};

#[derive(Envconfig)]
pub struct EnvVarOverrides {
    // Logger overrides
    #[envconfig(from = "LOG_LEVEL")]
    pub log_level: Option<LogLevel>,
    #[envconfig(from = "LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
    #[envconfig(from = "LOG_FILTER")]
    pub log_filter: Option<String>,

    // Execution overrides
    #[envconfig(from = "EXECUTION_MAX_DEPTH")]
    pub execution_max_depth: Option<u64>,
    #[envconfig(from = "EXECUTION_MAX_ERRORS")]
    pub execution_max_errors: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvVarOverridesError {
    #[error("Failed to override configuration: {0}")]
    FailedToOverrideConfig(#[from] ConfigError),
}

impl EnvVarOverrides {
    pub fn apply_overrides<T: BuilderState>(
        mut self,
        mut config: ConfigBuilder<T>,
    ) -> Result<ConfigBuilder<T>, EnvVarOverridesError> {
        if let Some(log_level) = self.log_level.take() {
            debug!("[config-override] 'log.level' = {:?}", log_level);
            config = config.set_override("log.level", log_level.as_str())?;
        }
        if let Some(log_format) = self.log_format.take() {
            debug!("[config-override] 'log.format' = {:?}", log_format);
            config = config.set_override("log.format", log_format.as_str())?;
        }
        if let Some(log_filter) = self.log_filter.take() {
            debug!("[config-override] 'log.filter' = {:?}", log_filter);
            config = config.set_override("log.filter", log_filter)?;
        }

        if let Some(max_depth) = self.execution_max_depth.take() {
            debug!("[config-override] 'execution.max_depth' = {}", max_depth);
            config = config.set_override("execution.max_depth", max_depth)?;
        }
        if let Some(max_errors) = self.execution_max_errors.take() {
            debug!("[config-override] 'execution.max_errors' = {}", max_errors);
            config = config.set_override("execution.max_errors", max_errors)?;
        }

        Ok(config)
    }
}
