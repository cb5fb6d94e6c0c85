use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Maximum depth of nested field completion within a single execution pass.
    /// Fields nested deeper resolve to `null` with an error.
    /// If not specified, depth is not limited.
    ///
    /// Can also be set via the `EXECUTION_MAX_DEPTH` environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    /// Maximum number of errors recorded by a single execution pass.
    /// When exceeded, the remaining errors are dropped and a final error reports the truncation.
    /// If not specified, all errors are recorded.
    ///
    /// Can also be set via the `EXECUTION_MAX_ERRORS` environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_errors: Option<usize>,
}
