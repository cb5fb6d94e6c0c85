use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::response::graphql_error::GraphQLError;

/// The outcome of one execution pass: `{ data, errors }`.
///
/// `data` is absent when execution never started (for example, the operation could not be selected),
/// and `null` when a non-null violation propagated all the way to the root.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ExecutionResult {
    pub fn from_data(data: Value) -> Self {
        ExecutionResult {
            errors: Vec::new(),
            data: Some(data),
        }
    }

    pub fn from_errors(errors: Vec<GraphQLError>) -> Self {
        ExecutionResult { errors, data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn omits_empty_errors_and_missing_data() {
        let with_data = ExecutionResult::from_data(json!({ "count": 1 }));
        let only_errors = ExecutionResult::from_errors(vec!["nope".into()]);

        assert_eq!(
            serde_json::to_string(&with_data).expect("serializes"),
            r#"{"data":{"count":1}}"#
        );
        assert_eq!(
            serde_json::to_string(&only_errors).expect("serializes"),
            r#"{"errors":[{"message":"nope"}]}"#
        );
    }
}
