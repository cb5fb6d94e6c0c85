use crate::response::{execution_result::ExecutionResult, graphql_error::GraphQLError};

/// A well-formed request that does not have the shape of a subscription.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("Subscription operations must select exactly one root field, but selected {count}.")]
    NotExactlyOneRootField { count: usize },
    #[error("The subscription field \"{field_name}\" is not defined by type \"{type_name}\".")]
    FieldNotDefined {
        type_name: String,
        field_name: String,
    },
    #[error("Subscription field \"{field_name}\" must resolve to an event source, but received: {received}.")]
    NotAnEventSource {
        field_name: String,
        received: String,
    },
}

/// Why a subscription could not be started. No event source is left open when this is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SubscribeError {
    #[error("Invalid subscription request: {}", join_messages(.0))]
    RequestValidation(Vec<GraphQLError>),
    #[error(transparent)]
    ProtocolViolation(#[from] ProtocolViolation),
    #[error("Subscribe resolver failed: {0}")]
    Resolver(GraphQLError),
}

impl SubscribeError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SubscribeError::RequestValidation(_) => "BAD_USER_INPUT",
            SubscribeError::ProtocolViolation(_) => "SUBSCRIPTION_PROTOCOL_VIOLATION",
            SubscribeError::Resolver(_) => "SUBSCRIPTION_RESOLVER_FAILED",
        }
    }

    /// The errors to report to the client. Resolver errors keep their own code when they carry one.
    pub fn graphql_errors(&self) -> Vec<GraphQLError> {
        let code = self.error_code();
        match self {
            SubscribeError::RequestValidation(errors) => errors
                .iter()
                .cloned()
                .map(|error| error.with_code(code))
                .collect(),
            SubscribeError::ProtocolViolation(violation) => {
                vec![GraphQLError::new(violation.to_string()).with_code(code)]
            }
            SubscribeError::Resolver(error) if error.code().is_some() => vec![error.clone()],
            SubscribeError::Resolver(error) => vec![error.clone().with_code(code)],
        }
    }
}

impl From<SubscribeError> for ExecutionResult {
    fn from(error: SubscribeError) -> Self {
        ExecutionResult::from_errors(error.graphql_errors())
    }
}

fn join_messages(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_validation_lists_every_message() {
        let error = SubscribeError::RequestValidation(vec![
            GraphQLError::new("first"),
            GraphQLError::new("second"),
        ]);

        assert_eq!(
            error.to_string(),
            "Invalid subscription request: first, second"
        );
        assert!(error
            .graphql_errors()
            .iter()
            .all(|error| error.code() == Some("BAD_USER_INPUT")));
    }

    #[test]
    fn resolver_errors_keep_their_own_code() {
        let coded = SubscribeError::Resolver(GraphQLError::new("nope").with_code("FORBIDDEN"));
        let plain = SubscribeError::Resolver(GraphQLError::new("broker down"));

        assert_eq!(coded.graphql_errors()[0].code(), Some("FORBIDDEN"));
        assert_eq!(
            plain.graphql_errors()[0].code(),
            Some("SUBSCRIPTION_RESOLVER_FAILED")
        );
    }

    #[test]
    fn converts_into_an_errors_only_result() {
        let error: SubscribeError = ProtocolViolation::NotExactlyOneRootField { count: 2 }.into();
        let result = ExecutionResult::from(error);

        insta::assert_snapshot!(
            serde_json::to_string(&result).expect("serializes"),
            @r#"{"errors":[{"message":"Subscription operations must select exactly one root field, but selected 2.","extensions":{"code":"SUBSCRIPTION_PROTOCOL_VIOLATION"}}]}"#
        );
    }
}
