//! Subscription orchestration: open the event source of the root field, then run one execution
//! pass per event.

mod error;
mod source;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

use crate::{
    execution::{
        execute::{DefaultExecutor, ExecutionRequest, Executor},
        QueryDocument,
    },
    schema::Schema,
    stream::{map_event_stream, ResponseStream},
    value::{ContextValue, RootValue},
};

pub use error::{ProtocolViolation, SubscribeError};
pub use source::create_source_event_stream;

/// The request of a subscription. Everything but the root value is reused by every event's
/// execution pass.
#[derive(Debug, Clone)]
pub struct ExecutionArgs {
    pub schema: Arc<Schema>,
    pub document: Arc<QueryDocument>,
    pub root_value: RootValue,
    pub context_value: ContextValue,
    pub variable_values: Option<HashMap<String, Value>>,
    pub operation_name: Option<String>,
}

impl ExecutionArgs {
    pub fn new(schema: Arc<Schema>, document: Arc<QueryDocument>) -> Self {
        ExecutionArgs {
            schema,
            document,
            root_value: RootValue::default(),
            context_value: ContextValue::default(),
            variable_values: None,
            operation_name: None,
        }
    }

    pub fn with_root_value(mut self, root_value: impl Into<RootValue>) -> Self {
        self.root_value = root_value.into();
        self
    }

    pub fn with_context_value(mut self, context_value: ContextValue) -> Self {
        self.context_value = context_value;
        self
    }

    pub fn with_variable_values(mut self, variable_values: HashMap<String, Value>) -> Self {
        self.variable_values = Some(variable_values);
        self
    }

    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }
}

/// Starts a subscription executed by the [`DefaultExecutor`].
pub async fn subscribe(args: ExecutionArgs) -> Result<ResponseStream, SubscribeError> {
    subscribe_with(Arc::new(DefaultExecutor::default()), args).await
}

/// Starts a subscription whose events are executed by `executor`.
///
/// Construction failures are returned here, before any response stream exists. Once running, each
/// event becomes the root value of one execution pass, with the rest of `args` unchanged.
#[instrument(
    level = "debug",
    skip_all,
    fields(operation_name = args.operation_name.as_deref())
)]
pub async fn subscribe_with<E>(
    executor: Arc<E>,
    args: ExecutionArgs,
) -> Result<ResponseStream, SubscribeError>
where
    E: Executor + ?Sized + 'static,
{
    let source = match create_source_event_stream(&args).await {
        Ok(source) => source,
        Err(error) => {
            warn!(code = error.error_code(), "failed to start subscription: {}", error);
            return Err(error);
        }
    };

    debug!("subscription started");

    let args = Arc::new(args);
    let responses = map_event_stream(source, move |event: Value| {
        let executor = executor.clone();
        let args = args.clone();
        async move {
            trace!("executing subscription event");
            executor
                .execute(ExecutionRequest {
                    schema: &args.schema,
                    document: &args.document,
                    root_value: RootValue::from(event),
                    context_value: &args.context_value,
                    variable_values: args.variable_values.as_ref(),
                    operation_name: args.operation_name.as_deref(),
                })
                .await
        }
    });

    Ok(Box::new(responses))
}
