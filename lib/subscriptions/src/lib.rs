pub mod execution;
pub mod response;
pub mod schema;
pub mod stream;
pub mod subscribe;
pub mod value;

#[cfg(test)]
mod tests;

pub use execution::execute::{DefaultExecutor, ExecutionRequest, Executor};
pub use execution::parse_operation;
pub use response::{execution_result::ExecutionResult, graphql_error::GraphQLError};
pub use schema::{Schema, SchemaBuilder};
pub use stream::{EventStream, ResponseStream, SourceEventStream, Step};
pub use subscribe::{
    create_source_event_stream, subscribe, subscribe_with, ExecutionArgs, ProtocolViolation,
    SubscribeError,
};
pub use value::{ContextValue, RootValue};
