use async_trait::async_trait;
use serde_json::Value;

use crate::{
    execution::resolve::{ArgumentValues, ResolveInfo},
    response::graphql_error::GraphQLError,
    stream::SourceEventStream,
    value::{ContextValue, RootValue},
};

/// Produces the value of a field during an execution pass.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(
        &self,
        parent: &Value,
        args: &ArgumentValues,
        context: &ContextValue,
        info: &ResolveInfo<'_>,
    ) -> Result<Value, GraphQLError>;
}

/// Produces the event source of a subscription root field.
///
/// Runs once per subscription, against the subscription's root value. Each event the returned
/// source yields then becomes the root value of one execution pass.
#[async_trait]
pub trait SubscribeResolver: Send + Sync {
    async fn subscribe(
        &self,
        root: &RootValue,
        args: &ArgumentValues,
        context: &ContextValue,
        info: &ResolveInfo<'_>,
    ) -> Result<SourceEventStream, GraphQLError>;
}
