use tracing::{debug, instrument};

use crate::{
    execution::{
        collect::collect_fields,
        context::{build_execution_context, get_operation_root_type, OperationKind},
        resolve::{get_field_def, resolve_subscribe_field, ResolvedValue},
    },
    response::graphql_error::{GraphQLError, GraphQLErrorPathSegment},
    stream::SourceEventStream,
    subscribe::{
        error::{ProtocolViolation, SubscribeError},
        ExecutionArgs,
    },
};

/// Validates the subscription request and opens the event source of its single root field.
///
/// Every failure is reported before an event source exists, so the caller can always tell a
/// subscription that never started from one that failed later.
#[instrument(
    level = "debug",
    skip_all,
    fields(operation_name = args.operation_name.as_deref())
)]
pub async fn create_source_event_stream(
    args: &ExecutionArgs,
) -> Result<SourceEventStream, SubscribeError> {
    let ctx = build_execution_context(
        &args.schema,
        &args.document,
        args.root_value.clone(),
        args.context_value.clone(),
        args.variable_values.as_ref(),
        args.operation_name.as_deref(),
    )
    .map_err(SubscribeError::RequestValidation)?;

    if ctx.operation.kind != OperationKind::Subscription {
        let error = GraphQLError::new(format!(
            "Expected a subscription operation, but got a {} operation.",
            ctx.operation.kind
        ))
        .located(ctx.operation.position, &[]);
        return Err(SubscribeError::RequestValidation(vec![error]));
    }

    let root_type = get_operation_root_type(ctx.schema, &ctx.operation)
        .map_err(|error| SubscribeError::RequestValidation(vec![error]))?;

    let fields = collect_fields(&ctx, root_type, ctx.operation.selection_set);
    let count = fields.len();
    let mut fields = fields.into_iter();
    let (response_key, field_nodes) = match (fields.next(), fields.next()) {
        (Some(root_field), None) => root_field,
        _ => return Err(ProtocolViolation::NotExactlyOneRootField { count }.into()),
    };

    let field_name = field_nodes
        .first()
        .map_or(response_key.as_str(), |node| node.name.as_str());
    let field_def = get_field_def(root_type, field_name).ok_or_else(|| {
        ProtocolViolation::FieldNotDefined {
            type_name: root_type.name.clone(),
            field_name: field_name.to_string(),
        }
    })?;

    let path = [GraphQLErrorPathSegment::from(response_key.as_str())];
    debug!(field = field_name, "resolving subscription event source");

    match resolve_subscribe_field(&ctx, field_def, &field_nodes, root_type, &path).await {
        Ok(ResolvedValue::EventSource(source)) => Ok(source),
        Ok(ResolvedValue::Value(value)) => Err(ProtocolViolation::NotAnEventSource {
            field_name: field_name.to_string(),
            received: value.to_string(),
        }
        .into()),
        Err(error) => Err(SubscribeError::Resolver(
            error.located(field_nodes.iter().map(|node| node.position), &path),
        )),
    }
}
