use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt};
use graphql_parser::query::Field;
use hive_subscriptions_config::execution::ExecutionConfig;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::{
    execution::{
        collect::{collect_fields, collect_subfields, FieldSelectionMap},
        context::{
            build_execution_context, get_operation_root_type, ExecutionContext, OperationKind,
        },
        resolve::{get_field_def, resolve_field_value_or_error},
        QueryDocument,
    },
    response::{
        execution_result::ExecutionResult,
        graphql_error::{GraphQLError, GraphQLErrorPathSegment},
    },
    schema::{FieldDefinition, ObjectType, Schema, TypeDefinition, TypeNode},
    stream::EventExecutionError,
    value::{ContextValue, RootValue},
};

/// The inputs of one execution pass. Only `root_value` differs between the passes of a subscription.
pub struct ExecutionRequest<'a> {
    pub schema: &'a Schema,
    pub document: &'a QueryDocument,
    pub root_value: RootValue,
    pub context_value: &'a ContextValue,
    pub variable_values: Option<&'a HashMap<String, Value>>,
    pub operation_name: Option<&'a str>,
}

/// Runs one full execution pass.
///
/// Field errors belong in the returned `ExecutionResult`. `Err` is reserved for failures that
/// prevent execution from running at all.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
    ) -> Result<ExecutionResult, EventExecutionError>;
}

#[derive(Debug, Clone, Default)]
pub struct DefaultExecutor {
    config: ExecutionConfig,
}

impl DefaultExecutor {
    pub fn new(config: ExecutionConfig) -> Self {
        DefaultExecutor { config }
    }
}

#[async_trait]
impl Executor for DefaultExecutor {
    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
    ) -> Result<ExecutionResult, EventExecutionError> {
        Ok(execute(request, &self.config).await)
    }
}

#[instrument(level = "trace", skip_all, fields(operation_name = request.operation_name))]
pub async fn execute(request: ExecutionRequest<'_>, config: &ExecutionConfig) -> ExecutionResult {
    let ctx = match build_execution_context(
        request.schema,
        request.document,
        request.root_value,
        request.context_value.clone(),
        request.variable_values,
        request.operation_name,
    ) {
        Ok(ctx) => ctx.with_limits(config.max_depth, config.max_errors),
        Err(errors) => return ExecutionResult::from_errors(errors),
    };

    let data = execute_operation(&ctx).await;

    ExecutionResult {
        errors: ctx.into_errors(),
        data: Some(data),
    }
}

async fn execute_operation(ctx: &ExecutionContext<'_>) -> Value {
    let root_type = match get_operation_root_type(ctx.schema, &ctx.operation) {
        Ok(root_type) => root_type,
        Err(error) => {
            ctx.record_error(error);
            return Value::Null;
        }
    };

    let fields = collect_fields(ctx, root_type, ctx.operation.selection_set);
    let serially = ctx.operation.kind == OperationKind::Mutation;

    match execute_fields(ctx, root_type, ctx.root_value.data(), &[], fields, serially).await {
        Ok(data) => Value::Object(data),
        Err(error) => {
            ctx.record_error(error);
            Value::Null
        }
    }
}

/// Executes the fields of one selection set. Mutation root fields run one after another.
///
/// `Err` carries a non-null violation that the parent has to absorb.
fn execute_fields<'a>(
    ctx: &'a ExecutionContext<'a>,
    parent_type: &'a ObjectType,
    source: &'a Value,
    path: &'a [GraphQLErrorPathSegment],
    fields: FieldSelectionMap<'a>,
    serially: bool,
) -> BoxFuture<'a, Result<Map<String, Value>, GraphQLError>> {
    async move {
        let mut response_keys = Vec::with_capacity(fields.len());
        let mut pending: Vec<BoxFuture<'a, Result<Value, GraphQLError>>> =
            Vec::with_capacity(fields.len());

        for (response_key, field_nodes) in fields {
            let Some(&first_node) = field_nodes.first() else {
                continue;
            };
            let field_name = first_node.name.as_str();

            if field_name == "__typename" {
                response_keys.push(response_key);
                pending.push(future::ready(Ok(Value::String(parent_type.name.clone()))).boxed());
                continue;
            }

            let Some(field_def) = get_field_def(parent_type, field_name) else {
                continue;
            };

            let mut field_path = path.to_vec();
            field_path.push(response_key.as_str().into());
            response_keys.push(response_key);
            pending.push(
                execute_field(ctx, parent_type, source, field_def, field_nodes, field_path).boxed(),
            );
        }

        let results = if serially {
            let mut results = Vec::with_capacity(pending.len());
            for field in pending {
                results.push(field.await);
            }
            results
        } else {
            future::join_all(pending).await
        };

        let mut data = Map::with_capacity(response_keys.len());
        for (response_key, result) in response_keys.into_iter().zip(results) {
            data.insert(response_key, result?);
        }
        Ok(data)
    }
    .boxed()
}

async fn execute_field<'a>(
    ctx: &'a ExecutionContext<'a>,
    parent_type: &'a ObjectType,
    source: &'a Value,
    field_def: &'a FieldDefinition,
    field_nodes: Vec<&'a Field<'static, String>>,
    path: Vec<GraphQLErrorPathSegment>,
) -> Result<Value, GraphQLError> {
    let completed = async {
        check_depth(ctx, &path)?;
        let resolved = resolve_field_value_or_error(
            ctx,
            field_def,
            &field_nodes,
            parent_type,
            source,
            &path,
        )
        .await?;
        complete_value(
            ctx,
            &field_def.field_type,
            parent_type,
            &field_def.name,
            &field_nodes,
            &path,
            resolved,
        )
        .await
    }
    .await;

    handle_field_error(ctx, completed, &field_def.field_type, &field_nodes, &path)
}

/// Nullable positions absorb the error and become `null`. Non-null positions pass it up.
fn handle_field_error(
    ctx: &ExecutionContext<'_>,
    completed: Result<Value, GraphQLError>,
    return_type: &TypeNode,
    field_nodes: &[&Field<'static, String>],
    path: &[GraphQLErrorPathSegment],
) -> Result<Value, GraphQLError> {
    let error = match completed {
        Ok(value) => return Ok(value),
        Err(error) => error.located(field_nodes.iter().map(|node| node.position), path),
    };

    if return_type.is_non_null() {
        return Err(error);
    }

    ctx.record_error(error);
    Ok(Value::Null)
}

fn check_depth(
    ctx: &ExecutionContext<'_>,
    path: &[GraphQLErrorPathSegment],
) -> Result<(), GraphQLError> {
    let Some(max_depth) = ctx.max_depth else {
        return Ok(());
    };

    let depth = path
        .iter()
        .filter(|segment| matches!(segment, GraphQLErrorPathSegment::String(_)))
        .count();

    if depth > max_depth {
        return Err(GraphQLError::new(format!(
            "Maximum execution depth of {} exceeded.",
            max_depth
        )));
    }

    Ok(())
}

fn complete_value<'a>(
    ctx: &'a ExecutionContext<'a>,
    return_type: &'a TypeNode,
    parent_type: &'a ObjectType,
    field_name: &'a str,
    field_nodes: &'a [&'a Field<'static, String>],
    path: &'a [GraphQLErrorPathSegment],
    result: Value,
) -> BoxFuture<'a, Result<Value, GraphQLError>> {
    async move {
        match return_type {
            TypeNode::NonNull(inner) => {
                let completed = complete_value(
                    ctx,
                    inner,
                    parent_type,
                    field_name,
                    field_nodes,
                    path,
                    result,
                )
                .await?;
                if completed.is_null() {
                    return Err(GraphQLError::new(format!(
                        "Cannot return null for non-nullable field {}.{}.",
                        parent_type.name, field_name
                    )));
                }
                Ok(completed)
            }
            _ if result.is_null() => Ok(Value::Null),
            TypeNode::List(item_type) => {
                let Value::Array(items) = result else {
                    return Err(GraphQLError::new(format!(
                        "Expected Iterable, but did not find one for field \"{}.{}\".",
                        parent_type.name, field_name
                    )));
                };

                let mut completed = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    let mut item_path = path.to_vec();
                    item_path.push(index.into());
                    let item_value = complete_value(
                        ctx,
                        item_type,
                        parent_type,
                        field_name,
                        field_nodes,
                        &item_path,
                        item,
                    )
                    .await;
                    completed.push(handle_field_error(
                        ctx,
                        item_value,
                        item_type,
                        field_nodes,
                        &item_path,
                    )?);
                }
                Ok(Value::Array(completed))
            }
            TypeNode::Named(type_name) => match ctx.schema.get_type(type_name) {
                Some(TypeDefinition::Scalar(scalar)) => serialize_scalar(scalar, &result),
                Some(TypeDefinition::Enum(enum_type)) => match result.as_str() {
                    Some(value) if enum_type.values.iter().any(|v| v == value) => Ok(result),
                    _ => Err(GraphQLError::new(format!(
                        "Enum \"{}\" cannot represent value: {}",
                        enum_type.name, result
                    ))),
                },
                Some(TypeDefinition::Object(object_type)) => {
                    complete_object_value(ctx, object_type, field_nodes, path, result).await
                }
                Some(TypeDefinition::Interface(_)) | Some(TypeDefinition::Union(_)) => {
                    let object_type = resolve_runtime_type(
                        ctx.schema,
                        type_name,
                        parent_type,
                        field_name,
                        &result,
                    )?;
                    complete_object_value(ctx, object_type, field_nodes, path, result).await
                }
                _ => Err(GraphQLError::new(format!(
                    "Cannot complete value of unexpected output type: \"{}\".",
                    type_name
                ))),
            },
        }
    }
    .boxed()
}

async fn complete_object_value<'a>(
    ctx: &'a ExecutionContext<'a>,
    object_type: &'a ObjectType,
    field_nodes: &'a [&'a Field<'static, String>],
    path: &'a [GraphQLErrorPathSegment],
    value: Value,
) -> Result<Value, GraphQLError> {
    let subfields = collect_subfields(ctx, object_type, field_nodes);
    execute_fields(ctx, object_type, &value, path, subfields, false)
        .await
        .map(Value::Object)
}

/// Abstract types are resolved through the `__typename` of the resolved value.
fn resolve_runtime_type<'a>(
    schema: &'a Schema,
    abstract_type: &str,
    parent_type: &ObjectType,
    field_name: &str,
    value: &Value,
) -> Result<&'a ObjectType, GraphQLError> {
    let Some(type_name) = value.get("__typename").and_then(Value::as_str) else {
        return Err(GraphQLError::new(format!(
            "Abstract type \"{}\" must resolve to an Object type at runtime for field \"{}.{}\". Provide \"__typename\" on the resolved value.",
            abstract_type, parent_type.name, field_name
        )));
    };

    match schema.get_object_type(type_name) {
        Some(object_type) if schema.is_possible_type(abstract_type, type_name) => Ok(object_type),
        _ => Err(GraphQLError::new(format!(
            "Runtime Object type \"{}\" is not a possible type for \"{}\".",
            type_name, abstract_type
        ))),
    }
}

fn serialize_scalar(scalar: &str, value: &Value) -> Result<Value, GraphQLError> {
    let serialized = match scalar {
        "Int" => {
            let int = match value {
                Value::Bool(boolean) => Some(i64::from(*boolean)),
                Value::Number(number) => number.as_i64().or_else(|| {
                    number
                        .as_f64()
                        .filter(|float| float.fract() == 0.0)
                        .map(|float| float as i64)
                }),
                _ => None,
            };
            int.filter(|int| i32::try_from(*int).is_ok())
                .map(Value::from)
                .ok_or_else(|| format!("Int cannot represent non-integer value: {}", value))
        }
        "Float" => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::Bool(boolean) => Ok(Value::from(if *boolean { 1.0 } else { 0.0 })),
            _ => Err(format!("Float cannot represent non numeric value: {}", value)),
        },
        "String" => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Bool(_) | Value::Number(_) => Ok(Value::String(value.to_string())),
            _ => Err(format!("String cannot represent value: {}", value)),
        },
        "Boolean" => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Number(number) => Ok(Value::Bool(number.as_f64() != Some(0.0))),
            _ => Err(format!(
                "Boolean cannot represent a non boolean value: {}",
                value
            )),
        },
        "ID" => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(number) if number.is_i64() || number.is_u64() => {
                Ok(Value::String(number.to_string()))
            }
            _ => Err(format!("ID cannot represent value: {}", value)),
        },
        _ => Ok(value.clone()),
    };

    serialized.map_err(GraphQLError::new)
}
