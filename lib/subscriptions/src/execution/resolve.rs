use std::collections::HashMap;
use std::fmt;

use graphql_parser::query::Field;
use serde_json::Value;

use crate::{
    execution::{
        context::{ExecutionContext, Fragments, Operation},
        values::get_argument_values,
    },
    response::graphql_error::{GraphQLError, GraphQLErrorPathSegment},
    schema::{FieldDefinition, ObjectType, Schema, TypeNode},
    stream::SourceEventStream,
    value::{ContextValue, RootValue},
};

pub type ArgumentValues = serde_json::Map<String, Value>;

/// Read-only view of the field being resolved.
pub struct ResolveInfo<'a> {
    pub field_name: &'a str,
    pub field_nodes: &'a [&'a Field<'static, String>],
    pub return_type: &'a TypeNode,
    pub parent_type: &'a ObjectType,
    pub path: &'a [GraphQLErrorPathSegment],
    pub schema: &'a Schema,
    pub fragments: &'a Fragments<'a>,
    pub root_value: &'a RootValue,
    pub operation: Operation<'a>,
    pub variable_values: &'a HashMap<String, Value>,
}

impl fmt::Debug for ResolveInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveInfo")
            .field("field_name", &self.field_name)
            .field("return_type", &self.return_type)
            .field("parent_type", &self.parent_type.name)
            .field("path", &self.path)
            .finish()
    }
}

pub fn build_resolve_info<'a>(
    ctx: &'a ExecutionContext<'a>,
    field_def: &'a FieldDefinition,
    field_nodes: &'a [&'a Field<'static, String>],
    parent_type: &'a ObjectType,
    path: &'a [GraphQLErrorPathSegment],
) -> ResolveInfo<'a> {
    ResolveInfo {
        field_name: &field_def.name,
        field_nodes,
        return_type: &field_def.field_type,
        parent_type,
        path,
        schema: ctx.schema,
        fragments: &ctx.fragments,
        root_value: &ctx.root_value,
        operation: ctx.operation,
        variable_values: &ctx.variable_values,
    }
}

/// `__typename` has no definition on the type itself.
pub fn get_field_def<'a>(
    parent_type: &'a ObjectType,
    field_name: &str,
) -> Option<&'a FieldDefinition> {
    parent_type.fields.get(field_name)
}

/// Reads `info.field_name` off a JSON object parent. Anything else resolves to `null`.
pub fn default_field_resolver(parent: &Value, info: &ResolveInfo<'_>) -> Value {
    parent
        .get(info.field_name)
        .cloned()
        .unwrap_or(Value::Null)
}

/// Resolves one field against `source`, with either the attached resolver or the default one.
pub async fn resolve_field_value_or_error<'a>(
    ctx: &'a ExecutionContext<'a>,
    field_def: &'a FieldDefinition,
    field_nodes: &'a [&'a Field<'static, String>],
    parent_type: &'a ObjectType,
    source: &'a Value,
    path: &'a [GraphQLErrorPathSegment],
) -> Result<Value, GraphQLError> {
    let Some(first_node) = field_nodes.first() else {
        return Ok(Value::Null);
    };
    let args = get_argument_values(ctx.schema, field_def, first_node, &ctx.variable_values)?;
    let info = build_resolve_info(ctx, field_def, field_nodes, parent_type, path);

    match &field_def.resolve {
        Some(resolver) => {
            resolver
                .resolve(source, &args, &ctx.context_value, &info)
                .await
        }
        None => Ok(default_field_resolver(source, &info)),
    }
}

/// What a subscribe resolver produced for the root field.
pub enum ResolvedValue {
    Value(Value),
    EventSource(SourceEventStream),
}

impl fmt::Debug for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ResolvedValue::EventSource(_) => f.write_str("EventSource"),
        }
    }
}

/// Opens the event source registered on the root value under the field's name, or falls back to
/// reading the plain field value.
pub fn default_subscribe_resolver(root: &RootValue, info: &ResolveInfo<'_>) -> ResolvedValue {
    match root.event_source(info.field_name) {
        Some(factory) => ResolvedValue::EventSource(factory.open()),
        None => ResolvedValue::Value(default_field_resolver(root.data(), info)),
    }
}

/// Runs the subscribe resolver of a root field against the subscription's root value.
pub async fn resolve_subscribe_field<'a>(
    ctx: &'a ExecutionContext<'a>,
    field_def: &'a FieldDefinition,
    field_nodes: &'a [&'a Field<'static, String>],
    parent_type: &'a ObjectType,
    path: &'a [GraphQLErrorPathSegment],
) -> Result<ResolvedValue, GraphQLError> {
    let Some(first_node) = field_nodes.first() else {
        return Ok(ResolvedValue::Value(Value::Null));
    };
    let args = get_argument_values(ctx.schema, field_def, first_node, &ctx.variable_values)?;
    let info = build_resolve_info(ctx, field_def, field_nodes, parent_type, path);

    match &field_def.subscribe {
        Some(subscriber) => subscriber
            .subscribe(&ctx.root_value, &args, &ctx.context_value, &info)
            .await
            .map(ResolvedValue::EventSource),
        None => Ok(default_subscribe_resolver(&ctx.root_value, &info)),
    }
}
