use std::collections::HashSet;

use graphql_parser::query::{Field, Selection, SelectionSet, TypeCondition};
use indexmap::IndexMap;

use crate::{
    execution::{context::ExecutionContext, values::should_include_node},
    schema::{ObjectType, Schema},
};

/// Response key to the field nodes selected under it, in selection order.
pub type FieldSelectionMap<'a> = IndexMap<String, Vec<&'a Field<'static, String>>>;

/// Collects the fields of `selection_set` that apply to `runtime_type`.
///
/// Fragment spreads are followed once each, inline fragments and fragments are matched by type
/// condition, and `@skip`/`@include` are honored.
pub fn collect_fields<'a>(
    ctx: &ExecutionContext<'a>,
    runtime_type: &ObjectType,
    selection_set: &'a SelectionSet<'static, String>,
) -> FieldSelectionMap<'a> {
    let mut fields = FieldSelectionMap::new();
    let mut visited_fragments = HashSet::new();
    collect_fields_impl(
        ctx,
        runtime_type,
        selection_set,
        &mut fields,
        &mut visited_fragments,
    );
    fields
}

/// Merges the sub-selections of every node of one response key.
pub fn collect_subfields<'a>(
    ctx: &ExecutionContext<'a>,
    return_type: &ObjectType,
    field_nodes: &[&'a Field<'static, String>],
) -> FieldSelectionMap<'a> {
    let mut fields = FieldSelectionMap::new();
    let mut visited_fragments = HashSet::new();
    for node in field_nodes {
        collect_fields_impl(
            ctx,
            return_type,
            &node.selection_set,
            &mut fields,
            &mut visited_fragments,
        );
    }
    fields
}

fn collect_fields_impl<'a>(
    ctx: &ExecutionContext<'a>,
    runtime_type: &ObjectType,
    selection_set: &'a SelectionSet<'static, String>,
    fields: &mut FieldSelectionMap<'a>,
    visited_fragments: &mut HashSet<&'a str>,
) {
    for selection in &selection_set.items {
        match selection {
            Selection::Field(field) => {
                if !should_include_node(&field.directives, &ctx.variable_values) {
                    continue;
                }
                let response_key = field.alias.as_ref().unwrap_or(&field.name);
                fields.entry(response_key.clone()).or_default().push(field);
            }
            Selection::InlineFragment(fragment) => {
                if !should_include_node(&fragment.directives, &ctx.variable_values)
                    || !does_fragment_condition_match(
                        ctx.schema,
                        fragment.type_condition.as_ref(),
                        runtime_type,
                    )
                {
                    continue;
                }
                collect_fields_impl(
                    ctx,
                    runtime_type,
                    &fragment.selection_set,
                    fields,
                    visited_fragments,
                );
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.fragment_name.as_str();
                if visited_fragments.contains(name)
                    || !should_include_node(&spread.directives, &ctx.variable_values)
                {
                    continue;
                }
                let Some(fragment) = ctx.fragments.get(name).copied() else {
                    continue;
                };
                visited_fragments.insert(fragment.name.as_str());
                if !does_fragment_condition_match(
                    ctx.schema,
                    Some(&fragment.type_condition),
                    runtime_type,
                ) {
                    continue;
                }
                collect_fields_impl(
                    ctx,
                    runtime_type,
                    &fragment.selection_set,
                    fields,
                    visited_fragments,
                );
            }
        }
    }
}

fn does_fragment_condition_match(
    schema: &Schema,
    condition: Option<&TypeCondition<'static, String>>,
    runtime_type: &ObjectType,
) -> bool {
    let Some(TypeCondition::On(type_name)) = condition else {
        return true;
    };

    type_name == &runtime_type.name || schema.is_possible_type(type_name, &runtime_type.name)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::{
        execution::{context::build_execution_context, parse_operation, QueryDocument},
        schema::SchemaBuilder,
        value::{ContextValue, RootValue},
    };

    fn schema() -> Schema {
        SchemaBuilder::from_sdl(
            r#"
            interface Event { id: ID! }
            type Query { ping: String }
            type Subscription implements Event {
              id: ID!
              messageAdded: String
              userJoined: String
            }
            "#,
        )
        .expect("valid sdl")
        .build()
    }

    fn keys(
        schema: &Schema,
        document: &QueryDocument,
        variables: Option<&HashMap<String, serde_json::Value>>,
    ) -> Vec<(String, usize)> {
        let ctx = build_execution_context(
            schema,
            document,
            RootValue::default(),
            ContextValue::default(),
            variables,
            None,
        )
        .expect("context builds");
        let root = schema.get_object_type("Subscription").expect("root type");

        collect_fields(&ctx, root, ctx.operation.selection_set)
            .into_iter()
            .map(|(key, nodes)| (key, nodes.len()))
            .collect()
    }

    #[test]
    fn merges_fragments_under_one_response_key() {
        let schema = schema();
        let document = parse_operation(
            r#"
            subscription {
              messageAdded
              ...Fields
              ... on Subscription { messageAdded }
            }
            fragment Fields on Subscription { messageAdded }
            "#,
        )
        .expect("parses");

        assert_eq!(
            keys(&schema, &document, None),
            vec![("messageAdded".to_string(), 3)]
        );
    }

    #[test]
    fn honors_aliases_directives_and_type_conditions() {
        let schema = schema();
        let document = parse_operation(
            r#"
            subscription ($skipJoin: Boolean!) {
              first: messageAdded
              userJoined @skip(if: $skipJoin)
              ... on Event { id }
              ... on Query { ping }
            }
            "#,
        )
        .expect("parses");
        let variables = HashMap::from([("skipJoin".to_string(), json!(true))]);

        assert_eq!(
            keys(&schema, &document, Some(&variables)),
            vec![("first".to_string(), 1), ("id".to_string(), 1)]
        );
    }

    #[test]
    fn visits_each_fragment_spread_once() {
        let schema = schema();
        let document = parse_operation(
            r#"
            subscription { ...A ...A }
            fragment A on Subscription { messageAdded }
            "#,
        )
        .expect("parses");

        assert_eq!(
            keys(&schema, &document, None),
            vec![("messageAdded".to_string(), 1)]
        );
    }
}
