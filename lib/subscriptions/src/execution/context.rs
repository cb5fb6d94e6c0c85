use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use graphql_parser::query::{
    Definition, Directive, FragmentDefinition, OperationDefinition, SelectionSet,
    VariableDefinition,
};
use graphql_parser::Pos;
use serde_json::Value;

use crate::{
    execution::{values::coerce_variable_values, QueryDocument},
    response::graphql_error::GraphQLError,
    schema::{ObjectType, Schema},
    value::{ContextValue, RootValue},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        })
    }
}

/// Borrowed view over any of the operation definition shapes.
#[derive(Debug, Clone, Copy)]
pub struct Operation<'a> {
    pub kind: OperationKind,
    pub name: Option<&'a str>,
    pub position: Option<Pos>,
    pub variable_definitions: &'a [VariableDefinition<'static, String>],
    pub directives: &'a [Directive<'static, String>],
    pub selection_set: &'a SelectionSet<'static, String>,
}

impl<'a> From<&'a OperationDefinition<'static, String>> for Operation<'a> {
    fn from(definition: &'a OperationDefinition<'static, String>) -> Self {
        match definition {
            OperationDefinition::SelectionSet(selection_set) => Operation {
                kind: OperationKind::Query,
                name: None,
                position: None,
                variable_definitions: &[],
                directives: &[],
                selection_set,
            },
            OperationDefinition::Query(query) => Operation {
                kind: OperationKind::Query,
                name: query.name.as_deref(),
                position: Some(query.position),
                variable_definitions: &query.variable_definitions,
                directives: &query.directives,
                selection_set: &query.selection_set,
            },
            OperationDefinition::Mutation(mutation) => Operation {
                kind: OperationKind::Mutation,
                name: mutation.name.as_deref(),
                position: Some(mutation.position),
                variable_definitions: &mutation.variable_definitions,
                directives: &mutation.directives,
                selection_set: &mutation.selection_set,
            },
            OperationDefinition::Subscription(subscription) => Operation {
                kind: OperationKind::Subscription,
                name: subscription.name.as_deref(),
                position: Some(subscription.position),
                variable_definitions: &subscription.variable_definitions,
                directives: &subscription.directives,
                selection_set: &subscription.selection_set,
            },
        }
    }
}

pub type Fragments<'a> = HashMap<&'a str, &'a FragmentDefinition<'static, String>>;

/// Everything one execution pass needs. Built per pass and never shared between passes.
pub struct ExecutionContext<'a> {
    pub schema: &'a Schema,
    pub fragments: Fragments<'a>,
    pub operation: Operation<'a>,
    pub root_value: RootValue,
    pub context_value: ContextValue,
    pub variable_values: HashMap<String, Value>,
    pub max_depth: Option<usize>,
    max_errors: Option<usize>,
    errors: Mutex<RecordedErrors>,
}

#[derive(Default)]
struct RecordedErrors {
    errors: Vec<GraphQLError>,
    truncated: bool,
}

impl<'a> ExecutionContext<'a> {
    pub fn with_limits(mut self, max_depth: Option<usize>, max_errors: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self.max_errors = max_errors;
        self
    }

    /// Records a field error. Fields of one selection set may run concurrently, hence `&self`.
    pub fn record_error(&self, error: GraphQLError) {
        let mut recorded = self
            .errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(max_errors) = self.max_errors {
            if recorded.errors.len() >= max_errors {
                recorded.truncated = true;
                return;
            }
        }
        recorded.errors.push(error);
    }

    pub fn error_count(&self) -> usize {
        self.errors
            .lock()
            .map(|recorded| recorded.errors.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().errors.len())
    }

    pub fn into_errors(self) -> Vec<GraphQLError> {
        let RecordedErrors {
            mut errors,
            truncated,
        } = self
            .errors
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if truncated {
            errors.push(GraphQLError::new(format!(
                "Too many errors, only the first {} are reported.",
                errors.len()
            )));
        }
        errors
    }
}

/// Selects the operation, gathers fragments and coerces the variables of a request.
///
/// Every problem found is reported, not just the first one.
pub fn build_execution_context<'a>(
    schema: &'a Schema,
    document: &'a QueryDocument,
    root_value: RootValue,
    context_value: ContextValue,
    raw_variable_values: Option<&HashMap<String, Value>>,
    operation_name: Option<&str>,
) -> Result<ExecutionContext<'a>, Vec<GraphQLError>> {
    let mut operation: Option<Operation<'a>> = None;
    let mut fragments = Fragments::new();
    let mut ambiguous = false;

    for definition in &document.definitions {
        match definition {
            Definition::Operation(definition) => {
                let candidate = Operation::from(definition);
                match operation_name {
                    Some(name) if candidate.name == Some(name) => operation = Some(candidate),
                    Some(_) => {}
                    None if operation.is_some() => ambiguous = true,
                    None => operation = Some(candidate),
                }
            }
            Definition::Fragment(fragment) => {
                fragments.insert(fragment.name.as_str(), fragment);
            }
        }
    }

    if ambiguous {
        return Err(vec![GraphQLError::new(
            "Must provide operation name if query contains multiple operations.",
        )]);
    }

    let Some(operation) = operation else {
        return Err(vec![match operation_name {
            Some(name) => GraphQLError::new(format!("Unknown operation named \"{}\".", name)),
            None => GraphQLError::new("Must provide an operation."),
        }]);
    };

    let variable_values =
        coerce_variable_values(schema, operation.variable_definitions, raw_variable_values)?;

    Ok(ExecutionContext {
        schema,
        fragments,
        operation,
        root_value,
        context_value,
        variable_values,
        max_depth: None,
        max_errors: None,
        errors: Mutex::default(),
    })
}

pub fn get_operation_root_type<'a>(
    schema: &'a Schema,
    operation: &Operation<'_>,
) -> Result<&'a ObjectType, GraphQLError> {
    let not_configured = || {
        GraphQLError::new(format!(
            "Schema is not configured to execute {} operation.",
            operation.kind
        ))
        .located(operation.position, &[])
    };

    schema
        .root_type_name(operation.kind)
        .and_then(|name| schema.get_object_type(name))
        .ok_or_else(not_configured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{execution::parse_operation, schema::SchemaBuilder};
    use serde_json::json;

    fn schema() -> Schema {
        SchemaBuilder::from_sdl(
            r#"
            type Query { ping: String }
            type Subscription { tick(every: Int!): Int }
            "#,
        )
        .expect("valid sdl")
        .build()
    }

    fn build<'a>(
        schema: &'a Schema,
        document: &'a QueryDocument,
        variables: Option<&HashMap<String, Value>>,
        operation_name: Option<&str>,
    ) -> Result<ExecutionContext<'a>, Vec<GraphQLError>> {
        build_execution_context(
            schema,
            document,
            RootValue::default(),
            ContextValue::default(),
            variables,
            operation_name,
        )
    }

    fn messages(errors: Vec<GraphQLError>) -> Vec<String> {
        errors.into_iter().map(|e| e.message).collect()
    }

    #[test]
    fn selects_the_only_operation() {
        let schema = schema();
        let document = parse_operation("subscription Ticks { tick(every: 1) }").expect("parses");

        let context = build(&schema, &document, None, None).expect("context builds");

        assert_eq!(context.operation.kind, OperationKind::Subscription);
        assert_eq!(context.operation.name, Some("Ticks"));
    }

    #[test]
    fn requires_operation_name_when_ambiguous() {
        let schema = schema();
        let document =
            parse_operation("subscription A { tick(every: 1) } query B { ping }").expect("parses");

        let errors = build(&schema, &document, None, None)
            .err()
            .expect("ambiguous operations");
        assert_eq!(
            messages(errors),
            vec!["Must provide operation name if query contains multiple operations."]
        );

        let context = build(&schema, &document, None, Some("B")).expect("named operation");
        assert_eq!(context.operation.kind, OperationKind::Query);
    }

    #[test]
    fn reports_unknown_and_missing_operations() {
        let schema = schema();
        let document = parse_operation("subscription A { tick(every: 1) }").expect("parses");
        let errors = build(&schema, &document, None, Some("C"))
            .err()
            .expect("unknown operation");
        assert_eq!(messages(errors), vec!["Unknown operation named \"C\"."]);

        let document = parse_operation("fragment F on Query { ping }").expect("parses");
        let errors = build(&schema, &document, None, None)
            .err()
            .expect("no operation");
        assert_eq!(messages(errors), vec!["Must provide an operation."]);
    }

    #[test]
    fn coerces_variables_into_the_context() {
        let schema = schema();
        let document =
            parse_operation("subscription ($every: Int = 5) { tick(every: $every) }").expect("parses");

        let context = build(&schema, &document, None, None).expect("default applies");
        assert_eq!(context.variable_values.get("every"), Some(&json!(5)));

        let variables = HashMap::from([("every".to_string(), json!("soon"))]);
        let errors = build(&schema, &document, Some(&variables), None)
            .err()
            .expect("invalid variable");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("Variable \"$every\" got invalid value"));
    }

    #[test]
    fn root_type_must_be_configured() {
        let schema = SchemaBuilder::from_sdl("type Query { ping: String }")
            .expect("valid sdl")
            .build();
        let document = parse_operation("subscription { tick }").expect("parses");
        let context = build(&schema, &document, None, None).expect("context builds");

        let error = get_operation_root_type(&schema, &context.operation)
            .expect_err("no subscription root");

        assert_eq!(
            error.message,
            "Schema is not configured to execute subscription operation."
        );
    }

    #[test]
    fn error_cap_truncates_and_reports() {
        let schema = schema();
        let document = parse_operation("{ ping }").expect("parses");
        let context = build(&schema, &document, None, None)
            .expect("context builds")
            .with_limits(None, Some(2));

        for index in 0..5 {
            context.record_error(GraphQLError::new(format!("error {index}")));
        }

        assert_eq!(context.error_count(), 2);
        assert_eq!(
            messages(context.into_errors()),
            vec![
                "error 0",
                "error 1",
                "Too many errors, only the first 2 are reported."
            ]
        );
    }
}
