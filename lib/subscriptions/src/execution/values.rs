use std::collections::HashMap;

use graphql_parser::query::{Directive, Field, Value as AstValue, VariableDefinition};
use serde_json::{Map, Number, Value};

use crate::{
    execution::resolve::ArgumentValues,
    response::graphql_error::GraphQLError,
    schema::{FieldDefinition, Schema, TypeDefinition, TypeNode},
};

/// Converts a literal from a document into JSON, substituting variables when they are available.
///
/// Without `variables` the literal must be constant (schema defaults, variable defaults).
/// Variables missing from `variables` become `null`.
pub fn ast_value_to_json<'a>(
    value: &AstValue<'a, String>,
    variables: Option<&HashMap<String, Value>>,
) -> Result<Value, String> {
    let json = match value {
        AstValue::Variable(name) => match variables {
            Some(variables) => variables.get(name).cloned().unwrap_or(Value::Null),
            None => return Err(format!("Variable \"${}\" is not allowed here.", name)),
        },
        AstValue::Int(number) => match number.as_i64() {
            Some(int) => Value::Number(int.into()),
            None => return Err("Int literal is out of range.".to_string()),
        },
        AstValue::Float(float) => Number::from_f64(*float)
            .map(Value::Number)
            .ok_or_else(|| format!("Float literal {} is not a finite number.", float))?,
        AstValue::String(string) => Value::String(string.clone()),
        AstValue::Boolean(boolean) => Value::Bool(*boolean),
        AstValue::Null => Value::Null,
        AstValue::Enum(name) => Value::String(name.clone()),
        AstValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| ast_value_to_json(item, variables))
                .collect::<Result<_, _>>()?,
        ),
        AstValue::Object(fields) => {
            let mut object = Map::with_capacity(fields.len());
            for (name, field_value) in fields {
                object.insert(name.clone(), ast_value_to_json(field_value, variables)?);
            }
            Value::Object(object)
        }
    };

    Ok(json)
}

/// Coerces an external input value (a variable or an argument) to `value_type`.
pub fn coerce_input_value(
    schema: &Schema,
    value: &Value,
    value_type: &TypeNode,
) -> Result<Value, String> {
    match value_type {
        TypeNode::NonNull(inner) => {
            if value.is_null() {
                return Err(format!(
                    "Expected non-nullable type \"{}\" not to be null.",
                    value_type
                ));
            }
            coerce_input_value(schema, value, inner)
        }
        _ if value.is_null() => Ok(Value::Null),
        TypeNode::List(inner) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| coerce_input_value(schema, item, inner))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            single => Ok(Value::Array(vec![coerce_input_value(
                schema, single, inner,
            )?])),
        },
        TypeNode::Named(name) => match schema.get_type(name) {
            Some(TypeDefinition::Scalar(scalar)) => coerce_scalar(scalar, value),
            Some(TypeDefinition::Enum(enum_type)) => match value {
                Value::String(candidate) if enum_type.values.contains(candidate) => {
                    Ok(value.clone())
                }
                _ => Err(format!(
                    "Value {} does not exist in \"{}\" enum.",
                    value, enum_type.name
                )),
            },
            Some(TypeDefinition::InputObject(input)) => {
                let Value::Object(fields) = value else {
                    return Err(format!(
                        "Expected type \"{}\" to be an object.",
                        input.name
                    ));
                };

                if let Some(unknown) = fields
                    .keys()
                    .find(|key| !input.fields.iter().any(|field| &field.name == *key))
                {
                    return Err(format!(
                        "Field \"{}\" is not defined by type \"{}\".",
                        unknown, input.name
                    ));
                }

                let mut coerced = Map::with_capacity(input.fields.len());
                for field in &input.fields {
                    match (fields.get(&field.name), &field.default_value) {
                        (Some(field_value), _) => {
                            let field_value =
                                coerce_input_value(schema, field_value, &field.value_type)
                                    .map_err(|message| {
                                        format!("At \"{}.{}\": {}", input.name, field.name, message)
                                    })?;
                            coerced.insert(field.name.clone(), field_value);
                        }
                        (None, Some(default_value)) => {
                            coerced.insert(field.name.clone(), default_value.clone());
                        }
                        (None, None) if field.value_type.is_non_null() => {
                            return Err(format!(
                                "Field \"{}\" of required type \"{}\" was not provided.",
                                field.name, field.value_type
                            ));
                        }
                        (None, None) => {}
                    }
                }
                Ok(Value::Object(coerced))
            }
            Some(other) => Err(format!("Type \"{}\" is not an input type.", other.name())),
            None => Err(format!("Unknown type \"{}\".", name)),
        },
    }
}

fn coerce_scalar(scalar: &str, value: &Value) -> Result<Value, String> {
    match scalar {
        "Int" => match value.as_i64() {
            Some(int) if i32::try_from(int).is_ok() => Ok(value.clone()),
            _ => Err(format!("Int cannot represent non-integer value: {}", value)),
        },
        "Float" => match value {
            Value::Number(_) => Ok(value.clone()),
            _ => Err(format!("Float cannot represent non numeric value: {}", value)),
        },
        "String" => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(format!("String cannot represent a non string value: {}", value)),
        },
        "Boolean" => match value {
            Value::Bool(_) => Ok(value.clone()),
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
    }
}

/// Coerces the raw variables of a request against the operation's variable definitions.
pub fn coerce_variable_values(
    schema: &Schema,
    definitions: &[VariableDefinition<'static, String>],
    inputs: Option<&HashMap<String, Value>>,
) -> Result<HashMap<String, Value>, Vec<GraphQLError>> {
    let mut coerced = HashMap::with_capacity(definitions.len());
    let mut errors = Vec::new();

    for definition in definitions {
        let name = &definition.name;
        let var_type = TypeNode::from(&definition.var_type);
        let invalid =
            |message: String| GraphQLError::new(message).located([definition.position], &[]);

        if !schema.is_input_type(var_type.named_type()) {
            errors.push(invalid(format!(
                "Variable \"${}\" expected value of type \"{}\" which cannot be used as an input type.",
                name, var_type
            )));
            continue;
        }

        match inputs.and_then(|inputs| inputs.get(name)) {
            None => match &definition.default_value {
                Some(default_value) => match ast_value_to_json(default_value, None)
                    .and_then(|value| coerce_input_value(schema, &value, &var_type))
                {
                    Ok(value) => {
                        coerced.insert(name.clone(), value);
                    }
                    Err(message) => errors.push(invalid(format!(
                        "Variable \"${}\" has an invalid default value; {}",
                        name, message
                    ))),
                },
                None if var_type.is_non_null() => errors.push(invalid(format!(
                    "Variable \"${}\" of required type \"{}\" was not provided.",
                    name, var_type
                ))),
                None => {}
            },
            Some(Value::Null) if var_type.is_non_null() => errors.push(invalid(format!(
                "Variable \"${}\" of non-null type \"{}\" must not be null.",
                name, var_type
            ))),
            Some(value) => match coerce_input_value(schema, value, &var_type) {
                Ok(value) => {
                    coerced.insert(name.clone(), value);
                }
                Err(message) => errors.push(invalid(format!(
                    "Variable \"${}\" got invalid value {}; {}",
                    name, value, message
                ))),
            },
        }
    }

    if errors.is_empty() {
        Ok(coerced)
    } else {
        Err(errors)
    }
}

/// Argument values of one field node, defaults applied and variables substituted.
pub fn get_argument_values(
    schema: &Schema,
    field_def: &FieldDefinition,
    field_node: &Field<'static, String>,
    variables: &HashMap<String, Value>,
) -> Result<ArgumentValues, GraphQLError> {
    let mut coerced = ArgumentValues::new();
    let invalid = |message: String| GraphQLError::new(message).located([field_node.position], &[]);

    for argument in &field_def.arguments {
        let name = &argument.name;
        let provided = field_node
            .arguments
            .iter()
            .find_map(|(arg_name, value)| (arg_name == name).then_some(value));

        let value = match provided {
            Some(AstValue::Variable(variable)) if !variables.contains_key(variable) => {
                if let Some(default_value) = &argument.default_value {
                    coerced.insert(name.clone(), default_value.clone());
                } else if argument.value_type.is_non_null() {
                    return Err(invalid(format!(
                        "Argument \"{}\" of required type \"{}\" was provided the variable \"${}\" which was not provided a runtime value.",
                        name, argument.value_type, variable
                    )));
                }
                continue;
            }
            Some(literal) => ast_value_to_json(literal, Some(variables)).map_err(invalid)?,
            None => {
                if let Some(default_value) = &argument.default_value {
                    coerced.insert(name.clone(), default_value.clone());
                } else if argument.value_type.is_non_null() {
                    return Err(invalid(format!(
                        "Argument \"{}\" of required type \"{}\" was not provided.",
                        name, argument.value_type
                    )));
                }
                continue;
            }
        };

        if value.is_null() && argument.value_type.is_non_null() {
            return Err(invalid(format!(
                "Argument \"{}\" of non-null type \"{}\" must not be null.",
                name, argument.value_type
            )));
        }

        let value = coerce_input_value(schema, &value, &argument.value_type).map_err(|message| {
            invalid(format!(
                "Argument \"{}\" has invalid value {}. {}",
                name, value, message
            ))
        })?;
        coerced.insert(name.clone(), value);
    }

    Ok(coerced)
}

/// Evaluates `@skip(if:)` and `@include(if:)` on a selection.
pub fn should_include_node(
    directives: &[Directive<'static, String>],
    variables: &HashMap<String, Value>,
) -> bool {
    let condition = |directive_name: &str| {
        directives
            .iter()
            .find(|directive| directive.name == directive_name)
            .and_then(|directive| {
                directive
                    .arguments
                    .iter()
                    .find_map(|(name, value)| (name == "if").then_some(value))
            })
            .and_then(|value| match value {
                AstValue::Boolean(boolean) => Some(*boolean),
                AstValue::Variable(variable) => variables.get(variable).and_then(Value::as_bool),
                _ => None,
            })
    };

    if condition("skip") == Some(true) {
        return false;
    }

    condition("include") != Some(false)
}
