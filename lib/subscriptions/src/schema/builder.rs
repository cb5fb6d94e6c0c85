use std::sync::Arc;

use graphql_parser::schema::{self as ast, Definition, TypeExtension};
use indexmap::IndexMap;
use tracing::debug;

use crate::{
    execution::values::ast_value_to_json,
    schema::{
        EnumType, FieldDefinition, InputObjectType, InputValueDefinition, InterfaceType,
        ObjectType, Resolver, Schema, SchemaError, SubscribeResolver, TypeDefinition, TypeNode,
        UnionType,
    },
};

/// Builds a [`Schema`] from SDL and attaches resolvers to its fields.
///
/// Root operation types come from the `schema { ... }` definition when present, otherwise from
/// the object types named `Query`, `Mutation` and `Subscription`.
#[derive(Debug)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn from_sdl(sdl: &str) -> Result<Self, SchemaError> {
        let document = graphql_parser::parse_schema::<String>(sdl)
            .map_err(|e| SchemaError::ParseError(e.to_string()))?;
        let mut schema = Schema::with_builtin_scalars();
        let mut explicit_roots = false;
        let mut extensions = Vec::new();

        for definition in document.definitions {
            match definition {
                Definition::SchemaDefinition(schema_definition) => {
                    explicit_roots = true;
                    schema.query_type = schema_definition.query;
                    schema.mutation_type = schema_definition.mutation;
                    schema.subscription_type = schema_definition.subscription;
                }
                Definition::TypeDefinition(type_definition) => {
                    let type_definition = convert_type_definition(type_definition)?;
                    let type_name = type_definition.name().to_string();
                    if schema.types.contains_key(&type_name)
                        && !super::BUILTIN_SCALARS.contains(&type_name.as_str())
                    {
                        return Err(SchemaError::DuplicateType { type_name });
                    }
                    schema.types.insert(type_name, type_definition);
                }
                Definition::TypeExtension(extension) => extensions.push(extension),
                Definition::DirectiveDefinition(_) => {}
            }
        }

        // Extensions may precede the type they extend, so they are applied last.
        for extension in extensions {
            apply_type_extension(&mut schema, extension)?;
        }

        if !explicit_roots {
            let root_name = |name: &str| schema.get_object_type(name).map(|o| o.name.clone());
            let query_type = root_name("Query");
            let mutation_type = root_name("Mutation");
            let subscription_type = root_name("Subscription");
            schema.query_type = query_type;
            schema.mutation_type = mutation_type;
            schema.subscription_type = subscription_type;
        }

        debug!(
            types = schema.types.len(),
            subscription_type = schema.subscription_type.as_deref(),
            "schema built from sdl"
        );

        Ok(SchemaBuilder { schema })
    }

    /// Attaches the resolver that produces `type_name.field_name` during execution.
    pub fn resolver(
        mut self,
        type_name: &str,
        field_name: &str,
        resolver: impl Resolver + 'static,
    ) -> Result<Self, SchemaError> {
        self.field_mut(type_name, field_name)?.resolve = Some(Arc::new(resolver));
        Ok(self)
    }

    /// Attaches the resolver that opens the event source of `type_name.field_name`.
    pub fn subscriber(
        mut self,
        type_name: &str,
        field_name: &str,
        subscriber: impl SubscribeResolver + 'static,
    ) -> Result<Self, SchemaError> {
        self.field_mut(type_name, field_name)?.subscribe = Some(Arc::new(subscriber));
        Ok(self)
    }

    pub fn build(self) -> Schema {
        self.schema
    }

    fn field_mut(
        &mut self,
        type_name: &str,
        field_name: &str,
    ) -> Result<&mut FieldDefinition, SchemaError> {
        let object = match self.schema.types.get_mut(type_name) {
            Some(TypeDefinition::Object(object)) => object,
            Some(_) => {
                return Err(SchemaError::NotAnObjectType {
                    type_name: type_name.to_string(),
                })
            }
            None => {
                return Err(SchemaError::TypeNotFound {
                    type_name: type_name.to_string(),
                })
            }
        };

        object
            .fields
            .get_mut(field_name)
            .ok_or_else(|| SchemaError::FieldNotFoundInType {
                field_name: field_name.to_string(),
                type_name: type_name.to_string(),
            })
    }
}

fn convert_type_definition(
    definition: ast::TypeDefinition<'_, String>,
) -> Result<TypeDefinition, SchemaError> {
    Ok(match definition {
        ast::TypeDefinition::Scalar(scalar) => TypeDefinition::Scalar(scalar.name),
        ast::TypeDefinition::Object(object) => TypeDefinition::Object(ObjectType {
            fields: convert_fields(&object.name, object.fields)?,
            name: object.name,
            interfaces: object.implements_interfaces,
        }),
        ast::TypeDefinition::Interface(interface) => TypeDefinition::Interface(InterfaceType {
            fields: convert_fields(&interface.name, interface.fields)?,
            name: interface.name,
        }),
        ast::TypeDefinition::Union(union) => TypeDefinition::Union(UnionType {
            name: union.name,
            members: union.types,
        }),
        ast::TypeDefinition::Enum(enum_type) => TypeDefinition::Enum(EnumType {
            name: enum_type.name,
            values: enum_type.values.into_iter().map(|v| v.name).collect(),
        }),
        ast::TypeDefinition::InputObject(input) => TypeDefinition::InputObject(InputObjectType {
            fields: convert_input_values(&input.name, input.fields)?,
            name: input.name,
        }),
    })
}

fn apply_type_extension(
    schema: &mut Schema,
    extension: TypeExtension<'_, String>,
) -> Result<(), SchemaError> {
    let extension = match extension {
        TypeExtension::Object(extension) => extension,
        TypeExtension::Scalar(ast::ScalarTypeExtension { name, .. })
        | TypeExtension::Interface(ast::InterfaceTypeExtension { name, .. })
        | TypeExtension::Union(ast::UnionTypeExtension { name, .. })
        | TypeExtension::Enum(ast::EnumTypeExtension { name, .. })
        | TypeExtension::InputObject(ast::InputObjectTypeExtension { name, .. }) => {
            return Err(SchemaError::UnsupportedExtension { type_name: name });
        }
    };

    let fields = convert_fields(&extension.name, extension.fields)?;
    match schema.types.get_mut(&extension.name) {
        Some(TypeDefinition::Object(object)) => {
            object.interfaces.extend(extension.implements_interfaces);
            object.fields.extend(fields);
            Ok(())
        }
        Some(_) => Err(SchemaError::NotAnObjectType {
            type_name: extension.name,
        }),
        None => Err(SchemaError::TypeNotFound {
            type_name: extension.name,
        }),
    }
}

fn convert_fields(
    type_name: &str,
    fields: Vec<ast::Field<'_, String>>,
) -> Result<IndexMap<String, FieldDefinition>, SchemaError> {
    fields
        .into_iter()
        .map(|field| {
            let coordinate = format!("{}.{}", type_name, field.name);
            let definition = FieldDefinition {
                arguments: convert_input_values(&coordinate, field.arguments)?,
                field_type: TypeNode::from(&field.field_type),
                name: field.name.clone(),
                resolve: None,
                subscribe: None,
            };
            Ok((field.name, definition))
        })
        .collect()
}

fn convert_input_values(
    owner: &str,
    values: Vec<ast::InputValue<'_, String>>,
) -> Result<Vec<InputValueDefinition>, SchemaError> {
    values
        .into_iter()
        .map(|input| {
            let default_value = input
                .default_value
                .as_ref()
                .map(|value| ast_value_to_json(value, None))
                .transpose()
                .map_err(|message| SchemaError::InvalidDefaultValue {
                    coordinate: format!("{}.{}", owner, input.name),
                    message,
                })?;

            Ok(InputValueDefinition {
                value_type: TypeNode::from(&input.value_type),
                name: input.name,
                default_value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::context::OperationKind;

    const SDL: &str = r#"
        type Query { ping: String }

        interface Node { id: ID! }

        type Message implements Node {
            id: ID!
            body: String
        }

        union Feed = Message

        enum Priority { LOW HIGH }

        input MessageFilter { priority: Priority = LOW }

        type Subscription {
            messageAdded(filter: MessageFilter, limit: Int = 10): Message!
        }

        extend type Subscription {
            feed: Feed
        }
    "#;

    #[test]
    fn builds_types_and_default_roots() {
        let schema = SchemaBuilder::from_sdl(SDL).expect("valid sdl").build();

        assert_eq!(schema.root_type_name(OperationKind::Query), Some("Query"));
        assert_eq!(schema.root_type_name(OperationKind::Mutation), None);
        assert_eq!(
            schema.root_type_name(OperationKind::Subscription),
            Some("Subscription")
        );

        let subscription = schema
            .get_object_type("Subscription")
            .expect("subscription type exists");
        assert_eq!(
            subscription.fields.keys().collect::<Vec<_>>(),
            vec!["messageAdded", "feed"]
        );

        let message_added = &subscription.fields["messageAdded"];
        assert_eq!(message_added.field_type.to_string(), "Message!");
        assert_eq!(message_added.arguments.len(), 2);
        assert_eq!(
            message_added.arguments[1].default_value,
            Some(serde_json::json!(10))
        );

        assert!(schema.is_possible_type("Node", "Message"));
        assert!(schema.is_possible_type("Feed", "Message"));
        assert!(!schema.is_possible_type("Feed", "Query"));
        assert!(schema.is_input_type("MessageFilter"));
        assert!(schema.is_input_type("Priority"));
        assert!(!schema.is_input_type("Message"));
    }

    #[test]
    fn explicit_schema_definition_wins() {
        let schema = SchemaBuilder::from_sdl(
            r#"
            schema { query: Root subscription: Events }
            type Root { ok: Boolean }
            type Events { tick: Int }
            type Subscription { unused: Int }
            "#,
        )
        .expect("valid sdl")
        .build();

        assert_eq!(
            schema.root_type_name(OperationKind::Subscription),
            Some("Events")
        );
        assert_eq!(schema.root_type_name(OperationKind::Query), Some("Root"));
    }

    #[test]
    fn rejects_resolvers_for_unknown_fields() {
        struct Noop;

        #[async_trait::async_trait]
        impl Resolver for Noop {
            async fn resolve(
                &self,
                _parent: &serde_json::Value,
                _args: &crate::execution::resolve::ArgumentValues,
                _context: &crate::value::ContextValue,
                _info: &crate::execution::resolve::ResolveInfo<'_>,
            ) -> Result<serde_json::Value, crate::response::graphql_error::GraphQLError> {
                Ok(serde_json::Value::Null)
            }
        }

        let builder = SchemaBuilder::from_sdl(SDL).expect("valid sdl");
        let error = builder
            .resolver("Subscription", "missing", Noop)
            .expect_err("field does not exist");

        assert!(matches!(
            error,
            SchemaError::FieldNotFoundInType { ref field_name, ref type_name }
                if field_name == "missing" && type_name == "Subscription"
        ));

        let error = SchemaBuilder::from_sdl(SDL)
            .expect("valid sdl")
            .resolver("Feed", "x", Noop)
            .expect_err("unions have no fields");
        assert!(matches!(error, SchemaError::NotAnObjectType { .. }));
    }

    #[test]
    fn rejects_duplicate_types_and_invalid_sdl() {
        assert!(matches!(
            SchemaBuilder::from_sdl("type A { a: Int } type A { b: Int }"),
            Err(SchemaError::DuplicateType { .. })
        ));
        assert!(matches!(
            SchemaBuilder::from_sdl("type {"),
            Err(SchemaError::ParseError(_))
        ));
    }
}
