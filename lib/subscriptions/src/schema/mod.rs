mod builder;
mod error;
mod resolvers;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::execution::context::OperationKind;

pub use builder::SchemaBuilder;
pub use error::SchemaError;
pub use resolvers::{Resolver, SubscribeResolver};

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
    Named(String),
    List(Box<TypeNode>),
    NonNull(Box<TypeNode>),
}

impl TypeNode {
    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeNode::NonNull(_))
    }

    /// The innermost named type, with list and non-null wrappers removed.
    pub fn named_type(&self) -> &str {
        match self {
            TypeNode::Named(name) => name,
            TypeNode::List(inner) | TypeNode::NonNull(inner) => inner.named_type(),
        }
    }
}

impl<'a> From<&graphql_parser::query::Type<'a, String>> for TypeNode {
    fn from(value: &graphql_parser::query::Type<'a, String>) -> Self {
        use graphql_parser::query::Type;

        match value {
            Type::NamedType(name) => TypeNode::Named(name.clone()),
            Type::ListType(inner) => TypeNode::List(Box::new(inner.as_ref().into())),
            Type::NonNullType(inner) => TypeNode::NonNull(Box::new(inner.as_ref().into())),
        }
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Named(name) => write!(f, "{}", name),
            TypeNode::List(inner) => write!(f, "[{}]", inner),
            TypeNode::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputValueDefinition {
    pub name: String,
    pub value_type: TypeNode,
    pub default_value: Option<Value>,
}

/// Schema-side declaration of a field, with the resolvers attached to it.
#[derive(Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub arguments: Vec<InputValueDefinition>,
    pub field_type: TypeNode,
    pub resolve: Option<Arc<dyn Resolver>>,
    pub subscribe: Option<Arc<dyn SubscribeResolver>>,
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .field("field_type", &self.field_type)
            .field("resolve", &self.resolve.is_some())
            .field("subscribe", &self.subscribe.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub interfaces: Vec<String>,
    pub fields: IndexMap<String, FieldDefinition>,
}

#[derive(Debug, Clone)]
pub struct InterfaceType {
    pub name: String,
    pub fields: IndexMap<String, FieldDefinition>,
}

#[derive(Debug, Clone)]
pub struct UnionType {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InputObjectType {
    pub name: String,
    pub fields: Vec<InputValueDefinition>,
}

#[derive(Debug, Clone)]
pub enum TypeDefinition {
    Scalar(String),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Scalar(name) => name,
            TypeDefinition::Object(object) => &object.name,
            TypeDefinition::Interface(interface) => &interface.name,
            TypeDefinition::Union(union) => &union.name,
            TypeDefinition::Enum(enum_type) => &enum_type.name,
            TypeDefinition::InputObject(input) => &input.name,
        }
    }

    pub fn is_input_type(&self) -> bool {
        matches!(
            self,
            TypeDefinition::Scalar(_) | TypeDefinition::Enum(_) | TypeDefinition::InputObject(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    types: HashMap<String, TypeDefinition>,
}

impl Schema {
    fn with_builtin_scalars() -> Self {
        let types = BUILTIN_SCALARS
            .iter()
            .map(|name| (name.to_string(), TypeDefinition::Scalar(name.to_string())))
            .collect();

        Schema {
            query_type: None,
            mutation_type: None,
            subscription_type: None,
            types,
        }
    }

    pub fn root_type_name(&self, kind: OperationKind) -> Option<&str> {
        match kind {
            OperationKind::Query => self.query_type.as_deref(),
            OperationKind::Mutation => self.mutation_type.as_deref(),
            OperationKind::Subscription => self.subscription_type.as_deref(),
        }
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn get_object_type(&self, name: &str) -> Option<&ObjectType> {
        match self.types.get(name) {
            Some(TypeDefinition::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// Whether `object_name` is a member of the union or an implementation of the interface `abstract_name`.
    pub fn is_possible_type(&self, abstract_name: &str, object_name: &str) -> bool {
        match self.types.get(abstract_name) {
            Some(TypeDefinition::Union(union)) => {
                union.members.iter().any(|member| member == object_name)
            }
            Some(TypeDefinition::Interface(_)) => self
                .get_object_type(object_name)
                .is_some_and(|object| object.interfaces.iter().any(|i| i == abstract_name)),
            _ => false,
        }
    }

    pub fn is_input_type(&self, name: &str) -> bool {
        self.types
            .get(name)
            .is_some_and(TypeDefinition::is_input_type)
    }
}
