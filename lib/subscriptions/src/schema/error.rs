#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to parse schema: {0}")]
    ParseError(String),
    #[error("Type '{type_name}' is defined more than once.")]
    DuplicateType { type_name: String },
    #[error("Type '{type_name}' not found.")]
    TypeNotFound { type_name: String },
    #[error("Type '{type_name}' is not an object type.")]
    NotAnObjectType { type_name: String },
    #[error("Field '{field_name}' not found in type '{type_name}'.")]
    FieldNotFoundInType {
        field_name: String,
        type_name: String,
    },
    #[error("Invalid default value for '{coordinate}': {message}")]
    InvalidDefaultValue { coordinate: String, message: String },
    #[error("Extending '{type_name}' is not supported, only object types can be extended.")]
    UnsupportedExtension { type_name: String },
}
