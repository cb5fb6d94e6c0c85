use graphql_parser::Pos;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<GraphQLErrorLocation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<GraphQLErrorPathSegment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        message.into().into()
    }

    /// Sets `extensions.code`, keeping other extension entries.
    pub fn with_code(mut self, code: &str) -> Self {
        let extensions = self
            .extensions
            .get_or_insert_with(|| Value::Object(Default::default()));
        if let Value::Object(map) = extensions {
            map.insert("code".to_string(), Value::String(code.to_string()));
        }
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(Value::as_str)
    }

    /// Attaches the response path and the source locations of the field nodes that caused the error.
    /// Already located errors keep their original location.
    pub fn located(
        mut self,
        positions: impl IntoIterator<Item = Pos>,
        path: &[GraphQLErrorPathSegment],
    ) -> Self {
        if self.path.is_none() && !path.is_empty() {
            self.path = Some(path.to_vec());
        }
        if self.locations.is_none() {
            let locations: Vec<GraphQLErrorLocation> =
                positions.into_iter().map(Into::into).collect();
            if !locations.is_empty() {
                self.locations = Some(locations);
            }
        }
        self
    }
}

impl From<String> for GraphQLError {
    fn from(message: String) -> Self {
        GraphQLError {
            message,
            locations: None,
            path: None,
            extensions: None,
        }
    }
}

impl From<&str> for GraphQLError {
    fn from(message: &str) -> Self {
        message.to_string().into()
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GraphQLErrorLocation {
    pub line: usize,
    pub column: usize,
}

impl From<Pos> for GraphQLErrorLocation {
    fn from(pos: Pos) -> Self {
        GraphQLErrorLocation {
            line: pos.line,
            column: pos.column,
        }
    }
}

/// A response key or a list index. Serialized as a bare string or number.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum GraphQLErrorPathSegment {
    String(String),
    Index(usize),
}

impl From<&str> for GraphQLErrorPathSegment {
    fn from(value: &str) -> Self {
        GraphQLErrorPathSegment::String(value.to_string())
    }
}

impl From<usize> for GraphQLErrorPathSegment {
    fn from(value: usize) -> Self {
        GraphQLErrorPathSegment::Index(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_path_segments_as_plain_values() {
        let error = GraphQLError::new("boom").located(
            [Pos { line: 2, column: 3 }],
            &["items".into(), 1.into(), "name".into()],
        );

        let serialized = serde_json::to_string(&error).expect("error serializes");

        assert_eq!(
            serialized,
            r#"{"message":"boom","locations":[{"line":2,"column":3}],"path":["items",1,"name"]}"#
        );
    }

    #[test]
    fn deserializes_mixed_path() {
        let error: GraphQLError =
            serde_json::from_str(r#"{"message":"x","path":["a",0]}"#).expect("valid error");

        assert_eq!(
            error.path,
            Some(vec![
                GraphQLErrorPathSegment::String("a".to_string()),
                GraphQLErrorPathSegment::Index(0)
            ])
        );
    }

    #[test]
    fn with_code_keeps_existing_extensions() {
        let mut error = GraphQLError::new("x");
        error.extensions = Some(serde_json::json!({ "retry": true }));
        let error = error.with_code("BAD_USER_INPUT");

        assert_eq!(error.code(), Some("BAD_USER_INPUT"));
        assert_eq!(
            error.extensions.as_ref().and_then(|e| e.get("retry")),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn located_does_not_override_existing_path() {
        let error = GraphQLError {
            path: Some(vec!["inner".into()]),
            ..GraphQLError::new("x")
        }
        .located([], &["outer".into()]);

        assert_eq!(error.path, Some(vec!["inner".into()]));
        assert_eq!(error.locations, None);
    }
}
