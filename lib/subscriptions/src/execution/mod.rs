pub mod collect;
pub mod context;
pub mod execute;
pub mod resolve;
pub mod values;

use graphql_parser::query::ParseError;

pub type QueryDocument = graphql_parser::query::Document<'static, String>;

#[inline]
pub fn parse_operation(operation: &str) -> Result<QueryDocument, ParseError> {
    graphql_parser::parse_query::<String>(operation).map(|document| document.into_static())
}
