use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    execution::{
        execute::{ExecutionRequest, Executor},
        parse_operation,
        resolve::{ArgumentValues, ResolveInfo},
        QueryDocument,
    },
    response::{
        execution_result::ExecutionResult,
        graphql_error::{GraphQLError, GraphQLErrorPathSegment},
    },
    schema::{Schema, SchemaBuilder, SubscribeResolver},
    stream::{EventExecutionError, EventStream, SourceEventStream, Step},
    subscribe::ExecutionArgs,
    value::{ContextValue, RootValue},
};

pub const CHAT_SDL: &str = include_str!("chat.graphql");

pub fn chat_schema() -> Schema {
    SchemaBuilder::from_sdl(CHAT_SDL)
        .expect("chat schema is valid")
        .build()
}

pub fn args(schema: Schema, operation: &str) -> ExecutionArgs {
    let document: QueryDocument = parse_operation(operation).expect("operation parses");
    ExecutionArgs::new(Arc::new(schema), Arc::new(document))
}

/// Counts the calls a subscription makes into its event source.
#[derive(Debug, Default, Clone)]
pub struct SourceProbe {
    pulls: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl SourceProbe {
    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// A source that yields `events` in order, then completes.
    pub fn source(&self, events: Vec<Result<Value, EventExecutionError>>) -> SourceEventStream {
        Box::new(CountingSource {
            events: events.into_iter(),
            probe: self.clone(),
        })
    }
}

struct CountingSource {
    events: std::vec::IntoIter<Result<Value, EventExecutionError>>,
    probe: SourceProbe,
}

#[async_trait]
impl EventStream for CountingSource {
    type Item = Value;
    type Error = EventExecutionError;

    async fn next(&mut self) -> Result<Step<Value>, EventExecutionError> {
        self.probe.pulls.fetch_add(1, Ordering::SeqCst);
        match self.events.next() {
            Some(event) => event.map(Step::Yield),
            None => Ok(Step::Done),
        }
    }

    async fn close(&mut self) -> Result<(), EventExecutionError> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        self.events = Vec::new().into_iter();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeCall {
    pub field_name: String,
    pub args: ArgumentValues,
    pub path: Vec<GraphQLErrorPathSegment>,
}

/// Hands out a prepared event source to the first subscriber and records what it was given.
#[derive(Default)]
pub struct PreparedSource {
    source: Mutex<Option<SourceEventStream>>,
    pub seen: Mutex<Vec<SubscribeCall>>,
}

impl PreparedSource {
    pub fn new(source: SourceEventStream) -> Self {
        PreparedSource {
            source: Mutex::new(Some(source)),
            seen: Mutex::default(),
        }
    }
}

#[async_trait]
impl SubscribeResolver for PreparedSource {
    async fn subscribe(
        &self,
        _root: &RootValue,
        args: &ArgumentValues,
        _context: &ContextValue,
        info: &ResolveInfo<'_>,
    ) -> Result<SourceEventStream, GraphQLError> {
        self.seen
            .lock()
            .expect("lock is not poisoned")
            .push(SubscribeCall {
                field_name: info.field_name.to_string(),
                args: args.clone(),
                path: info.path.to_vec(),
            });
        self.source
            .lock()
            .expect("lock is not poisoned")
            .take()
            .ok_or_else(|| GraphQLError::new("source already taken"))
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub schema: usize,
    pub document: usize,
    pub root_value: Value,
    pub context_value: ContextValue,
    pub variable_values: Option<HashMap<String, Value>>,
    pub operation_name: Option<String>,
}

/// Executor double that answers `{ "event": <root value> }` and records every request.
#[derive(Default)]
pub struct RecordingExecutor {
    requests: Mutex<Vec<RecordedRequest>>,
    reject_call: Option<usize>,
}

impl RecordingExecutor {
    /// Rejects the `index`-th call (zero based).
    pub fn rejecting(index: usize) -> Self {
        RecordingExecutor {
            reject_call: Some(index),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock is not poisoned").clone()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
    ) -> Result<ExecutionResult, EventExecutionError> {
        let call = {
            let mut requests = self.requests.lock().expect("lock is not poisoned");
            requests.push(RecordedRequest {
                schema: request.schema as *const Schema as usize,
                document: request.document as *const QueryDocument as usize,
                root_value: request.root_value.data().clone(),
                context_value: request.context_value.clone(),
                variable_values: request.variable_values.cloned(),
                operation_name: request.operation_name.map(str::to_string),
            });
            requests.len() - 1
        };

        if self.reject_call == Some(call) {
            return Err(EventExecutionError::Execution(format!("call {} failed", call)));
        }

        Ok(ExecutionResult::from_data(
            json!({ "event": request.root_value.data() }),
        ))
    }
}
