mod logger;

use std::collections::HashMap;
use std::env;
use std::fs;
use std::process;
use std::sync::Arc;

use hive_subscriptions::{
    execution::context::OperationKind,
    parse_operation,
    stream::{from_stream, EventExecutionError, SourceEventStream},
    subscribe_with, DefaultExecutor, EventStream, ExecutionArgs, ExecutionResult, RootValue,
    SchemaBuilder, Step,
};
use hive_subscriptions_config::{load_config, SubscriptionsConfigError};
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Unable to read {0}: {1}")]
    Read(String, std::io::Error),
    #[error("Invalid JSON in {0}: {1}")]
    Json(String, serde_json::Error),
    #[error("Events file must contain a JSON array")]
    EventsNotAnArray,
    #[error("Variables file must contain a JSON object")]
    VariablesNotAnObject,
    #[error("Invalid schema: {0}")]
    Schema(#[from] hive_subscriptions::schema::SchemaError),
    #[error("Invalid operation: {0}")]
    Operation(String),
    #[error(transparent)]
    Config(#[from] SubscriptionsConfigError),
    #[error("Failed to serialize a result: {0}")]
    Output(serde_json::Error),
}

struct CliArgs {
    schema_path: String,
    operation_path: String,
    events_path: String,
    variables_path: Option<String>,
    operation_name: Option<String>,
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 4 {
        eprintln!(
            "Usage: subscriptions-dev-cli <schema_path> <operation_path> <events_path> [variables_path] [operation_name]"
        );
        eprintln!();
        eprintln!("The events file holds a JSON array. An element shaped like {{\"$error\": \"...\"}} makes the source fail at that point.");
        process::exit(1);
    }

    let cli_args = CliArgs {
        schema_path: args[1].clone(),
        operation_path: args[2].clone(),
        events_path: args[3].clone(),
        variables_path: args.get(4).cloned(),
        operation_name: args.get(5).cloned(),
    };

    match run(cli_args).await {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(error) => {
            eprintln!("{}", error);
            process::exit(1);
        }
    }
}

/// Returns `false` when the subscription could not start or one of its events failed.
async fn run(cli_args: CliArgs) -> Result<bool, CliError> {
    let config = load_config(env::var("SUBSCRIPTIONS_CONFIG_PATH").ok())?;
    logger::configure_logging(&config.log);

    let schema = SchemaBuilder::from_sdl(&read(&cli_args.schema_path)?)?.build();
    let document = parse_operation(&read(&cli_args.operation_path)?)
        .map_err(|error| CliError::Operation(error.to_string()))?;
    let events = read_events(&cli_args.events_path)?;
    info!(events = events.len(), "loaded events");

    // Every root field of the subscription type replays the same events.
    let mut root_value = RootValue::default();
    let root_fields = schema
        .root_type_name(OperationKind::Subscription)
        .and_then(|name| schema.get_object_type(name))
        .map(|root_type| root_type.fields.keys().cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    let events = Arc::new(events);
    for field_name in root_fields {
        let events = events.clone();
        root_value = root_value.with_event_source(field_name, move || -> SourceEventStream {
            Box::new(from_stream(futures::stream::iter(events.as_ref().clone())))
        });
    }

    let mut args =
        ExecutionArgs::new(Arc::new(schema), Arc::new(document)).with_root_value(root_value);
    if let Some(path) = &cli_args.variables_path {
        args = args.with_variable_values(read_variables(path)?);
    }
    if let Some(operation_name) = cli_args.operation_name {
        args = args.with_operation_name(operation_name);
    }

    let executor = Arc::new(DefaultExecutor::new(config.execution));
    let mut responses = match subscribe_with(executor, args).await {
        Ok(responses) => responses,
        Err(error) => {
            print_result(&ExecutionResult::from(error))?;
            return Ok(false);
        }
    };

    let mut delivered = 0usize;
    loop {
        match responses.next().await {
            Ok(Step::Yield(result)) => {
                delivered += 1;
                print_result(&result)?;
            }
            Ok(Step::Done) => {
                debug!(delivered, "event stream completed");
                return Ok(true);
            }
            Err(error) => {
                eprintln!("Event {} failed: {}", delivered + 1, error);
                return Ok(false);
            }
        }
    }
}

fn read(path: &str) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|error| CliError::Read(path.to_string(), error))
}

fn read_json(path: &str) -> Result<Value, CliError> {
    serde_json::from_str(&read(path)?).map_err(|error| CliError::Json(path.to_string(), error))
}

fn read_events(path: &str) -> Result<Vec<Result<Value, EventExecutionError>>, CliError> {
    let Value::Array(events) = read_json(path)? else {
        return Err(CliError::EventsNotAnArray);
    };

    Ok(events
        .into_iter()
        .map(|event| match event.get("$error").and_then(Value::as_str) {
            Some(message) => Err(EventExecutionError::Source(message.to_string())),
            None => Ok(event),
        })
        .collect())
}

fn read_variables(path: &str) -> Result<HashMap<String, Value>, CliError> {
    let Value::Object(variables) = read_json(path)? else {
        return Err(CliError::VariablesNotAnObject);
    };

    Ok(variables.into_iter().collect())
}

fn print_result(result: &ExecutionResult) -> Result<(), CliError> {
    let line = serde_json::to_string(result).map_err(CliError::Output)?;
    println!("{}", line);
    Ok(())
}
