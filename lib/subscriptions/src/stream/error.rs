/// Failure of a single pull from a subscription's event stream.
///
/// Scoped to the `next()` call that surfaced it. Field-level errors of an execution pass are not
/// represented here, they are part of the `ExecutionResult`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EventExecutionError {
    #[error("Event source failed: {0}")]
    Source(String),
    #[error("Failed to execute event: {0}")]
    Execution(String),
    #[error("Subscription aborted: {0}")]
    Aborted(String),
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Event stream was closed by its consumer")]
pub struct StreamClosed;
