use crate::error::AppError;

/// A long-lived component owned by the [`App`](crate::App).
///
/// Services are constructed once at process start and torn down, in reverse
/// registration order, when the process exits.
pub trait Service: Send {
    /// Human-readable name used in logs
    fn name(&self) -> &str;

    /// Stop background work and release resources
    fn shutdown(&mut self) -> Result<(), AppError>;
}
