//! Typed operations as an alternative to submitting bare futures.

use async_trait::async_trait;

/// A reusable unit of work that can be submitted with
/// [`Scheduler::submit_operation`](crate::core::Scheduler::submit_operation).
///
/// Closures and `async` blocks go through [`Scheduler::submit`]; implement this
/// trait when the work carries its own state and is built in one place but
/// submitted from another (an ingest row, an inbound event).
///
/// [`Scheduler::submit`]: crate::core::Scheduler::submit
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use slotgate::core::Operation;
///
/// struct UploadRow {
///     line: usize,
///     raw: String,
/// }
///
/// #[async_trait]
/// impl Operation for UploadRow {
///     type Output = usize;
///     type Error = String;
///
///     async fn run(self) -> Result<usize, String> {
///         if self.raw.is_empty() {
///             return Err(format!("line {} is empty", self.line));
///         }
///         Ok(self.raw.len())
///     }
/// }
/// ```
#[async_trait]
pub trait Operation: Send + 'static {
    /// Success value.
    type Output: Send + 'static;
    /// Task-defined error, delivered as [`TaskError::Failed`](crate::core::TaskError::Failed).
    type Error: Send + 'static;

    /// Run to completion.
    async fn run(self) -> Result<Self::Output, Self::Error>;
}
