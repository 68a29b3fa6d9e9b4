use thiserror::Error;

use crate::queue::ShutdownRejected;

#[derive(Debug, Error)]
pub enum TandemError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid queue capacity {0}: capacity must be greater than zero")]
    InvalidCapacity(usize),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("queue is shutting down; no new values accepted")]
    QueueShutdown,
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<TandemError>,
    },
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl TandemError {
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Builds a [`TandemError::WorkerPanicked`] from a thread join payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send + 'static>) -> Self {
        let details = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic payload".to_string()
        };

        Self::WorkerPanicked(details)
    }
}

impl<T> From<ShutdownRejected<T>> for TandemError {
    fn from(_rejected: ShutdownRejected<T>) -> Self {
        Self::QueueShutdown
    }
}
