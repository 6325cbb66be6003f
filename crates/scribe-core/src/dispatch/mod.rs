//! Recognize one segment: providers and the registry-backed dispatcher.
//!
//! The scheduler only needs `Recognize`. `ServiceDispatcher` implements it by
//! picking a service from the registry per call and failing over to another
//! service when a provider errors or returns nothing.

mod command;
mod dispatcher;

use async_trait::async_trait;
use std::path::Path;

use crate::error::TransportError;

pub use command::CommandProvider;
pub use dispatcher::ServiceDispatcher;

/// The capability the scheduler runs per segment.
///
/// `Ok(None)` means the call completed but produced no text.
#[async_trait]
pub trait Recognize: Send + Sync {
    async fn recognize(&self, segment: &Path) -> Result<Option<String>, TransportError>;
}

/// One interchangeable recognition backend.
#[async_trait]
pub trait RecognitionProvider: Send + Sync {
    /// Registry name for this provider.
    fn name(&self) -> &str;

    async fn recognize(&self, segment: &Path) -> Result<Option<String>, TransportError>;
}
