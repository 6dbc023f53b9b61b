use async_trait::async_trait;

use crate::error::PageError;

/// Request/response boundary to the live page. Everything the engine needs
/// from a browser fits behind these five calls, which keeps the pipeline
/// testable without one.
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn url(&self) -> Result<String, PageError>;
    /// Full serialized HTML of the page as currently rendered.
    async fn content(&self) -> Result<String, PageError>;
    /// Whether at least one element matches the selector right now.
    async fn exists(&self, selector: &str) -> Result<bool, PageError>;
    async fn click(&self, selector: &str) -> Result<(), PageError>;
    async fn press_escape(&self) -> Result<(), PageError>;
}

/// Visual capture collaborator. Never assumed fast or available; callers
/// treat failure as a missing artifact, not a failed capture.
#[async_trait]
pub trait ViewCamera: Send + Sync {
    async fn capture_png(&self) -> Result<Vec<u8>, PageError>;
}
