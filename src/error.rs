use thiserror::Error;

/// Fatal capture failures. Everything else degrades into the record or the
/// per-artifact report instead of aborting the run.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no record producible: {reason}")]
    NoRecordProducible { reason: String },
    #[error("bundle delivery failed: {reason}")]
    BundleDeliveryFailure { reason: String },
}

/// Live-page driver failures (navigation, DOM probes, screenshots).
#[derive(Debug, Error)]
pub enum PageError {
    #[error("browser driver: {0}")]
    Driver(String),
    #[error("screenshot: {0}")]
    Screenshot(String),
}

/// Artifact write failures reported by the sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SinkError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        SinkError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
