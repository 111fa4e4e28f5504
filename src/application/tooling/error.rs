use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("request to {service} failed: {source}")]
    Http {
        service: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned an error: {message}")]
    Upstream { service: String, message: String },
    #[error("{0}")]
    Failed(String),
}
