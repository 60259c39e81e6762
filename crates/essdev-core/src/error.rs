use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EssdevError {
    #[error("payload file {} is not valid JSON; fix or delete it", path.display())]
    MalformedPayload {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("payload key '{key}' has an unexpected type: expected a JSON object")]
    InvalidShape { key: String },

    #[error("timed out after {}s waiting for lock {}", timeout.as_secs_f64(), path.display())]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error(
        "missing dispatch configuration: {missing} not set (both GH_DISPATCH_TOKEN and GH_DISPATCH_URL are required)"
    )]
    MissingDispatchConfig { missing: String },

    #[error("dispatch to {url} returned {status}: {body}")]
    DispatchFailed {
        url: String,
        status: u16,
        body: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, EssdevError>;
