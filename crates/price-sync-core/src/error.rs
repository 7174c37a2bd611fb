#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[cfg(feature = "network")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad config: {0}")]
    Config(String),

    #[error("bad baseline: {0}")]
    Baseline(String),

    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let e = SyncError::Api {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(e.to_string(), "API error (HTTP 502): bad gateway");
    }

    #[test]
    fn json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
        let e: SyncError = err.into();
        assert!(e.to_string().starts_with("JSON parse error:"));
    }
}
