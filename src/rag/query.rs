use thiserror::Error;

use crate::core::errors::ApiError;

#[derive(Debug, Error)]
pub enum QueryError {
    /// Rejected before any provider is called.
    #[error("{0}")]
    InvalidQuery(String),
    #[error("{stage} failed: {source}")]
    UpstreamFailure {
        stage: &'static str,
        #[source]
        source: ApiError,
    },
}

impl QueryError {
    pub fn upstream(stage: &'static str) -> impl FnOnce(ApiError) -> QueryError {
        move |source| QueryError::UpstreamFailure { stage, source }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidQuery(msg) => ApiError::BadRequest(msg),
            failure @ QueryError::UpstreamFailure { .. } => ApiError::Upstream(failure.to_string()),
        }
    }
}

/// Trims `raw` and rejects empty input or input longer than `max_chars` characters.
pub fn sanitize_query(raw: &str, max_chars: usize) -> Result<String, QueryError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().count() > max_chars {
        return Err(QueryError::InvalidQuery(format!(
            "Query must be non-empty and at most {} characters.",
            max_chars
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_valid_queries() {
        assert_eq!(
            sanitize_query("  Which outlets open at 8am?\n", 500).unwrap(),
            "Which outlets open at 8am?"
        );
    }

    #[test]
    fn rejects_blank_and_oversized_queries() {
        assert!(matches!(sanitize_query("", 500), Err(QueryError::InvalidQuery(_))));
        assert!(matches!(sanitize_query(" \t\n ", 500), Err(QueryError::InvalidQuery(_))));
        assert!(matches!(
            sanitize_query(&"a".repeat(501), 500),
            Err(QueryError::InvalidQuery(_))
        ));
        assert!(sanitize_query(&"a".repeat(500), 500).is_ok());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let query = "é".repeat(500);
        assert!(sanitize_query(&query, 500).is_ok());
    }

    #[test]
    fn maps_to_api_errors() {
        let bad: ApiError = QueryError::InvalidQuery("nope".to_string()).into();
        assert!(matches!(bad, ApiError::BadRequest(msg) if msg == "nope"));

        let upstream: ApiError =
            QueryError::upstream("embedding")(ApiError::Upstream("timeout".to_string())).into();
        assert!(matches!(upstream, ApiError::Upstream(msg) if msg.contains("embedding")));
    }
}
