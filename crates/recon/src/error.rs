use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty candidate list, duplicate header, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A join key column could not be resolved in a table that requires one.
    #[error("table '{table}': no column matches any of {candidates:?}")]
    MissingKeyColumn { table: String, candidates: Vec<String> },
    /// Malformed CSV data.
    #[error("table '{table}': {message}")]
    Csv { table: String, message: String },
    /// IO error (file read/write).
    #[error("IO error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_column_names_candidates() {
        let err = LinkError::MissingKeyColumn {
            table: "pull_requests".into(),
            candidates: vec!["pr_id".into(), "id".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("pull_requests"));
        assert!(msg.contains("\"pr_id\""));
    }
}
