//! Error types that cross the service boundary.
//!
//! Internals use `anyhow`; these typed errors mark the two failures the
//! HTTP layer maps to distinct statuses.

use thiserror::Error;

/// Ingestion failed: the document could not be read, structured, embedded,
/// or stored. Maps to 422.
#[derive(Debug, Error)]
#[error("Could not process the uploaded document: {source}")]
pub struct DocumentProcessingError {
    pub doc_id: String,
    #[source]
    pub source: anyhow::Error,
}

impl DocumentProcessingError {
    pub fn new(doc_id: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            doc_id: doc_id.into(),
            source,
        }
    }
}

/// The reasoning loop failed outright (not a timeout or iteration cap,
/// which still produce an answer). Maps to 500.
#[derive(Debug, Error)]
#[error("An error occurred in the agent: {0}")]
pub struct AgentError(#[source] pub anyhow::Error);

/// A tool call failed. Rendered into the observation the model sees.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ToolFailure {
    pub tool: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = DocumentProcessingError::new("d1", anyhow::anyhow!("bad xref"));
        assert_eq!(
            e.to_string(),
            "Could not process the uploaded document: bad xref"
        );
        assert_eq!(e.doc_id, "d1");

        let e = AgentError(anyhow::anyhow!("model unreachable"));
        assert_eq!(e.to_string(), "An error occurred in the agent: model unreachable");
    }
}
