//! The two capabilities the reasoning loop can invoke.

use serde::Deserialize;

use docqa_core::citation::RetrievalResult;
use docqa_core::index::VectorIndex;

use crate::error::ToolFailure;
use crate::retrieval::Synthesizer;

/// Canonical answer after a successful wipe.
pub const WIPED_ANSWER: &str = "Vector store wiped successfully.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Search,
    WipeIndex,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::Search, Tool::WipeIndex];

    pub fn name(self) -> &'static str {
        match self {
            Tool::Search => "knowledge_base_search",
            Tool::WipeIndex => "wipe_vector_store",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tool::Search => {
                "Search the uploaded documents and return an answer with sources. \
                 Input: the search query as plain text, or JSON \
                 {\"query\": \"...\", \"doc_ids\": [\"...\"], \"top_k\": 10} to restrict \
                 the search to specific documents."
            }
            Tool::WipeIndex => {
                "Delete every indexed document and reset the knowledge base. \
                 Use only when explicitly asked to clear or reset. Input: None"
            }
        }
    }

    /// Resolve a model-written tool name; tolerant of case and brackets.
    pub fn from_name(raw: &str) -> Option<Tool> {
        let name = raw
            .trim()
            .trim_matches(|c| matches!(c, '[' | ']' | '`' | '"' | '\''))
            .trim();
        Tool::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// `name: description` lines for the prompt.
    pub fn render_descriptions() -> String {
        Tool::ALL
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_names() -> String {
        Tool::ALL
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// What a successful tool call established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    Retrieved(RetrievalResult),
    Wiped,
}

#[derive(Debug, Clone)]
pub struct Observation {
    pub text: String,
    pub evidence: Evidence,
}

/// Parsed search input.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct SearchInput {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub doc_ids: Option<Vec<String>>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl SearchInput {
    /// JSON object input, or the whole string as the query.
    /// `None` (the model's way of saying "no input") is an empty query.
    pub fn parse(raw: &str) -> SearchInput {
        let raw = raw.trim();
        if raw.starts_with('{') {
            if let Ok(input) = serde_json::from_str::<SearchInput>(raw) {
                return input;
            }
        }
        if raw.eq_ignore_ascii_case("none") {
            return SearchInput::default();
        }
        SearchInput {
            query: raw.to_string(),
            ..SearchInput::default()
        }
    }
}

pub struct Toolbox<'a> {
    synthesizer: Synthesizer<'a>,
    index: &'a dyn VectorIndex,
    default_top_k: usize,
}

impl<'a> Toolbox<'a> {
    pub fn new(
        synthesizer: Synthesizer<'a>,
        index: &'a dyn VectorIndex,
        default_top_k: usize,
    ) -> Self {
        Self {
            synthesizer,
            index,
            default_top_k,
        }
    }

    pub async fn invoke(&self, tool: Tool, input: &str) -> Result<Observation, ToolFailure> {
        match tool {
            Tool::Search => self.search(input).await,
            Tool::WipeIndex => self.wipe().await,
        }
    }

    async fn search(&self, raw: &str) -> Result<Observation, ToolFailure> {
        let input = SearchInput::parse(raw);
        let top_k = input.top_k.unwrap_or(self.default_top_k).max(1);
        let result = self
            .synthesizer
            .answer(&input.query, input.doc_ids.as_deref(), top_k)
            .await
            .map_err(|e| ToolFailure {
                tool: Tool::Search.name(),
                message: format!("Error in knowledge search: {:#}", e),
            })?;
        Ok(Observation {
            text: result.to_string(),
            evidence: Evidence::Retrieved(result),
        })
    }

    async fn wipe(&self) -> Result<Observation, ToolFailure> {
        self.index
            .wipe_and_reset()
            .await
            .map_err(|e| ToolFailure {
                tool: Tool::WipeIndex.name(),
                message: format!("Failed to wipe vector store: {:#}", e),
            })?;
        tracing::info!("vector store wiped by agent");
        Ok(Observation {
            text: WIPED_ANSWER.to_string(),
            evidence: Evidence::Wiped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_resolve_loosely() {
        assert_eq!(Tool::from_name("knowledge_base_search"), Some(Tool::Search));
        assert_eq!(Tool::from_name(" [Wipe_Vector_Store] "), Some(Tool::WipeIndex));
        assert_eq!(Tool::from_name("web_search"), None);
        assert_eq!(Tool::render_names(), "knowledge_base_search, wipe_vector_store");
    }

    #[test]
    fn test_search_input_forms() {
        assert_eq!(SearchInput::parse("warranty terms").query, "warranty terms");
        assert_eq!(SearchInput::parse("None"), SearchInput::default());

        let json = SearchInput::parse(r#"{"query": "fees", "doc_ids": ["d1"], "top_k": 3}"#);
        assert_eq!(json.query, "fees");
        assert_eq!(json.doc_ids, Some(vec!["d1".to_string()]));
        assert_eq!(json.top_k, Some(3));

        // A UUID-shaped query is just a query.
        let uuid = "123e4567-e89b-12d3-a456-426614174000";
        let input = SearchInput::parse(uuid);
        assert_eq!(input.query, uuid);
        assert_eq!(input.doc_ids, None);

        // Broken JSON falls back to plain text.
        assert_eq!(SearchInput::parse("{not json").query, "{not json");
    }
}
