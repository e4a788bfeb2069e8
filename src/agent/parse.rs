//! Parse one model turn of the ReAct protocol.
//!
//! A turn is either an action:
//!
//! ```text
//! Thought: I should search for the warranty terms.
//! Action: knowledge_base_search
//! Action Input: warranty period
//! ```
//!
//! or a final answer:
//!
//! ```text
//! Thought: I have what I need.
//! Final Answer: Based on the documents: ...
//! ```
//!
//! Anything else is a [`ParseError`], which the loop feeds back to the
//! model as an observation.

use std::fmt;

const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";
const FINAL_ANSWER: &str = "Final Answer:";
const OBSERVATION: &str = "\nObservation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Act {
        thought: String,
        tool: String,
        input: String,
    },
    Finish {
        thought: String,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    message: String,
}

impl ParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid Format: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub fn parse_step(output: &str) -> Result<Step, ParseError> {
    // The model sometimes invents its own observation; ignore it.
    let output = match output.find(OBSERVATION) {
        Some(pos) => &output[..pos],
        None => output,
    };

    let action = find_marker(output, ACTION);
    let final_answer = output.find(FINAL_ANSWER);

    match (action, final_answer) {
        (Some(_), Some(_)) => Err(ParseError::new(
            "Both an action and a final answer were given; give exactly one.",
        )),
        (None, Some(pos)) => {
            let text = output[pos + FINAL_ANSWER.len()..].trim();
            if text.is_empty() {
                return Err(ParseError::new("'Final Answer:' is empty."));
            }
            Ok(Step::Finish {
                thought: thought(&output[..pos]),
                text: text.to_string(),
            })
        }
        (Some(pos), None) => {
            let after = &output[pos + ACTION.len()..];
            let input_pos = after
                .find(ACTION_INPUT)
                .ok_or_else(|| ParseError::new("Missing 'Action Input:' after 'Action:'."))?;
            let tool = after[..input_pos].trim();
            if tool.is_empty() {
                return Err(ParseError::new("'Action:' names no tool."));
            }
            let input = after[input_pos + ACTION_INPUT.len()..].trim();
            Ok(Step::Act {
                thought: thought(&output[..pos]),
                tool: tool.to_string(),
                input: unquote(input).to_string(),
            })
        }
        (None, None) => Err(ParseError::new(
            "Missing 'Action:' or 'Final Answer:' after 'Thought:'.",
        )),
    }
}

/// Position of a line-leading `marker`, skipping `Action Input:`.
fn find_marker(text: &str, marker: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with(marker) && !trimmed.starts_with(ACTION_INPUT) {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

fn thought(prefix: &str) -> String {
    let t = prefix.trim();
    t.strip_prefix("Thought:").unwrap_or(t).trim().to_string()
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    for q in ['"', '\'', '`'] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return s[1..s.len() - 1].trim();
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action() {
        let step = parse_step(
            "Thought: look it up\nAction: knowledge_base_search\nAction Input: \"warranty\"",
        )
        .unwrap();
        assert_eq!(
            step,
            Step::Act {
                thought: "look it up".into(),
                tool: "knowledge_base_search".into(),
                input: "warranty".into(),
            }
        );
    }

    #[test]
    fn test_json_action_input_kept_whole() {
        let step = parse_step(
            "Action: knowledge_base_search\nAction Input: {\"query\": \"x\",\n \"top_k\": 2}",
        )
        .unwrap();
        match step {
            Step::Act { input, .. } => assert_eq!(input, "{\"query\": \"x\",\n \"top_k\": 2}"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_final_answer_multiline() {
        let step = parse_step(
            "Thought: done\nFinal Answer: Based on the documents: yes\nSources:\n- Document a, Page 1",
        )
        .unwrap();
        assert_eq!(
            step,
            Step::Finish {
                thought: "done".into(),
                text: "Based on the documents: yes\nSources:\n- Document a, Page 1".into(),
            }
        );
    }

    #[test]
    fn test_invented_observation_is_dropped() {
        let step = parse_step(
            "Action: wipe_vector_store\nAction Input: None\nObservation: done\nFinal Answer: x",
        )
        .unwrap();
        assert!(matches!(step, Step::Act { ref tool, .. } if tool == "wipe_vector_store"));
    }

    #[test]
    fn test_malformed_turns() {
        let both = parse_step("Action: a\nAction Input: b\nFinal Answer: c").unwrap_err();
        assert!(both.to_string().starts_with("Invalid Format"));
        assert!(parse_step("I think the answer is 42").is_err());
        assert!(parse_step("Action: knowledge_base_search").is_err());
        assert!(parse_step("Final Answer:   ").is_err());
    }
}
