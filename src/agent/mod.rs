//! Bounded ReAct reasoning loop.
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            ▼                                              │
//!   THINKING ──▶ parse ──┬─ Act ──▶ ACTING ──▶ OBSERVING ───┘
//!       │                ├─ Finish ─────────────────────────▶ FINAL_ANSWER
//!       │                └─ error ──▶ observation "Invalid Format: .." ─┘
//!       └─ iteration cap / deadline ─────────────────────────▶ FORCED_STOP
//! ```
//!
//! | Bound | Default | On exhaustion |
//! |-------|---------|---------------|
//! | `max_iterations` | 3 | [`StopReason::MaxIterations`] |
//! | `timeout` (whole question) | 10s | [`StopReason::Timeout`] |
//!
//! The deadline wraps every generator and tool call with
//! [`tokio::time::timeout_at`], so an in-flight call is cancelled (its
//! future dropped) rather than awaited. Every outcome, forced or not, is
//! built by [`EvidenceLog::resolve`] and is one of the three canonical
//! answers. Only a generator failure ends the loop with an error.

pub mod answer;
pub mod parse;
pub mod tools;

use anyhow::Context;
use serde::Serialize;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::error::AgentError;
use crate::generation::{GenerationRequest, Generator};
use crate::prompt::PromptTemplate;

use answer::EvidenceLog;
use parse::{parse_step, Step};
use tools::{Tool, Toolbox};

pub use answer::FinalAnswer;
pub use tools::WIPED_ANSWER;

const REACT_TEMPLATE: &str = "\
You are an assistant that answers questions about the user's uploaded documents.

Your final answer MUST be exactly one of these three forms:

1. When the documents contain the answer:
Based on the documents: <concise answer>
Sources:
- Document <id>, Page <number>

2. When they do not:
No relevant information found in the documents.

3. When you cleared the knowledge base:
Vector store wiped successfully.

You have access to the following tools:

{tools}

Use this format:

Question: the question you must answer
Thought: one sentence about what to do next
Action: the tool to use, one of [{tool_names}]
Action Input: the input to the tool
Observation: the result of the tool
... (Thought/Action/Action Input/Observation may repeat a few times)
Thought: I now know the final answer
Final Answer: one of the three forms above

Prefer giving a final answer over searching again.

Begin!

Question: {input}
Thought:{agent_scratchpad}";

const STOP_SEQUENCES: &[&str] = &["\nObservation:"];

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    FinalAnswer,
    MaxIterations,
    Timeout,
}

/// Result of one `ask`.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub stop_reason: StopReason,
    /// Completed think/act cycles.
    pub steps: usize,
}

/// One think/act/observe cycle.
#[derive(Debug, Clone)]
pub struct AgentStep {
    pub thought: String,
    pub action: Option<Tool>,
    pub action_input: String,
    pub observation: String,
}

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub max_iterations: usize,
    pub timeout: Duration,
}

pub struct ReasoningLoop<'a> {
    generator: &'a dyn Generator,
    toolbox: Toolbox<'a>,
    settings: LoopSettings,
    template: PromptTemplate,
}

impl<'a> ReasoningLoop<'a> {
    pub fn new(generator: &'a dyn Generator, toolbox: Toolbox<'a>, settings: LoopSettings) -> Self {
        Self {
            generator,
            toolbox,
            settings,
            template: PromptTemplate::new(REACT_TEMPLATE),
        }
    }

    pub async fn run(&self, question: &str) -> Result<Answer, AgentError> {
        let deadline = Instant::now() + self.settings.timeout;
        let descriptions = Tool::render_descriptions();
        let names = Tool::render_names();

        let mut trace: Vec<AgentStep> = Vec::new();
        let mut scratchpad = String::new();
        let mut evidence = EvidenceLog::default();
        let mut claim: Option<String> = None;

        let stop_reason = loop {
            if trace.len() >= self.settings.max_iterations {
                break StopReason::MaxIterations;
            }

            let prompt = self
                .template
                .render(&[
                    ("tools", descriptions.as_str()),
                    ("tool_names", names.as_str()),
                    ("input", question),
                    ("agent_scratchpad", scratchpad.as_str()),
                ])
                .map_err(AgentError)?;

            let request = GenerationRequest::new(&prompt).with_stop(STOP_SEQUENCES);
            let output = match timeout_at(deadline, self.generator.generate(request)).await {
                Err(_) => break StopReason::Timeout,
                Ok(result) => result
                    .context("Generation provider failed")
                    .map_err(AgentError)?,
            };

            let step = match parse_step(&output) {
                Ok(Step::Finish { thought, text }) => {
                    tracing::debug!(%thought, "final answer proposed");
                    claim = Some(text);
                    break StopReason::FinalAnswer;
                }
                Ok(Step::Act {
                    thought,
                    tool: tool_name,
                    input,
                }) => {
                    let tool = Tool::from_name(&tool_name);
                    let observation = match tool {
                        None => format!(
                            "{} is not a valid tool, try one of [{}].",
                            tool_name, names
                        ),
                        Some(tool) => {
                            match timeout_at(deadline, self.toolbox.invoke(tool, &input)).await {
                                Err(_) => break StopReason::Timeout,
                                Ok(Ok(obs)) => {
                                    evidence.record(&obs.evidence);
                                    obs.text
                                }
                                Ok(Err(failure)) => {
                                    tracing::warn!(
                                        tool = failure.tool,
                                        error = %failure,
                                        "tool failed"
                                    );
                                    failure.to_string()
                                }
                            }
                        }
                    };
                    AgentStep {
                        thought,
                        action: tool,
                        action_input: input,
                        observation,
                    }
                }
                Err(e) => AgentStep {
                    thought: String::new(),
                    action: None,
                    action_input: String::new(),
                    observation: e.to_string(),
                },
            };

            tracing::debug!(
                step = trace.len() + 1,
                action = step.action.map(Tool::name).unwrap_or("none"),
                input = %step.action_input,
                "agent step"
            );
            scratchpad.push_str(output.trim_end());
            scratchpad.push_str("\nObservation: ");
            scratchpad.push_str(&step.observation);
            scratchpad.push_str("\nThought:");
            trace.push(step);
        };

        let answer = evidence.resolve(claim.as_deref());
        tracing::info!(?stop_reason, steps = trace.len(), "agent finished");
        Ok(Answer {
            answer: answer.to_string(),
            stop_reason,
            steps: trace.len(),
        })
    }
}
