//! Building the final answer from evidence.
//!
//! The loop's answer is always one of three shapes. Which one is decided by
//! what the tools actually returned; the model's closing text only chooses
//! among shapes the evidence supports and supplies the prose of a found
//! answer. Citations always come from retrieval.

use std::fmt;

use docqa_core::citation::{RetrievalResult, NOT_FOUND_ANSWER};

use crate::retrieval::{says_not_found, strip_answer_frame};

use super::tools::{Evidence, WIPED_ANSWER};

/// Evidence gathered over one question.
#[derive(Debug, Default)]
pub struct EvidenceLog {
    /// Latest found retrieval since the last wipe.
    found: Option<RetrievalResult>,
    wiped: bool,
}

impl EvidenceLog {
    pub fn record(&mut self, evidence: &Evidence) {
        match evidence {
            Evidence::Retrieved(result @ RetrievalResult::Found { .. }) => {
                self.found = Some(result.clone())
            }
            Evidence::Retrieved(RetrievalResult::NotFound) => {}
            Evidence::Wiped => {
                self.found = None;
                self.wiped = true;
            }
        }
    }

    /// The answer the evidence alone supports.
    pub fn default_answer(&self) -> FinalAnswer {
        match &self.found {
            Some(result) => FinalAnswer::Retrieved(result.clone()),
            None if self.wiped => FinalAnswer::Wiped,
            None => FinalAnswer::Retrieved(RetrievalResult::NotFound),
        }
    }

    /// Reconcile the model's claimed final answer with the evidence.
    pub fn resolve(&self, claim: Option<&str>) -> FinalAnswer {
        let Some(claim) = claim else {
            return self.default_answer();
        };

        if claim.to_lowercase().contains("wiped successfully") {
            return if self.wiped {
                FinalAnswer::Wiped
            } else {
                self.default_answer()
            };
        }

        if says_not_found(claim) {
            return FinalAnswer::Retrieved(RetrievalResult::NotFound);
        }

        match &self.found {
            Some(RetrievalResult::Found { answer, citations }) => {
                let prose = strip_answer_frame(claim);
                FinalAnswer::Retrieved(RetrievalResult::Found {
                    answer: if prose.is_empty() { answer.clone() } else { prose.to_string() },
                    citations: citations.clone(),
                })
            }
            _ => self.default_answer(),
        }
    }
}

/// One of the three canonical answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalAnswer {
    Retrieved(RetrievalResult),
    Wiped,
}

impl fmt::Display for FinalAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalAnswer::Retrieved(RetrievalResult::NotFound) => f.write_str(NOT_FOUND_ANSWER),
            FinalAnswer::Retrieved(found) => write!(f, "{}", found),
            FinalAnswer::Wiped => f.write_str(WIPED_ANSWER),
        }
    }
}
