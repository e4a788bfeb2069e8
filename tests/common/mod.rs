//! Deterministic providers for integration tests.
#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docqa::agent::WIPED_ANSWER;
use docqa::config::AgentConfig;
use docqa::embedding::Embedder;
use docqa::generation::{GenerationRequest, Generator};
use docqa::service::{Harness, HarnessSettings};
use docqa_core::citation::NOT_FOUND_ANSWER;
use docqa_core::index::VectorIndex;
use docqa_core::models::{Line, Page, Span};

const DIMS: usize = 128;

/// Bag-of-words embedder: every distinct lowercase word gets its own axis.
#[derive(Default)]
pub struct VocabEmbedder {
    vocab: Mutex<Vec<String>>,
}

impl VocabEmbedder {
    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vocab = self.vocab.lock().unwrap();
        let mut v = vec![0.0; DIMS];
        for word in words(text) {
            let idx = match vocab.iter().position(|w| *w == word) {
                Some(i) => i,
                None => {
                    vocab.push(word);
                    vocab.len() - 1
                }
            };
            v[idx % DIMS] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for VocabEmbedder {
    fn model_name(&self) -> &str {
        "vocab"
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// Embedder that never returns.
pub struct HangingEmbedder;

#[async_trait]
impl Embedder for HangingEmbedder {
    fn model_name(&self) -> &str {
        "hanging"
    }

    async fn embed_many(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        bail!("unreachable")
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Generator that answers synthesis prompts from their context and plays a
/// script for reasoning-loop prompts.
///
/// Synthesis: if any question word appears in the context, answer with the
/// first context block; otherwise say nothing relevant was found.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<String>>,
    /// Reply once the script runs out.
    fallback: Option<String>,
    react_prompts: Mutex<Vec<String>>,
    react_calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(script: &[&str]) -> Self {
        Self {
            script: Mutex::new(script.iter().map(|s| s.to_string()).collect()),
            fallback: None,
            react_prompts: Mutex::new(Vec::new()),
            react_calls: AtomicUsize::new(0),
        }
    }

    /// Reply with `turn` to every reasoning prompt.
    pub fn always(turn: &str) -> Self {
        Self {
            fallback: Some(turn.to_string()),
            ..Self::new(&[])
        }
    }

    pub fn react_calls(&self) -> usize {
        self.react_calls.load(Ordering::SeqCst)
    }

    pub fn last_react_prompt(&self) -> Option<String> {
        self.react_prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String> {
        let prompt = request.prompt;
        if prompt.contains("Sources available for this context:") {
            return Ok(synthesize(prompt));
        }

        self.react_calls.fetch_add(1, Ordering::SeqCst);
        self.react_prompts.lock().unwrap().push(prompt.to_string());
        let next = self.script.lock().unwrap().pop_front();
        match next.or_else(|| self.fallback.clone()) {
            Some(turn) => Ok(turn),
            None => bail!("script exhausted"),
        }
    }
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    let from = text.find(start).map(|i| i + start.len()).unwrap_or(0);
    let rest = &text[from..];
    let to = rest.find(end).unwrap_or(rest.len());
    &rest[..to]
}

fn synthesize(prompt: &str) -> String {
    let context = between(prompt, "Context:\n", "\n\nQuestion:");
    let question = between(prompt, "Question: ", "\n");
    let context_words = words(context);
    if !words(question).iter().any(|w| context_words.contains(w)) {
        return NOT_FOUND_ANSWER.to_string();
    }
    let first_block = context.split("\n\n").next().unwrap_or_default();
    let body = first_block
        .split_once("] ")
        .map(|(_, b)| b)
        .unwrap_or(first_block);
    format!("Based on the documents: {}", body)
}

/// Generator that never returns.
pub struct HangingGenerator;

#[async_trait]
impl Generator for HangingGenerator {
    fn model_name(&self) -> &str {
        "hanging"
    }

    async fn generate(&self, _request: GenerationRequest<'_>) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        bail!("unreachable")
    }
}

pub fn harness(
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    timeout_secs: f64,
) -> Harness {
    let settings = HarnessSettings {
        agent: AgentConfig {
            max_iterations: 3,
            timeout_secs,
        },
        ..HarnessSettings::default()
    };
    Harness::new(index, embedder, generator, settings)
}

/// Page 1: heading "Intro", body "Hello world".
/// Page 2: heading "Details", body "More info here".
pub fn two_page_document() -> Vec<Page> {
    vec![
        Page::new(
            1,
            vec![
                Line::single("Intro", 18.0),
                Line::new(vec![Span::new("Hello ", 10.0), Span::new("world", 10.0)]),
            ],
        ),
        Page::new(
            2,
            vec![
                Line::single("Details", 18.0),
                Line::new(vec![
                    Span::new("More ", 10.0),
                    Span::new("info ", 10.0),
                    Span::new("here", 10.0),
                ]),
            ],
        ),
    ]
}

pub fn is_canonical(answer: &str) -> bool {
    answer == NOT_FOUND_ANSWER
        || answer == WIPED_ANSWER
        || (answer.starts_with("Based on the documents: ")
            && answer.contains("\nSources:\n- Document "))
}

/// A one-page PDF with one `Tj` line per `(font size, text)` pair.
pub fn one_page_pdf(lines: &[(i64, &str)]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![Operation::new("BT", vec![])];
    for (size, text) in lines {
        operations.push(Operation::new("Tf", vec!["F1".into(), Object::Integer(*size)]));
        operations.push(Operation::new("Td", vec![Object::Integer(0), Object::Integer(-30)]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
    }
    operations.push(Operation::new("ET", vec![]));
    let content = Content { operations };

    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
