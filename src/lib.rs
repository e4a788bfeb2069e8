//! # docqa
//!
//! Question answering over a private PDF corpus with page-level citations.
//!
//! docqa structures each uploaded PDF into heading-delimited sections by
//! font size, splits them into overlapping chunks, embeds and stores them
//! in a SQLite-backed vector index, and answers questions with a bounded
//! ReAct loop over two tools: knowledge-base search and index wipe.
//!
//! ## Architecture
//!
//! ```text
//!  PDF ──▶ PdfReader ──▶ structure ──▶ split_sections ──▶ Embedder ──▶ SqliteIndex
//!                                                                          │
//!  question ──▶ ReasoningLoop ──▶ Toolbox ──▶ Synthesizer ──▶ query ◀──────┘
//!                    │                            │
//!                    └──────── Generator ◀────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`service`] | The [`Harness`](service::Harness) context: owns the index and providers |
//! | [`ingest`] | Reader → sections → chunks → embeddings → index |
//! | [`retrieval`] | Retrieval synthesizer with citation handling |
//! | [`agent`] | Bounded reasoning loop and its tools |
//! | [`sqlite_index`] | Durable vector index |
//! | [`embedding`] / [`generation`] | Model providers |
//! | [`pdf`] / [`staging`] | PDF reading and temporary upload files |
//! | [`server`] | HTTP service |
//! | [`config`] / [`logging`] / [`error`] | Ambient concerns |
//!
//! The pure algorithms (structurer, chunker, citation sets, index trait)
//! live in the `docqa-core` crate, re-exported as [`docqa_core`].

pub mod agent;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod http;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod pdf;
pub mod prompt;
pub mod retrieval;
pub mod server;
pub mod service;
pub mod sqlite_index;
pub mod staging;

pub use docqa_core;
