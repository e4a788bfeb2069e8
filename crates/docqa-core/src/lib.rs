//! # docqa Core
//!
//! Runtime-agnostic logic for docqa: the document data model, the
//! font-size document structurer, the overlap-aware chunker, citation
//! sets, and the [`VectorIndex`](index::VectorIndex) abstraction.
//!
//! This crate contains no tokio, sqlx, network, or filesystem I/O. The
//! `docqa` application crate supplies the durable index, the model
//! providers, and the reasoning loop on top of it.
//!
//! ## Ingestion data flow
//!
//! ```text
//! DocumentReader ──▶ Vec<Page> ──▶ structure() ──▶ Vec<Section>
//!                                                     │
//!                                                     ▼
//!               VectorIndex::add ◀── embed ◀── split_sections() ──▶ Vec<Chunk>
//! ```

pub mod chunk;
pub mod citation;
pub mod index;
pub mod models;
pub mod structure;
pub mod vector;
