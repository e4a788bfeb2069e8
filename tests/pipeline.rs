mod common;

use std::sync::Arc;

use common::{harness, two_page_document, HangingGenerator, ScriptedGenerator, VocabEmbedder};
use docqa::agent::WIPED_ANSWER;
use docqa::embedding::{DisabledEmbedder, Embedder};
use docqa::pdf::PdfReader;
use docqa::sqlite_index::SqliteIndex;
use docqa::staging::StagedUpload;
use docqa_core::citation::{RetrievalResult, NOT_FOUND_ANSWER};
use docqa_core::index::memory::InMemoryIndex;
use docqa_core::index::VectorIndex;
use docqa_core::models::{Line, Page};

#[tokio::test]
async fn test_two_page_document_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let index = Arc::new(
        SqliteIndex::open(&tmp.path().join("index.sqlite"), "pdf_rag_collection")
            .await
            .unwrap(),
    );
    let embedder = Arc::new(VocabEmbedder::default());
    let generator = Arc::new(ScriptedGenerator::new(&[
        "Thought: the user wants the store cleared\nAction: wipe_vector_store\nAction Input: None",
        "Thought: done\nFinal Answer: Vector store wiped successfully.",
    ]));
    let h = harness(index.clone(), embedder.clone(), generator, 10.0);

    let report = h.ingest("doc-1", two_page_document()).await.unwrap();
    assert_eq!(report.pages, 2);
    assert_eq!(report.sections, 2);
    assert_eq!(report.chunks, 2);

    let hello = h.search("Hello", None, Some(1)).await.unwrap();
    let citations = hello.citations().expect("expected a found result");
    assert_eq!(citations.len(), 1);
    assert!(citations.contains("doc-1", 1));
    assert_eq!(
        hello.to_string(),
        "Based on the documents: Hello world\nSources:\n- Document doc-1, Page 1"
    );

    let unrelated = h.search("zebra", None, None).await.unwrap();
    assert_eq!(unrelated, RetrievalResult::NotFound);
    assert_eq!(unrelated.to_string(), NOT_FOUND_ANSWER);

    let missing_doc = h
        .search("Hello", Some(&["no-such-doc".to_string()]), None)
        .await
        .unwrap();
    assert_eq!(missing_doc.to_string(), NOT_FOUND_ANSWER);

    let answer = h.ask("Please clear the knowledge base.").await.unwrap();
    assert_eq!(answer.answer, WIPED_ANSWER);

    let query_vec = embedder.embed("hello").await.unwrap();
    let after = index
        .query(&query_vec, Some(&["doc-1".to_string()]), 10)
        .await
        .unwrap();
    assert!(after.is_empty());
}

#[tokio::test]
async fn test_duplicate_pages_cite_once() {
    let index = Arc::new(InMemoryIndex::new());
    let h = harness(
        index.clone(),
        Arc::new(VocabEmbedder::default()),
        Arc::new(ScriptedGenerator::new(&[])),
        10.0,
    );

    // Two sections starting on page 3 become two chunks citing one page.
    let pages = vec![
        Page::new(
            3,
            vec![
                Line::single("Fees", 16.0),
                Line::single("alpha fee schedule", 10.0),
                Line::single("Penalties", 16.0),
                Line::single("alpha late penalty", 10.0),
                Line::single("padding a", 10.0),
                Line::single("padding b", 10.0),
            ],
        ),
    ];
    let report = h.ingest("doc-a", pages).await.unwrap();
    assert_eq!(report.chunks, 2);

    let result = h.search("alpha", None, None).await.unwrap();
    let citations = result.citations().unwrap();
    assert_eq!(citations.len(), 1);
    assert!(citations.contains("doc-a", 3));
}

#[tokio::test]
async fn test_empty_document_is_vacuous_success() {
    let index = Arc::new(InMemoryIndex::new());
    let h = harness(
        index.clone(),
        Arc::new(DisabledEmbedder),
        Arc::new(HangingGenerator),
        1.0,
    );

    let report = h.ingest("empty", Vec::<Page>::new()).await.unwrap();
    assert_eq!(report.sections, 0);
    assert_eq!(report.chunks, 0);
    assert!(index.is_empty().unwrap());
}

#[tokio::test]
async fn test_embedding_failure_is_document_error() {
    let index = Arc::new(InMemoryIndex::new());
    let h = harness(
        index.clone(),
        Arc::new(DisabledEmbedder),
        Arc::new(HangingGenerator),
        1.0,
    );

    let err = h.ingest("doc-x", two_page_document()).await.unwrap_err();
    assert_eq!(err.doc_id, "doc-x");
    assert!(err
        .to_string()
        .starts_with("Could not process the uploaded document:"));
    assert!(index.is_empty().unwrap());
}

#[tokio::test]
async fn test_staged_upload_removed_after_failed_ingest() {
    let tmp = tempfile::tempdir().unwrap();
    let h = harness(
        Arc::new(InMemoryIndex::new()),
        Arc::new(VocabEmbedder::default()),
        Arc::new(HangingGenerator),
        1.0,
    );

    let staged =
        StagedUpload::write(tmp.path(), Some("broken.pdf"), b"definitely not a pdf").unwrap();
    let path = staged.path().to_path_buf();
    assert!(path.exists());

    let result = h.ingest("doc-bad", PdfReader::from_staged(staged)).await;
    assert!(result.is_err());
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_concurrent_background_ingestion() {
    let index = Arc::new(InMemoryIndex::new());
    let h = Arc::new(harness(
        index.clone(),
        Arc::new(VocabEmbedder::default()),
        Arc::new(HangingGenerator),
        1.0,
    ));

    let handles: Vec<_> = (0..4)
        .map(|i| h.clone().spawn_ingest(format!("doc-{}", i), two_page_document()))
        .collect();
    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.chunks, 2);
    }
    assert_eq!(index.len().unwrap(), 8);

    let query_vec = VocabEmbedder::default().embed("more info").await.unwrap();
    let only_two = index
        .query(&query_vec, Some(&["doc-2".to_string()]), 10)
        .await
        .unwrap();
    assert_eq!(only_two.len(), 2);
    assert!(only_two.iter().all(|hit| hit.metadata.doc_id == "doc-2"));
}
