use docforge::pipeline::{DocumentationPipeline, PipelineSettings, PipelineState};
use docforge::{DocForgeError, SourceFile};
use pretty_assertions::assert_eq;

mod common;
use common::test_helpers::*;
use common::StubBackend;

fn pipeline(backend: StubBackend, context_tokens: usize) -> DocumentationPipeline<StubBackend> {
    DocumentationPipeline::new(
        backend,
        PipelineSettings { model: "gpt-test".into(), context_tokens, completion_tokens: 1024 },
    )
}

fn two_files() -> Vec<SourceFile> {
    vec![
        SourceFile::new("a.ts", source_text(10, 30, 'a')),
        SourceFile::new("b.ts", source_text(10, 30, 'b')),
    ]
}

#[tokio::test]
async fn two_chunks_then_one_consolidation_call() {
    setup_test_logger();
    let pipeline = pipeline(StubBackend::new(), 125);

    let doc = pipeline.run(&two_files(), "Genera un README").await.unwrap();

    let calls = pipeline.backend().calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(doc.chunk_count, 2);
    assert!(doc.consolidated);
    assert_eq!(doc.content, "R3");

    // first chunk: all of a.ts plus the leading lines of b.ts
    let first = &calls[0].user;
    assert!(first.starts_with("Genera un README (Parte 1 de 2 del código)"));
    assert!(first.contains("// Archivo: a.ts"));
    assert!(first.contains(&source_text(10, 30, 'a')));
    assert!(first.contains("// Archivo: b.ts"));

    let second = &calls[1].user;
    assert!(second.starts_with("Genera un README (Parte 2 de 2 del código)"));
    assert!(!second.contains("// Archivo:"));
    assert!(second.contains(&"b".repeat(29)));

    let consolidation = &calls[2].user;
    assert!(consolidation.starts_with("Por favor, resume y consolida"));
    assert!(consolidation.ends_with("R1\n\nR2"));
    assert!(!consolidation.contains("Código a analizar:"));

    assert!(calls.iter().all(|c| c.model == "gpt-test" && c.max_tokens == 1024));
    assert!(calls.iter().all(|c| c.system == calls[0].system));
}

#[tokio::test]
async fn single_chunk_returns_raw_output() {
    let pipeline = pipeline(StubBackend::new(), 3072);
    let files = vec![SourceFile::new("main.py", "print('hola')\n")];

    let doc = pipeline.run(&files, "Documenta").await.unwrap();

    let calls = pipeline.backend().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(doc.content, "R1");
    assert_eq!(doc.chunk_count, 1);
    assert!(!doc.consolidated);
    assert_eq!(
        calls[0].user,
        "Documenta\n\nCódigo a analizar:\n\n\n// Archivo: main.py\nprint('hola')\n"
    );
}

#[tokio::test]
async fn no_call_after_a_failed_chunk() {
    let pipeline = pipeline(StubBackend::failing_at(1), 125);
    let mut states = Vec::new();

    let err = pipeline
        .run_observed(&two_files(), "Documenta", None, |s| states.push(s.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, DocForgeError::Backend(_)));
    assert_eq!(pipeline.backend().calls().len(), 1);
    assert_eq!(
        states,
        vec![
            PipelineState::Collecting { files: 2 },
            PipelineState::Processing { chunk: 1, total: 2 },
            PipelineState::Failed { reason: err.to_string() },
        ]
    );
}

#[tokio::test]
async fn consolidation_failure_discards_partials() {
    let pipeline = pipeline(StubBackend::failing_at(3), 125);

    let err = pipeline.run(&two_files(), "Documenta").await.unwrap_err();

    assert!(err.is_backend());
    assert_eq!(pipeline.backend().calls().len(), 3);
}

#[tokio::test]
async fn empty_consolidation_keeps_joined_partials() {
    let pipeline = pipeline(StubBackend::empty_at(3), 125);

    let doc = pipeline.run(&two_files(), "Documenta").await.unwrap();

    assert_eq!(doc.content, "R1\n\nR2");
    assert!(doc.consolidated);
}

#[tokio::test]
async fn model_override_applies_to_every_call() {
    let pipeline = pipeline(StubBackend::new(), 125);

    pipeline
        .run_observed(&two_files(), "Documenta", Some("gpt-4o"), |_| {})
        .await
        .unwrap();

    assert!(pipeline.backend().calls().iter().all(|c| c.model == "gpt-4o"));
}

#[tokio::test]
async fn states_are_reported_in_order() {
    let pipeline = pipeline(StubBackend::new(), 125);
    let mut states = Vec::new();

    pipeline
        .run_observed(&two_files(), "Documenta", None, |s| states.push(s.clone()))
        .await
        .unwrap();

    assert_eq!(
        states,
        vec![
            PipelineState::Collecting { files: 2 },
            PipelineState::Processing { chunk: 1, total: 2 },
            PipelineState::Processing { chunk: 2, total: 2 },
            PipelineState::Consolidating { partials: 2 },
            PipelineState::Done { chunks: 2 },
        ]
    );
}
