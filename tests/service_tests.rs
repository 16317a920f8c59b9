use docforge::api::{AiRequest, DocForgeService, ExportRequest};
use docforge::documents::OutputFormat;
use docforge::DocForgeError;
use std::io::{Cursor, Write};
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::FileOptions;

mod common;
use common::test_helpers::*;
use common::StubBackend;

fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn upload_then_generate_over_selected_files() {
    setup_test_logger();
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(StubBackend::new());
    let service = DocForgeService::new(create_test_config(dir.path()), backend.clone());

    let project = service
        .upload(&zip_of(&[
            ("shop/src/cart.ts", "export class Cart {}\n"),
            ("shop/src/db.ts", "export const db = {};\n"),
            ("shop/.git/HEAD", "ref: refs/heads/main\n"),
        ]))
        .unwrap();
    assert_eq!(project.project.files, vec!["shop/src/cart.ts", "shop/src/db.ts"]);
    assert_eq!(project.tree[0].label, "shop");

    let response = service
        .generate(&AiRequest {
            prompt: "Documenta el carrito [word]".into(),
            extract_path: project.project.extract_path.display().to_string(),
            selected_files: vec!["shop/src/cart.ts".into()],
            model: None,
        })
        .await
        .unwrap();

    assert_eq!(response.result, "R1");
    assert_eq!(response.format, OutputFormat::Word);
    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].user.starts_with("Documenta el carrito\n"));
    assert!(calls[0].user.contains("// Archivo: shop/src/cart.ts"));
    assert!(!calls[0].user.contains("db.ts"));
}

#[tokio::test(flavor = "current_thread")]
async fn empty_selection_documents_every_supported_file() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(StubBackend::new());
    let service = DocForgeService::new(create_test_config(dir.path()), backend.clone());
    let project = service
        .upload(&zip_of(&[
            ("app/main.py", "print(1)\n"),
            ("app/util.py", "def f():\n    pass\n"),
            ("app/notes.bin", "\0\0\0"),
        ]))
        .unwrap();

    let response = service
        .generate(&AiRequest {
            prompt: "Documenta".into(),
            extract_path: project.project.extract_path.display().to_string(),
            selected_files: vec![],
            model: None,
        })
        .await
        .unwrap();

    assert_eq!(response.chunk_count, 1);
    let user = &backend.calls()[0].user;
    assert!(user.contains("// Archivo: app/main.py\nprint(1)\n"));
    assert!(user.contains("// Archivo: app/util.py\n"));
    assert!(!user.contains("notes.bin"));
}

#[tokio::test]
async fn backend_errors_surface_verbatim() {
    let dir = TempDir::new().unwrap();
    let service = DocForgeService::new(create_test_config(dir.path()), Arc::new(StubBackend::failing_at(1)));
    let project = service.upload(&zip_of(&[("main.py", "print(1)\n")])).unwrap();

    let err = service
        .generate(&AiRequest {
            prompt: "Documenta".into(),
            extract_path: project.project.extract_path.display().to_string(),
            selected_files: vec![],
            model: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Backend error: quota exceeded at call 1");
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn paths_outside_uploads_are_rejected() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(StubBackend::new());
    let service = DocForgeService::new(create_test_config(dir.path()), backend.clone());
    service.upload(&zip_of(&[("main.py", "print(1)\n")])).unwrap();
    write_project(dir.path(), &[("secret/keys.py", "KEY = 1\n")]);

    let err = service
        .generate(&AiRequest {
            prompt: "Documenta".into(),
            extract_path: dir.path().join("secret").display().to_string(),
            selected_files: vec![],
            model: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DocForgeError::Validation(_)));
    assert!(backend.calls().is_empty());
}

#[test]
fn export_zip_bundles_sections() {
    let dir = TempDir::new().unwrap();
    let service = DocForgeService::new(create_test_config(dir.path()), Arc::new(StubBackend::new()));

    let file = service
        .export(&ExportRequest {
            instruction: "Documentación completa [zip]".into(),
            content: "---ARCHIVO: README.md---\n# A\n---ARCHIVO: API.md---\n# B\n".into(),
            format: None,
        })
        .unwrap();

    assert_eq!(file.file_name, "Documentación completa.zip");
    assert_eq!(file.mime.essence_str(), "application/zip");
    let archive = zip::ZipArchive::new(Cursor::new(file.bytes)).unwrap();
    assert_eq!(archive.len(), 2);
}
