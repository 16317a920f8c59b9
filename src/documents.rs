//! Generated documents: output formats, multi-file sections and export.

use chrono::{DateTime, Utc};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use zip::write::FileOptions;

use crate::error::{DocForgeError, Result};

static SECTION_DELIMITER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^---ARCHIVO:\s*(.+?)\s*---\s*$").unwrap()
});

static MERMAID_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```mermaid[^\n]*\n([\s\S]*?)```").unwrap()
});

const NAME_CHARS: usize = 30;
const DEFAULT_NAME: &str = "documento";
const UNNAMED_SECTION: &str = "documentacion.md";

/// Format a document is exported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
    Word,
    Pdf,
    Zip,
}

impl OutputFormat {
    /// Parses the tag used in instructions, e.g. `pdf` in `[pdf]`
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Some(Self::Markdown),
            "html" => Some(Self::Html),
            "word" | "docx" => Some(Self::Word),
            "pdf" => Some(Self::Pdf),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Word => "docx",
            Self::Pdf => "pdf",
            Self::Zip => "zip",
        }
    }

    pub fn mime_type(&self) -> mime::Mime {
        let essence = match self {
            Self::Markdown => "text/markdown; charset=utf-8",
            Self::Html => return mime::TEXT_HTML_UTF_8,
            Self::Word => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::Pdf => return mime::APPLICATION_PDF,
            Self::Zip => "application/zip",
        };
        essence.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Word => "word",
            Self::Pdf => "pdf",
            Self::Zip => "zip",
        };
        f.write_str(tag)
    }
}

/// One file of a multi-file answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Name from the `---ARCHIVO: <name>---` line, `None` for text outside any delimiter
    pub name: Option<String>,
    pub content: String,
}

/// Splits model output on `---ARCHIVO: <name>---` lines
///
/// Text without any delimiter comes back as a single unnamed section. Blank
/// text before the first delimiter is dropped.
pub fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section { name: None, content: String::new() };

    for line in text.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        if let Some(caps) = SECTION_DELIMITER.captures(bare) {
            if current.name.is_some() || !current.content.trim().is_empty() {
                sections.push(current);
            }
            current = Section { name: Some(caps[1].to_string()), content: String::new() };
        } else {
            current.content.push_str(line);
        }
    }
    if current.name.is_some() || !current.content.trim().is_empty() || sections.is_empty() {
        sections.push(current);
    }

    for section in &mut sections {
        if section.name.is_some() {
            section.content = section.content.trim().to_string();
        }
    }
    sections
}

/// Bodies of the ```` ```mermaid ```` blocks in `text`, in order
pub fn extract_mermaid_blocks(text: &str) -> Vec<String> {
    MERMAID_BLOCK
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|body| !body.is_empty())
        .collect()
}

/// A finished answer ready to be previewed or exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDocument {
    pub id: Uuid,
    /// Instruction that produced the document, without the format tag
    pub instruction: String,
    pub format: OutputFormat,
    /// File name: first characters of the instruction plus the format's extension
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl GeneratedDocument {
    pub fn from_result(instruction: &str, format: OutputFormat, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            instruction: instruction.to_string(),
            format,
            name: document_name(instruction, format),
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// File name without extension
    pub fn stem(&self) -> &str {
        self.name
            .strip_suffix(self.format.extension())
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or(&self.name)
    }

    pub fn sections(&self) -> Vec<Section> {
        split_sections(&self.content)
    }

    pub fn mermaid_blocks(&self) -> Vec<String> {
        extract_mermaid_blocks(&self.content)
    }

    /// File bytes in the document's format
    ///
    /// Word and PDF exports carry the raw text; no layout is rendered.
    pub fn render(&self) -> Result<Vec<u8>> {
        match self.format {
            OutputFormat::Markdown | OutputFormat::Word | OutputFormat::Pdf => {
                Ok(self.content.clone().into_bytes())
            }
            OutputFormat::Html => Ok(to_html_page(&self.name, &self.content).into_bytes()),
            OutputFormat::Zip => zip_sections(&self.sections()),
        }
    }
}

fn document_name(instruction: &str, format: OutputFormat) -> String {
    let stem: String = instruction.trim().chars().take(NAME_CHARS).collect();
    let stem = sanitize_file_name(stem.trim());
    let stem = if stem.is_empty() { DEFAULT_NAME.to_string() } else { stem };
    format!("{}.{}", stem, format.extension())
}

/// Replaces characters that are not allowed in file names
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

/// Wraps text in a minimal HTML page unless it already is one
pub fn to_html_page(title: &str, content: &str) -> String {
    let head = content.trim_start().to_ascii_lowercase();
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        return content.to_string();
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<pre>{}</pre>\n</body>\n</html>\n",
        escape_html(title),
        escape_html(content)
    )
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn section_file_name(section: &Section) -> String {
    section
        .name
        .as_deref()
        .map(|n| {
            n.split('/')
                .map(sanitize_file_name)
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join("/")
        })
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNNAMED_SECTION.to_string())
}

fn zip_sections(sections: &[Section]) -> Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for section in sections {
        writer.start_file(section_file_name(section), options)?;
        writer.write_all(section.content.as_bytes())?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Writes every document into `dir`, returning the written paths
///
/// A document whose answer holds several named sections becomes a folder
/// with one file per section; zip documents become a single archive.
pub fn write_documents(docs: &[GeneratedDocument], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for doc in docs {
        let sections = doc.sections();
        let multi_file = sections.iter().filter(|s| s.name.is_some()).count() > 1;

        if multi_file && doc.format != OutputFormat::Zip {
            let folder = free_path(dir, doc.stem(), None, &doc.id);
            for section in &sections {
                let path = folder.join(section_file_name(section));
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, section.content.as_bytes())?;
                written.push(path);
            }
        } else {
            let path = free_path(dir, doc.stem(), Some(doc.format.extension()), &doc.id);
            fs::write(&path, doc.render()?)?;
            written.push(path);
        }
    }

    info!("Wrote {} file(s) to {}", written.len(), dir.display());
    Ok(written)
}

/// `dir/stem[.ext]`, suffixed with part of the document id when taken
fn free_path(dir: &Path, stem: &str, ext: Option<&str>, id: &Uuid) -> PathBuf {
    let name = |stem: &str| match ext {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem.to_string(),
    };
    let first = dir.join(name(stem));
    if !first.exists() {
        return first;
    }
    let short = id.simple().to_string();
    dir.join(name(&format!("{}-{}", stem, &short[..8])))
}

impl TryFrom<&str> for OutputFormat {
    type Error = DocForgeError;

    fn try_from(tag: &str) -> Result<Self> {
        Self::from_tag(tag).ok_or_else(|| DocForgeError::Validation(format!("Unknown format: {}", tag)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Read;
    use tempfile::TempDir;

    const MULTI: &str = "---ARCHIVO: README.md---\n# Demo\n\n---ARCHIVO: docs/api.md---\n## API\n";

    #[test]
    fn plain_text_is_one_unnamed_section() {
        let sections = split_sections("# Title\nbody\n");
        assert_eq!(sections, vec![Section { name: None, content: "# Title\nbody\n".into() }]);
        assert_eq!(split_sections("").len(), 1);
    }

    #[test]
    fn delimiters_split_named_sections() {
        let sections = split_sections(MULTI);
        assert_eq!(
            sections,
            vec![
                Section { name: Some("README.md".into()), content: "# Demo".into() },
                Section { name: Some("docs/api.md".into()), content: "## API".into() },
            ]
        );
    }

    #[test]
    fn preamble_before_first_delimiter_is_kept() {
        let sections = split_sections("Aquí tienes:\n---ARCHIVO: a.md---\nA\n");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, None);
        assert_eq!(sections[1].content, "A");
    }

    #[test]
    fn mermaid_blocks_are_extracted() {
        let text = "Intro\n```mermaid\ngraph TD;\n  A-->B;\n```\n```rust\nfn main() {}\n```\n```mermaid\nsequenceDiagram\n```\n";
        assert_eq!(extract_mermaid_blocks(text), vec!["graph TD;\n  A-->B;", "sequenceDiagram"]);
    }

    #[test]
    fn name_uses_first_thirty_chars() {
        let doc = GeneratedDocument::from_result(
            "Genera un README general del proyecto completo",
            OutputFormat::Markdown,
            "x",
        );
        assert_eq!(doc.name, "Genera un README general del p.md");
        assert_eq!(doc.stem(), "Genera un README general del p");

        let doc = GeneratedDocument::from_result("  ", OutputFormat::Pdf, "x");
        assert_eq!(doc.name, "documento.pdf");
        let doc = GeneratedDocument::from_result("a/b: c", OutputFormat::Html, "x");
        assert_eq!(doc.name, "a_b_ c.html");
    }

    #[test]
    fn html_export_escapes_plain_text() {
        let doc = GeneratedDocument::from_result("Doc", OutputFormat::Html, "<script>&</script>");
        let html = String::from_utf8(doc.render().unwrap()).unwrap();
        assert!(html.contains("<pre>&lt;script&gt;&amp;&lt;/script&gt;</pre>"));

        let page = "<!DOCTYPE html><html><body>ok</body></html>";
        assert_eq!(to_html_page("t", page), page);
    }

    #[test]
    fn formats_have_extensions_and_mime_types() {
        assert_eq!(OutputFormat::Word.extension(), "docx");
        assert_eq!(OutputFormat::Pdf.mime_type(), mime::APPLICATION_PDF);
        assert_eq!(OutputFormat::Zip.mime_type().essence_str(), "application/zip");
        assert_eq!(OutputFormat::Markdown.mime_type().essence_str(), "text/markdown");
        assert_eq!(OutputFormat::from_tag("PDF"), Some(OutputFormat::Pdf));
        assert!(OutputFormat::try_from("odt").is_err());
    }

    #[test]
    fn zip_export_holds_each_section() {
        let doc = GeneratedDocument::from_result("Docs [zip]", OutputFormat::Zip, MULTI);
        let bytes = doc.render().unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut api = String::new();
        archive.by_name("docs/api.md").unwrap().read_to_string(&mut api).unwrap();
        assert_eq!(api, "## API");
    }

    #[test]
    fn writes_sections_into_a_folder() {
        let out = TempDir::new().unwrap();
        let docs = vec![
            GeneratedDocument::from_result("Manual", OutputFormat::Markdown, MULTI),
            GeneratedDocument::from_result("Resumen", OutputFormat::Markdown, "# Resumen\n"),
        ];

        let written = write_documents(&docs, out.path()).unwrap();

        assert_eq!(written.len(), 3);
        assert_eq!(fs::read_to_string(out.path().join("Manual/docs/api.md")).unwrap(), "## API");
        assert_eq!(fs::read_to_string(out.path().join("Resumen.md")).unwrap(), "# Resumen\n");
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        let out = TempDir::new().unwrap();
        let docs = vec![
            GeneratedDocument::from_result("Same", OutputFormat::Markdown, "one"),
            GeneratedDocument::from_result("Same", OutputFormat::Markdown, "two"),
        ];
        let written = write_documents(&docs, out.path()).unwrap();
        assert_ne!(written[0], written[1]);
        assert_eq!(fs::read_to_string(&written[1]).unwrap(), "two");
    }
}
