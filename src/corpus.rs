//! The text sent to the model: every selected file, in selection order,
//! behind a `// Archivo: <path>` header line.

use serde::{Deserialize, Serialize};

/// Header line written before every file in the corpus
pub const FILE_HEADER_PREFIX: &str = "// Archivo: ";

/// One source file selected for a documentation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the project root, `/`-separated
    pub relative_path: String,
    /// UTF-8 contents
    pub content: String,
}

impl SourceFile {
    /// Creates a source file entry
    pub fn new(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
        }
    }
}

/// The concatenated text of every file in one request
///
/// Each file is rendered as a blank line, the `// Archivo: <path>` header and
/// its content. The text is built once and never mutated.
#[derive(Debug, Clone)]
pub struct Corpus {
    text: String,
    file_count: usize,
}

impl Corpus {
    /// Serializes the files in order
    pub fn from_files(files: &[SourceFile]) -> Self {
        let capacity = files
            .iter()
            .map(|f| f.relative_path.len() + f.content.len() + FILE_HEADER_PREFIX.len() + 3)
            .sum();
        let mut text = String::with_capacity(capacity);
        for file in files {
            text.push_str("\n\n");
            text.push_str(FILE_HEADER_PREFIX);
            text.push_str(&file.relative_path);
            text.push('\n');
            text.push_str(&file.content);
        }
        Self {
            text,
            file_count: files.len(),
        }
    }

    /// Serialized text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of files rendered into the corpus
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// True when no file was rendered
    pub fn is_empty(&self) -> bool {
        self.file_count == 0
    }
}
