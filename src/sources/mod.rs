//! Project sources: listing, selecting and reading the files of an extracted
//! upload or a cloned repository.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::config::SourceSettings;
use crate::corpus::SourceFile;
use crate::error::{DocForgeError, Result};

pub mod github;
pub mod upload;

pub use github::{clone_repository, parse_repo_slug, GitHubClient, RepoSlug, RepoSummary};
pub use upload::{extract_zip_upload, ExtractedProject};

/// Lists every file under `root` as sorted `/`-separated relative paths
///
/// Entries whose name is in `ignored` are skipped together with their
/// contents. Unreadable entries are logged and skipped.
pub fn list_project_files(root: &Path, ignored: &[String]) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(DocForgeError::Validation(format!(
            "Project directory does not exist: {}",
            root.display()
        )));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e.file_name().to_string_lossy().as_ref(), ignored));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if let Some(rel) = pathdiff::diff_paths(entry.path(), root) {
                    files.push(to_slash_path(&rel));
                }
            }
            Ok(_) => {}
            Err(e) => {
                let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                warn!("Skipping unreadable entry {}: {}", path, e);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Files analyzed when the user made no selection: listing restricted to supported extensions
pub fn supported_source_files(root: &Path, settings: &SourceSettings) -> Result<Vec<String>> {
    Ok(list_project_files(root, &settings.ignored_names)?
        .into_iter()
        .filter(|f| has_supported_extension(f, &settings.supported_extensions))
        .collect())
}

/// Reads the selected files in order
///
/// Paths escaping `root`, lexically or through a symlink, are rejected;
/// unreadable, non-UTF-8 and binary files are skipped.
pub fn read_source_files(root: &Path, selected: &[String]) -> Result<Vec<SourceFile>> {
    let canonical_root = root.canonicalize().map_err(|_| {
        DocForgeError::Validation(format!("Project directory does not exist: {}", root.display()))
    })?;
    let mut files = Vec::with_capacity(selected.len());
    for rel in selected {
        let path = resolve_within(root, rel)?;
        let path = match path.canonicalize() {
            Ok(path) => path,
            Err(e) => {
                warn!("Error reading {}: {}", path.display(), e);
                continue;
            }
        };
        if !path.starts_with(&canonical_root) {
            return Err(DocForgeError::Validation(format!("Invalid file path: {}", rel)));
        }
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Error reading {}: {}", path.display(), e);
                continue;
            }
        };
        if content_inspector::inspect(&bytes).is_binary() {
            debug!("Skipping binary file {}", rel);
            continue;
        }
        match String::from_utf8(bytes) {
            Ok(content) => files.push(SourceFile::new(rel.replace('\\', "/"), content)),
            Err(_) => warn!("Skipping non UTF-8 file {}", rel),
        }
    }
    Ok(files)
}

/// Reads the user's selection, or every supported file when nothing is selected
pub fn collect_sources(root: &Path, selected: &[String], settings: &SourceSettings) -> Result<Vec<SourceFile>> {
    if selected.is_empty() {
        let all = supported_source_files(root, settings)?;
        read_source_files(root, &all)
    } else {
        read_source_files(root, selected)
    }
}

/// Joins `relative` onto `root`, refusing absolute paths and `..` components
pub fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf> {
    let rel = Path::new(relative);
    let escapes = rel.components().any(|c| {
        matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
    });
    if escapes || relative.trim().is_empty() {
        return Err(DocForgeError::Validation(format!("Invalid file path: {}", relative)));
    }
    Ok(root.join(rel))
}

fn is_ignored(name: &str, ignored: &[String]) -> bool {
    ignored.iter().any(|pattern| {
        match pattern.strip_prefix("*.") {
            Some(suffix) => name.ends_with(&format!(".{}", suffix)),
            None => name == pattern,
        }
    })
}

fn has_supported_extension(path: &str, extensions: &[String]) -> bool {
    Path::new(path)
        .extension()
        .map(|ext| {
            let ext = format!(".{}", ext.to_string_lossy().to_lowercase());
            extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Node of the project file tree shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub label: String,
    /// Relative path of the file or directory
    pub value: String,
    /// `None` for files
    pub children: Option<Vec<FileNode>>,
}

#[derive(Default)]
struct DirBuilder {
    dirs: BTreeMap<String, DirBuilder>,
    files: Vec<String>,
}

/// Builds a tree from relative paths: directories first, each level sorted by name
pub fn build_file_tree(paths: &[String]) -> Vec<FileNode> {
    let mut root = DirBuilder::default();
    for path in paths {
        let mut parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let Some(file) = parts.pop() else { continue };
        let mut node = &mut root;
        for part in parts {
            node = node.dirs.entry(part.to_string()).or_default();
        }
        node.files.push(file.to_string());
    }
    render_level(&root, "")
}

fn render_level(dir: &DirBuilder, prefix: &str) -> Vec<FileNode> {
    let join = |name: &str| if prefix.is_empty() { name.to_string() } else { format!("{}/{}", prefix, name) };

    let mut nodes: Vec<FileNode> = dir
        .dirs
        .iter()
        .map(|(name, sub)| {
            let value = join(name);
            FileNode {
                label: name.clone(),
                children: Some(render_level(sub, &value)),
                value,
            }
        })
        .collect();

    let mut files = dir.files.clone();
    files.sort();
    files.dedup();
    nodes.extend(files.into_iter().map(|name| FileNode {
        value: join(&name),
        label: name,
        children: None,
    }));
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/util")).unwrap();
        fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/left-pad")).unwrap();
        fs::write(dir.path().join("src/main.ts"), "console.log('hi');\n").unwrap();
        fs::write(dir.path().join("src/util/strings.py"), "def f():\n    pass\n").unwrap();
        fs::write(dir.path().join("README.md"), "# demo\n").unwrap();
        fs::write(dir.path().join("logo.png"), [0x89u8, b'P', b'N', b'G', 0, 0, 0, 0]).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::write(dir.path().join("node_modules/left-pad/index.js"), "module.exports = 1;\n").unwrap();
        dir
    }

    #[test]
    fn listing_skips_ignored_directories() {
        let dir = project();
        let files = list_project_files(dir.path(), &SourceSettings::default().ignored_names).unwrap();
        assert_eq!(files, vec!["README.md", "logo.png", "src/main.ts", "src/util/strings.py"]);
    }

    #[test]
    fn default_selection_keeps_supported_extensions() {
        let dir = project();
        let files = supported_source_files(dir.path(), &SourceSettings::default()).unwrap();
        assert_eq!(files, vec!["src/main.ts", "src/util/strings.py"]);
    }

    #[test]
    fn reading_skips_binary_and_missing_files() {
        let dir = project();
        let selected = vec!["logo.png".to_string(), "missing.rs".to_string(), "README.md".to_string()];
        let files = read_source_files(dir.path(), &selected).unwrap();
        assert_eq!(files, vec![SourceFile::new("README.md", "# demo\n")]);
    }

    #[test]
    fn selection_cannot_escape_the_project() {
        let dir = project();
        let err = read_source_files(dir.path(), &["../etc/passwd".to_string()]).unwrap_err();
        assert!(matches!(err, DocForgeError::Validation(_)));
        assert!(resolve_within(dir.path(), "/etc/passwd").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_cannot_escape_the_project() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), "TOP SECRET\n").unwrap();
        let dir = project();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), dir.path().join("link.ts")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("src/main.ts"), dir.path().join("alias.ts")).unwrap();

        let err = read_source_files(dir.path(), &["link.ts".to_string()]).unwrap_err();
        assert!(matches!(err, DocForgeError::Validation(_)));

        let files = read_source_files(dir.path(), &["alias.ts".to_string()]).unwrap();
        assert_eq!(files, vec![SourceFile::new("alias.ts", "console.log('hi');\n")]);
    }

    #[test]
    fn tree_lists_directories_first() {
        let paths = vec![
            "b.ts".to_string(),
            "src/z.ts".to_string(),
            "src/a/x.ts".to_string(),
            "a.ts".to_string(),
        ];
        let tree = build_file_tree(&paths);
        let labels: Vec<_> = tree.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["src", "a.ts", "b.ts"]);

        let src = tree[0].children.as_ref().unwrap();
        assert_eq!(src[0].value, "src/a");
        assert_eq!(src[0].children.as_ref().unwrap()[0].value, "src/a/x.ts");
        assert_eq!(src[1].value, "src/z.ts");
        assert!(src[1].children.is_none());
    }

    #[test]
    fn missing_root_is_a_validation_error() {
        let err = list_project_files(Path::new("/definitely/not/here"), &[]).unwrap_err();
        assert!(matches!(err, DocForgeError::Validation(_)));
        let err = read_source_files(Path::new("/definitely/not/here"), &["a.ts".to_string()]).unwrap_err();
        assert!(matches!(err, DocForgeError::Validation(_)));
    }
}
