use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::error::{DocForgeError, Result};

/// Directory and file listing of one uploaded or cloned project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedProject {
    pub extract_path: PathBuf,
    pub files: Vec<String>,
}

/// Extracts an uploaded ZIP archive into `<upload_dir>/extracted/<millis>`
///
/// Entries that would land outside the target directory are skipped.
pub fn extract_zip_upload(bytes: &[u8], upload_dir: &Path, ignored: &[String]) -> Result<ExtractedProject> {
    if bytes.is_empty() {
        return Err(DocForgeError::Validation("No file provided".into()));
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let extract_path = unique_dir(&upload_dir.join("extracted"))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            warn!("Skipping unsafe archive entry: {}", entry.name());
            continue;
        };
        let out_path = extract_path.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
    }

    let files = super::list_project_files(&extract_path, ignored)?;
    info!("Extracted {} file(s) into {}", files.len(), extract_path.display());
    Ok(ExtractedProject { extract_path, files })
}

/// Creates `<parent>/<millis>`, bumping the stamp until the directory is new
pub(crate) fn unique_dir(parent: &Path) -> Result<PathBuf> {
    fs::create_dir_all(parent)?;
    let mut stamp = Utc::now().timestamp_millis();
    loop {
        let candidate = parent.join(stamp.to_string());
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => stamp += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
