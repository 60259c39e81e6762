use crate::document::{default_document, normalize, Document};
use crate::error::{EssdevError, Result};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DEFAULT_TEMP_SUFFIX: &str = ".json";
const TEMP_PREFIX: &str = "instance-params-";

/// Load a payload file, falling back to the default document when the file
/// is missing or blank.
///
/// Unparseable content is an error: a broken file is never silently
/// replaced by defaults.
pub fn load(path: &Path) -> Result<Document> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "payload missing, using defaults");
            return Ok(default_document());
        }
        Err(e) => return Err(e.into()),
    };
    let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
    if content.iter().all(u8::is_ascii_whitespace) {
        debug!(path = %path.display(), "payload empty, using defaults");
        return Ok(default_document());
    }
    let raw: Value =
        serde_json::from_slice(content).map_err(|source| EssdevError::MalformedPayload {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(normalize(raw))
}

/// On-disk form: 2-space indented JSON plus a trailing newline.
pub fn serialize(document: &Document) -> Result<String> {
    let mut out = document.to_pretty_json()?;
    out.push('\n');
    Ok(out)
}

/// Atomically replace `path` with `document`, creating parent directories.
pub fn write(path: &Path, document: &Document) -> Result<()> {
    atomic_write(path, serialize(document)?.as_bytes())?;
    debug!(path = %path.display(), "payload written");
    Ok(())
}

/// Write `document` to a fresh temp file whose name ends in `suffix`.
///
/// The file is removed when the returned `TempPath` drops unless the caller
/// calls `keep()` on it.
pub fn write_temp(document: &Document, suffix: &str) -> Result<TempPath> {
    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(suffix)
        .tempfile()?;
    tmp.write_all(serialize(document)?.as_bytes())?;
    tmp.flush()?;
    let path = tmp.into_temp_path();
    debug!(path = %path.display(), "dry-run payload written");
    Ok(path)
}

/// Temp-file suffix mirroring the payload's extension (`.json` if none).
pub fn temp_suffix_for(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_else(|| DEFAULT_TEMP_SUFFIX.to_string())
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
