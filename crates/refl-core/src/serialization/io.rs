//! JSON documents on disk.

use crate::domain::{ReflError, ReflResult};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Canonical `\n` line endings with exactly one trailing newline.
pub fn normalize_text(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn render_document(value: &Value) -> ReflResult<String> {
    Ok(normalize_text(&serde_json::to_string_pretty(value)?))
}

pub fn write_document(path: &Path, value: &Value) -> ReflResult<()> {
    let content = render_document(value)?;
    fs::write(path, content).map_err(|source| {
        ReflError::internal(
            "SYS.WRITE",
            format!("failed to write '{}': {}", path.display(), source),
        )
    })
}

pub fn read_document(path: &Path) -> ReflResult<Value> {
    let content = fs::read_to_string(path).map_err(|source| {
        ReflError::lookup(
            "LOOKUP.FILE",
            format!("failed to read '{}': {}", path.display(), source),
        )
    })?;
    serde_json::from_str(&content).map_err(|source| {
        ReflError::structural_mismatch(
            "STRUCTURE.JSON",
            format!("'{}' is not valid JSON: {}", path.display(), source),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{normalize_text, read_document, write_document};
    use crate::domain::ReflErrorCategory;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn normalize_text_uses_canonical_line_endings() {
        assert_eq!(normalize_text("alpha\r\nbeta\rgamma"), "alpha\nbeta\ngamma\n");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn documents_round_trip_through_disk() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("model.json");
        let document = json!({"name": "EasyModel", "interface": null, "scale": {"max": "inf"}});

        write_document(&path, &document).expect("document should be written");
        let written = fs::read_to_string(&path).expect("document should be readable");
        assert!(written.ends_with("}\n"));
        assert_eq!(read_document(&path).expect("document should parse"), document);
    }

    #[test]
    fn missing_and_malformed_files_are_classified() {
        let temp = TempDir::new().expect("tempdir should be created");
        let missing = read_document(&temp.path().join("absent.json")).unwrap_err();
        assert_eq!(missing.category(), ReflErrorCategory::Lookup);

        let path = temp.path().join("broken.json");
        fs::write(&path, "{ not json").expect("fixture should be written");
        let malformed = read_document(&path).unwrap_err();
        assert_eq!(malformed.code(), "STRUCTURE.JSON");
    }
}
