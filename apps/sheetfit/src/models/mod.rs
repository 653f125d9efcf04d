pub mod structure;
pub mod style;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::layout::providers::ImageDetail;
use crate::models::structure::Sheet;

/// A sheet as read from disk: the structure tree, its styles and the images it
/// references.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetDocument {
    #[serde(flatten)]
    pub sheet: Sheet,
    #[serde(default)]
    pub images: HashMap<String, ImageDetail>,
}

impl SheetDocument {
    /// Parses a JSON document and tidies its sheet.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut document: SheetDocument =
            serde_json::from_str(json).context("Failed to parse sheet document JSON")?;
        document.sheet.tidy();
        Ok(document)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sheet document '{}'", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid sheet document '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const DOCUMENT: &str = r#"{
        "styles": {"label": {"font_face": "bold"}},
        "sections": [{
            "blocks": [{
                "title": "Contact",
                "items": [{"runs": ["Email", "ada@example.org"], "options": {"style": "label"}}]
            }, {
                "items": [],
                "options": {"method": "image", "image": "logo"}
            }]
        }, {"blocks": []}],
        "images": {"logo": {"width": 120, "height": 40}}
    }"#;

    #[test]
    fn test_from_json_tidies_the_sheet() {
        let document = SheetDocument::from_json(DOCUMENT).unwrap();
        assert!(document.sheet.is_tidy());
        assert_eq!(document.sheet.sections.len(), 1, "empty trailing section stripped");
        assert_eq!(document.sheet.sections[0].blocks[1].name, "s1.b2");
        assert!(document.sheet.styles.contains("label"));
        assert_eq!(document.images["logo"].width, 120.0);
    }

    #[test]
    fn test_from_path_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();
        let document = SheetDocument::from_path(file.path()).unwrap();
        assert_eq!(document.sheet.sections[0].blocks.len(), 2);
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = SheetDocument::from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("absent.json"), "got {err:#}");
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let err = SheetDocument::from_json("{\"sections\": 3}").unwrap_err();
        assert!(err.to_string().contains("parse"), "got {err}");
    }
}
