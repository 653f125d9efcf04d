use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::layout::distribution::Effort;
use crate::layout::geometry::Extent;
use crate::layout::options::{default_layout_options, LayoutOptions};

/// Driver configuration loaded from environment variables (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    /// Engine tuning from `SHEETFIT_OPTIONS`, or the defaults.
    pub options: LayoutOptions,
    pub effort: Option<Effort>,
    pub page_width: Option<f32>,
    pub page_height: Option<f32>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            input: PathBuf::from(require_env("SHEETFIT_INPUT")?),
            options: match std::env::var("SHEETFIT_OPTIONS") {
                Ok(path) => load_options(Path::new(&path))?,
                Err(_) => default_layout_options(),
            },
            effort: match std::env::var("SHEETFIT_EFFORT") {
                Ok(value) => Some(value.parse::<Effort>().context("SHEETFIT_EFFORT is invalid")?),
                Err(_) => None,
            },
            page_width: optional_points("SHEETFIT_PAGE_WIDTH")?,
            page_height: optional_points("SHEETFIT_PAGE_HEIGHT")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// The configured options with environment overrides applied.
    pub fn layout_options(&self) -> LayoutOptions {
        let base = self.options.clone();
        LayoutOptions {
            page: Extent::new(
                self.page_width.unwrap_or(base.page.width),
                self.page_height.unwrap_or(base.page.height),
            ),
            effort: self.effort.unwrap_or(base.effort),
            ..base
        }
    }
}

/// Reads a JSON `LayoutOptions` file; absent fields keep their defaults.
pub fn load_options(path: &Path) -> Result<LayoutOptions> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read layout options from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse layout options in {}", path.display()))
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_points(key: &str) -> Result<Option<f32>> {
    let Ok(value) = std::env::var(key) else {
        return Ok(None);
    };
    let points = value
        .trim()
        .parse::<f32>()
        .with_context(|| format!("{key} must be a number of points"))?;
    anyhow::ensure!(points > 0.0, "{key} must be positive, got {points}");
    Ok(Some(points))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn make_config(options: LayoutOptions) -> Config {
        Config {
            input: PathBuf::from("sheet.json"),
            options,
            effort: Some(Effort::High),
            page_width: Some(612.0),
            page_height: None,
            rust_log: "debug".to_string(),
        }
    }

    fn write_options(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_layout_options_overlay_defaults() {
        let options = make_config(default_layout_options()).layout_options();
        assert_eq!(options.page, Extent::new(612.0, 842.0), "height keeps the A4 default");
        assert_eq!(options.effort, Effort::High);
        assert_eq!(options.row_gap, default_layout_options().row_gap);
    }

    #[test]
    fn test_options_file_is_the_base_for_env_overrides() {
        let file = write_options(r#"{"row_gap": 5, "effort": "low", "page": {"width": 400, "height": 600}}"#);
        let loaded = load_options(file.path()).unwrap();
        assert_eq!(loaded.row_gap, 5.0);
        assert_eq!(loaded.shuffle_limit, default_layout_options().shuffle_limit);

        let mut config = make_config(loaded);
        config.effort = None;
        let options = config.layout_options();
        assert_eq!(options.effort, Effort::Low, "file value stands without SHEETFIT_EFFORT");
        assert_eq!(options.page, Extent::new(612.0, 600.0));
        assert_eq!(options.row_gap, 5.0);
    }

    #[test]
    fn test_malformed_options_file_is_an_error() {
        let file = write_options("{ not json");
        let err = load_options(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse layout options"), "got {err:#}");
    }

    #[test]
    fn test_missing_options_file_is_an_error() {
        let err = load_options(Path::new("/nonexistent/sheetfit-options.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read layout options"));
    }
}
