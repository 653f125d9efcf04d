// Layout engine: run wrapping, column packing, width search and pagination.
// The engine is synchronous and CPU-bound; async callers go through
// `layout_document`, which runs it inside tokio::task::spawn_blocking.

pub mod block;
pub mod columns;
pub mod context;
pub mod distribution;
pub mod font_metrics;
pub mod geometry;
pub mod optimizer;
pub mod options;
pub mod page_fill;
pub mod placed;
pub mod providers;
pub mod quality;
pub mod run_builder;
pub mod section;
pub mod sheet;

use serde::Serialize;
use tracing::info;

use crate::errors::{Advisory, LayoutError};
use crate::models::SheetDocument;

pub use context::LayoutContext;
pub use options::{default_layout_options, LayoutOptions};
pub use page_fill::PageFillAnalysis;
pub use placed::PlacedContent;
pub use providers::{ImageLibrary, StandardFonts};

/// Everything one layout run produces.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutReport {
    pub pages: Vec<PlacedContent>,
    pub fills: Vec<PageFillAnalysis>,
    pub advisories: Vec<Advisory>,
}

/// Lays out a tidied document with the standard fonts and the document's own
/// images.
pub fn layout_document_sync(document: &SheetDocument, options: &LayoutOptions) -> Result<LayoutReport, LayoutError> {
    let sheet = &document.sheet;
    if !sheet.is_tidy() {
        return Err(LayoutError::InvalidDocument(
            "sheet must be tidied before layout".to_string(),
        ));
    }

    let images = ImageLibrary::new(document.images.clone());
    let ctx = LayoutContext::new(options, &sheet.styles, &StandardFonts, &images);
    let pages = sheet::place_sheet(&ctx, sheet)?;
    let advisories = ctx.into_advisories();

    let (pages, fills): (Vec<_>, Vec<_>) = pages.into_iter().map(|p| (p.content, p.fill)).unzip();
    info!(
        pages = pages.len(),
        advisories = advisories.len(),
        effort = ?options.effort,
        "layout complete"
    );
    Ok(LayoutReport {
        pages,
        fills,
        advisories,
    })
}

/// Runs [`layout_document_sync`] on the blocking pool.
pub async fn layout_document(document: SheetDocument, options: LayoutOptions) -> Result<LayoutReport, LayoutError> {
    tokio::task::spawn_blocking(move || layout_document_sync(&document, &options))
        .await
        .map_err(|e| LayoutError::Internal(anyhow::anyhow!("spawn_blocking failed in layout: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::page_fill::PageFillVerdict;
    use crate::models::structure::{Block, Item, Section, Sheet};

    fn make_document(tidy: bool) -> SheetDocument {
        let mut sheet = Sheet::new(vec![Section::new(vec![
            Block::new(vec![Item::cells(&["Name", "Ada Lovelace"]), Item::cells(&["Role", "Analyst"])])
                .with_title("Profile"),
        ])]);
        if tidy {
            sheet.tidy();
        }
        SheetDocument {
            sheet,
            images: Default::default(),
        }
    }

    #[test]
    fn test_untidy_sheet_is_rejected() {
        let err = layout_document_sync(&make_document(false), &default_layout_options()).unwrap_err();
        assert_eq!(err.code(), "INVALID_DOCUMENT");
    }

    #[test]
    fn test_report_has_one_fill_per_page() {
        let report = layout_document_sync(&make_document(true), &default_layout_options()).unwrap();
        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.fills.len(), report.pages.len());
        assert_eq!(report.fills[0].verdict, PageFillVerdict::TooMuchWhitespace, "short sheet");
        assert!(report.advisories.is_empty());
    }

    #[tokio::test]
    async fn test_async_entry_point_matches_sync() {
        let options = default_layout_options();
        let expected = layout_document_sync(&make_document(true), &options).unwrap();
        let report = layout_document(make_document(true), options).await.unwrap();
        assert_eq!(report.pages, expected.pages, "layout is deterministic");
    }
}
