//! Sheet assembly: pagination of sections onto fixed-size pages.
//!
//! Sections are taken greedily in order. Vertical margins between sections
//! collapse to the larger of the two. A section that does not fully fit is
//! split after the blocks its best arrangement placed and continues on the
//! next page. Only a block that cannot fit an empty page fails the layout.

use tracing::{info, warn};

use crate::errors::LayoutError;
use crate::layout::block::decoration;
use crate::layout::columns::{ColumnPacker, ItemPlacer, PackMode, MIN_BLOCK_DIMENSION};
use crate::layout::context::LayoutContext;
use crate::layout::geometry::{Extent, Spacing};
use crate::layout::page_fill::{analyze_page_fill, PageFillAnalysis, PageFillVerdict};
use crate::layout::placed::{PlacedContent, PlacedGroupContent};
use crate::layout::section::{place_section, placed_blocks, section_margins, SectionSlice};
use crate::models::structure::{Section, Sheet};

/// A composed page and how well it is filled.
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub content: PlacedContent,
    pub fill: PageFillAnalysis,
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Lays `sheet` out onto as many pages as it needs. An empty sheet yields
/// one empty page.
pub fn place_sheet(ctx: &LayoutContext<'_>, sheet: &Sheet) -> Result<Vec<PageLayout>, LayoutError> {
    let style = ctx.style(sheet.options.style.as_deref(), "page");
    let inset = style.box_style.inset();
    let page = ctx.options().page;
    let area = page - inset;
    if area.width < MIN_BLOCK_DIMENSION || area.height < MIN_BLOCK_DIMENSION {
        return Err(LayoutError::extent_too_small(format!(
            "page {:.1}x{:.1} leaves {:.1}x{:.1} inside its padding",
            page.width, page.height, area.width, area.height
        )));
    }

    let plan = paginate(ctx, sheet, area)?;
    let last = plan.len().saturating_sub(1);
    let mut pages = Vec::with_capacity(plan.len());
    for (n, slices) in plan.iter().enumerate() {
        let body = compose_page(ctx, slices, area)?;
        let fill = analyze_page_fill(body.extent.height, area.height);
        if n < last && fill.verdict == PageFillVerdict::TooMuchWhitespace {
            info!(
                page = n + 1,
                fill = fill.fill_fraction,
                "page ends early, next section does not fit"
            );
        }

        let quality = body.quality;
        let mut items = vec![body.at(inset.top_left())];
        let decorated = style.box_style.has_decoration();
        if decorated {
            items.insert(0, decoration(&style, page));
        }
        let mut content = PlacedGroupContent::from_items(items, quality, Some(page)).represents(format!("page{}", n + 1));
        if decorated {
            content = content.with_clip_item(0);
        }
        pages.push(PageLayout { content, fill });
    }

    info!(pages = pages.len(), sections = sheet.sections.len(), "laid out sheet");
    Ok(pages)
}

/// Decides which section slices go on which page.
fn paginate<'s>(
    ctx: &LayoutContext<'_>,
    sheet: &'s Sheet,
    area: Extent,
) -> Result<Vec<Vec<SectionSlice<'s>>>, LayoutError> {
    let mut pages = Vec::new();
    let mut current: Vec<SectionSlice<'s>> = Vec::new();
    // Bottom of the last section on the page and its bottom margin.
    let mut bottom = 0.0_f32;
    let mut bottom_margin = 0.0_f32;

    for section in &sheet.sections {
        let margins = section_margins(ctx, section);
        let mut start = 0;
        loop {
            let top = if current.is_empty() {
                margins.top
            } else {
                bottom + bottom_margin.max(margins.top)
            };
            let extent = slot(area, top, margins);
            let slice = SectionSlice {
                section,
                blocks: start..section.blocks.len(),
            };

            match fit_prefix(ctx, &slice, extent)? {
                Some((placed, height)) if placed == slice.len() => {
                    current.push(slice);
                    bottom = top + height;
                    bottom_margin = margins.bottom;
                    break;
                }
                Some((placed, _)) => {
                    current.push(SectionSlice {
                        section,
                        blocks: start..start + placed,
                    });
                    start += placed;
                }
                None if current.is_empty() => {
                    return Err(LayoutError::extent_too_small(too_big(section, start, area)));
                }
                None => {}
            }
            pages.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() || pages.is_empty() {
        pages.push(current);
    }
    Ok(pages)
}

/// The extent a section gets below `top`, after its own margins.
fn slot(area: Extent, top: f32, margins: Spacing) -> Extent {
    Extent::new(
        area.width - margins.horizontal(),
        (area.height - top - margins.bottom).max(0.0),
    )
}

/// Largest leading part of `slice` that fits `extent` on its own, as
/// `(blocks placed, height)`, or `None` if not even one block fits.
///
/// A prefix cut from a larger arrangement is re-placed alone, since it may
/// arrange differently once the trailing blocks are gone.
fn fit_prefix(
    ctx: &LayoutContext<'_>,
    slice: &SectionSlice<'_>,
    extent: Extent,
) -> Result<Option<(usize, f32)>, LayoutError> {
    let mut count = slice.len();
    loop {
        let prefix = SectionSlice {
            section: slice.section,
            blocks: slice.blocks.start..slice.blocks.start + count,
        };
        let placed = match place_section(ctx, &prefix, extent) {
            Ok(placed) => placed,
            Err(e) if e.is_recoverable() => return Ok(None),
            Err(e) => return Err(e),
        };
        let fitted = placed_blocks(&prefix, &placed);
        if fitted == count {
            return Ok(Some((count, placed.extent.height)));
        }
        if fitted == 0 {
            return Ok(None);
        }
        count = fitted;
    }
}

/// Stacks the page's slices with a single flowing column.
fn compose_page(
    ctx: &LayoutContext<'_>,
    slices: &[SectionSlice<'_>],
    area: Extent,
) -> Result<PlacedContent, LayoutError> {
    let placer = SlicePlacer { ctx, slices };
    let mut packer = ColumnPacker::new(&placer, area, 1).shuffle_limit(0);
    let packed = packer.pack(PackMode::Flowing)?;
    if packed.quality().unplaced > 0 {
        warn!(
            unplaced = packed.quality().unplaced,
            sections = slices.len(),
            "page composition dropped planned sections"
        );
    }
    Ok(packed.content)
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

struct SlicePlacer<'c, 'a, 's> {
    ctx: &'c LayoutContext<'a>,
    slices: &'c [SectionSlice<'s>],
}

impl ItemPlacer for SlicePlacer<'_, '_, '_> {
    fn item_count(&self) -> usize {
        self.slices.len()
    }

    fn margins(&self, index: usize) -> Spacing {
        section_margins(self.ctx, self.slices[index].section)
    }

    fn place(&self, index: usize, extent: Extent) -> Result<PlacedContent, LayoutError> {
        place_section(self.ctx, &self.slices[index], extent)
    }
}

fn too_big(section: &Section, start: usize, area: Extent) -> String {
    match section.blocks.get(start) {
        Some(block) => format!(
            "block '{}' does not fit an empty {:.1}x{:.1} page",
            block.name, area.width, area.height
        ),
        None => format!(
            "section '{}' does not fit an empty {:.1}x{:.1} page",
            section.name, area.width, area.height
        ),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::options::{default_layout_options, LayoutOptions};
    use crate::layout::providers::{ImageLibrary, StandardFonts};
    use crate::models::structure::{Block, Item};
    use crate::models::style::StyleSheet;

    fn make_options(height: f32) -> LayoutOptions {
        LayoutOptions {
            page: Extent::new(400.0, height),
            optimize_widths: false,
            max_section_columns: 1,
            ..default_layout_options()
        }
    }

    /// `sections` sections of `blocks` blocks, each block `rows` rows high.
    fn make_sheet(sections: usize, blocks: usize, rows: usize) -> Sheet {
        let sections = (0..sections)
            .map(|_| {
                Section::new(
                    (0..blocks)
                        .map(|_| Block::new((0..rows).map(|r| Item::cells(&[&format!("row{r}"), "x"])).collect()))
                        .collect(),
                )
            })
            .collect();
        let mut sheet = Sheet::new(sections);
        sheet.tidy();
        sheet
    }

    fn section_names(page: &PageLayout) -> Vec<String> {
        let body = page.content.children().last().expect("page body");
        body.children()
            .iter()
            .filter_map(|s| s.represents.clone())
            .collect()
    }

    fn run_layout(sheet: &Sheet, options: &LayoutOptions) -> Result<Vec<PageLayout>, LayoutError> {
        let images = ImageLibrary::default();
        let ctx = LayoutContext::new(options, &sheet.styles, &StandardFonts, &images);
        place_sheet(&ctx, sheet)
    }

    // ── pagination ──────────────────────────────────────────────────────────

    #[test]
    fn test_small_sheet_fits_one_page() {
        let sheet = make_sheet(2, 2, 2);
        let pages = run_layout(&sheet, &default_layout_options()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(section_names(&pages[0]), vec!["s1", "s2"]);
        assert_eq!(pages[0].content.extent, Extent::new(595.0, 842.0));
        assert_eq!(pages[0].content.represents.as_deref(), Some("page1"));
    }

    #[test]
    fn test_empty_sheet_yields_one_empty_page() {
        let sheet = make_sheet(0, 0, 0);
        let pages = run_layout(&sheet, &default_layout_options()).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(section_names(&pages[0]).is_empty());
        assert_eq!(pages[0].fill.verdict, PageFillVerdict::TooMuchWhitespace);
    }

    #[test]
    fn test_long_section_is_split_across_pages() {
        // Each 4-row block is 58 high plus 4+4 margin; 200 − 72 padding leaves 128.
        let sheet = make_sheet(1, 5, 4);
        let pages = run_layout(&sheet, &make_options(200.0)).unwrap();
        assert!(pages.len() >= 3, "got {} pages", pages.len());
        for page in &pages {
            assert_eq!(section_names(page), vec!["s1"], "each page holds part of s1");
            assert_ne!(page.fill.verdict, PageFillVerdict::Overflow);
        }

        let blocks: Vec<String> = pages
            .iter()
            .flat_map(|page| {
                let section = &page.content.children().last().unwrap().children()[0];
                section.children()[0]
                    .children()
                    .iter()
                    .filter_map(|b| b.represents.clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(blocks, vec!["s1.b1", "s1.b2", "s1.b3", "s1.b4", "s1.b5"], "reading order kept");
    }

    #[test]
    fn test_block_taller_than_a_page_fails() {
        let sheet = make_sheet(1, 1, 20);
        let err = run_layout(&sheet, &make_options(200.0)).unwrap_err();
        assert!(matches!(err, LayoutError::ExtentTooSmall(_)), "got {err:?}");
        assert!(err.to_string().contains("s1.b1"));
    }

    #[test]
    fn test_section_margins_collapse_between_sections() {
        let sheet = make_sheet(2, 1, 1);
        let pages = run_layout(&sheet, &default_layout_options()).unwrap();
        let body = pages[0].content.children().last().unwrap();
        let (first, second) = (&body.children()[0], &body.children()[1]);
        let gap = second.location.y - (first.location.y + first.extent.height);
        assert!((gap - 8.0).abs() < 1e-3, "section bottom margin 8, got gap {gap}");
    }
}
