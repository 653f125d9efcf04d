//! Block assembly: a titled table of items, or an image.
//!
//! A table block turns each item into a row and each of the item's runs into a
//! cell; the item's last run spans to the end of its row. Blocks report their
//! natural height: the table is packed against an unbounded height and the
//! enclosing column decides whether the block fits.

use tracing::debug;

use crate::errors::LayoutError;
use crate::layout::columns::{ColumnPacker, ItemPlacer, PackMode, Packed, TableCell, MIN_BLOCK_DIMENSION};
use crate::layout::context::LayoutContext;
use crate::layout::geometry::{Extent, Point, Spacing};
use crate::layout::optimizer::refine_widths;
use crate::layout::placed::{PlacedContent, PlacedGroupContent, PlacedImageContent, PlacedKind};
use crate::layout::quality::PlacementQuality;
use crate::models::structure::{Block, DisplayMethod, Item, Run};
use crate::models::style::Style;

/// Height offered to a table so that it is never cut short.
pub const UNBOUNDED_HEIGHT: f32 = 1.0e6;

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Outer margins of `block`, used when the block is stacked in a column.
pub fn block_margins(ctx: &LayoutContext<'_>, block: &Block) -> Spacing {
    ctx.style(block.options.style.as_deref(), "block").box_style.margin
}

/// Places `block` at `width`, memoized per block and width.
pub fn place_block(ctx: &LayoutContext<'_>, block: &Block, width: f32) -> Result<PlacedContent, LayoutError> {
    ctx.cached_block(&block.name, width, || build_block(ctx, block, width))
}

fn build_block(ctx: &LayoutContext<'_>, block: &Block, width: f32) -> Result<PlacedContent, LayoutError> {
    let style = ctx.style(block.options.style.as_deref(), "block");
    let inset = style.box_style.inset();
    let inner_width = width - inset.horizontal();
    if inner_width < MIN_BLOCK_DIMENSION {
        return Err(LayoutError::extent_too_small(format!(
            "block '{}' has {inner_width:.1} of {width:.1} left inside its padding",
            block.name
        )));
    }

    let mut items = Vec::new();
    let mut y = inset.top;

    let mut title_quality = None;
    if let Some(title) = &block.title {
        let title_style = ctx.style(block.options.title_style.as_deref(), "title");
        let (title_content, bottom) = place_title(ctx, title, &title_style, inner_width)?;
        title_quality = Some(title_content.quality);
        items.push(title_content.at(Point::new(inset.left, y)));
        y += bottom;
    }

    let body = match block.options.method {
        DisplayMethod::Table if block.items.is_empty() => None,
        DisplayMethod::Table => Some(place_table(ctx, block, inner_width)?),
        DisplayMethod::Image => Some(place_image(ctx, block, inner_width)),
    };
    let body_quality = body.as_ref().map(|b| b.quality);
    if let Some(body) = body {
        let height = body.extent.height;
        items.push(body.at(Point::new(inset.left, y)));
        y += height;
    }

    let extent = Extent::new(width, y + inset.bottom);
    let quality = PlacementQuality::for_table(&[vec![title_quality, body_quality]], 0);

    let decorated = style.box_style.has_decoration();
    if decorated {
        items.insert(0, decoration(&style, extent));
    }
    let mut content = PlacedGroupContent::from_items(items, quality, Some(extent)).represents(block.name.clone());
    if decorated {
        content = content.with_clip_item(0);
    }
    Ok(content)
}

/// The box-filling rectangle for a style with a background or border.
pub(crate) fn decoration(style: &Style, extent: Extent) -> PlacedContent {
    PlacedContent::rect(
        extent,
        style.box_style.background.clone(),
        style.box_style.border_width,
        style.box_style.border_color.clone(),
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Title
// ────────────────────────────────────────────────────────────────────────────

/// Stacks the title's runs at full width. Returns the title group and the
/// distance from its top to the start of the body, margins included.
fn place_title(
    ctx: &LayoutContext<'_>,
    title: &Item,
    style: &Style,
    width: f32,
) -> Result<(PlacedContent, f32), LayoutError> {
    let margin = style.box_style.margin;
    let run_width = width - margin.horizontal();
    let mut runs = Vec::with_capacity(title.runs.len());
    let mut y = margin.top;
    for run in &title.runs {
        let placed = ctx.place_run(run, style, Extent::new(run_width, UNBOUNDED_HEIGHT))?;
        let height = placed.extent.height;
        runs.push(placed.at(Point::new(margin.left, y)));
        y += height;
    }
    let qualities: Vec<Option<PlacementQuality>> = runs.iter().map(|r| Some(r.quality)).collect();
    let quality = PlacementQuality::for_table(&[qualities], 0);
    let group = PlacedGroupContent::from_items(runs, quality, Some(Extent::new(width, y)))
        .represents(title.name.clone());
    Ok((group, y + margin.bottom))
}

// ────────────────────────────────────────────────────────────────────────────
// Table body
// ────────────────────────────────────────────────────────────────────────────

/// Table cells of a block: one run per cell, styled by its item.
struct CellPlacer<'c, 'a> {
    ctx: &'c LayoutContext<'a>,
    runs: Vec<&'c Run>,
    /// Style of each run's item.
    styles: Vec<Style>,
    style_of: Vec<usize>,
}

impl<'c, 'a> CellPlacer<'c, 'a> {
    fn new(ctx: &'c LayoutContext<'a>, items: &'c [Item]) -> Self {
        let mut runs = Vec::new();
        let mut styles = Vec::with_capacity(items.len());
        let mut style_of = Vec::new();
        for (i, item) in items.iter().enumerate() {
            styles.push(ctx.style(item.options.style.as_deref(), "cell"));
            for run in &item.runs {
                runs.push(run);
                style_of.push(i);
            }
        }
        Self {
            ctx,
            runs,
            styles,
            style_of,
        }
    }

    fn style(&self, index: usize) -> &Style {
        &self.styles[self.style_of[index]]
    }
}

impl ItemPlacer for CellPlacer<'_, '_> {
    fn item_count(&self) -> usize {
        self.runs.len()
    }

    fn margins(&self, index: usize) -> Spacing {
        self.style(index).box_style.margin
    }

    fn place(&self, index: usize, extent: Extent) -> Result<PlacedContent, LayoutError> {
        self.ctx.place_run(self.runs[index], self.style(index), extent)
    }
}

/// Row = item, column = run; the last run of each item spans to the row end.
fn table_cells(items: &[Item], columns: usize) -> Vec<TableCell> {
    let mut cells = Vec::new();
    let mut index = 0;
    for (row, item) in items.iter().enumerate() {
        let count = item.runs.len();
        for (column, _) in item.runs.iter().enumerate() {
            let span = if column + 1 == count {
                columns.saturating_sub(column).max(1)
            } else {
                1
            };
            cells.push(TableCell {
                index,
                row,
                column,
                span,
            });
            index += 1;
        }
    }
    cells
}

fn place_table(ctx: &LayoutContext<'_>, block: &Block, width: f32) -> Result<PlacedContent, LayoutError> {
    let placer = CellPlacer::new(ctx, &block.items);
    let widest = block.items.iter().map(|i| i.runs.len()).max().unwrap_or(1).max(1);
    let hinted = block.options.columns.filter(|&c| c > 0).unwrap_or(widest);

    match pack_table(ctx, &placer, &block.items, hinted, width) {
        Err(e) if e.is_recoverable() && hinted < widest => {
            debug!(
                block = %block.name,
                hinted,
                widest,
                error = %e,
                "column hint narrower than an item, retrying"
            );
            pack_table(ctx, &placer, &block.items, widest, width)
        }
        other => other,
    }
    .map(|packed| packed.content)
}

fn pack_table(
    ctx: &LayoutContext<'_>,
    placer: &CellPlacer<'_, '_>,
    items: &[Item],
    columns: usize,
    width: f32,
) -> Result<Packed, LayoutError> {
    let options = ctx.options();
    let cells = table_cells(items, columns);
    let mode = PackMode::Table {
        cells: &cells,
        row_gap: options.row_gap,
    };
    let mut packer = ColumnPacker::new(placer, Extent::new(width, UNBOUNDED_HEIGHT), columns)
        .granularity(options.cell_granularity)
        .effort(options.effort)
        .shuffle_limit(options.shuffle_limit);

    let packed = packer.pack(mode)?;
    if options.optimize_widths && options.effort.refines_widths() && columns > 1 {
        refine_widths(&mut packer, mode, packed, options.optimizer_evaluations)
    } else {
        Ok(packed)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Image body
// ────────────────────────────────────────────────────────────────────────────

/// Scales the block's image down to `width`; never scales up.
fn place_image(ctx: &LayoutContext<'_>, block: &Block, width: f32) -> PlacedContent {
    let reference = block.options.image.clone().unwrap_or_default();
    let image = ctx.image(&reference);
    let natural = Extent::new(image.width, image.height);
    let scale = if natural.width > 0.0 {
        (width / natural.width).min(1.0)
    } else {
        1.0
    };
    let extent = Extent::new(natural.width * scale, natural.height * scale);
    PlacedContent {
        represents: Some(format!("{}.image", block.name)),
        extent,
        location: Point::ZERO,
        quality: PlacementQuality::for_image(1.0 - scale * scale, width - extent.width),
        kind: PlacedKind::Image(PlacedImageContent { reference, natural }),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::layout::options::{default_layout_options, LayoutOptions};
    use crate::layout::providers::{ImageDetail, ImageLibrary, StandardFonts};
    use crate::layout::quality::Method;
    use crate::models::structure::Sheet;
    use crate::models::style::{SpacingDef, StyleDef, StyleSheet};

    fn make_options() -> LayoutOptions {
        LayoutOptions {
            optimizer_evaluations: 12,
            ..default_layout_options()
        }
    }

    fn make_block(block: Block) -> Block {
        let mut sheet = Sheet::new(vec![crate::models::structure::Section::new(vec![block])]);
        sheet.tidy();
        sheet.sections.remove(0).blocks.remove(0)
    }

    fn flat_cells() -> StyleSheet {
        StyleSheet::new().with(
            "cell",
            StyleDef {
                margin: Some(SpacingDef::Uniform(0.0)),
                ..Default::default()
            },
        )
    }

    fn with_context<T>(styles: &StyleSheet, images: &ImageLibrary, f: impl FnOnce(&LayoutContext<'_>) -> T) -> T {
        let options = make_options();
        let ctx = LayoutContext::new(&options, styles, &StandardFonts, images);
        f(&ctx)
    }

    fn body(content: &PlacedContent) -> &PlacedContent {
        content.children().last().expect("block has a body")
    }

    // ── table blocks ────────────────────────────────────────────────────────

    #[test]
    fn test_five_row_table_height_and_offsets() {
        let block = make_block(Block::new(vec![
            Item::cells(&["Name", "Ada Lovelace"]),
            Item::cells(&["Born", "1815"]),
            Item::cells(&["Field", "Mathematics"]),
            Item::cells(&["Known", "Notes on the engine"]),
            Item::cells(&["Died", "1852"]),
        ]));
        let styles = flat_cells();
        let images = ImageLibrary::default();
        with_context(&styles, &images, |ctx| {
            let placed = place_block(ctx, &block, 300.0).unwrap();
            let table = body(&placed);
            let cells = table.children();
            assert_eq!(cells.len(), 10);

            let line = 12.0;
            let gap = ctx.options().row_gap;
            assert_eq!(table.location, Point::new(2.0, 2.0), "padding 2 on every side");
            assert_eq!(cells[0].location, Point::new(0.0, 0.0), "first cell at the table origin");
            assert!((table.extent.height - (5.0 * line + 4.0 * gap)).abs() < 1e-3);
            assert!((placed.extent.height - (2.0 + 5.0 * line + 4.0 * gap + 2.0)).abs() < 1e-3);
            assert!(placed.extent.height <= 100.0, "fits a 100 high area");
            assert_eq!(placed.quality.unplaced, 0);
        });
    }

    #[test]
    fn test_table_bottom_in_a_bounded_area_counts_margins_and_gaps() {
        let block = make_block(Block::new(vec![
            Item::cells(&["Name", "Ada"]),
            Item::cells(&["Born", "1815"]),
            Item::cells(&["Field", "Mathematics"]),
            Item::cells(&["Known", "Engines"]),
            Item::cells(&["Died", "1852"]),
        ]));
        let styles = StyleSheet::new().with(
            "cell",
            StyleDef {
                margin: Some(SpacingDef::Sides(Spacing::new(2.0, 2.0, 1.0, 3.0))),
                ..Default::default()
            },
        );
        let images = ImageLibrary::default();
        with_context(&styles, &images, |ctx| {
            let placer = CellPlacer::new(ctx, &block.items);
            let cells = table_cells(&block.items, 2);
            let gap = ctx.options().row_gap;
            let mut packer = ColumnPacker::new(&placer, Extent::new(300.0, 100.0), 2)
                .granularity(ctx.options().cell_granularity);
            let packed = packer
                .pack(PackMode::Table { cells: &cells, row_gap: gap })
                .unwrap();

            assert_eq!(packed.quality().unplaced, 0, "five rows fit 100 high");
            let children = packed.content.children();
            assert_eq!(children.len(), 10);
            assert_eq!(children[0].location, Point::new(2.0, 1.0), "left and top cell margins");

            let rows: f32 = children.chunks(2).map(|row| row[0].extent.height.max(row[1].extent.height)).sum();
            let expected = 1.0 + rows + 4.0 * gap + 3.0;
            assert!(
                (packed.content.extent.height - expected).abs() < 1e-3,
                "bottom {} != top margin + rows + gaps + bottom margin {expected}",
                packed.content.extent.height
            );
            assert!((rows - 5.0 * 12.0).abs() < 1e-3, "single-line rows");

            let placed = place_block(ctx, &block, 300.0).unwrap();
            assert_eq!(body(&placed).location, Point::new(2.0, 2.0), "padding 2");
            assert!((placed.extent.height - (2.0 + expected + 2.0)).abs() < 1e-3);
        });
    }

    #[test]
    fn test_last_run_spans_to_row_end() {
        let cells = table_cells(&[Item::cells(&["a", "b", "c"]), Item::cells(&["wide"])], 3);
        assert_eq!(cells[2].span, 1);
        assert_eq!(cells[3], TableCell { index: 3, row: 1, column: 0, span: 3 });
    }

    #[test]
    fn test_narrow_column_hint_is_widened() {
        let mut block = Block::new(vec![Item::cells(&["a", "b", "c"])]);
        block.options.columns = Some(1);
        let block = make_block(block);
        let styles = flat_cells();
        let images = ImageLibrary::default();
        with_context(&styles, &images, |ctx| {
            let placed = place_block(ctx, &block, 300.0).unwrap();
            assert_eq!(body(&placed).children().len(), 3);
        });
    }

    #[test]
    fn test_title_is_stacked_above_body() {
        let block = make_block(Block::new(vec![Item::cells(&["x", "y"])]).with_title("Heading"));
        let styles = flat_cells();
        let images = ImageLibrary::default();
        with_context(&styles, &images, |ctx| {
            let placed = place_block(ctx, &block, 200.0).unwrap();
            let children = placed.children();
            assert_eq!(children.len(), 2);
            let title = &children[0];
            assert_eq!(title.represents.as_deref(), Some("s1.b1.title"));
            // title line 13.2 + bottom margin 2
            assert!((children[1].location.y - (2.0 + 13.2 + 2.0)).abs() < 1e-3);
            assert_eq!(placed.quality.method(), Method::Table);
            assert_eq!(placed.quality.count, 2, "title and body");
        });
    }

    #[test]
    fn test_block_too_narrow_for_padding() {
        let block = make_block(Block::new(vec![Item::cells(&["x"])]));
        let styles = StyleSheet::new();
        let images = ImageLibrary::default();
        with_context(&styles, &images, |ctx| {
            let err = place_block(ctx, &block, 10.0).unwrap_err();
            assert!(err.is_recoverable());
        });
    }

    #[test]
    fn test_decorated_block_records_clip_item() {
        let mut block = Block::new(vec![Item::cells(&["x"])]);
        block.options.style = Some("boxed".into());
        let block = make_block(block);
        let styles = StyleSheet::new().with(
            "boxed",
            StyleDef {
                background: Some("#eeeeee".into()),
                border_width: Some(1.0),
                ..Default::default()
            },
        );
        let images = ImageLibrary::default();
        with_context(&styles, &images, |ctx| {
            let placed = place_block(ctx, &block, 200.0).unwrap();
            match &placed.kind {
                PlacedKind::Group(group) => {
                    assert_eq!(group.clip_item, Some(0));
                    assert!(matches!(group.items[0].kind, PlacedKind::Rect(_)));
                    assert_eq!(group.items[0].extent, placed.extent);
                }
                other => panic!("expected group, got {other:?}"),
            }
        });
    }

    // ── image blocks ────────────────────────────────────────────────────────

    #[test]
    fn test_image_is_scaled_down_to_fit() {
        let mut block = Block::new(vec![]);
        block.options.method = DisplayMethod::Image;
        block.options.image = Some("logo".into());
        let block = make_block(block);
        let styles = StyleSheet::new();
        let images = ImageLibrary::new(HashMap::from([(
            "logo".to_string(),
            ImageDetail {
                width: 392.0,
                height: 100.0,
                pixel_data: Vec::new(),
            },
        )]));
        with_context(&styles, &images, |ctx| {
            // inner width 200 − 2×2 padding = 196 → scale 0.5
            let placed = place_block(ctx, &block, 200.0).unwrap();
            let image = body(&placed);
            assert_eq!(image.extent, Extent::new(196.0, 50.0));
            assert!((image.quality.image_shrinkage() - 0.75).abs() < 1e-4);
            assert!((placed.extent.height - 54.0).abs() < 1e-3);
        });
    }

    #[test]
    fn test_small_image_is_not_enlarged() {
        let mut block = Block::new(vec![]);
        block.options.method = DisplayMethod::Image;
        block.options.image = Some("missing".into());
        let block = make_block(block);
        let styles = StyleSheet::new();
        let images = ImageLibrary::default();
        let options = make_options();
        let ctx = LayoutContext::new(&options, &styles, &StandardFonts, &images);
        let placed = place_block(&ctx, &block, 300.0).unwrap();
        assert_eq!(body(&placed).extent, Extent::new(48.0, 48.0));
        assert_eq!(ctx.into_advisories().len(), 1, "missing image reported");
    }
}
