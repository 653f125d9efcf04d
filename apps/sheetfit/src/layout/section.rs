//! Section assembly: blocks flowed into one or more columns.
//!
//! A section is placed as a slice of its blocks so that pagination can place
//! the part that fits on one page and carry the rest to the next.

use std::ops::Range;

use tracing::debug;

use crate::errors::LayoutError;
use crate::layout::block::{block_margins, decoration, place_block};
use crate::layout::columns::{ColumnPacker, ItemPlacer, PackMode, Packed, MIN_BLOCK_DIMENSION};
use crate::layout::context::LayoutContext;
use crate::layout::geometry::{Extent, Spacing};
use crate::layout::optimizer::refine_widths;
use crate::layout::placed::{PlacedContent, PlacedGroupContent};
use crate::models::structure::{Block, Section};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// A contiguous run of a section's blocks.
#[derive(Debug, Clone)]
pub struct SectionSlice<'s> {
    pub section: &'s Section,
    pub blocks: Range<usize>,
}

impl<'s> SectionSlice<'s> {
    pub fn whole(section: &'s Section) -> Self {
        Self {
            section,
            blocks: 0..section.blocks.len(),
        }
    }

    pub fn blocks(&self) -> &'s [Block] {
        &self.section.blocks[self.blocks.clone()]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

pub fn section_margins(ctx: &LayoutContext<'_>, section: &Section) -> Spacing {
    ctx.style(section.options.style.as_deref(), "section").box_style.margin
}

/// Places as many of the slice's blocks as fit in `extent`, in reading order.
///
/// The result's `quality.unplaced` is the number of trailing blocks left over.
/// Its height is the natural height of what was placed.
pub fn place_section(
    ctx: &LayoutContext<'_>,
    slice: &SectionSlice<'_>,
    extent: Extent,
) -> Result<PlacedContent, LayoutError> {
    let range = (slice.blocks.start, slice.blocks.end);
    ctx.cached_section(&slice.section.name, range, extent, || build_section(ctx, slice, extent))
}

/// Number of the slice's blocks that `placed` holds.
pub fn placed_blocks(slice: &SectionSlice<'_>, placed: &PlacedContent) -> usize {
    slice.len().saturating_sub(placed.quality.unplaced as usize)
}

fn build_section(
    ctx: &LayoutContext<'_>,
    slice: &SectionSlice<'_>,
    extent: Extent,
) -> Result<PlacedContent, LayoutError> {
    let section = slice.section;
    let style = ctx.style(section.options.style.as_deref(), "section");
    let inset = style.box_style.inset();
    let inner = extent - inset;
    if inner.width < MIN_BLOCK_DIMENSION || inner.height < 0.0 {
        return Err(LayoutError::extent_too_small(format!(
            "section '{}' has {:.1}x{:.1} inside its padding",
            section.name, inner.width, inner.height
        )));
    }

    let placer = BlockPlacer {
        ctx,
        blocks: slice.blocks(),
    };
    let body = best_columns(ctx, section, &placer, inner)?;

    let extent = Extent::new(extent.width, body.content.extent.height + inset.vertical());
    let quality = body.content.quality;
    let mut items = vec![body.content.at(inset.top_left())];
    let decorated = style.box_style.has_decoration();
    if decorated {
        items.insert(0, decoration(&style, extent));
    }
    let mut content = PlacedGroupContent::from_items(items, quality, Some(extent)).represents(section.name.clone());
    if decorated {
        content = content.with_clip_item(0);
    }
    Ok(content)
}

/// Tries every allowed column count and keeps the best packing.
fn best_columns(
    ctx: &LayoutContext<'_>,
    section: &Section,
    placer: &BlockPlacer<'_, '_>,
    inner: Extent,
) -> Result<Packed, LayoutError> {
    let options = ctx.options();
    let counts: Vec<usize> = match section.options.columns.filter(|&k| k > 0) {
        Some(k) => vec![k],
        None => (1..=options.max_section_columns.min(placer.blocks.len()).max(1)).collect(),
    };

    let mut best: Option<Packed> = None;
    for k in counts {
        let mut packer = ColumnPacker::new(placer, inner, k)
            .granularity(options.column_granularity)
            .effort(options.effort)
            .shuffle_limit(options.shuffle_limit);
        let packed = match packer.pack(PackMode::Flowing) {
            Ok(packed) => packed,
            Err(e) if e.is_recoverable() => {
                debug!(section = %section.name, columns = k, error = %e, "column count does not fit");
                continue;
            }
            Err(e) => return Err(e),
        };
        let packed = if options.optimize_widths && options.effort.refines_widths() && k > 1 {
            refine_widths(&mut packer, PackMode::Flowing, packed, options.optimizer_evaluations)?
        } else {
            packed
        };
        if packed.quality().better(best.as_ref().map(Packed::quality))? {
            best = Some(packed);
        }
    }

    let best = best.ok_or_else(|| {
        LayoutError::extent_too_small(format!(
            "no column count fits section '{}' into {:.1}x{:.1}",
            section.name, inner.width, inner.height
        ))
    })?;
    debug!(
        section = %section.name,
        columns = best.widths.len(),
        unplaced = best.quality().unplaced,
        "placed section"
    );
    Ok(best)
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

struct BlockPlacer<'c, 'a> {
    ctx: &'c LayoutContext<'a>,
    blocks: &'c [Block],
}

impl ItemPlacer for BlockPlacer<'_, '_> {
    fn item_count(&self) -> usize {
        self.blocks.len()
    }

    fn margins(&self, index: usize) -> Spacing {
        block_margins(self.ctx, &self.blocks[index])
    }

    fn place(&self, index: usize, extent: Extent) -> Result<PlacedContent, LayoutError> {
        place_block(self.ctx, &self.blocks[index], extent.width)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
