//! Column packer — distributes ordered items over `k` columns of a fixed area.
//!
//! # Modes
//! - **Flowing**: items keep reading order; column 1 takes the first run of
//!   items, column 2 the next, and so on. The split starts as
//!   `n−(k−1), 1, …, 1`, overflow spills forward, and a shuffle-down hill climb
//!   moves the tallest column's last item rightward while that improves quality.
//! - **Table**: every item is a cell at an explicit `(row, column)` with a span.
//!   Rows stack with a fixed gap and are as tall as their tallest cell.
//!
//! In both modes every enumerated width vector is packed and the best result
//! by `PlacementQuality::better` is kept. A vector that cannot hold its columns
//! raises a recoverable error and is skipped.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::debug;

use crate::errors::LayoutError;
use crate::layout::distribution::{BinDistributions, CyclicJitter, Effort};
use crate::layout::geometry::{quantize, Extent, Point, Spacing, EPSILON};
use crate::layout::placed::{PlacedContent, PlacedGroupContent};
use crate::layout::quality::PlacementQuality;

/// Narrowest box any item may be given.
pub const MIN_BLOCK_DIMENSION: f32 = 8.0;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// The items a packer distributes. Placement is by index so a packer can
/// re-place the same item at many widths.
pub trait ItemPlacer {
    fn item_count(&self) -> usize;

    fn margins(&self, index: usize) -> Spacing;

    /// Places item `index` inside `extent`. Only the width is binding; the
    /// packer checks the returned height against the space left.
    fn place(&self, index: usize, extent: Extent) -> Result<PlacedContent, LayoutError>;
}

/// A cell of a table-mode packing. `index` refers to the placer's items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCell {
    pub index: usize,
    pub row: usize,
    pub column: usize,
    pub span: usize,
}

#[derive(Debug, Clone, Copy)]
pub enum PackMode<'c> {
    Flowing,
    Table { cells: &'c [TableCell], row_gap: f32 },
}

/// A packed group together with the column widths that produced it.
#[derive(Debug, Clone)]
pub struct Packed {
    pub content: PlacedContent,
    pub widths: Vec<f32>,
}

impl Packed {
    pub fn quality(&self) -> &PlacementQuality {
        &self.content.quality
    }
}

/// One column of a flowing packing: the items that fit, positioned in packer
/// coordinates.
#[derive(Debug)]
struct ColumnFit {
    /// Bottom of the last item including its bottom margin.
    height: f32,
    /// Widest right margin, collapsed against the next column's left margins.
    right_margin: f32,
    items: Vec<PlacedContent>,
}

/// `(start, end, left, right, carried margin)` with coordinates quantized.
type ColumnKey = (usize, usize, i64, i64, i64);

/// A full flowing assignment for one width vector.
#[derive(Debug, Clone)]
struct Arrangement {
    counts: Vec<usize>,
    columns: Vec<Rc<ColumnFit>>,
    unplaced: usize,
    quality: PlacementQuality,
}

pub struct ColumnPacker<'p, P: ItemPlacer + ?Sized> {
    placer: &'p P,
    extent: Extent,
    columns: usize,
    granularity: f32,
    effort: Effort,
    shuffle_limit: usize,
    column_cache: HashMap<ColumnKey, Option<Rc<ColumnFit>>>,
    bins: BinDistributions,
    jitter: CyclicJitter,
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

impl<'p, P: ItemPlacer + ?Sized> ColumnPacker<'p, P> {
    pub fn new(placer: &'p P, extent: Extent, columns: usize) -> Self {
        Self {
            placer,
            extent,
            columns: columns.max(1),
            granularity: 8.0,
            effort: Effort::Default,
            shuffle_limit: 64,
            column_cache: HashMap::new(),
            bins: BinDistributions::new(),
            jitter: CyclicJitter::new(),
        }
    }

    pub fn granularity(mut self, granularity: f32) -> Self {
        self.granularity = granularity.max(EPSILON);
        self
    }

    pub fn effort(mut self, effort: Effort) -> Self {
        self.effort = effort;
        self
    }

    pub fn shuffle_limit(mut self, limit: usize) -> Self {
        self.shuffle_limit = limit;
        self
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    fn units(&self) -> usize {
        ((self.extent.width / self.granularity).floor() as usize).max(self.columns)
    }

    /// Width of one enumeration unit.
    pub fn unit_width(&self) -> f32 {
        self.extent.width / self.units() as f32
    }

    /// Candidate width vectors, each summing to the packer's width.
    pub fn candidate_widths(&mut self) -> Vec<Vec<f32>> {
        if self.columns == 1 {
            return vec![vec![self.extent.width]];
        }
        let units = self.units();
        let unit = self.unit_width();
        self.bins
            .enumerate(units, self.columns, self.effort.combination_cap(), &mut self.jitter)
            .into_iter()
            .map(|parts| parts.into_iter().map(|p| p as f32 * unit).collect())
            .collect()
    }

    /// Packs every candidate width vector and returns the best result.
    pub fn pack(&mut self, mode: PackMode<'_>) -> Result<Packed, LayoutError> {
        let candidates = self.candidate_widths();
        debug!(
            columns = self.columns,
            candidates = candidates.len(),
            width = self.extent.width,
            "packing columns"
        );

        let mut best: Option<Packed> = None;
        let mut skipped = 0usize;
        for widths in candidates {
            match self.pack_widths(mode, &widths) {
                Ok(packed) => {
                    if packed.quality().better(best.as_ref().map(Packed::quality))? {
                        best = Some(packed);
                    }
                }
                Err(e) if e.is_recoverable() => skipped += 1,
                Err(e) => return Err(e),
            }
        }

        best.ok_or_else(|| {
            LayoutError::extent_too_small(format!(
                "no width vector for {} columns fits {:.1}x{:.1} ({skipped} tried)",
                self.columns, self.extent.width, self.extent.height
            ))
        })
    }

    /// Packs with one explicit width vector.
    pub fn pack_widths(&mut self, mode: PackMode<'_>, widths: &[f32]) -> Result<Packed, LayoutError> {
        debug_assert_eq!(widths.len(), self.columns);
        match mode {
            PackMode::Flowing => {
                let arrangement = self.pack_flowing(widths)?;
                Ok(self.into_packed(arrangement, widths))
            }
            PackMode::Table { cells, row_gap } => self.pack_table(cells, row_gap, widths),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Flowing mode
// ────────────────────────────────────────────────────────────────────────────

impl<'p, P: ItemPlacer + ?Sized> ColumnPacker<'p, P> {
    fn pack_flowing(&mut self, widths: &[f32]) -> Result<Arrangement, LayoutError> {
        let counts = initial_split(self.placer.item_count(), self.columns);
        let mut arrangement = self.place_all(counts, widths)?;
        for _ in 0..self.shuffle_limit {
            match self.shuffle_step(&arrangement, widths)? {
                Some(improved) => arrangement = improved,
                None => break,
            }
        }
        Ok(arrangement)
    }

    /// Places every column left to right, spilling what a column cannot hold
    /// into the next one. Whatever the last column cannot hold is unplaced.
    fn place_all(&mut self, mut counts: Vec<usize>, widths: &[f32]) -> Result<Arrangement, LayoutError> {
        let n = self.placer.item_count();
        let mut columns = Vec::with_capacity(self.columns);
        let mut start = 0usize;
        let mut left = 0.0_f32;
        let mut carried = 0.0_f32;

        for j in 0..self.columns {
            let end = (start + counts[j]).min(n);
            let right = left + widths[j];
            let fit = self.place_column(start, end, left, right, carried)?;
            let placed = fit.items.len();
            if placed < end - start && j + 1 < self.columns {
                counts[j + 1] += end - start - placed;
                counts[j] = placed;
            }
            start += placed;
            carried = fit.right_margin;
            left = right;
            columns.push(fit);
        }

        let unplaced = n - start;
        let cells: Vec<Vec<Option<PlacementQuality>>> = columns
            .iter()
            .map(|c| c.items.iter().map(|item| Some(item.quality)).collect())
            .collect();
        let heights: Vec<f32> = columns.iter().map(|c| c.height).collect();
        let quality = PlacementQuality::for_columns(&cells, &heights, unplaced as u32);

        Ok(Arrangement {
            counts,
            columns,
            unplaced,
            quality,
        })
    }

    /// Moves the tallest column's last item into the next column. Returns the
    /// new arrangement only if it is strictly better.
    fn shuffle_step(
        &mut self,
        current: &Arrangement,
        widths: &[f32],
    ) -> Result<Option<Arrangement>, LayoutError> {
        let tallest = current
            .columns
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.height.total_cmp(&b.1.height))
            .map(|(j, _)| j);
        let Some(j) = tallest else {
            return Ok(None);
        };
        if j + 1 >= self.columns || current.counts[j] < 2 {
            return Ok(None);
        }

        let mut counts = current.counts.clone();
        counts[j] -= 1;
        counts[j + 1] += 1;
        let candidate = match self.place_all(counts, widths) {
            Ok(candidate) => candidate,
            Err(e) if e.is_recoverable() => return Ok(None),
            Err(e) => return Err(e),
        };
        if candidate.quality.better(Some(&current.quality))? {
            Ok(Some(candidate))
        } else {
            Ok(None)
        }
    }

    fn place_column(
        &mut self,
        start: usize,
        end: usize,
        left: f32,
        right: f32,
        carried: f32,
    ) -> Result<Rc<ColumnFit>, LayoutError> {
        let key = (start, end, quantize(left), quantize(right), quantize(carried));
        if let Some(cached) = self.column_cache.get(&key) {
            return cached.clone().ok_or_else(|| too_narrow(left, right));
        }

        let result = self.fit_column(start, end, left, right, carried).map(Rc::new);
        match &result {
            Ok(fit) => {
                self.column_cache.insert(key, Some(fit.clone()));
            }
            Err(e) if e.is_recoverable() => {
                self.column_cache.insert(key, None);
            }
            Err(_) => {}
        }
        result
    }

    fn fit_column(
        &self,
        start: usize,
        end: usize,
        left: f32,
        right: f32,
        carried: f32,
    ) -> Result<ColumnFit, LayoutError> {
        let mut items = Vec::with_capacity(end - start);
        let mut right_margin = 0.0_f32;
        let mut bottom = 0.0_f32;
        let mut bottom_margin = 0.0_f32;

        for index in start..end {
            let margins = self.placer.margins(index);
            let x = left + (margins.left - carried).max(0.0);
            let width = right - x - margins.right;
            if width < MIN_BLOCK_DIMENSION - EPSILON {
                return Err(too_narrow(left, right));
            }

            let top = if items.is_empty() {
                margins.top
            } else {
                bottom + bottom_margin.max(margins.top)
            };
            let available = (self.extent.height - top - margins.bottom).max(0.0);
            let placed = match self.placer.place(index, Extent::new(width, available)) {
                Ok(placed) => placed,
                Err(e) if e.is_recoverable() => {
                    debug!(index, width, error = %e, "item does not fit, closing column");
                    break;
                }
                Err(e) => return Err(e),
            };
            if top + placed.extent.height + margins.bottom > self.extent.height + EPSILON {
                break;
            }

            bottom = top + placed.extent.height;
            bottom_margin = margins.bottom;
            right_margin = right_margin.max(margins.right);
            items.push(placed.at(Point::new(x, top)));
        }

        let height = if items.is_empty() { 0.0 } else { bottom + bottom_margin };
        Ok(ColumnFit {
            height,
            right_margin,
            items,
        })
    }

    fn into_packed(&self, arrangement: Arrangement, widths: &[f32]) -> Packed {
        if arrangement.unplaced > 0 {
            debug!(
                unplaced = arrangement.unplaced,
                counts = ?arrangement.counts,
                "items left over after the last column"
            );
        }
        let height = arrangement
            .columns
            .iter()
            .map(|c| c.height)
            .fold(0.0_f32, f32::max);
        let items: Vec<PlacedContent> = arrangement
            .columns
            .iter()
            .flat_map(|c| c.items.iter().cloned())
            .collect();
        let content = PlacedGroupContent::from_items(
            items,
            arrangement.quality,
            Some(Extent::new(self.extent.width, height)),
        );
        Packed {
            content,
            widths: widths.to_vec(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Table mode
// ────────────────────────────────────────────────────────────────────────────

impl<'p, P: ItemPlacer + ?Sized> ColumnPacker<'p, P> {
    fn pack_table(
        &mut self,
        cells: &[TableCell],
        row_gap: f32,
        widths: &[f32],
    ) -> Result<Packed, LayoutError> {
        validate_cells(cells, self.columns)?;

        let mut edges = Vec::with_capacity(widths.len() + 1);
        edges.push(0.0_f32);
        for w in widths {
            edges.push(edges[edges.len() - 1] + w);
        }

        let row_count = cells.iter().map(|c| c.row + 1).max().unwrap_or(0);
        let mut rows: Vec<Vec<TableCell>> = vec![Vec::new(); row_count];
        for cell in cells {
            rows[cell.row].push(*cell);
        }
        for row in &mut rows {
            row.sort_by_key(|c| c.column);
        }

        let mut grid: Vec<Vec<Option<PlacementQuality>>> = vec![vec![None; row_count]; self.columns];
        let mut items = Vec::with_capacity(cells.len());
        let mut last_bottom: Option<(f32, f32)> = None;
        let mut unplaced = 0usize;

        for (r, row) in rows.iter().enumerate() {
            let margins: Vec<Spacing> = row.iter().map(|c| self.placer.margins(c.index)).collect();
            let top = match last_bottom {
                None => margins.iter().map(|m| m.top).fold(0.0_f32, f32::max),
                Some((bottom, _)) => bottom + row_gap,
            };
            let bottom_margin = margins.iter().map(|m| m.bottom).fold(0.0_f32, f32::max);

            let mut placed_row = Vec::with_capacity(row.len());
            let mut carried: Option<(usize, f32)> = None;
            for (cell, m) in row.iter().zip(&margins) {
                let left = edges[cell.column];
                let right = edges[cell.column + cell.span];
                let collapse = match carried {
                    Some((end_column, margin)) if end_column == cell.column => margin,
                    _ => 0.0,
                };
                let x = left + (m.left - collapse).max(0.0);
                let width = right - x - m.right;
                if width < MIN_BLOCK_DIMENSION - EPSILON {
                    return Err(too_narrow(left, right));
                }
                let available = (self.extent.height - top - m.bottom).max(0.0);
                let placed = self.placer.place(cell.index, Extent::new(width, available))?;
                carried = Some((cell.column + cell.span, m.right));
                placed_row.push((cell, placed.at(Point::new(x, top))));
            }

            let row_height = placed_row
                .iter()
                .map(|(_, p)| p.extent.height)
                .fold(0.0_f32, f32::max);
            if top + row_height + bottom_margin > self.extent.height + EPSILON {
                unplaced = rows[r..].iter().map(Vec::len).sum();
                break;
            }

            for (cell, placed) in placed_row {
                grid[cell.column][r] = Some(placed.quality);
                items.push(placed);
            }
            last_bottom = Some((top + row_height, bottom_margin));
        }

        let height = last_bottom.map_or(0.0, |(bottom, margin)| bottom + margin);
        let quality = PlacementQuality::for_table(&grid, unplaced as u32);
        let content = PlacedGroupContent::from_items(
            items,
            quality,
            Some(Extent::new(self.extent.width, height)),
        );
        Ok(Packed {
            content,
            widths: widths.to_vec(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

/// `n−(k−1)` items in the first column and one in each other column. With
/// fewer items than columns the trailing columns start empty.
fn initial_split(n: usize, k: usize) -> Vec<usize> {
    if n >= k {
        let mut counts = vec![1; k];
        counts[0] = n - (k - 1);
        counts
    } else {
        (0..k).map(|j| usize::from(j < n)).collect()
    }
}

/// Rejects spans that leave the table and cells that share a slot.
fn validate_cells(cells: &[TableCell], columns: usize) -> Result<(), LayoutError> {
    let mut taken = HashSet::new();
    for cell in cells {
        if cell.span == 0 || cell.column + cell.span > columns {
            return Err(LayoutError::ColumnOverfull {
                column: cell.column,
                assigned: cell.span,
                capacity: columns.saturating_sub(cell.column),
            });
        }
        for column in cell.column..cell.column + cell.span {
            if !taken.insert((cell.row, column)) {
                return Err(LayoutError::ColumnOverfull {
                    column,
                    assigned: 2,
                    capacity: 1,
                });
            }
        }
    }
    Ok(())
}

fn too_narrow(left: f32, right: f32) -> LayoutError {
    LayoutError::extent_too_small(format!(
        "column {left:.1}..{right:.1} is narrower than {MIN_BLOCK_DIMENSION}"
    ))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
