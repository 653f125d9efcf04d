//! Placement quality — the score every candidate layout is compared by.
//!
//! Ordering between two qualities of the same method:
//! 1. fewer `unplaced` items wins,
//! 2. then fewer `unplaced_descendants`,
//! 3. then the lower `minor_score()`.
//!
//! Comparing qualities produced by different methods is a programmer error and
//! returns `LayoutError::IncompatibleQualities`.

use std::ops::Add;

use serde::Serialize;

use crate::errors::LayoutError;

// ────────────────────────────────────────────────────────────────────────────
// Weights
// ────────────────────────────────────────────────────────────────────────────

const BAD_BREAK_WEIGHT: f32 = 10.0;
const GOOD_BREAK_WEIGHT: f32 = 1.0;
/// `excess_sq` is divided by this before the square root is taken.
const EXCESS_DIVISOR: f32 = 100.0;
const IMAGE_SHRINK_WEIGHT: f32 = 15.0;
const HEIGHT_DEV_DIVISOR: f32 = 10.0;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// The placement category a quality was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Wrapping,
    Table,
    Columns,
    Image,
    None,
}

/// Line-break counts from text wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Breaks {
    pub bad: u32,
    pub good: u32,
}

impl Breaks {
    pub fn new(bad: u32, good: u32) -> Self {
        Self { bad, good }
    }

    fn score(&self) -> f32 {
        BAD_BREAK_WEIGHT * self.bad as f32 + GOOD_BREAK_WEIGHT * self.good as f32
    }
}

impl Add for Breaks {
    type Output = Breaks;

    fn add(self, other: Breaks) -> Breaks {
        Breaks::new(self.bad + other.bad, self.good + other.good)
    }
}

/// Method-specific terms. Each variant holds exactly the terms its method scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum QualityDetail {
    None,
    Wrapping {
        breaks: Breaks,
    },
    Image {
        shrinkage: f32,
    },
    Table {
        breaks: Breaks,
        image_shrinkage: f32,
    },
    Columns {
        breaks: Breaks,
        image_shrinkage: f32,
        height_dev: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacementQuality {
    pub detail: QualityDetail,
    pub count: u32,
    /// Sum of squared unused space; see [`PlacementQuality::excess`].
    excess_sq: f32,
    pub unplaced: u32,
    pub unplaced_descendants: u32,
}

// ────────────────────────────────────────────────────────────────────────────
// Constructors
// ────────────────────────────────────────────────────────────────────────────

impl PlacementQuality {
    fn with_detail(detail: QualityDetail, count: u32, excess_sq: f32) -> Self {
        Self {
            detail,
            count,
            excess_sq,
            unplaced: 0,
            unplaced_descendants: 0,
        }
    }

    pub fn for_wrapping(count: u32, excess: f32, breaks: Breaks) -> Self {
        let excess = excess.max(0.0);
        Self::with_detail(QualityDetail::Wrapping { breaks }, count, excess * excess)
    }

    /// `shrinkage` is the fraction of the natural image area lost by scaling it down.
    pub fn for_image(shrinkage: f32, excess: f32) -> Self {
        let excess = excess.max(0.0);
        Self::with_detail(
            QualityDetail::Image {
                shrinkage: shrinkage.max(0.0),
            },
            1,
            excess * excess,
        )
    }

    /// Borders, backgrounds and other content with no quality of its own.
    pub fn for_decoration() -> Self {
        Self::with_detail(QualityDetail::None, 0, 0.0)
    }

    /// Aggregates a column-major grid of cell qualities (`cells[column][row]`).
    pub fn for_table(cells: &[Vec<Option<PlacementQuality>>], unplaced: u32) -> Self {
        let totals = GridTotals::collect(cells);
        let mut quality = Self::with_detail(
            QualityDetail::Table {
                breaks: totals.breaks,
                image_shrinkage: totals.image_shrinkage,
            },
            totals.count,
            totals.excess_sq,
        );
        quality.unplaced = unplaced;
        quality.unplaced_descendants = totals.unplaced_descendants;
        quality
    }

    /// Like [`PlacementQuality::for_table`], plus the spread of column heights.
    pub fn for_columns(
        cells: &[Vec<Option<PlacementQuality>>],
        heights: &[f32],
        unplaced: u32,
    ) -> Self {
        let totals = GridTotals::collect(cells);
        let tallest = heights.iter().copied().fold(0.0_f32, f32::max);
        let height_dev = tallest * heights.len() as f32 - heights.iter().sum::<f32>();
        let mut quality = Self::with_detail(
            QualityDetail::Columns {
                breaks: totals.breaks,
                image_shrinkage: totals.image_shrinkage,
                height_dev: height_dev.max(0.0),
            },
            totals.count,
            totals.excess_sq,
        );
        quality.unplaced = unplaced;
        quality.unplaced_descendants = totals.unplaced_descendants;
        quality
    }
}

/// Running totals while folding a grid of child qualities.
#[derive(Default)]
struct GridTotals {
    count: u32,
    excess_sq: f32,
    breaks: Breaks,
    image_shrinkage: f32,
    unplaced_descendants: u32,
}

impl GridTotals {
    fn collect(cells: &[Vec<Option<PlacementQuality>>]) -> Self {
        let mut totals = GridTotals::default();
        let rows = cells.iter().map(Vec::len).max().unwrap_or(0);

        for row in 0..rows {
            // Only the best-fitting cell of a row counts towards excess.
            let row_excess = cells
                .iter()
                .filter_map(|column| column.get(row).copied().flatten())
                .filter(|q| q.method() != Method::None)
                .map(|q| q.excess_sq)
                .fold(None, |best: Option<f32>, e| Some(best.map_or(e, |b| b.min(e))));
            totals.excess_sq += row_excess.unwrap_or(0.0);
        }

        for quality in cells.iter().flatten().flatten() {
            if quality.method() == Method::None {
                continue;
            }
            totals.count += 1;
            totals.breaks = totals.breaks + quality.breaks();
            totals.image_shrinkage += quality.image_shrinkage();
            totals.unplaced_descendants += quality.unplaced + quality.unplaced_descendants;
        }
        totals
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Accessors and ordering
// ────────────────────────────────────────────────────────────────────────────

impl PlacementQuality {
    pub fn method(&self) -> Method {
        match self.detail {
            QualityDetail::None => Method::None,
            QualityDetail::Wrapping { .. } => Method::Wrapping,
            QualityDetail::Image { .. } => Method::Image,
            QualityDetail::Table { .. } => Method::Table,
            QualityDetail::Columns { .. } => Method::Columns,
        }
    }

    /// Unused space, as the square root of the stored sum of squares.
    pub fn excess(&self) -> f32 {
        self.excess_sq.sqrt()
    }

    pub fn excess_sq(&self) -> f32 {
        self.excess_sq
    }

    pub fn breaks(&self) -> Breaks {
        match self.detail {
            QualityDetail::Wrapping { breaks }
            | QualityDetail::Table { breaks, .. }
            | QualityDetail::Columns { breaks, .. } => breaks,
            QualityDetail::None | QualityDetail::Image { .. } => Breaks::default(),
        }
    }

    pub fn image_shrinkage(&self) -> f32 {
        match self.detail {
            QualityDetail::Image { shrinkage } => shrinkage,
            QualityDetail::Table {
                image_shrinkage, ..
            }
            | QualityDetail::Columns {
                image_shrinkage, ..
            } => image_shrinkage,
            QualityDetail::None | QualityDetail::Wrapping { .. } => 0.0,
        }
    }

    pub fn height_dev(&self) -> f32 {
        match self.detail {
            QualityDetail::Columns { height_dev, .. } => height_dev,
            _ => 0.0,
        }
    }

    /// Weighted sum of the method's soft terms; lower is better.
    pub fn minor_score(&self) -> f32 {
        let breaks = self.breaks().score();
        let excess = (self.excess_sq / EXCESS_DIVISOR).sqrt();
        let image = self.image_shrinkage() * IMAGE_SHRINK_WEIGHT;
        match self.detail {
            QualityDetail::None => 0.0,
            QualityDetail::Wrapping { .. } => breaks + excess,
            QualityDetail::Image { .. } => image + excess,
            QualityDetail::Table { .. } => breaks + excess + image,
            QualityDetail::Columns { height_dev, .. } => {
                breaks + excess + image + height_dev / HEIGHT_DEV_DIVISOR
            }
        }
    }

    /// Whether `self` is strictly better than `other`. An absent `other` always loses.
    pub fn better(&self, other: Option<&PlacementQuality>) -> Result<bool, LayoutError> {
        let Some(other) = other else {
            return Ok(true);
        };
        if self.method() != other.method() {
            return Err(LayoutError::IncompatibleQualities {
                left: self.method(),
                right: other.method(),
            });
        }
        if self.unplaced != other.unplaced {
            return Ok(self.unplaced < other.unplaced);
        }
        if self.unplaced_descendants != other.unplaced_descendants {
            return Ok(self.unplaced_descendants < other.unplaced_descendants);
        }
        Ok(self.minor_score() < other.minor_score())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
