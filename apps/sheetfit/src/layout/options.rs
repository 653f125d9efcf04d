use serde::{Deserialize, Serialize};

use crate::layout::distribution::Effort;
use crate::layout::geometry::Extent;

/// Engine tuning for one layout run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Page size in points.
    pub page: Extent,
    pub effort: Effort,
    /// Width unit used when enumerating table column widths.
    pub cell_granularity: f32,
    /// Width unit used when enumerating section column widths.
    pub column_granularity: f32,
    /// Vertical gap between table rows.
    pub row_gap: f32,
    /// Upper bound on automatically chosen section columns.
    pub max_section_columns: usize,
    /// Shuffle-down iterations per width vector.
    pub shuffle_limit: usize,
    /// Objective evaluations per width refinement.
    pub optimizer_evaluations: usize,
    pub optimize_widths: bool,
    pub run_cache_capacity: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        default_layout_options()
    }
}

/// A4 portrait with moderate search effort.
pub fn default_layout_options() -> LayoutOptions {
    LayoutOptions {
        page: Extent::new(595.0, 842.0),
        effort: Effort::Default,
        cell_granularity: 8.0,
        column_granularity: 24.0,
        row_gap: 2.0,
        max_section_columns: 3,
        shuffle_limit: 64,
        optimizer_evaluations: 32,
        optimize_widths: true,
        run_cache_capacity: 4096,
    }
}
