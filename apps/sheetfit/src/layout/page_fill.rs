//! Page Fill Analysis — how well a composed page uses its content area.
//!
//! # Fill rules
//! - Fill ≥ 92% and ≤ 100% → acceptable
//! - Fill < 92% (whitespace > 8%) → too much whitespace
//! - Fill > 100% → overflow
//!
//! Only non-final pages are expected to be full; the last page of a sheet is
//! allowed to end early.

use serde::{Deserialize, Serialize};

/// Whitespace above this fraction makes a page look underfilled.
pub const MAX_WHITESPACE_FRACTION: f32 = 0.08;

/// Overflow below this fraction is rounding noise.
const OVERFLOW_TOLERANCE: f32 = 1e-4;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFillVerdict {
    Acceptable,
    TooMuchWhitespace,
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFillAnalysis {
    /// Height taken by placed content, in points.
    pub used: f32,
    /// Height of the page's content area, in points.
    pub available: f32,
    pub fill_fraction: f32,
    pub whitespace_fraction: f32,
    pub overflow_fraction: f32,
    pub verdict: PageFillVerdict,
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Analyzes a page whose content takes `used` of `available` points.
///
/// A non-positive `available` counts as fully used when nothing is placed and
/// as overflowing otherwise.
pub fn analyze_page_fill(used: f32, available: f32) -> PageFillAnalysis {
    let used = used.max(0.0);
    let fill_fraction = if available > 0.0 {
        used / available
    } else if used > 0.0 {
        f32::INFINITY
    } else {
        1.0
    };

    let whitespace_fraction = (1.0 - fill_fraction).max(0.0);
    let overflow_fraction = (fill_fraction - 1.0).max(0.0);

    let verdict = if overflow_fraction > OVERFLOW_TOLERANCE {
        PageFillVerdict::Overflow
    } else if whitespace_fraction > MAX_WHITESPACE_FRACTION {
        PageFillVerdict::TooMuchWhitespace
    } else {
        PageFillVerdict::Acceptable
    };

    PageFillAnalysis {
        used,
        available,
        fill_fraction,
        whitespace_fraction,
        overflow_fraction,
        verdict,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
