//! Width optimizer — continuous refinement of a discrete column-width vector.
//!
//! `k−1` variables in `[0,1]` start at `0.5`; variable `i` moves column `i` by
//! `(v−0.5)×2` enumeration units and the last column absorbs the difference.
//! The trial score is the packing's `minor_score()`. Infeasible trials score
//! `PENALTY` so the simplex walks away from them.

use tracing::debug;

use crate::errors::LayoutError;
use crate::layout::columns::{ColumnPacker, ItemPlacer, PackMode, Packed, MIN_BLOCK_DIMENSION};

/// Score of an infeasible trial.
pub const PENALTY: f64 = 1e9;

const INITIAL_STEP: f64 = 0.25;
const TOLERANCE: f64 = 1e-3;

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

// ────────────────────────────────────────────────────────────────────────────
// Simplex search
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub evaluations: usize,
}

/// Nelder–Mead minimization of `f` from the simplex `start + step·e_i`.
///
/// Stops when the spread of simplex values is within `tolerance` or the
/// evaluation budget is used up; the budget is checked between iterations.
pub fn minimize<F>(mut f: F, start: &[f64], step: f64, max_evaluations: usize, tolerance: f64) -> Minimum
where
    F: FnMut(&[f64]) -> f64,
{
    let dims = start.len();

    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(dims + 1);
    simplex.push((start.to_vec(), f(start)));
    for i in 0..dims {
        let mut vertex = start.to_vec();
        vertex[i] += step;
        let value = f(&vertex);
        simplex.push((vertex, value));
    }

    let mut used = dims + 1;
    loop {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        if dims == 0 || used >= max_evaluations || simplex[dims].1 - simplex[0].1 <= tolerance {
            break;
        }

        let centroid: Vec<f64> = (0..dims)
            .map(|d| simplex[..dims].iter().map(|(x, _)| x[d]).sum::<f64>() / dims as f64)
            .collect();
        let toward = |from: &[f64], scale: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(from)
                .map(|(c, x)| c + scale * (x - c))
                .collect()
        };
        let (worst, worst_value) = simplex[dims].clone();

        let reflected = toward(&worst, -REFLECTION);
        let reflected_value = f(&reflected);
        used += 1;

        if reflected_value < simplex[0].1 {
            let expanded = toward(&reflected, EXPANSION);
            let expanded_value = f(&expanded);
            used += 1;
            simplex[dims] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
            continue;
        }
        if reflected_value < simplex[dims - 1].1 {
            simplex[dims] = (reflected, reflected_value);
            continue;
        }

        let (contracted, limit) = if reflected_value < worst_value {
            (toward(&reflected, CONTRACTION), reflected_value)
        } else {
            (toward(&worst, CONTRACTION), worst_value)
        };
        let contracted_value = f(&contracted);
        used += 1;
        if contracted_value < limit {
            simplex[dims] = (contracted, contracted_value);
            continue;
        }

        let anchor = simplex[0].0.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let shrunk: Vec<f64> = anchor
                .iter()
                .zip(&vertex.0)
                .map(|(a, x)| a + SHRINK * (x - a))
                .collect();
            let value = f(&shrunk);
            *vertex = (shrunk, value);
        }
        used += dims;
    }

    let (point, value) = simplex.swap_remove(0);
    Minimum {
        point,
        value,
        evaluations: used,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Column-width refinement
// ────────────────────────────────────────────────────────────────────────────

/// Refines `start` around its width vector. Returns the refined packing only
/// when it is strictly better than `start`.
pub fn refine_widths<P: ItemPlacer + ?Sized>(
    packer: &mut ColumnPacker<'_, P>,
    mode: PackMode<'_>,
    start: Packed,
    max_evaluations: usize,
) -> Result<Packed, LayoutError> {
    let k = start.widths.len();
    if k < 2 || max_evaluations == 0 {
        return Ok(start);
    }

    let unit = packer.unit_width() as f64;
    let base: Vec<f64> = start.widths.iter().map(|&w| w as f64).collect();
    let total: f64 = base.iter().sum();

    let mut fatal: Option<LayoutError> = None;
    let mut best: Option<Packed> = None;
    let origin = vec![0.5; k - 1];
    let minimum = minimize(
        |vars| {
            if fatal.is_some() {
                return PENALTY;
            }
            let Some(widths) = widths_for(&base, total, vars, unit) else {
                return PENALTY;
            };
            match packer.pack_widths(mode, &widths) {
                Ok(packed) => {
                    let score = packed.quality().minor_score() as f64;
                    match packed.quality().better(best.as_ref().map(Packed::quality)) {
                        Ok(true) => best = Some(packed),
                        Ok(false) => {}
                        Err(e) => fatal = Some(e),
                    }
                    score
                }
                Err(e) if e.is_recoverable() => PENALTY,
                Err(e) => {
                    fatal = Some(e);
                    PENALTY
                }
            }
        },
        &origin,
        INITIAL_STEP,
        max_evaluations,
        TOLERANCE,
    );
    if let Some(e) = fatal {
        return Err(e);
    }

    let improved = match best {
        Some(candidate) if candidate.quality().better(Some(start.quality()))? => Some(candidate),
        _ => None,
    };
    debug!(
        columns = k,
        evaluations = minimum.evaluations,
        score = minimum.value,
        improved = improved.is_some(),
        "refined column widths"
    );
    Ok(improved.unwrap_or(start))
}

/// Maps optimizer variables onto a width vector, or `None` when out of range.
fn widths_for(base: &[f64], total: f64, vars: &[f64], unit: f64) -> Option<Vec<f32>> {
    if vars.iter().any(|v| !(0.0..=1.0).contains(v)) {
        return None;
    }
    let mut widths: Vec<f64> = base[..vars.len()]
        .iter()
        .zip(vars)
        .map(|(w, v)| w + (v - 0.5) * 2.0 * unit)
        .collect();
    let last = total - widths.iter().sum::<f64>();
    widths.push(last);
    if widths.iter().any(|&w| w < MIN_BLOCK_DIMENSION as f64) {
        return None;
    }
    Some(widths.into_iter().map(|w| w as f32).collect())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::geometry::{Extent, Spacing};
    use crate::layout::placed::PlacedContent;
    use crate::layout::quality::PlacementQuality;

    /// Items of fixed area: the narrower the column, the taller the item.
    struct AreaPlacer {
        areas: Vec<f32>,
    }

    impl ItemPlacer for AreaPlacer {
        fn item_count(&self) -> usize {
            self.areas.len()
        }

        fn margins(&self, _index: usize) -> Spacing {
            Spacing::ZERO
        }

        fn place(&self, index: usize, extent: Extent) -> Result<PlacedContent, LayoutError> {
            let height = self.areas[index] / extent.width;
            let mut placed = PlacedContent::rect(Extent::new(extent.width, height), None, 0.0, None);
            placed.quality = PlacementQuality::for_wrapping(1, 0.0, Default::default());
            Ok(placed)
        }
    }

    // ── simplex ─────────────────────────────────────────────────────────────

    #[test]
    fn test_minimize_finds_quadratic_minimum() {
        let result = minimize(
            |x| (x[0] - 0.3).powi(2) + (x[1] - 0.7).powi(2),
            &[0.5, 0.5],
            0.25,
            500,
            1e-12,
        );
        assert!((result.point[0] - 0.3).abs() < 1e-3, "x = {:?}", result.point);
        assert!((result.point[1] - 0.7).abs() < 1e-3, "x = {:?}", result.point);
    }

    #[test]
    fn test_minimize_respects_budget() {
        let mut calls = 0usize;
        let result = minimize(
            |x| {
                calls += 1;
                x.iter().map(|v| v.sin().abs()).sum()
            },
            &[0.9, 0.8, 0.7],
            0.25,
            20,
            0.0,
        );
        assert_eq!(calls, result.evaluations);
        // One iteration may finish after the budget is reached.
        assert!(calls <= 20 + 3 + 1, "made {calls} calls");
    }

    #[test]
    fn test_minimize_avoids_penalized_region() {
        let result = minimize(
            |x| if x[0] > 1.0 { PENALTY } else { -x[0] },
            &[0.5],
            0.25,
            100,
            1e-9,
        );
        assert!(result.point[0] <= 1.0);
        assert!(result.point[0] > 0.9, "reached {:?}", result.point);
    }

    // ── width mapping ───────────────────────────────────────────────────────

    #[test]
    fn test_widths_keep_total_and_reject_out_of_range() {
        let widths = widths_for(&[100.0, 100.0, 100.0], 300.0, &[1.0, 0.25], 10.0).unwrap();
        assert_eq!(widths, vec![110.0, 95.0, 95.0]);
        assert!(widths_for(&[100.0, 100.0], 200.0, &[1.5], 10.0).is_none());
        assert!(widths_for(&[10.0, 100.0], 110.0, &[0.0], 10.0).is_none(), "column below minimum");
    }

    // ── refinement ──────────────────────────────────────────────────────────

    #[test]
    fn test_refinement_balances_column_heights() {
        let placer = AreaPlacer { areas: vec![6000.0, 2000.0] };
        let mut packer = ColumnPacker::new(&placer, Extent::new(200.0, 1000.0), 2).granularity(25.0);
        let start = packer.pack_widths(PackMode::Flowing, &[100.0, 100.0]).unwrap();
        let start_score = start.quality().minor_score();

        let refined = refine_widths(&mut packer, PackMode::Flowing, start, 40).unwrap();
        assert!(
            refined.quality().minor_score() < start_score - 1.0,
            "{} vs {start_score}",
            refined.quality().minor_score()
        );
        assert!(refined.widths[0] > 100.0, "wider first column: {:?}", refined.widths);
        assert!((refined.widths.iter().sum::<f32>() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_refinement_never_returns_worse() {
        let placer = AreaPlacer { areas: vec![2000.0, 2000.0] };
        let mut packer = ColumnPacker::new(&placer, Extent::new(200.0, 1000.0), 2).granularity(25.0);
        let start = packer.pack_widths(PackMode::Flowing, &[100.0, 100.0]).unwrap();
        let start_quality = *start.quality();
        let refined = refine_widths(&mut packer, PackMode::Flowing, start, 40).unwrap();
        assert!(!start_quality.better(Some(refined.quality())).unwrap());
        assert_eq!(refined.widths, vec![100.0, 100.0], "balanced start is kept");
    }

    #[test]
    fn test_single_column_is_returned_unchanged() {
        let placer = AreaPlacer { areas: vec![1000.0] };
        let mut packer = ColumnPacker::new(&placer, Extent::new(100.0, 1000.0), 1);
        let start = packer.pack_widths(PackMode::Flowing, &[100.0]).unwrap();
        let refined = refine_widths(&mut packer, PackMode::Flowing, start, 40).unwrap();
        assert_eq!(refined.widths, vec![100.0]);
    }
}
