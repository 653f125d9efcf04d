//! Width distributions — ways of splitting `n` width units over `m` columns.
//!
//! Every distribution gives each column at least one unit and sums to exactly
//! `n`. When there are more distributions than the effort level allows, units
//! are merged into packets, the coarse distributions are enumerated, and each
//! one is rounded back to `n` units with a deterministic jitter.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed rounding offsets, in sixths of a unit.
const JITTER_SIXTHS: [u64; 6] = [3, 0, 5, 1, 4, 2];

// ────────────────────────────────────────────────────────────────────────────
// Effort
// ────────────────────────────────────────────────────────────────────────────

/// How many candidate width vectors the packer may try per layout decision.
///
/// `Low` also skips the continuous width refinement that blocks and sections
/// otherwise run after the discrete search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Low,
    #[default]
    Default,
    High,
    Extreme,
}

impl Effort {
    pub fn combination_cap(&self) -> u64 {
        match self {
            Effort::Low => 24,
            Effort::Default => 120,
            Effort::High => 600,
            Effort::Extreme => 3000,
        }
    }

    /// Whether the continuous width refinement runs at this level.
    pub fn refines_widths(&self) -> bool {
        *self != Effort::Low
    }
}

impl FromStr for Effort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Effort::Low),
            "default" | "normal" => Ok(Effort::Default),
            "high" => Ok(Effort::High),
            "extreme" => Ok(Effort::Extreme),
            other => anyhow::bail!("unknown effort level '{other}' (expected low|default|high|extreme)"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Jitter
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic stand-in for random rounding; repeats every six draws.
#[derive(Debug, Clone, Default)]
pub struct CyclicJitter {
    position: usize,
}

impl CyclicJitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next offset in sixths, in `0..6`.
    pub fn next_sixth(&mut self) -> u64 {
        let value = JITTER_SIXTHS[self.position % JITTER_SIXTHS.len()];
        self.position += 1;
        value
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Counting and enumeration
// ────────────────────────────────────────────────────────────────────────────

/// Memoized distribution counts, owned by one packer.
#[derive(Debug, Default)]
pub struct BinDistributions {
    counts: HashMap<(usize, usize), u64>,
}

impl BinDistributions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ways to split `n` units into `m` positive parts (saturating).
    pub fn count(&mut self, n: usize, m: usize) -> u64 {
        if m == 0 || n < m {
            return 0;
        }
        if m == 1 || n == m {
            return 1;
        }
        if let Some(&cached) = self.counts.get(&(n, m)) {
            return cached;
        }
        let total = self
            .count(n - 1, m - 1)
            .saturating_add(self.count(n - 1, m));
        self.counts.insert((n, m), total);
        total
    }

    /// At most `cap` distinct distributions of `n` units over `m` columns.
    pub fn enumerate(
        &mut self,
        n: usize,
        m: usize,
        cap: u64,
        jitter: &mut CyclicJitter,
    ) -> Vec<Vec<usize>> {
        if m == 0 || n < m {
            return Vec::new();
        }
        let cap = cap.max(1);
        if self.count(n, m) <= cap {
            return all_combinations(n, m, cap as usize);
        }

        let packet = (2..=n / m).find(|&p| self.count(n / p, m) <= cap);
        let Some(packet) = packet else {
            // Too few units to coarsen; sample exact splits at even rank strides.
            let total = self.count(n, m);
            return (0..cap)
                .map(|i| (u128::from(i) * u128::from(total) / u128::from(cap)) as u64)
                .map(|rank| self.nth_combination(n, m, rank))
                .collect();
        };

        let coarse_total = n / packet;
        let mut seen = HashSet::new();
        all_combinations(coarse_total, m, cap as usize)
            .into_iter()
            .map(|coarse| debias(&coarse, n, coarse_total, jitter.next_sixth()))
            .filter(|parts| seen.insert(parts.clone()))
            .collect()
    }

    /// The split at `rank` in the order `all_combinations` produces them.
    fn nth_combination(&mut self, mut n: usize, mut m: usize, mut rank: u64) -> Vec<usize> {
        let mut parts = Vec::with_capacity(m);
        let mut extra = 0usize;
        while m > 1 {
            // Splits that close the current part here rank first.
            let closing = self.count(n - 1, m - 1);
            if rank < closing {
                parts.push(1 + extra);
                extra = 0;
                m -= 1;
            } else {
                rank -= closing;
                extra += 1;
            }
            n -= 1;
        }
        parts.push(n + extra);
        parts
    }
}

/// Every split of `n` into `m` positive parts, stopping after `limit`.
pub fn all_combinations(n: usize, m: usize, limit: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if m == 0 || n < m {
        return out;
    }
    let mut prefix = Vec::with_capacity(m);
    extend_combinations(n, m, limit, &mut prefix, &mut out);
    out
}

fn extend_combinations(
    remaining: usize,
    slots: usize,
    limit: usize,
    prefix: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if out.len() >= limit {
        return;
    }
    if slots == 1 {
        prefix.push(remaining);
        out.push(prefix.clone());
        prefix.pop();
        return;
    }
    for part in 1..=remaining - (slots - 1) {
        prefix.push(part);
        extend_combinations(remaining - part, slots - 1, limit, prefix, out);
        prefix.pop();
        if out.len() >= limit {
            return;
        }
    }
}

/// Scales a split of `coarse_total` packets back to exactly `n` units.
///
/// Cumulative boundaries are rounded down after adding `sixths / 6` of a coarse
/// step, so the last boundary lands on `n` and no part collapses to zero.
fn debias(coarse: &[usize], n: usize, coarse_total: usize, sixths: u64) -> Vec<usize> {
    let n = n as u64;
    let coarse_total = coarse_total as u64;
    let mut parts = Vec::with_capacity(coarse.len());
    let mut cumulative = 0u64;
    let mut previous = 0u64;
    for &part in coarse {
        cumulative += part as u64;
        let boundary = (cumulative * n * 6 + sixths * coarse_total) / (6 * coarse_total);
        let boundary = boundary.min(n);
        parts.push((boundary - previous) as usize);
        previous = boundary;
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(combos: &[Vec<usize>], n: usize, m: usize) {
        for parts in combos {
            assert_eq!(parts.len(), m, "wrong column count in {parts:?}");
            assert_eq!(parts.iter().sum::<usize>(), n, "{parts:?} does not sum to {n}");
            assert!(parts.iter().all(|&p| p > 0), "{parts:?} has an empty column");
        }
    }

    // ── counting ────────────────────────────────────────────────────────────

    #[test]
    fn test_count_matches_recurrence() {
        let mut bins = BinDistributions::new();
        assert_eq!(bins.count(5, 3), 6);
        assert_eq!(bins.count(20, 3), 171);
        assert_eq!(bins.count(7, 1), 1);
        assert_eq!(bins.count(4, 4), 1);
        assert_eq!(bins.count(3, 4), 0);
    }

    #[test]
    fn test_count_saturates_instead_of_overflowing() {
        let mut bins = BinDistributions::new();
        assert_eq!(bins.count(200, 100), u64::MAX);
    }

    // ── enumeration ─────────────────────────────────────────────────────────

    #[test]
    fn test_small_problem_is_enumerated_exactly() {
        let mut bins = BinDistributions::new();
        let combos = bins.enumerate(5, 3, 120, &mut CyclicJitter::new());
        assert_eq!(combos.len(), 6);
        assert_valid(&combos, 5, 3);
    }

    #[test]
    fn test_all_pairs_sum_to_total() {
        let mut bins = BinDistributions::new();
        for n in 1..=14 {
            for m in 1..=n.min(5) {
                let combos = bins.enumerate(n, m, 10_000, &mut CyclicJitter::new());
                assert_eq!(combos.len() as u64, bins.count(n, m), "n={n} m={m}");
                assert_valid(&combos, n, m);
            }
        }
    }

    #[test]
    fn test_coarsened_enumeration_keeps_exact_total() {
        let mut bins = BinDistributions::new();
        let combos = bins.enumerate(103, 10, 1000, &mut CyclicJitter::new());
        assert!(!combos.is_empty());
        assert!(combos.len() <= 715, "packet size 7 gives 715 coarse splits");
        assert_valid(&combos, 103, 10);
    }

    #[test]
    fn test_coarsened_enumeration_has_no_duplicates() {
        let mut bins = BinDistributions::new();
        let combos = bins.enumerate(60, 3, 24, &mut CyclicJitter::new());
        let unique: HashSet<_> = combos.iter().collect();
        assert_eq!(unique.len(), combos.len());
        assert!(combos.len() as u64 <= 24);
        assert_valid(&combos, 60, 3);
    }

    #[test]
    fn test_enumeration_is_deterministic() {
        let a = BinDistributions::new().enumerate(80, 4, 120, &mut CyclicJitter::new());
        let b = BinDistributions::new().enumerate(80, 4, 120, &mut CyclicJitter::new());
        assert_eq!(a, b);
    }

    #[test]
    fn test_uncoarsenable_problem_is_sampled_evenly() {
        // 30 units over 16 columns cannot be merged into packets of two.
        let mut bins = BinDistributions::new();
        let combos = bins.enumerate(30, 16, 50, &mut CyclicJitter::new());
        assert_eq!(combos.len(), 50);
        assert_valid(&combos, 30, 16);
        let unique: HashSet<_> = combos.iter().collect();
        assert_eq!(unique.len(), 50);
        assert_eq!(combos[0][0], 1);
        assert!(combos[49][0] > 1, "samples reach the far end: {:?}", combos[49]);
        let lead: HashSet<usize> = combos.iter().map(|c| c[0]).collect();
        assert!(lead.len() > 2, "first column widths vary: {lead:?}");
    }

    #[test]
    fn test_nth_combination_matches_enumeration_order() {
        let mut bins = BinDistributions::new();
        let all = all_combinations(9, 4, usize::MAX);
        for (rank, parts) in all.iter().enumerate() {
            assert_eq!(&bins.nth_combination(9, 4, rank as u64), parts, "rank {rank}");
        }
    }

    // ── jitter and effort ───────────────────────────────────────────────────

    #[test]
    fn test_jitter_cycles_through_six_values() {
        let mut jitter = CyclicJitter::new();
        let first: Vec<u64> = (0..6).map(|_| jitter.next_sixth()).collect();
        let second: Vec<u64> = (0..6).map(|_| jitter.next_sixth()).collect();
        assert_eq!(first, vec![3, 0, 5, 1, 4, 2]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_debias_never_leaves_empty_parts() {
        for sixths in 0..6 {
            let parts = debias(&[1, 1, 12], 103, 14, sixths);
            assert_valid(&[parts], 103, 3);
        }
    }

    #[test]
    fn test_effort_parses_and_orders_caps() {
        assert_eq!("HIGH".parse::<Effort>().unwrap(), Effort::High);
        assert!("frantic".parse::<Effort>().is_err());
        assert!(Effort::Low.combination_cap() < Effort::Default.combination_cap());
        assert!(Effort::High.combination_cap() < Effort::Extreme.combination_cap());
    }

    #[test]
    fn test_only_low_effort_skips_refinement() {
        assert!(!Effort::Low.refines_widths());
        assert!(Effort::Default.refines_widths());
        assert!(Effort::High.refines_widths());
        assert!(Effort::Extreme.refines_widths());
    }
}
