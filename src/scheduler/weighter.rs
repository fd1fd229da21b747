/// Weighted sampler
///
/// Maps a uniform random fraction in [0,1] to a catalog index with
/// probability proportional to per-entry weight. Build once per catalog
/// snapshot; the cumulative array must be rebuilt whenever weights change.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeighterError {
    /// No entries to sample from.
    EmptyCatalog,
    /// Weights sum to zero (or are not a finite positive total), so no
    /// distribution is defined.
    ZeroTotalWeight,
}

impl fmt::Display for WeighterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCatalog => write!(f, "cannot sample from an empty catalog"),
            Self::ZeroTotalWeight => write!(f, "catalog weights sum to zero"),
        }
    }
}

impl std::error::Error for WeighterError {}

/// Inverse-CDF lookup structure over a weight list.
///
/// `cumulative[i]` holds the fraction of total weight that precedes entry
/// `i`, so `cumulative[0]` is always 0 and the sequence is non-decreasing.
#[derive(Debug, Clone)]
pub struct WeightedIndexer {
    cumulative: Vec<f64>,
}

impl WeightedIndexer {
    pub fn new(weights: &[f64]) -> Result<Self, WeighterError> {
        if weights.is_empty() {
            return Err(WeighterError::EmptyCatalog);
        }
        let total: f64 = weights.iter().sum();
        if !(total > 0.0) || !total.is_finite() {
            return Err(WeighterError::ZeroTotalWeight);
        }

        let mut cumulative = Vec::with_capacity(weights.len());
        let mut prefix = 0.0;
        for &w in weights {
            cumulative.push(prefix / total);
            prefix += w;
        }
        Ok(Self { cumulative })
    }

    /// Greatest index `i` with `cumulative[i] <= fraction`.
    ///
    /// Buckets are half-open on the right: a fraction exactly equal to a
    /// cumulative boundary lands in the upper bucket. `0.0` always yields
    /// index 0 and `1.0` the last index.
    pub fn index(&self, fraction: f64) -> usize {
        self.cumulative
            .partition_point(|&c| c <= fraction)
            .saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn works_for_simple_cases() {
        let indexer = WeightedIndexer::new(&[50.0, 50.0]).unwrap();
        assert_eq!(indexer.index(0.2), 0);
        assert_eq!(indexer.index(0.8), 1);
    }

    #[test]
    fn works_for_boundary_values() {
        let indexer = WeightedIndexer::new(&[50.0, 50.0]).unwrap();
        assert_eq!(indexer.index(0.0), 0);
        assert_eq!(indexer.index(0.499999), 0);
        assert_eq!(indexer.index(0.5), 1);
        assert_eq!(indexer.index(1.0), 1);

        let indexer = WeightedIndexer::new(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(indexer.index(0.0), 0);
        assert_eq!(indexer.index(0.33333), 0);
        assert_eq!(indexer.index(0.33334), 1);
        assert_eq!(indexer.index(0.66666), 1);
        assert_eq!(indexer.index(0.66667), 2);
        assert_eq!(indexer.index(1.0), 2);
    }

    #[test]
    fn zero_weight_entries_get_no_mass() {
        let indexer = WeightedIndexer::new(&[0.0, 1.0, 0.0, 1.0]).unwrap();
        assert_eq!(indexer.index(0.0), 1);
        assert_eq!(indexer.index(0.49), 1);
        assert_eq!(indexer.index(0.5), 3);
        assert_eq!(indexer.index(1.0), 3);
    }

    #[test]
    fn rejects_degenerate_weight_lists() {
        assert_eq!(
            WeightedIndexer::new(&[]).unwrap_err(),
            WeighterError::EmptyCatalog
        );
        assert_eq!(
            WeightedIndexer::new(&[0.0, 0.0]).unwrap_err(),
            WeighterError::ZeroTotalWeight
        );
    }

    #[test]
    fn mass_distribution_tracks_weights() {
        let weights = [1.0, 4.0, 3.0, 2.0];
        let total: f64 = weights.iter().sum();
        let indexer = WeightedIndexer::new(&weights).unwrap();

        let draws = 100_000;
        let mut hits = [0u32; 4];
        for i in 0..draws {
            // Even grid over [0,1) stands in for uniform sampling and keeps
            // the test deterministic.
            let fraction = i as f64 / draws as f64;
            hits[indexer.index(fraction)] += 1;
        }

        for (i, &w) in weights.iter().enumerate() {
            let observed = hits[i] as f64 / draws as f64;
            let expected = w / total;
            assert!(
                (observed - expected).abs() < 0.001,
                "index {i}: observed {observed}, expected {expected}"
            );
        }
    }
}
