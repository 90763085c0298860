//! Nearest-sample lookup over one derived series.
//!
//! Samples are held in timestamp order. A query resolves to the sample with
//! the smallest `|t - query|`; ties go to the earliest index, including runs
//! of duplicate timestamps. A best match further away than the tolerance
//! resolves to nothing.

use std::fmt;

use contracts::{check_series, ContractError, Timestamped, DEFAULT_TOLERANCE};

/// Immutable, ordered sample sequence with tolerance-bounded lookup
pub struct SeriesIndex<S> {
    name: &'static str,
    samples: Vec<S>,
    tolerance: f64,
}

impl<S> fmt::Debug for SeriesIndex<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeriesIndex")
            .field("name", &self.name)
            .field("len", &self.samples.len())
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

impl<S: Timestamped> SeriesIndex<S> {
    /// Build an index over `samples`
    ///
    /// # Errors
    /// - `EmptySeries` when `samples` is empty
    /// - `NonMonotonicSeries` when a timestamp decreases or is not finite
    pub fn new(name: &'static str, samples: Vec<S>, tolerance: f64) -> Result<Self, ContractError> {
        check_series(name, &samples)?;
        Ok(Self {
            name,
            samples,
            tolerance,
        })
    }

    /// Build an index with the default 0.05s tolerance
    pub fn with_default_tolerance(
        name: &'static str,
        samples: Vec<S>,
    ) -> Result<Self, ContractError> {
        Self::new(name, samples, DEFAULT_TOLERANCE)
    }

    /// Sample active at `query`, if any
    #[inline]
    pub fn resolve(&self, query: f64) -> Option<&S> {
        self.resolve_index(query).map(|i| &self.samples[i])
    }

    /// Index of the sample active at `query`, if any
    pub fn resolve_index(&self, query: f64) -> Option<usize> {
        if query.is_nan() {
            return None;
        }

        // first sample at or after the query
        let upper = self.samples.partition_point(|s| s.t() < query);

        let below = upper.checked_sub(1).map(|i| self.first_index_at(self.samples[i].t()));
        let above = (upper < self.samples.len()).then_some(upper);

        let best = match (below, above) {
            (Some(b), Some(a)) => {
                if self.distance(b, query) <= self.distance(a, query) {
                    b
                } else {
                    a
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };

        (self.distance(best, query) <= self.tolerance).then_some(best)
    }

    /// Series name as it appears in the analysis result
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: construction rejects empty series
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the first sample
    pub fn first_time(&self) -> f64 {
        self.samples.first().map_or(f64::NAN, Timestamped::t)
    }

    /// Timestamp of the last sample
    pub fn last_time(&self) -> f64 {
        self.samples.last().map_or(f64::NAN, Timestamped::t)
    }

    pub fn samples(&self) -> &[S] {
        &self.samples
    }

    #[inline]
    fn distance(&self, index: usize, query: f64) -> f64 {
        (self.samples[index].t() - query).abs()
    }

    /// Earliest index whose timestamp equals `t`
    #[inline]
    fn first_index_at(&self, t: f64) -> usize {
        self.samples.partition_point(|s| s.t() < t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Sample {
        t: f64,
        id: usize,
    }

    impl Timestamped for Sample {
        fn t(&self) -> f64 {
            self.t
        }
    }

    fn index(times: &[f64]) -> SeriesIndex<Sample> {
        let samples = times
            .iter()
            .enumerate()
            .map(|(id, &t)| Sample { t, id })
            .collect();
        SeriesIndex::with_default_tolerance("test", samples).unwrap()
    }

    /// Linear scan: minimum distance, first index wins ties
    fn linear_resolve(times: &[f64], query: f64, tolerance: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &t) in times.iter().enumerate() {
            let d = (t - query).abs();
            match best {
                Some((_, bd)) if d >= bd => {}
                _ => best = Some((i, d)),
            }
        }
        best.filter(|&(_, d)| d <= tolerance).map(|(i, _)| i)
    }

    #[test]
    fn test_resolve_within_tolerance() {
        let idx = index(&[0.0, 1.0, 2.0]);
        assert_eq!(idx.resolve(0.97).map(|s| s.t), Some(1.0));
        assert_eq!(idx.resolve(1.0).map(|s| s.t), Some(1.0));
        assert_eq!(idx.resolve(2.04).map(|s| s.t), Some(2.0));
    }

    #[test]
    fn test_resolve_outside_tolerance() {
        let idx = index(&[0.0, 1.0, 2.0]);
        assert!(idx.resolve(0.9).is_none());
        assert!(idx.resolve(-0.5).is_none());
        assert!(idx.resolve(3.0).is_none());
    }

    #[test]
    fn test_tie_goes_to_earlier_sample() {
        let samples = vec![Sample { t: 0.0, id: 0 }, Sample { t: 0.1, id: 1 }];
        let idx = SeriesIndex::new("test", samples, 0.1).unwrap();
        assert_eq!(idx.resolve(0.05).map(|s| s.id), Some(0));
    }

    #[test]
    fn test_duplicates_resolve_to_first() {
        let idx = index(&[0.0, 1.0, 1.0, 1.0, 2.0]);
        assert_eq!(idx.resolve_index(1.0), Some(1));
        assert_eq!(idx.resolve_index(1.02), Some(1));
        assert_eq!(idx.resolve_index(0.98), Some(1));
    }

    #[test]
    fn test_nan_query() {
        let idx = index(&[0.0, 1.0]);
        assert_eq!(idx.resolve_index(f64::NAN), None);
    }

    #[test]
    fn test_single_sample() {
        let idx = index(&[5.0]);
        assert_eq!(idx.resolve_index(5.03), Some(0));
        assert_eq!(idx.resolve_index(4.9), None);
        assert_eq!(idx.first_time(), 5.0);
        assert_eq!(idx.last_time(), 5.0);
    }

    #[test]
    fn test_empty_rejected() {
        let err = SeriesIndex::<Sample>::with_default_tolerance("speed_timeline", vec![]).unwrap_err();
        assert!(matches!(err, ContractError::EmptySeries { .. }));
    }

    #[test]
    fn test_decreasing_rejected() {
        let samples = vec![Sample { t: 1.0, id: 0 }, Sample { t: 0.5, id: 1 }];
        assert!(SeriesIndex::with_default_tolerance("test", samples).is_err());
    }

    fn sorted_times() -> impl Strategy<Value = Vec<f64>> {
        // integer grid keeps exact ties and duplicates likely
        prop::collection::vec(0u32..200, 1..40).prop_map(|mut v| {
            v.sort_unstable();
            v.into_iter().map(|x| x as f64 * 0.025).collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_matches_linear_scan(times in sorted_times(), query in -1.0f64..6.0) {
            let idx = index(&times);
            prop_assert_eq!(
                idx.resolve_index(query),
                linear_resolve(&times, query, DEFAULT_TOLERANCE)
            );
        }

        #[test]
        fn prop_grid_queries_match_linear_scan(times in sorted_times(), step in 0u32..240) {
            let query = step as f64 * 0.025;
            let idx = index(&times);
            prop_assert_eq!(
                idx.resolve_index(query),
                linear_resolve(&times, query, DEFAULT_TOLERANCE)
            );
        }

        #[test]
        fn prop_resolved_sample_within_tolerance(times in sorted_times(), query in -1.0f64..6.0) {
            let idx = index(&times);
            if let Some(s) = idx.resolve(query) {
                prop_assert!((s.t - query).abs() <= DEFAULT_TOLERANCE);
            }
        }
    }
}
