//! First-order Markov model over chord degrees.
//!
//! Learned once from a corpus of progressions (the style catalog) and read-only
//! afterwards. Iteration order of both maps is the sorted degree order, which
//! keeps sampling reproducible for a seeded RNG.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};

/// Destination degree -> probability
pub type Transitions = BTreeMap<i32, f64>;

/// Degree-to-degree transition table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkovChain {
    table: BTreeMap<i32, Transitions>,
}

impl MarkovChain {
    /// Count every adjacent pair in every sequence and normalize each source
    /// row into probabilities.
    pub fn learn<S: AsRef<[i32]>>(corpus: &[S]) -> Self {
        let mut counts: BTreeMap<i32, BTreeMap<i32, u32>> = BTreeMap::new();
        for sequence in corpus {
            for pair in sequence.as_ref().windows(2) {
                *counts.entry(pair[0]).or_default().entry(pair[1]).or_default() += 1;
            }
        }

        let table: BTreeMap<i32, Transitions> = counts
            .into_iter()
            .map(|(from, row)| {
                let total: u32 = row.values().sum();
                let probs = row
                    .into_iter()
                    .map(|(to, n)| (to, n as f64 / total as f64))
                    .collect();
                (from, probs)
            })
            .collect();

        debug!(sources = table.len(), "Learned chord transition table");
        Self { table }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Outgoing transitions for a source degree
    pub fn transitions(&self, from: i32) -> Option<&Transitions> {
        self.table.get(&from)
    }

    /// Degrees that appear as a source anywhere in the table
    pub fn sources(&self) -> impl Iterator<Item = i32> + '_ {
        self.table.keys().copied()
    }

    /// Random walk of exactly `length` degrees starting at `start`.
    ///
    /// A degree with no outgoing transitions falls back to a uniformly chosen
    /// source degree.
    pub fn generate(&self, start: i32, length: usize, rng: &mut fastrand::Rng) -> Result<Vec<i32>> {
        if self.table.is_empty() {
            return Err(EngineError::InvalidGenerationInput(
                "markov chain has no transitions".to_string(),
            ));
        }

        let mut sequence = Vec::with_capacity(length);
        if length == 0 {
            return Ok(sequence);
        }
        sequence.push(start);

        let mut current = start;
        while sequence.len() < length {
            current = match self.table.get(&current) {
                Some(row) => sample(row, rng.f64()),
                None => {
                    let keys: Vec<i32> = self.sources().collect();
                    keys[rng.usize(..keys.len())]
                }
            };
            sequence.push(current);
        }
        Ok(sequence)
    }
}

/// Inverse-CDF draw over a probability row
fn sample(row: &Transitions, draw: f64) -> i32 {
    let mut cumulative = 0.0;
    let mut last = 0;
    for (&to, &p) in row {
        cumulative += p;
        last = to;
        if cumulative >= draw {
            return to;
        }
    }
    // Rounding left the total just under the draw
    last
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Vec<i32>> {
        vec![vec![0, 5, 3, 4], vec![0, 3, 4, 0], vec![0, 5, 3, 4]]
    }

    #[test]
    fn test_learn_normalizes_rows() {
        let chain = MarkovChain::learn(&corpus());
        for from in chain.sources() {
            let total: f64 = chain.transitions(from).unwrap().values().sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
        let row = chain.transitions(0).unwrap();
        assert!((row[&5] - 2.0 / 3.0).abs() < 1e-9);
        assert!((row[&3] - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(chain.transitions(3).unwrap().get(&4), Some(&1.0));
    }

    #[test]
    fn test_generate_length_and_start() {
        let chain = MarkovChain::learn(&corpus());
        let mut rng = fastrand::Rng::with_seed(7);
        for length in 0..10 {
            let seq = chain.generate(0, length, &mut rng).unwrap();
            assert_eq!(seq.len(), length);
            if length > 0 {
                assert_eq!(seq[0], 0);
            }
        }
    }

    #[test]
    fn test_generate_only_takes_learned_transitions() {
        let chain = MarkovChain::learn(&corpus());
        let mut rng = fastrand::Rng::with_seed(11);
        for _ in 0..200 {
            let seq = chain.generate(0, 8, &mut rng).unwrap();
            for pair in seq.windows(2) {
                let row = chain.transitions(pair[0]).unwrap();
                assert!(row.get(&pair[1]).copied().unwrap_or(0.0) > 0.0);
            }
        }
    }

    #[test]
    fn test_unknown_start_falls_back_to_sources() {
        let chain = MarkovChain::learn(&corpus());
        let mut rng = fastrand::Rng::with_seed(3);
        let seq = chain.generate(6, 2, &mut rng).unwrap();
        assert_eq!(seq[0], 6);
        assert!(chain.sources().any(|s| s == seq[1]));
    }

    #[test]
    fn test_empirical_frequencies_converge() {
        let chain = MarkovChain::learn(&corpus());
        let mut rng = fastrand::Rng::with_seed(42);
        let trials = 20_000;
        let to_five = (0..trials)
            .filter(|_| chain.generate(0, 2, &mut rng).unwrap()[1] == 5)
            .count();
        let freq = to_five as f64 / trials as f64;
        assert!((freq - 2.0 / 3.0).abs() < 0.02, "frequency {freq}");
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let chain = MarkovChain::learn::<Vec<i32>>(&[]);
        assert!(chain.is_empty());
        let mut rng = fastrand::Rng::with_seed(1);
        assert!(matches!(
            chain.generate(0, 4, &mut rng),
            Err(EngineError::InvalidGenerationInput(_))
        ));
    }
}
