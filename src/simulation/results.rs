// src/simulation/results.rs
use std::collections::BTreeMap;
use std::fmt;

/// Measurement histogram: classical bitstring to number of shots.
///
/// Character `i` of each key is classical bit `i`, so a key reads in the same
/// order as the hidden bitstring it came from.
pub type Counts = BTreeMap<String, usize>;

/// Holds the results of a sampled circuit simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    counts: Counts,
    shots: usize,
}

impl SimulationResult {
    /// Creates a new, empty result set. (Internal visibility)
    pub(crate) fn new() -> Self {
        Self {
            counts: Counts::new(),
            shots: 0,
        }
    }

    /// Records the classical register after one shot. (Internal visibility)
    pub(crate) fn record_shot(&mut self, clbits: &[u8]) {
        let key: String = clbits.iter().map(|b| if *b == 1 { '1' } else { '0' }).collect();
        *self.counts.entry(key).or_insert(0) += 1;
        self.shots += 1;
    }

    /// How often `bitstring` was observed.
    pub fn get(&self, bitstring: &str) -> usize {
        self.counts.get(bitstring).copied().unwrap_or(0)
    }

    /// The full histogram.
    pub fn counts(&self) -> &Counts {
        &self.counts
    }

    /// Total shots recorded.
    pub fn shots(&self) -> usize {
        self.shots
    }

    /// The most frequent outcome; ties go to the lexicographically smallest key.
    pub fn most_frequent(&self) -> Option<(&str, usize)> {
        self.counts
            .iter()
            .fold(None, |best: Option<(&str, usize)>, (key, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((key.as_str(), *count)),
            })
    }
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation Results ({} shots):", self.shots)?;
        if self.counts.is_empty() {
            writeln!(f, "  No shots were recorded.")?;
        } else {
            for (key, count) in &self.counts {
                let label = if key.is_empty() { "<no bits>" } else { key.as_str() };
                writeln!(f, "    {}: {}", label, count)?;
            }
        }
        Ok(())
    }
}
