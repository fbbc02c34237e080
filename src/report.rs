//! Small-world verdict over collected path statistics

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::algo::PathStatistics;

/// Average path length at or below which the hypothesis holds
pub const DEFAULT_THRESHOLD: f64 = 6.0;

#[derive(Debug, Clone, Serialize)]
pub struct PathReport {
    pub pairs_evaluated: usize,
    pub valid_pairs: usize,
    pub capped_pairs: usize,
    pub failed_pairs: usize,
    pub skipped_pairs: usize,
    pub average: f64,
    pub threshold: f64,
    /// Measured pairs exist and their average is within the threshold
    pub holds: bool,
    pub distribution: BTreeMap<u32, usize>,
    pub excluded_sources: Vec<String>,
}

impl PathReport {
    pub fn from_statistics(stats: &PathStatistics, threshold: f64) -> Self {
        let average = stats.average();
        Self {
            pairs_evaluated: stats.evaluated_pairs(),
            valid_pairs: stats.valid_pairs,
            capped_pairs: stats.capped_pairs,
            failed_pairs: stats.failed_pairs,
            skipped_pairs: stats.skipped_pairs,
            average,
            threshold,
            holds: stats.valid_pairs > 0 && average <= threshold,
            distribution: stats.distribution.clone(),
            excluded_sources: stats.excluded_sources.clone(),
        }
    }

    pub fn verdict(&self) -> &'static str {
        if self.valid_pairs == 0 {
            "no measurable paths"
        } else if self.holds {
            "consistent with six degrees of separation"
        } else {
            "not consistent with six degrees of separation"
        }
    }
}

impl fmt::Display for PathReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pairs evaluated: {}", self.pairs_evaluated)?;
        writeln!(
            f,
            "  measured {}, capped {}, failed {}, skipped {}",
            self.valid_pairs, self.capped_pairs, self.failed_pairs, self.skipped_pairs
        )?;
        writeln!(f, "Average path length: {:.2}", self.average)?;
        write!(f, "Verdict (threshold {:.1}): {}", self.threshold, self.verdict())
    }
}
