//! Average path length over a set of identifier pairs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

use super::pathfinding::PathFinder;

/// Consecutive capped results after which a source is reported as an outlier
pub const DEFAULT_EXCLUSION_THRESHOLD: u32 = 10;

/// What happens to a source once it hits the exclusion threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionPolicy {
    /// Log the exclusion and reset its streak; later pairs are still measured
    #[default]
    LogOnly,
    /// Log the exclusion and stop measuring pairs from that source
    SkipSource,
}

#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub exclusion_threshold: u32,
    pub policy: ExclusionPolicy,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            exclusion_threshold: DEFAULT_EXCLUSION_THRESHOLD,
            policy: ExclusionPolicy::LogOnly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairStatus {
    /// Counted in the average
    Measured { hops: u32 },
    /// Hop count equal to the cap, left out of the average. `reached` tells a
    /// target found at exactly the cap apart from one never reached.
    Capped { reached: bool },
    /// The search failed; distance unknown
    Failed { error: String },
    /// Not searched because the source was excluded earlier
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairResult {
    pub source: String,
    pub target: String,
    #[serde(flatten)]
    pub status: PairStatus,
}

/// Everything gathered while folding a set of pairs
#[derive(Debug, Clone, Default, Serialize)]
pub struct PathStatistics {
    pub depth_cap: u32,
    pub total_hops: u64,
    pub valid_pairs: usize,
    pub capped_pairs: usize,
    pub failed_pairs: usize,
    pub skipped_pairs: usize,
    /// Sources that reached the exclusion threshold, in order of exclusion
    pub excluded_sources: Vec<String>,
    /// Hop count → number of measured pairs
    pub distribution: BTreeMap<u32, usize>,
    pub pairs: Vec<PairResult>,
}

impl PathStatistics {
    /// Mean hop count over measured pairs, 0 when there are none
    pub fn average(&self) -> f64 {
        if self.valid_pairs == 0 {
            0.0
        } else {
            self.total_hops as f64 / self.valid_pairs as f64
        }
    }

    pub fn evaluated_pairs(&self) -> usize {
        self.pairs.len()
    }
}

/// Drives a [`PathFinder`] over identifier pairs, one pair at a time
pub struct AggregateStats<'a> {
    finder: &'a PathFinder,
    config: StatsConfig,
}

impl<'a> AggregateStats<'a> {
    pub fn new(finder: &'a PathFinder, config: StatsConfig) -> Self {
        Self { finder, config }
    }

    /// Mean hop count over `pairs`, see [`AggregateStats::collect`]
    pub async fn average_path(&self, pairs: &[(String, String)]) -> f64 {
        self.collect(pairs).await.average()
    }

    /// Measure every pair.
    ///
    /// Failed searches are skipped entirely. Results equal to the cap are left out
    /// of the average and extend the source's capped streak; any other result
    /// resets it. A streak reaching the exclusion threshold is logged and reset.
    pub async fn collect(&self, pairs: &[(String, String)]) -> PathStatistics {
        let cap = self.finder.depth_cap();
        let threshold = self.config.exclusion_threshold.max(1);
        let mut stats = PathStatistics {
            depth_cap: cap,
            ..PathStatistics::default()
        };
        let mut streaks: HashMap<&str, u32> = HashMap::new();
        let mut excluded: HashSet<&str> = HashSet::new();

        for (source, target) in pairs {
            if self.config.policy == ExclusionPolicy::SkipSource && excluded.contains(source.as_str()) {
                stats.skipped_pairs += 1;
                stats.pairs.push(PairResult {
                    source: source.clone(),
                    target: target.clone(),
                    status: PairStatus::Skipped,
                });
                continue;
            }

            let outcome = match self.finder.shortest_path(source, target).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    debug!("Skipping pair {} -> {}: {}", source, target, e);
                    stats.failed_pairs += 1;
                    stats.pairs.push(PairResult {
                        source: source.clone(),
                        target: target.clone(),
                        status: PairStatus::Failed { error: e.to_string() },
                    });
                    continue;
                }
            };

            let hops = outcome.hops(cap);
            let streak = streaks.entry(source.as_str()).or_insert(0);
            let status = if hops == cap {
                *streak += 1;
                stats.capped_pairs += 1;
                PairStatus::Capped {
                    reached: outcome.is_found(),
                }
            } else {
                *streak = 0;
                stats.total_hops += u64::from(hops);
                stats.valid_pairs += 1;
                *stats.distribution.entry(hops).or_insert(0) += 1;
                PairStatus::Measured { hops }
            };
            stats.pairs.push(PairResult {
                source: source.clone(),
                target: target.clone(),
                status,
            });

            if *streak >= threshold {
                *streak = 0;
                info!(
                    "Source {} hit the cap {} times in a row, excluded from the average",
                    source, threshold
                );
                if let Some(audit) = self.finder.audit() {
                    audit.record(format!(
                        "source {} capped {} times in a row, excluded from average",
                        source, threshold
                    ));
                }
                if excluded.insert(source.as_str()) {
                    stats.excluded_sources.push(source.clone());
                }
            }
        }

        info!(
            "Measured {} of {} pairs ({} capped, {} failed, {} skipped), average {:.2}",
            stats.valid_pairs,
            pairs.len(),
            stats.capped_pairs,
            stats.failed_pairs,
            stats.skipped_pairs,
            stats.average()
        );
        stats
    }
}
