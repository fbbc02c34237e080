//! Path algorithms
//!
//! Bounded BFS over the store's adjacency (`pathfinding`), averaging over many
//! pairs with outlier bookkeeping (`stats`), and pair selection (`pairs`).

pub mod pairs;
pub mod pathfinding;
pub mod stats;

pub use pairs::{all_pairs, sample_pairs};
pub use pathfinding::{PathConfig, PathError, PathFinder, PathOutcome, PathResult, DEFAULT_DEPTH_CAP};
pub use stats::{
    AggregateStats, ExclusionPolicy, PairResult, PairStatus, PathStatistics, StatsConfig,
    DEFAULT_EXCLUSION_THRESHOLD,
};
