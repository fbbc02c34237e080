//! Choosing which identifier pairs to measure

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Every unordered pair `(ids[i], ids[j])` with `i < j`, in index order
pub fn all_pairs(ids: &[String]) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(pair_count(ids.len()));
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            pairs.push((a.clone(), b.clone()));
        }
    }
    pairs
}

/// `n` distinct pairs drawn uniformly from [`all_pairs`], reproducible for a given seed.
///
/// Returns all pairs when `n` covers them.
pub fn sample_pairs(ids: &[String], n: usize, seed: u64) -> Vec<(String, String)> {
    let total = pair_count(ids.len());
    if n >= total {
        return all_pairs(ids);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = rand::seq::index::sample(&mut rng, total, n).into_vec();
    picked.sort_unstable();

    // Walk the rows of the upper triangle once, consuming sorted indices
    let k = ids.len();
    let mut pairs = Vec::with_capacity(n);
    let mut row = 0;
    let mut row_start = 0;
    for idx in picked {
        while idx >= row_start + (k - 1 - row) {
            row_start += k - 1 - row;
            row += 1;
        }
        let col = row + 1 + (idx - row_start);
        pairs.push((ids[row].clone(), ids[col].clone()));
    }
    pairs
}

fn pair_count(k: usize) -> usize {
    k * k.saturating_sub(1) / 2
}
