//! Proportional split of an integer amount.

/// Split `total` across `weights` proportionally.
///
/// Each entry gets `floor(total * weight / sum)`. The rounding remainder goes
/// to the single largest weight; among equal weights the earliest index wins,
/// so callers order entries by precedence. The shares always sum to `total`,
/// except when every weight is zero, in which case nothing is distributed.
pub fn apportion(total: u64, weights: &[u64]) -> Vec<u64> {
    let sum: u128 = weights.iter().map(|&w| u128::from(w)).sum();
    if sum == 0 {
        return vec![0; weights.len()];
    }

    let mut shares: Vec<u64> = weights
        .iter()
        .map(|&w| (u128::from(total) * u128::from(w) / sum) as u64)
        .collect();

    let assigned: u64 = shares.iter().sum();
    let remainder = total - assigned;
    if remainder > 0 {
        // max_by_key returns the last maximum; reverse to prefer the first.
        let largest = weights
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|&(_, &w)| w)
            .map(|(i, _)| i);
        if let Some(i) = largest {
            shares[i] += remainder;
        }
    }
    shares
}
