//! Contiguous ownership ranges over the particle array.

use std::ops::Range;

/// Split `0..n` into `workers` contiguous ranges of `ceil(n / workers)`
/// particles each, clamped to `n`; trailing ranges are empty when there are
/// more workers than particles. Ownership of a range covers the particle
/// entries, their accelerations, and their map slots.
pub fn ranges(n: usize, workers: usize) -> Vec<Range<usize>> {
    let per = (n + workers - 1) / workers;
    (0..workers)
        .map(|w| (w * per).min(n)..((w + 1) * per).min(n))
        .collect()
}
