//! Uniform sampling without replacement.
//!
//! Fanout needs `n` distinct peers out of `len`, each equally likely, in
//! O(n) work once the key sequence exists. A partial Fisher–Yates shuffle
//! over positions does that; recording only the swapped positions in a map
//! leaves the key sequence itself untouched so it can stay cached.

use std::collections::HashMap;

/// Source of uniformly distributed integers.
///
/// Injected by the caller so that sampling is reproducible under a seeded
/// or scripted source. Every `rand::Rng` qualifies.
pub trait UniformRandom {
    /// A uniform integer in `[0, bound)`. Never called with `bound == 0`.
    fn next_below(&mut self, bound: usize) -> usize;
}

impl<R: rand::Rng> UniformRandom for R {
    fn next_below(&mut self, bound: usize) -> usize {
        self.gen_range(0..bound)
    }
}

/// Pick `min(n, len)` distinct positions in `0..len`.
///
/// Position order in the result is the draw order. When `n >= len` every
/// position is returned in ascending order and no randomness is consumed.
pub fn sample_indices<R>(len: usize, n: usize, rng: &mut R) -> Vec<usize>
where
    R: UniformRandom + ?Sized,
{
    if n >= len {
        return (0..len).collect();
    }

    // Virtual array a[k] = swapped.get(k).unwrap_or(k).
    let mut swapped: HashMap<usize, usize> = HashMap::with_capacity(n);
    let mut picked = Vec::with_capacity(n);
    for i in 0..n {
        let remaining = len - i;
        let offset = rng.next_below(remaining);
        assert!(
            offset < remaining,
            "random source returned {offset}, outside [0, {remaining})"
        );
        let j = i + offset;

        let at_i = swapped.get(&i).copied().unwrap_or(i);
        let at_j = swapped.get(&j).copied().unwrap_or(j);
        swapped.insert(j, at_i);
        picked.push(at_j);
    }
    picked
}

/// Pick `min(n, items.len())` distinct elements of `items`.
pub fn sample<'a, T, R>(items: &'a [T], n: usize, rng: &mut R) -> Vec<&'a T>
where
    R: UniformRandom + ?Sized,
{
    sample_indices(items.len(), n, rng)
        .into_iter()
        .map(|i| &items[i])
        .collect()
}
