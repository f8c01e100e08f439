//! Drawing batches of pairwise-distinct values.

use std::collections::HashSet;
use std::hash::Hash;

/// Batches redrawn before a warning is logged.
pub const RETRY_WARN_THRESHOLD: u64 = 10_000;

/// Draw `N` values from `generate` until all of them are pairwise distinct.
///
/// A batch containing a duplicate is discarded entirely and drawn again, so
/// the positional order of the result is generation order. There is no
/// retry bound: a generator that cannot produce `N` distinct values loops
/// forever (one warning is logged once the retry count reaches
/// [`RETRY_WARN_THRESHOLD`]).
pub fn sample_distinct<T, const N: usize, F>(mut generate: F) -> [T; N]
where
    T: Eq + Hash,
    F: FnMut() -> T,
{
    let mut retries = 0u64;
    loop {
        let batch: [T; N] = std::array::from_fn(|_| generate());
        if all_distinct(&batch) {
            return batch;
        }
        retries += 1;
        if retries == RETRY_WARN_THRESHOLD {
            tracing::warn!(
                retries = retries,
                batch_size = N,
                "distinct sampling keeps colliding; generator range may be too small"
            );
        }
    }
}

fn all_distinct<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_whole_batch() {
        // First batch [1, 1] collides and is thrown away.
        let mut script = vec![1, 1, 2, 3].into_iter();
        let batch: [i32; 2] = sample_distinct(|| script.next().unwrap());
        assert_eq!(batch, [2, 3]);
    }

    #[test]
    fn test_single_element_never_retries() {
        let mut calls = 0;
        let batch: [u8; 1] = sample_distinct(|| {
            calls += 1;
            7
        });
        assert_eq!(batch, [7]);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_keeps_generation_order() {
        let mut next = 10;
        let batch: [i32; 4] = sample_distinct(|| {
            next -= 1;
            next
        });
        assert_eq!(batch, [9, 8, 7, 6]);
    }
}
