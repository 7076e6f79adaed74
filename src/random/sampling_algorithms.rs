//! Uniform sampling without replacement from containers of known length. The algorithm is written
//! to be generic over the container type, so it works directly on edge sets and node ranges
//! without collecting them first.

use crate::rand::seq::index::sample as choose_range;
use crate::rand::Rng;

/// Sample a random element uniformly from a container of known length.
///
/// We do not assume the container is randomly indexable, only that it can be iterated over.
pub fn sample_single_from_known_length<I, R, T>(rng: &mut R, iter: I) -> Option<T>
where
    R: Rng,
    I: IntoIterator<Item = T>,
    I::IntoIter: ExactSizeIterator,
{
    let mut iter = iter.into_iter();
    let len = iter.len();
    if len == 0 {
        return None;
    }
    let index = rng.random_range(0..len);
    iter.nth(index)
}

/// Sample multiple random elements uniformly without replacement from a container of known length.
/// If more samples are requested than there are items, every item is returned.
///
/// We do not assume the container is randomly indexable, only that it can be iterated over.
/// The selected items are returned in iteration order.
pub fn sample_multiple_from_known_length<I, R, T>(rng: &mut R, iter: I, requested: usize) -> Vec<T>
where
    R: Rng,
    I: IntoIterator<Item = T>,
    I::IntoIter: ExactSizeIterator,
{
    let iter = iter.into_iter();
    let requested = requested.min(iter.len());
    if requested == 0 {
        return Vec::new();
    }

    let mut indexes = Vec::with_capacity(requested);
    indexes.extend(choose_range(rng, iter.len(), requested));
    indexes.sort_unstable();
    let mut index_iterator = indexes.into_iter();
    let mut next_idx = index_iterator.next();
    let mut selected = Vec::with_capacity(requested);

    for (idx, item) in iter.enumerate() {
        if Some(idx) == next_idx {
            selected.push(item);
            next_idx = index_iterator.next();
            if next_idx.is_none() {
                break;
            }
        }
    }

    selected
}

#[cfg(test)]
mod test {
    use super::{sample_multiple_from_known_length, sample_single_from_known_length};
    use crate::rand::rngs::SmallRng;
    use crate::rand::SeedableRng;

    #[test]
    fn samples_without_replacement() {
        let mut rng = SmallRng::seed_from_u64(42);
        let selected = sample_multiple_from_known_length(&mut rng, 0..100usize, 10);
        assert_eq!(selected.len(), 10);
        let mut deduped = selected.clone();
        deduped.dedup();
        assert_eq!(deduped, selected);
        assert!(selected.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn requesting_too_many_returns_everything() {
        let mut rng = SmallRng::seed_from_u64(42);
        let selected = sample_multiple_from_known_length(&mut rng, 0..5usize, 10);
        assert_eq!(selected, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn requesting_none_returns_empty() {
        let mut rng = SmallRng::seed_from_u64(42);
        let selected: Vec<usize> = sample_multiple_from_known_length(&mut rng, 0..5usize, 0);
        assert!(selected.is_empty());
    }

    #[test]
    fn single_sample_from_empty_is_none() {
        let mut rng = SmallRng::seed_from_u64(42);
        assert_eq!(sample_single_from_known_length(&mut rng, 0..0usize), None);
        let item = sample_single_from_known_length(&mut rng, [4, 5, 6]).unwrap();
        assert!((4..=6).contains(&item));
    }

    #[test]
    fn all_items_equally_likely() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut counts = [0usize; 10];
        for _ in 0..10_000 {
            for item in sample_multiple_from_known_length(&mut rng, 0..10usize, 3) {
                counts[item] += 1;
            }
        }
        // Each item is expected 3000 times.
        for count in counts {
            assert!((count as i64 - 3000).abs() < 250, "count {count}");
        }
    }
}
