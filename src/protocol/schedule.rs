//! The deterministic pass schedule of Randomized Shell Sort.
//!
//! This is an implementation of the region schedule from:
//! "Randomized Shellsort: A Simple Oblivious Sorting Algorithm"
//! by M. T. Goodrich <https://arxiv.org/abs/0909.1037>.
//!
//! The array is partitioned into regions of length `offset`, and each
//! iteration runs a shaker pass (forward then backward over adjacent regions)
//! followed by a brick pass (3-hop, 2-hop, then the even- and odd-aligned
//! adjacent sub-passes). `offset` starts at `n / 2` and halves until the last
//! iteration compares adjacent positions at `offset = 1`.
//!
//! The schedule depends only on `n`. That is what makes the client's access
//! pattern data-oblivious: the store observes the same sequence of region
//! pairs for every input of a given length.

use crate::error::Error;

/// A pair of disjoint regions to be matched against each other.
///
/// Direction is encoded by the order of the starts: `a_start > b_start` means
/// the pair is compared descending (the shaker backward sweep).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RegionPair {
    pub a_start: u32,
    pub b_start: u32,
    pub size: u32,
}

impl RegionPair {
    fn new(a_start: u32, b_start: u32, size: u32) -> Self {
        Self {
            a_start,
            b_start,
            size,
        }
    }
}

/// Emit the full region-pair sequence for an array of length `n`.
///
/// ## Errors
/// `n` must be a power of two; anything else (including zero) is rejected
/// with `InvalidArgument`. `n == 1` yields an empty schedule.
pub fn region_pairs(n: u32) -> Result<Vec<RegionPair>, Error> {
    if n == 0 || !n.is_power_of_two() {
        return Err(Error::invalid_argument(format!(
            "array length {n} is not a power of two"
        )));
    }

    let mut pairs = Vec::new();
    let mut offset = n / 2;

    while offset >= 1 {
        let num_regions = n / offset;
        let region = |i: u32| i * offset;

        // Shaker pass: forward adjacent, then backward adjacent.
        for i in 0..num_regions - 1 {
            pairs.push(RegionPair::new(region(i), region(i + 1), offset));
        }
        for i in (0..num_regions - 1).rev() {
            pairs.push(RegionPair::new(region(i + 1), region(i), offset));
        }

        // Brick pass: 3-hop, 2-hop, even-adjacent, odd-adjacent.
        if num_regions >= 4 {
            for i in 0..num_regions - 3 {
                pairs.push(RegionPair::new(region(i), region(i + 3), offset));
            }
        }
        if num_regions >= 3 {
            for i in 0..num_regions - 2 {
                pairs.push(RegionPair::new(region(i), region(i + 2), offset));
            }
        }
        for i in (0..num_regions - 1).step_by(2) {
            pairs.push(RegionPair::new(region(i), region(i + 1), offset));
        }
        for i in (1..num_regions - 1).step_by(2) {
            pairs.push(RegionPair::new(region(i), region(i + 1), offset));
        }

        offset /= 2;
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::{region_pairs, RegionPair};
    use crate::error::Error;

    fn pair(a: u32, b: u32, size: u32) -> RegionPair {
        RegionPair {
            a_start: a,
            b_start: b,
            size,
        }
    }

    #[test]
    fn rejects_non_power_of_two() {
        for n in [0, 3, 6, 12, 100] {
            assert!(matches!(region_pairs(n), Err(Error::InvalidArgument(_))));
        }
    }

    #[test]
    fn single_element_schedule_is_empty() {
        assert!(region_pairs(1).unwrap().is_empty());
    }

    #[test]
    fn two_element_schedule() {
        // offset = 1, two regions: shaker forward, shaker backward, then the
        // even-adjacent brick sub-pass. 3-hop and 2-hop are skipped below
        // four regions, and there is no odd-aligned adjacent pair.
        assert_eq!(
            region_pairs(2).unwrap(),
            vec![pair(0, 1, 1), pair(1, 0, 1), pair(0, 1, 1)]
        );
    }

    #[test]
    fn four_element_schedule() {
        let expected = vec![
            // offset = 2: two regions of two.
            pair(0, 2, 2),
            pair(2, 0, 2),
            pair(0, 2, 2),
            // offset = 1: four regions of one.
            pair(0, 1, 1),
            pair(1, 2, 1),
            pair(2, 3, 1),
            pair(3, 2, 1),
            pair(2, 1, 1),
            pair(1, 0, 1),
            pair(0, 3, 1), // 3-hop
            pair(0, 2, 1), // 2-hop
            pair(1, 3, 1),
            pair(0, 1, 1), // even-adjacent
            pair(2, 3, 1),
            pair(1, 2, 1), // odd-adjacent
        ];
        assert_eq!(region_pairs(4).unwrap(), expected);
    }

    #[test]
    fn regions_are_always_disjoint() {
        for n in [2_u32, 4, 8, 16, 64, 256] {
            for p in region_pairs(n).unwrap() {
                let (lo, hi) = if p.a_start < p.b_start {
                    (p.a_start, p.b_start)
                } else {
                    (p.b_start, p.a_start)
                };
                assert!(lo + p.size <= hi, "overlapping regions in {p:?} for n={n}");
                assert!(hi + p.size <= n, "region out of bounds in {p:?} for n={n}");
            }
        }
    }

    #[test]
    fn schedule_depends_only_on_length() {
        assert_eq!(region_pairs(64).unwrap(), region_pairs(64).unwrap());
    }

    #[test]
    fn offsets_halve_down_to_one() {
        let pairs = region_pairs(16).unwrap();
        let mut sizes: Vec<u32> = pairs.iter().map(|p| p.size).collect();
        sizes.dedup();
        assert_eq!(sizes, vec![8, 4, 2, 1]);
    }
}
