// First-round seeding: folding league seeds into bracket matches.

// Lay out the first knockout round for the given number of seeds, as lists of
// 0-based seed indexes per match.
//
// Seeds are paired highest against lowest ((1,K), (2,K-1), ...) and the pairs
// dealt serpentine-fashion across a power-of-two number of matches, so that
// the strongest seeds meet as late as possible. Each match's team list is the
// concatenation of the pairs it received: eight seeds over two matches give
// [1, 8, 4, 5] and [2, 7, 3, 6].
pub fn first_round_matches(num_seeds: usize, capacity: usize) -> Vec<Vec<usize>> {
    if num_seeds == 0 {
        return Vec::new();
    }

    let num_matches = num_matches_for(num_seeds, capacity);
    let mut matches: Vec<Vec<usize>> = vec![Vec::new(); num_matches];

    let num_pairs = num_seeds.div_ceil(2);
    for pair_index in 0..num_pairs {
        let band = pair_index / num_matches;
        let rank = pair_index % num_matches;
        let match_index = if band % 2 == 0 {
            rank
        } else {
            num_matches - 1 - rank
        };

        let low = pair_index;
        let high = num_seeds - 1 - pair_index;
        matches[match_index].push(low);
        if high != low {
            matches[match_index].push(high);
        }
    }

    return matches;
}

// The number of first-round matches: the smallest power of two that offers a
// slot to every seed. Halving from here reaches a single final.
fn num_matches_for(num_seeds: usize, capacity: usize) -> usize {
    let minimum = num_seeds.div_ceil(capacity).max(1);
    minimum.next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_seeds_fold_into_two_matches() {
        assert_eq!(
            vec![vec![0, 7, 3, 4], vec![1, 6, 2, 5]],
            first_round_matches(8, 4),
        );
    }

    #[test]
    fn four_or_fewer_seeds_give_a_single_match() {
        assert_eq!(vec![vec![0, 3, 1, 2]], first_round_matches(4, 4));
        assert_eq!(vec![vec![0, 2, 1]], first_round_matches(3, 4));
        assert_eq!(vec![vec![0, 1]], first_round_matches(2, 4));
    }

    #[test]
    fn sixteen_seeds_put_one_and_sixteen_together() {
        let matches = first_round_matches(16, 4);
        assert_eq!(4, matches.len());
        assert_eq!(vec![0, 15, 7, 8], matches[0]);
        assert_eq!(vec![1, 14, 6, 9], matches[1]);
        assert_eq!(vec![2, 13, 5, 10], matches[2]);
        assert_eq!(vec![3, 12, 4, 11], matches[3]);
    }

    #[test]
    fn awkward_seed_counts_round_up_to_a_power_of_two() {
        // Ten seeds need three matches' worth of space, so four matches; the
        // leftover pair lands in the last match.
        let matches = first_round_matches(10, 4);
        assert_eq!(4, matches.len());
        assert_eq!(vec![0, 9], matches[0]);
        assert_eq!(vec![1, 8], matches[1]);
        assert_eq!(vec![2, 7], matches[2]);
        assert_eq!(vec![3, 6, 4, 5], matches[3]);
    }

    #[test]
    fn every_seed_appears_exactly_once() {
        for num_seeds in 1..=24 {
            let matches = first_round_matches(num_seeds, 4);
            let mut seen: Vec<usize> = matches.into_iter().flatten().collect();
            seen.sort();
            assert_eq!((0..num_seeds).collect::<Vec<_>>(), seen);
        }
    }
}
