use crate::state::SeatIndex;
use serde::{Deserialize, Serialize};

/// What one seat put into the pot over the whole hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    pub seat: SeatIndex,
    pub amount: u32,
    pub folded: bool,
}

/// One layer of the pot and the seats that can win it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pot {
    pub amount: u32,
    /// Ascending seat order.
    pub eligible: Vec<SeatIndex>,
}

impl Pot {
    /// More than one player can win this layer.
    pub fn is_contested(&self) -> bool {
        self.eligible.len() > 1
    }
}

/// Splits total contributions into the main pot and side pots, lowest layer
/// first.
///
/// Each distinct contribution level opens a layer that every seat at or above
/// that level pays into. Only seats that have not folded are eligible to win
/// it. A layer nobody can win is merged into the nearest lower layer, so the
/// pots always add up to the total contributed. Eligibility only shrinks as
/// the levels rise, so the bottom layer is unwinnable only when every
/// contributor folded; that case yields one pot with no eligible seats.
pub fn compute_side_pots(contributions: &[Contribution]) -> Vec<Pot> {
    let mut levels: Vec<u32> = contributions.iter().map(|c| c.amount).filter(|&a| a > 0).collect();
    levels.sort_unstable();
    levels.dedup();

    let mut pots: Vec<Pot> = Vec::with_capacity(levels.len());
    let mut prev_level = 0;

    for level in levels {
        let layer = level - prev_level;
        let mut amount = 0;
        let mut eligible = Vec::new();
        for c in contributions.iter().filter(|c| c.amount >= level) {
            amount += layer;
            if !c.folded {
                eligible.push(c.seat);
            }
        }
        prev_level = level;
        eligible.sort_unstable();

        match pots.last_mut() {
            Some(lower) if eligible.is_empty() => lower.amount += amount,
            _ => pots.push(Pot { amount, eligible }),
        }
    }

    pots
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn contrib(list: &[(u32, bool)]) -> Vec<Contribution> {
        list.iter()
            .enumerate()
            .map(|(seat, &(amount, folded))| Contribution { seat, amount, folded })
            .collect()
    }

    fn total(pots: &[Pot]) -> u32 {
        pots.iter().map(|p| p.amount).sum()
    }

    #[test]
    fn test_single_pot_when_everyone_matches() {
        let pots = compute_side_pots(&contrib(&[(100, false), (100, false), (100, false)]));
        assert_eq!(pots, vec![Pot { amount: 300, eligible: vec![0, 1, 2] }]);
    }

    #[test]
    fn test_short_all_in_creates_side_pot() {
        let pots = compute_side_pots(&contrib(&[(50, false), (100, false), (100, false)]));
        assert_eq!(pots, vec![
            Pot { amount: 150, eligible: vec![0, 1, 2] },
            Pot { amount: 100, eligible: vec![1, 2] },
        ]);
    }

    #[test]
    fn test_four_levels() {
        let pots = compute_side_pots(&contrib(&[(25, false), (75, false), (150, false), (150, false)]));
        assert_eq!(pots, vec![
            Pot { amount: 100, eligible: vec![0, 1, 2, 3] },
            Pot { amount: 150, eligible: vec![1, 2, 3] },
            Pot { amount: 150, eligible: vec![2, 3] },
        ]);
    }

    #[test]
    fn test_folded_chips_stay_in_pot_but_cannot_win() {
        let pots = compute_side_pots(&contrib(&[(60, true), (100, false), (100, false)]));
        assert_eq!(pots, vec![
            Pot { amount: 180, eligible: vec![1, 2] },
            Pot { amount: 80, eligible: vec![1, 2] },
        ]);
    }

    #[test]
    fn test_zero_contribution_is_ignored() {
        let pots = compute_side_pots(&contrib(&[(0, false), (40, false), (40, false)]));
        assert_eq!(pots, vec![Pot { amount: 80, eligible: vec![1, 2] }]);
    }

    #[test]
    fn test_layer_with_only_folded_contributors_rolls_down() {
        // seat 0 bet 500 and left the table; seats 1 and 2 are all in for less
        let pots = compute_side_pots(&contrib(&[(500, true), (100, false), (80, false)]));
        assert_eq!(pots, vec![
            Pot { amount: 240, eligible: vec![1, 2] },
            Pot { amount: 40 + 400, eligible: vec![1] },
        ]);
        assert_eq!(total(&pots), 680);
    }

    #[test]
    fn test_folded_small_contribution_only_joins_main_pot() {
        let pots = compute_side_pots(&contrib(&[(10, true), (50, false), (50, false)]));
        assert_eq!(pots, vec![
            Pot { amount: 30, eligible: vec![1, 2] },
            Pot { amount: 80, eligible: vec![1, 2] },
        ]);
    }

    #[test]
    fn test_everyone_folded_keeps_the_chips() {
        let pots = compute_side_pots(&contrib(&[(10, true), (30, true)]));
        assert_eq!(pots, vec![Pot { amount: 40, eligible: vec![] }]);
    }

    #[test]
    fn test_contested() {
        assert!(Pot { amount: 10, eligible: vec![0, 3] }.is_contested());
        assert!(!Pot { amount: 10, eligible: vec![3] }.is_contested());
    }

    proptest! {
        #[test]
        fn prop_pots_add_up(list in prop::collection::vec((0u32..5_000, any::<bool>()), 2..10)) {
            let contributions = contrib(&list);
            let pots = compute_side_pots(&contributions);
            let contributed: u32 = contributions.iter().map(|c| c.amount).sum();
            prop_assert_eq!(total(&pots), contributed);
        }

        #[test]
        fn prop_only_live_contributors_are_eligible(list in prop::collection::vec((1u32..5_000, any::<bool>()), 2..10)) {
            let contributions = contrib(&list);
            for pot in compute_side_pots(&contributions) {
                for seat in pot.eligible {
                    prop_assert!(!contributions[seat].folded);
                }
            }
        }
    }
}
