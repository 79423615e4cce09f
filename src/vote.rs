//! Plurality vote over ensemble outputs
//!
//! The most frequent class index wins. Ties go to whichever tied index
//! appeared first in the input, so `[2, 3, 2, 3]` resolves to 2.

use serde::Serialize;

/// Vote counts in first-encounter order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    entries: Vec<(i64, usize)>,
}

impl VoteTally {
    pub fn from_votes(votes: &[i64]) -> Self {
        let mut entries: Vec<(i64, usize)> = Vec::new();
        for &vote in votes {
            match entries.iter_mut().find(|(index, _)| *index == vote) {
                Some((_, count)) => *count += 1,
                None => entries.push((vote, 1)),
            }
        }
        Self { entries }
    }

    /// `(index, count)` pairs in the order indices first appeared
    pub fn entries(&self) -> &[(i64, usize)] {
        &self.entries
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn count(&self, index: i64) -> usize {
        self.entries
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Winning index and its count, `None` for an empty tally
    pub fn winner(&self) -> Option<(i64, usize)> {
        let top = self.entries.iter().map(|(_, count)| *count).max()?;
        self.entries.iter().copied().find(|(_, count)| *count == top)
    }

    /// Whether more than one index shares the top count
    pub fn is_tied(&self) -> bool {
        match self.winner() {
            Some((_, top)) => self.entries.iter().filter(|(_, c)| *c == top).count() > 1,
            None => false,
        }
    }

    /// Whether every voter agreed
    pub fn is_unanimous(&self) -> bool {
        self.entries.len() == 1
    }
}

/// Resolve a vote to a single class index
pub fn resolve(votes: &[i64]) -> Option<i64> {
    VoteTally::from_votes(votes).winner().map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_clear_majority() {
        assert_eq!(resolve(&[5, 5, 5, 12]), Some(5));
        assert_eq!(resolve(&[7]), Some(7));
    }

    #[test]
    fn test_tie_goes_to_first_seen() {
        assert_eq!(resolve(&[2, 3, 2, 3]), Some(2));
        assert_eq!(resolve(&[3, 2, 2, 3]), Some(3));
        assert_eq!(resolve(&[1, 2, 3, 4]), Some(1));
    }

    fn permutations(votes: &[i64]) -> Vec<Vec<i64>> {
        if votes.len() <= 1 {
            return vec![votes.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..votes.len() {
            let mut rest = votes.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn test_unique_plurality_holds_for_every_ordering() {
        for votes in [[5, 5, 12, 7], [5, 5, 5, 12], [9, 9, 9, 9]] {
            let orderings = permutations(&votes);
            assert_eq!(orderings.len(), 24);
            for ordering in orderings {
                assert_eq!(resolve(&ordering), Some(votes[0]), "{:?}", ordering);
            }
        }
    }

    #[test]
    fn test_empty_votes() {
        assert_eq!(resolve(&[]), None);
        assert!(!VoteTally::default().is_tied());
    }

    #[test]
    fn test_tally_details() {
        let tally = VoteTally::from_votes(&[2, 3, 2, 3]);
        assert_eq!(tally.entries(), &[(2, 2), (3, 2)]);
        assert!(tally.is_tied());
        assert!(!tally.is_unanimous());
        assert_eq!(tally.total(), 4);
        assert_eq!(tally.count(3), 2);
        assert_eq!(tally.count(9), 0);

        let unanimous = VoteTally::from_votes(&[4, 4, 4]);
        assert!(unanimous.is_unanimous());
        assert_eq!(unanimous.winner(), Some((4, 3)));
    }

    #[test]
    fn test_out_of_range_indices_still_vote() {
        assert_eq!(resolve(&[41, 41, 0]), Some(41));
        assert_eq!(resolve(&[-1, -1, 3]), Some(-1));
    }

    #[quickcheck]
    fn prop_winner_has_max_count(votes: Vec<i64>) -> bool {
        let tally = VoteTally::from_votes(&votes);
        match resolve(&votes) {
            None => votes.is_empty(),
            Some(winner) => {
                let top = tally.count(winner);
                votes.iter().all(|v| tally.count(*v) <= top)
            }
        }
    }

    #[quickcheck]
    fn prop_strict_majority_survives_reordering(votes: Vec<i64>) -> bool {
        let tally = VoteTally::from_votes(&votes);
        if tally.is_tied() || votes.is_empty() {
            return true;
        }
        let mut reversed = votes.clone();
        reversed.reverse();
        resolve(&votes) == resolve(&reversed)
    }
}
