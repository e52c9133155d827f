use std::collections::HashMap;

use uuid::Uuid;

use super::votes::VoteTally;
use super::Listing;

#[derive(Debug, Clone)]
pub struct Scored<T> {
    pub item: T,
    pub tally: VoteTally,
}

impl<T: Listing> Listing for Scored<T> {
    fn id(&self) -> Uuid {
        self.item.id()
    }

    fn tags(&self) -> &[String] {
        self.item.tags()
    }
}

/// Order by net score, highest first. The sort is stable, so callers that pass
/// items newest-first keep that order among equal scores. Items with no
/// tally entry score zero.
pub fn rank<T: Listing>(items: Vec<T>, tallies: &HashMap<Uuid, VoteTally>) -> Vec<Scored<T>> {
    let mut scored: Vec<Scored<T>> = items
        .into_iter()
        .map(|item| {
            let tally = tallies.get(&item.id()).copied().unwrap_or_default();
            Scored { item, tally }
        })
        .collect();
    scored.sort_by(|a, b| b.tally.score().cmp(&a.tally.score()));
    scored
}

/// Podium place for the first three entries of a ranked list.
pub fn medal(position: usize) -> Option<u8> {
    match position {
        1..=3 => Some(position as u8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Item {
        id: Uuid,
        name: &'static str,
        tags: Vec<String>,
    }

    impl Listing for Item {
        fn id(&self) -> Uuid {
            self.id
        }

        fn tags(&self) -> &[String] {
            &self.tags
        }
    }

    fn item(name: &'static str) -> Item {
        Item { id: Uuid::new_v4(), name, tags: vec![] }
    }

    fn tally(up: i64, down: i64) -> VoteTally {
        VoteTally { upvotes: up, downvotes: down }
    }

    #[test]
    fn equal_scores_keep_input_order() {
        // A and B tie on score; their input order survives
        let (a, b, d) = (item("A"), item("B"), item("D"));
        let tallies = HashMap::from([(a.id, tally(5, 0)), (b.id, tally(6, 1)), (d.id, tally(3, 0))]);

        let ranked = rank(vec![a, b, d], &tallies);
        let names: Vec<_> = ranked.iter().map(|s| s.item.name).collect();
        assert_eq!(names, ["A", "B", "D"]);
    }

    #[test]
    fn higher_scores_first_and_missing_tally_is_zero() {
        let (quiet, loved, hated) = (item("quiet"), item("loved"), item("hated"));
        let tallies = HashMap::from([(loved.id, tally(4, 1)), (hated.id, tally(0, 2))]);

        let ranked = rank(vec![quiet, hated, loved], &tallies);
        let scores: Vec<_> = ranked.iter().map(|s| (s.item.name, s.tally.score())).collect();
        assert_eq!(scores, [("loved", 3), ("quiet", 0), ("hated", -2)]);
    }

    #[test]
    fn medals_for_podium_only() {
        assert_eq!(medal(1), Some(1));
        assert_eq!(medal(3), Some(3));
        assert_eq!(medal(4), None);
        assert_eq!(medal(0), None);
    }
}
