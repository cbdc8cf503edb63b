//! Index arithmetic over the reel.

use super::ReelItem;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Next playable index strictly after (or before) `from`, skipping the
/// add-story slot. `None` once the reel is exhausted in that direction.
pub fn resolve(items: &[ReelItem], from: usize, direction: Direction) -> Option<usize> {
    match direction {
        Direction::Forward => items
            .iter()
            .enumerate()
            .skip(from.saturating_add(1))
            .find(|(_, item)| item.is_playable())
            .map(|(index, _)| index),
        Direction::Backward => items
            .iter()
            .enumerate()
            .take(from.min(items.len()))
            .rev()
            .find(|(_, item)| item.is_playable())
            .map(|(index, _)| index),
    }
}

pub fn first_playable(items: &[ReelItem]) -> Option<usize> {
    items.iter().position(ReelItem::is_playable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stories::fixtures;

    fn reel(stories: usize) -> Vec<ReelItem> {
        std::iter::once(ReelItem::AddStory)
            .chain((0..stories).map(|i| ReelItem::Story(fixtures::story(&format!("s{i}"), 15))))
            .collect()
    }

    #[test]
    fn forward_walks_to_the_end_then_stops() {
        let items = reel(2);
        assert_eq!(resolve(&items, 1, Direction::Forward), Some(2));
        assert_eq!(resolve(&items, 2, Direction::Forward), None);
    }

    #[test]
    fn backward_never_lands_on_the_placeholder() {
        let items = reel(2);
        assert_eq!(resolve(&items, 2, Direction::Backward), Some(1));
        assert_eq!(resolve(&items, 1, Direction::Backward), None);
    }

    #[test]
    fn skips_placeholders_anywhere_in_the_sequence() {
        let mut items = reel(2);
        items.insert(2, ReelItem::AddStory);
        assert_eq!(resolve(&items, 1, Direction::Forward), Some(3));
        assert_eq!(resolve(&items, 3, Direction::Backward), Some(1));

        for from in 0..items.len() {
            for direction in [Direction::Forward, Direction::Backward] {
                if let Some(index) = resolve(&items, from, direction) {
                    assert!(items[index].is_playable());
                }
            }
        }
    }

    #[test]
    fn out_of_range_start_is_harmless() {
        let items = reel(1);
        assert_eq!(resolve(&items, 99, Direction::Forward), None);
        assert_eq!(resolve(&items, 99, Direction::Backward), Some(1));
        assert_eq!(resolve(&[], 0, Direction::Backward), None);
    }

    #[test]
    fn first_playable_skips_the_add_story_slot() {
        assert_eq!(first_playable(&reel(3)), Some(1));
        assert_eq!(first_playable(&reel(0)), None);
    }
}
