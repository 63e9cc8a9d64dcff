//! Turns a hover-driven drag gesture into single-element move requests.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveIntent {
    pub from: usize,
    pub to: usize,
}

impl fmt::Display for MoveIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Tracks where the dragged item currently sits. Every hover over another
/// slot yields one move and the dragged item follows it there.
#[derive(Debug, Clone)]
pub struct DragGesture {
    index: usize,
}

impl DragGesture {
    pub fn start(index: usize) -> Self {
        Self { index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn hover(&mut self, hover_index: usize) -> Option<MoveIntent> {
        if hover_index == self.index {
            return None;
        }
        let intent = MoveIntent {
            from: self.index,
            to: hover_index,
        };
        self.index = hover_index;
        Some(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hovering_own_slot_emits_nothing() {
        let mut gesture = DragGesture::start(2);
        assert_eq!(gesture.hover(2), None);
        assert_eq!(gesture.index(), 2);
    }

    #[test]
    fn dragged_item_follows_each_hover() {
        let mut gesture = DragGesture::start(0);
        let intents: Vec<_> = [1, 2, 2, 3].into_iter().filter_map(|i| gesture.hover(i)).collect();
        assert_eq!(
            intents,
            vec![
                MoveIntent { from: 0, to: 1 },
                MoveIntent { from: 1, to: 2 },
                MoveIntent { from: 2, to: 3 },
            ]
        );
        assert_eq!(gesture.index(), 3);
    }
}
