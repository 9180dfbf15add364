use serde::{Deserialize, Serialize};

/// Position within the segment starts of the current rhythm/case selection.
///
/// A value object: navigation handlers take a cursor and hand back a new
/// one, and a fresh cursor (index 0) is built whenever the rhythm or case
/// changes. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCursor {
    index: usize,
    count: usize,
}

impl SegmentCursor {
    pub fn new(count: usize) -> Self {
        Self { index: 0, count }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 1-based (position, total) for the "segment i of N" banner.
    pub fn position(&self) -> (usize, usize) {
        (self.index + 1, self.count)
    }

    /// Advance, clamped at the last segment.
    pub fn next(self) -> Self {
        if self.count == 0 {
            return self;
        }
        Self {
            index: (self.index + 1).min(self.count - 1),
            ..self
        }
    }

    /// Step back, clamped at the first segment.
    pub fn previous(self) -> Self {
        Self {
            index: self.index.saturating_sub(1),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_clamps_at_the_end() {
        let mut cursor = SegmentCursor::new(3);
        cursor = cursor.next().next();
        assert_eq!(cursor.index(), 2);
        cursor = cursor.next();
        assert_eq!(cursor.index(), 2);
    }

    #[test]
    fn previous_clamps_at_zero() {
        let cursor = SegmentCursor::new(3).previous();
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn empty_cursor_never_moves() {
        let cursor = SegmentCursor::new(0);
        assert!(cursor.is_empty());
        assert_eq!(cursor.next(), cursor);
        assert_eq!(cursor.previous(), cursor);
    }

    #[test]
    fn position_is_one_based() {
        let cursor = SegmentCursor::new(5).next();
        assert_eq!(cursor.position(), (2, 5));
    }

    #[test]
    fn new_selection_starts_at_zero() {
        let moved = SegmentCursor::new(4).next().next();
        assert_eq!(moved.index(), 2);
        let reset = SegmentCursor::new(2);
        assert_eq!(reset.index(), 0);
        assert_eq!(reset.count(), 2);
    }
}
