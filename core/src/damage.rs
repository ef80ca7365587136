use std::ops::Range;

/// Accumulated repaint work since the last render.
///
/// Scroll steps are repainted incrementally: the host shifts the retained image and only the
/// exposed strip is redrawn. Dirty ranges are kept in current viewport coordinates, so each
/// scroll shifts the ranges recorded before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Damage {
    full: bool,
    scroll: i32,
    dirty: Vec<Range<i32>>,
}

impl Damage {
    pub fn is_empty(&self) -> bool {
        !self.full && self.scroll == 0 && self.dirty.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Net horizontal translation in pixels (positive: content moved left).
    pub fn scroll(&self) -> i32 {
        self.scroll
    }

    pub fn dirty(&self) -> &[Range<i32>] {
        &self.dirty
    }

    pub(crate) fn mark_full(&mut self) {
        self.full = true;
        self.scroll = 0;
        self.dirty.clear();
    }

    pub(crate) fn add_scroll(&mut self, dx: i32) {
        if self.full || dx == 0 {
            return;
        }
        self.scroll += dx;
        for range in &mut self.dirty {
            *range = range.start - dx..range.end - dx;
        }
    }

    pub(crate) fn mark_dirty(&mut self, range: Range<i32>) {
        if self.full || range.is_empty() {
            return;
        }
        self.dirty.push(range);
    }

    pub(crate) fn take(&mut self) -> Damage {
        std::mem::take(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scroll_accumulates_and_shifts_dirty_ranges() {
        let mut damage = Damage::default();
        damage.mark_dirty(10..20);
        damage.add_scroll(3);
        damage.add_scroll(2);

        assert_eq!(damage.scroll(), 5);
        assert_eq!(damage.dirty(), &[5..15]);
    }

    #[test]
    fn full_damage_absorbs_everything_else() {
        let mut damage = Damage::default();
        damage.add_scroll(4);
        damage.mark_full();
        damage.add_scroll(1);
        damage.mark_dirty(0..3);

        assert!(damage.is_full());
        assert_eq!(damage.scroll(), 0);
        assert!(damage.dirty().is_empty());

        let taken = damage.take();
        assert!(taken.is_full());
        assert!(damage.is_empty());
    }
}
