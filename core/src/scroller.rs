//! The scroll window manager.
//!
//! `Scroller` owns the master queue and the holder window and is the only code that touches the
//! running offsets. After every public operation
//!
//! ```text
//! sum(holder widths) == viewport_width + left_offset + right_offset
//! 0 <= left_offset  < width(left holder)
//! 0 <= right_offset < width(right holder)
//! ```
//!
//! `left_offset` counts the pixels of the left holder already scrolled past the left edge;
//! `right_offset` is the part of the right holder still beyond the right edge.
//!
//! Two glyph cursors remember where the window sits in the queue: `left_cursor` is the glyph the
//! left edge grows from (growing steps to its predecessor) and `right_cursor` the glyph the right
//! edge grows from (growing steps to its successor). Cursors always reference queued glyphs.

use std::ops::Range;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::HostError;
use crate::clock::TimerQueue;
use crate::clock::TimerTarget;
use crate::damage::Damage;
use crate::glyph::ContentGlyph;
use crate::glyph::Glyph;
use crate::holder::HolderId;
use crate::holder::HolderWindow;
use crate::host::Surface;
use crate::queue::GlyphId;
use crate::queue::GlyphQueue;

/// Which way content travels across the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Content moves left; new holders are grown on the right edge.
    Leftward,
    /// Content moves right; new holders are grown on the left edge.
    Rightward,
}

impl Direction {
    pub fn of(delta: i32) -> Option<Self> {
        match delta {
            d if d > 0 => Some(Direction::Leftward),
            d if d < 0 => Some(Direction::Rightward),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Scroller {
    queue: GlyphQueue,
    window: HolderWindow,
    viewport_width: i32,
    left_offset: i32,
    right_offset: i32,
    left_cursor: GlyphId,
    right_cursor: GlyphId,
    /// Set once the right cursor has been pointed at the first arrival since the trailing gap was
    /// materialized, so later arrivals queue up behind it.
    right_cursor_fresh: bool,
    /// Arrival width not yet absorbed from the trailing gap.
    pending_gap_shrink: i32,
    direction: Direction,
    min_gap_width: i32,
    max_fade_levels: u8,
    damage: Damage,
}

impl Scroller {
    pub(crate) fn new(viewport_width: i32, min_gap_width: i32, max_fade_levels: u8) -> Self {
        let viewport_width = viewport_width.max(1);
        let mut queue = GlyphQueue::new();
        queue.retain(GlyphId::GAP);
        let mut damage = Damage::default();
        damage.mark_full();
        Self {
            queue,
            window: HolderWindow::new(GlyphId::GAP, viewport_width),
            viewport_width,
            left_offset: 0,
            right_offset: 0,
            left_cursor: GlyphId::GAP,
            right_cursor: GlyphId::GAP,
            right_cursor_fresh: false,
            pending_gap_shrink: 0,
            direction: Direction::Leftward,
            min_gap_width: min_gap_width.max(1),
            max_fade_levels: max_fade_levels.max(1),
            damage,
        }
    }

    pub(crate) fn viewport_width(&self) -> i32 {
        self.viewport_width
    }

    pub(crate) fn left_offset(&self) -> i32 {
        self.left_offset
    }

    pub(crate) fn right_offset(&self) -> i32 {
        self.right_offset
    }

    pub(crate) fn direction(&self) -> Direction {
        self.direction
    }

    pub(crate) fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub(crate) fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn queued_glyphs(&self) -> Vec<GlyphId> {
        self.queue.iter().collect()
    }

    pub(crate) fn glyph(&self, id: GlyphId) -> Option<&Glyph> {
        self.queue.glyph(id)
    }

    pub(crate) fn glyph_mut(&mut self, id: GlyphId) -> Option<&mut Glyph> {
        self.queue.glyph_mut(id)
    }

    pub(crate) fn is_live(&self, id: GlyphId) -> bool {
        self.queue.is_live(id)
    }

    pub(crate) fn is_queued(&self, id: GlyphId) -> bool {
        self.queue.is_queued(id)
    }

    #[cfg(test)]
    pub(crate) fn cursors(&self) -> (GlyphId, GlyphId) {
        (self.left_cursor, self.right_cursor)
    }

    pub(crate) fn holder_widths(&self) -> Vec<i32> {
        self.window.iter().map(|(_, holder)| holder.width).collect()
    }

    #[cfg(test)]
    pub(crate) fn holder_glyphs(&self) -> Vec<GlyphId> {
        self.window.iter().map(|(_, holder)| holder.glyph).collect()
    }

    pub(crate) fn drain_released(
        &mut self,
    ) -> Vec<(GlyphId, std::sync::Arc<tickertape_protocol::Notification>)> {
        self.queue.drain_released()
    }

    pub(crate) fn damage(&self) -> &Damage {
        &self.damage
    }

    pub(crate) fn take_damage(&mut self) -> Damage {
        self.damage.take()
    }

    pub(crate) fn mark_full_damage(&mut self) {
        self.damage.mark_full();
    }

    /// Terminal state: nothing queued and a single gap holder spanning the viewport.
    pub(crate) fn is_quiescent(&self) -> bool {
        self.queue.is_empty()
            && self.window.len() == 1
            && self
                .window
                .left_holder()
                .is_some_and(|holder| holder.glyph.is_gap())
            && self.left_offset == 0
            && self.right_offset == 0
    }

    fn holder_glyph(&self, id: HolderId) -> Option<GlyphId> {
        self.window.get(id).map(|holder| holder.glyph)
    }

    fn holder_width(&self, id: HolderId) -> i32 {
        self.window.get(id).map_or(0, |holder| holder.width)
    }

    fn natural_width(&self, id: GlyphId) -> i32 {
        self.queue
            .glyph(id)
            .and_then(Glyph::natural_width)
            .unwrap_or(self.min_gap_width)
    }

    /// Elastic width for a gap materialized next to `neighbor`: whatever the viewport has left
    /// after the nearest content, or the whole viewport when nothing is queued.
    fn gap_width(&self, neighbor: GlyphId) -> i32 {
        match self.queue.glyph(neighbor).and_then(Glyph::natural_width) {
            Some(width) => (self.viewport_width - width).max(self.min_gap_width),
            None => self.viewport_width,
        }
    }

    fn grow_right(&mut self) {
        let glyph = self.queue.next(self.right_cursor);
        self.right_cursor = glyph;
        self.right_cursor_fresh = false;

        let width = if glyph.is_gap() {
            self.gap_width(self.queue.prev(GlyphId::GAP))
        } else {
            self.natural_width(glyph)
        };

        let right = self.window.right();
        if glyph.is_gap() && self.holder_glyph(right).is_some_and(GlyphId::is_gap) {
            if let Some(holder) = self.window.get_mut(right) {
                holder.width += width;
            }
        } else {
            self.window.push_right(glyph, width);
            self.queue.retain(glyph);
            self.pending_gap_shrink = 0;
        }
        self.right_offset += width;
        trace!(?glyph, width, "grow right");
    }

    fn grow_left(&mut self) {
        let glyph = self.queue.prev(self.left_cursor);
        self.left_cursor = glyph;

        let width = if glyph.is_gap() {
            self.gap_width(self.queue.next(GlyphId::GAP))
        } else {
            self.natural_width(glyph)
        };

        let left = self.window.left();
        if glyph.is_gap() && self.holder_glyph(left).is_some_and(GlyphId::is_gap) {
            if let Some(holder) = self.window.get_mut(left) {
                holder.width += width;
            }
        } else {
            self.window.push_left(glyph, width);
            self.queue.retain(glyph);
            self.pending_gap_shrink = 0;
        }
        self.left_offset += width;
        trace!(?glyph, width, "grow left");
    }

    fn first_queued_from_left(&self) -> Option<GlyphId> {
        self.window
            .iter()
            .map(|(_, holder)| holder.glyph)
            .find(|glyph| self.queue.is_queued(*glyph))
    }

    fn first_queued_from_right(&self) -> Option<GlyphId> {
        self.window
            .ids()
            .into_iter()
            .rev()
            .filter_map(|id| self.holder_glyph(id))
            .find(|glyph| self.queue.is_queued(*glyph))
    }

    fn evict_left(&mut self) -> bool {
        let Some(holder) = self.window.remove(self.window.left()) else {
            return false;
        };
        self.left_offset -= holder.width;
        if holder.glyph == self.left_cursor {
            self.left_cursor = self
                .first_queued_from_left()
                .unwrap_or_else(|| self.queue.next(self.right_cursor));
        }
        self.queue.release(holder.glyph);
        trace!(glyph = ?holder.glyph, width = holder.width, "evict left");
        true
    }

    fn evict_right(&mut self) -> bool {
        let Some(holder) = self.window.remove(self.window.right()) else {
            return false;
        };
        self.right_offset -= holder.width;
        if holder.glyph == self.right_cursor {
            self.right_cursor = self
                .first_queued_from_right()
                .unwrap_or_else(|| self.queue.prev(self.left_cursor));
            self.right_cursor_fresh = false;
        }
        self.queue.release(holder.glyph);
        trace!(glyph = ?holder.glyph, width = holder.width, "evict right");
        true
    }

    /// Grows and evicts holders until both offsets are back in range, then collapses to the
    /// terminal state if nothing is left to show.
    pub(crate) fn normalize(&mut self) {
        loop {
            if self.right_offset < 0 {
                self.grow_right();
                continue;
            }
            if self.left_offset < 0 {
                self.grow_left();
                continue;
            }
            if self.window.len() > 1 && self.left_offset >= self.holder_width(self.window.left())
            {
                self.evict_left();
                continue;
            }
            if self.window.len() > 1
                && self.right_offset >= self.holder_width(self.window.right())
            {
                self.evict_right();
                continue;
            }
            break;
        }
        self.collapse_if_quiescent();
    }

    fn collapse_if_quiescent(&mut self) -> bool {
        if !self.queue.is_empty() || self.window.len() != 1 {
            return false;
        }
        let left = self.window.left();
        if !self.holder_glyph(left).is_some_and(GlyphId::is_gap) {
            return false;
        }
        self.left_cursor = GlyphId::GAP;
        self.right_cursor = GlyphId::GAP;
        self.right_cursor_fresh = false;
        self.pending_gap_shrink = 0;
        let viewport_width = self.viewport_width;
        let already_idle = self.holder_width(left) == viewport_width
            && self.left_offset == 0
            && self.right_offset == 0;
        if already_idle {
            return true;
        }
        if let Some(holder) = self.window.get_mut(left) {
            holder.width = viewport_width;
        }
        self.left_offset = 0;
        self.right_offset = 0;
        debug!(viewport_width, "ticker window collapsed to idle gap");
        true
    }

    /// Scrolls by `delta` pixels; positive moves content left.
    pub(crate) fn advance(&mut self, delta: i32) {
        let Some(direction) = Direction::of(delta) else {
            return;
        };
        self.direction = direction;
        self.left_offset += delta;
        self.right_offset -= delta;
        self.normalize();
        self.absorb_pending_gap_shrink();
        self.damage.add_scroll(delta);
        self.check_consistency("advance");
    }

    /// Shrinks the hidden part of the gap holder on the growing edge by up to `amount`.
    fn shrink_trailing_gap(&mut self, amount: i32) -> i32 {
        let (holder_id, slack) = match self.direction {
            Direction::Leftward => (self.window.right(), self.right_offset),
            Direction::Rightward => (self.window.left(), self.left_offset),
        };
        if !self.holder_glyph(holder_id).is_some_and(GlyphId::is_gap) {
            return 0;
        }
        let absorbed = amount.min(slack).max(0);
        if absorbed == 0 {
            return 0;
        }
        if let Some(holder) = self.window.get_mut(holder_id) {
            holder.width -= absorbed;
        }
        match self.direction {
            Direction::Leftward => self.right_offset -= absorbed,
            Direction::Rightward => self.left_offset -= absorbed,
        }
        absorbed
    }

    fn absorb_pending_gap_shrink(&mut self) {
        if self.pending_gap_shrink <= 0 {
            return;
        }
        let edge = match self.direction {
            Direction::Leftward => self.window.right(),
            Direction::Rightward => self.window.left(),
        };
        if !self.holder_glyph(edge).is_some_and(GlyphId::is_gap) {
            self.pending_gap_shrink = 0;
            return;
        }
        let absorbed = self.shrink_trailing_gap(self.pending_gap_shrink);
        self.pending_gap_shrink -= absorbed;
    }

    /// Enqueues a content glyph.
    ///
    /// When the growing edge currently shows the gap, the gap gives up hidden width equal to the
    /// new glyph's so the arrival scrolls in promptly instead of waiting out the whole gap.
    pub(crate) fn insert(&mut self, glyph: ContentGlyph) -> GlyphId {
        let width = glyph.width();
        let id = self.queue.enqueue(Glyph::Content(glyph));

        let edge = match self.direction {
            Direction::Leftward => self.window.right(),
            Direction::Rightward => self.window.left(),
        };
        if self.holder_glyph(edge).is_some_and(GlyphId::is_gap) {
            if self.direction == Direction::Leftward
                && self.right_cursor.is_gap()
                && !self.right_cursor_fresh
            {
                // The ring continues with the oldest message after the gap; point the cursor
                // just before the new arrival so it is the next thing materialized.
                self.right_cursor = self.queue.prev(id);
                self.right_cursor_fresh = true;
            }
            let absorbed = self.shrink_trailing_gap(width);
            self.pending_gap_shrink += width - absorbed;
        }

        self.normalize();
        self.check_consistency("insert");
        id
    }

    /// Removes a glyph from the master queue, cancelling its fade timer and moving any cursor
    /// that references it. Holders already showing it stay in place.
    pub(crate) fn dequeue(&mut self, id: GlyphId, timers: &mut TimerQueue<TimerTarget>) -> bool {
        if id.is_gap() || !self.queue.is_queued(id) {
            return false;
        }
        if let Some(handle) = self
            .queue
            .glyph_mut(id)
            .and_then(Glyph::content_mut)
            .and_then(ContentGlyph::take_fade_timer)
        {
            timers.cancel(handle);
        }
        if self.left_cursor == id {
            self.left_cursor = self.queue.next(id);
        }
        if self.right_cursor == id {
            self.right_cursor = self.queue.prev(id);
        }
        self.queue.unlink(id)
    }

    /// Passive expiry: the glyph leaves the queue but visible holders keep painting it in its
    /// final fade color until they scroll out.
    pub(crate) fn expire_passively(
        &mut self,
        id: GlyphId,
        timers: &mut TimerQueue<TimerTarget>,
    ) -> bool {
        if let Some(glyph) = self.queue.glyph_mut(id) {
            glyph.expire();
        }
        self.mark_glyph_dirty(id);
        let removed = self.dequeue(id, timers);
        self.normalize();
        self.check_consistency("expire");
        removed
    }

    /// Explicit deletion: the glyph is expired, dequeued and every holder showing it is removed.
    ///
    /// Freed width is handed to the nearest gap holder beyond the deleted one (walking away from
    /// the anchored edge); content between the two closes up. Adjacent gap holders are merged.
    pub(crate) fn delete(&mut self, id: GlyphId, timers: &mut TimerQueue<TimerTarget>) -> bool {
        if id.is_gap() || !self.queue.is_live(id) {
            return false;
        }
        if let Some(glyph) = self.queue.glyph_mut(id) {
            glyph.expire();
        }
        self.dequeue(id, timers);

        let visible = self.window.iter().any(|(_, holder)| holder.glyph == id);
        if visible {
            match self.direction {
                Direction::Leftward => {
                    if self.holder_glyph(self.window.right()) == Some(id) {
                        self.grow_right();
                    }
                    let order = self.window.ids();
                    self.remove_holders_of(id, order);
                    self.merge_adjacent_gaps();
                    self.right_offset = self.recomputed_offset(self.left_offset);
                }
                Direction::Rightward => {
                    if self.holder_glyph(self.window.left()) == Some(id) {
                        self.grow_left();
                    }
                    let order = self.window.ids().into_iter().rev().collect();
                    self.remove_holders_of(id, order);
                    self.merge_adjacent_gaps();
                    self.left_offset = self.recomputed_offset(self.right_offset);
                }
            }
            self.damage.mark_full();
        }

        self.normalize();
        self.check_consistency("delete");
        debug!(?id, visible, "deleted glyph");
        true
    }

    /// Removes every holder showing `id`, walking `order` away from the anchored edge.
    ///
    /// Freed width goes to the first gap holder past the removed one. When the walk runs out
    /// first, it goes to the nearest gap on the anchored side, or opens a gap where the glyph was.
    fn remove_holders_of(&mut self, id: GlyphId, order: Vec<HolderId>) {
        let mut missing_width = 0;
        let mut anchored_gap = None;
        let mut last_kept = None;
        let mut vacated_after = None;
        for holder_id in order {
            let Some(glyph) = self.holder_glyph(holder_id) else {
                continue;
            };
            if glyph == id {
                if let Some(removed) = self.window.remove(holder_id) {
                    missing_width += removed.width;
                    vacated_after = Some(last_kept);
                    self.queue.release(removed.glyph);
                }
                continue;
            }
            if glyph.is_gap() {
                if missing_width > 0
                    && let Some(holder) = self.window.get_mut(holder_id)
                {
                    holder.width += missing_width;
                    missing_width = 0;
                } else {
                    anchored_gap = Some(holder_id);
                }
            }
            last_kept = Some(holder_id);
        }
        if missing_width == 0 {
            return;
        }

        if let Some(holder) = anchored_gap.and_then(|gap| self.window.get_mut(gap)) {
            holder.width += missing_width;
            return;
        }
        let opened = match (self.direction, vacated_after.flatten()) {
            (Direction::Leftward, Some(kept)) => {
                self.window.insert_after(kept, GlyphId::GAP, missing_width)
            }
            (Direction::Rightward, Some(kept)) => {
                self.window.insert_before(kept, GlyphId::GAP, missing_width)
            }
            (Direction::Leftward, None) => {
                Some(self.window.push_left(GlyphId::GAP, missing_width))
            }
            (Direction::Rightward, None) => {
                Some(self.window.push_right(GlyphId::GAP, missing_width))
            }
        };
        if opened.is_none() {
            warn!(?id, missing_width, "freed width had nowhere to go");
        }
    }

    fn merge_adjacent_gaps(&mut self) {
        let mut cursor = Some(self.window.left());
        while let Some(current) = cursor {
            let next = self.window.next(current);
            let both_gaps = next.is_some_and(|next| {
                self.holder_glyph(current).is_some_and(GlyphId::is_gap)
                    && self.holder_glyph(next).is_some_and(GlyphId::is_gap)
            });
            match next {
                Some(next) if both_gaps => {
                    if let Some(removed) = self.window.remove(next) {
                        if let Some(holder) = self.window.get_mut(current) {
                            holder.width += removed.width;
                        }
                        self.queue.release(removed.glyph);
                    }
                }
                _ => cursor = next,
            }
        }
    }

    /// Offset for the non-anchored edge given the anchored one, from the current holder widths.
    fn recomputed_offset(&self, anchored_offset: i32) -> i32 {
        let total = self.window.total_width();
        let offset = total - i64::from(self.viewport_width) - i64::from(anchored_offset);
        i32::try_from(offset).unwrap_or(i32::MAX)
    }

    /// Changes the viewport width, letting the gap holder on the growing edge absorb the change.
    pub(crate) fn resize(&mut self, viewport_width: i32) {
        let viewport_width = viewport_width.max(1);
        let delta = viewport_width - self.viewport_width;
        if delta == 0 {
            return;
        }
        self.viewport_width = viewport_width;

        if self.queue.is_empty()
            && self.window.len() == 1
            && self
                .window
                .left_holder()
                .is_some_and(|holder| holder.glyph.is_gap())
        {
            self.collapse_if_quiescent();
        } else {
            let edge = match self.direction {
                Direction::Leftward => self.window.right(),
                Direction::Rightward => self.window.left(),
            };
            let min_gap_width = self.min_gap_width;
            if self.holder_glyph(edge).is_some_and(GlyphId::is_gap)
                && let Some(holder) = self.window.get_mut(edge)
            {
                holder.width = (holder.width + delta).max(min_gap_width);
            }
            match self.direction {
                Direction::Leftward => {
                    self.right_offset = self.recomputed_offset(self.left_offset);
                }
                Direction::Rightward => {
                    self.left_offset = self.recomputed_offset(self.right_offset);
                }
            }
            self.normalize();
        }

        self.damage.mark_full();
        self.check_consistency("resize");
        debug!(viewport_width, "ticker resized");
    }

    /// Glyph under viewport column `x`.
    pub(crate) fn glyph_at(&self, x: i32) -> Option<GlyphId> {
        if x < 0 || x >= self.viewport_width {
            return None;
        }
        let mut left = -self.left_offset;
        for (_, holder) in self.window.iter() {
            let right = left + holder.width;
            if x < right {
                return Some(holder.glyph);
            }
            left = right;
        }
        None
    }

    /// Viewport spans currently occupied by holders of `id`.
    fn spans_of(&self, id: GlyphId) -> Vec<Range<i32>> {
        let mut spans = Vec::new();
        let mut left = -self.left_offset;
        for (_, holder) in self.window.iter() {
            let right = left + holder.width;
            if holder.glyph == id {
                let span = left.max(0)..right.min(self.viewport_width);
                if !span.is_empty() {
                    spans.push(span);
                }
            }
            left = right;
        }
        spans
    }

    pub(crate) fn mark_glyph_dirty(&mut self, id: GlyphId) {
        for span in self.spans_of(id) {
            self.damage.mark_dirty(span);
        }
    }

    /// Paints every holder intersecting `clip`.
    pub(crate) fn paint(
        &self,
        surface: &mut dyn Surface,
        clip: Range<i32>,
    ) -> Result<(), HostError> {
        let clip = clip.start.max(0)..clip.end.min(self.viewport_width);
        if clip.is_empty() {
            return Ok(());
        }
        let mut left = -self.left_offset;
        for (_, holder) in self.window.iter() {
            if left >= clip.end {
                break;
            }
            let right = left + holder.width;
            if right > clip.start {
                let Some(glyph) = self.queue.glyph(holder.glyph) else {
                    warn!(glyph = ?holder.glyph, "holder references a freed glyph");
                    left = right;
                    continue;
                };
                surface.paint(
                    glyph.paint_view(self.max_fade_levels),
                    holder.width,
                    left,
                    clip.start.max(left)..clip.end.min(right),
                )?;
            }
            left = right;
        }
        Ok(())
    }

    /// Panics if the window arithmetic no longer adds up.
    ///
    /// A mismatch is a logic error in this module, never a runtime condition.
    pub(crate) fn check_consistency(&self, operation: &str) {
        let total = self.window.total_width();
        let expected = i64::from(self.viewport_width)
            + i64::from(self.left_offset)
            + i64::from(self.right_offset);
        let left_width = self.holder_width(self.window.left());
        let right_width = self.holder_width(self.window.right());
        let offsets_ok = (0..left_width).contains(&self.left_offset)
            && (0..right_width).contains(&self.right_offset);
        let cursors_ok =
            self.queue.is_queued(self.left_cursor) && self.queue.is_queued(self.right_cursor);
        if total != expected || !offsets_ok || !cursors_ok {
            panic!(
                "ticker window inconsistent after {operation}: total={total} expected={expected} \
                 viewport={} left_offset={} right_offset={} cursors=({:?}, {:?}) holders={:?}",
                self.viewport_width,
                self.left_offset,
                self.right_offset,
                self.left_cursor,
                self.right_cursor,
                self.window
                    .iter()
                    .map(|(_, holder)| (holder.glyph, holder.width))
                    .collect::<Vec<_>>(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::content;
    use pretty_assertions::assert_eq;
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn scroller(viewport_width: i32) -> (Scroller, TimerQueue<TimerTarget>) {
        (Scroller::new(viewport_width, 10, 5), TimerQueue::new())
    }

    #[test]
    fn starts_quiescent() {
        let (scroller, _) = scroller(100);
        assert!(scroller.is_quiescent());
        assert_eq!(scroller.holder_widths(), vec![100]);
        scroller.check_consistency("new");
    }

    #[test]
    fn first_message_scrolls_in_from_the_right() {
        let (mut scroller, _) = scroller(400);
        let hello = scroller.insert(content("hello", 50));
        assert!(!scroller.is_quiescent());

        scroller.advance(50);

        assert_eq!(scroller.left_offset(), 50);
        assert_eq!(scroller.right_offset(), 0);
        assert_eq!(scroller.holder_widths(), vec![400, 50]);
        assert_eq!(scroller.holder_glyphs(), vec![GlyphId::GAP, hello]);
        assert_eq!(scroller.glyph_at(399), Some(hello));
        assert_eq!(scroller.glyph_at(349), Some(GlyphId::GAP));
    }

    #[test]
    fn trailing_gap_fills_what_the_newest_message_leaves() {
        let (mut scroller, _) = scroller(60);
        scroller.insert(content("a", 30));
        scroller.insert(content("b", 40));

        scroller.advance(60);
        assert_eq!(scroller.holder_widths(), vec![30, 40]);
        assert_eq!(scroller.left_offset(), 0);
        assert_eq!(scroller.right_offset(), 10);

        scroller.advance(11);
        assert_eq!(scroller.holder_widths(), vec![30, 40, 20]);
        assert_eq!(scroller.left_offset(), 11);
        assert_eq!(scroller.right_offset(), 19);
    }

    #[test]
    fn deleting_left_holder_expands_the_following_gap() {
        let (mut scroller, mut timers) = scroller(60);
        let a = scroller.insert(content("a", 30));
        let b = scroller.insert(content("b", 40));
        scroller.advance(60);
        scroller.advance(11);
        let total_before: i32 = scroller.holder_widths().iter().sum();

        assert!(scroller.delete(a, &mut timers));

        assert_eq!(scroller.holder_glyphs(), vec![b, GlyphId::GAP]);
        assert_eq!(scroller.holder_widths(), vec![40, 50]);
        assert_eq!(scroller.holder_widths().iter().sum::<i32>(), total_before);
        assert_eq!(scroller.left_offset(), 11);
        assert_eq!(scroller.right_offset(), 19);
        assert!(!scroller.is_live(a));
        assert!(scroller.take_damage().is_full());
    }

    #[test]
    fn deleting_gap_or_unknown_glyph_is_a_no_op() {
        let (mut scroller, mut timers) = scroller(60);
        let a = scroller.insert(content("a", 30));
        assert!(!scroller.delete(GlyphId::GAP, &mut timers));
        assert!(scroller.delete(a, &mut timers));
        assert!(!scroller.delete(a, &mut timers));
        assert!(scroller.is_quiescent());
    }

    #[test]
    fn deleting_right_holder_grows_past_it_first() {
        let (mut scroller, mut timers) = scroller(100);
        let a = scroller.insert(content("a", 30));
        scroller.advance(5);
        assert_eq!(scroller.holder_glyphs(), vec![GlyphId::GAP, a]);

        assert!(scroller.delete(a, &mut timers));

        assert_eq!(scroller.holder_glyphs(), vec![GlyphId::GAP]);
        assert_eq!(scroller.queue_len(), 0);
        scroller.advance(1);
        assert!(scroller.is_quiescent());
    }

    #[test]
    fn passive_expiry_keeps_visible_holder_until_it_scrolls_out() {
        let (mut scroller, mut timers) = scroller(50);
        let a = scroller.insert(content("a", 20));
        scroller.advance(20);
        assert_eq!(scroller.holder_glyphs(), vec![GlyphId::GAP, a]);

        assert!(scroller.expire_passively(a, &mut timers));
        assert!(scroller.is_live(a));
        assert!(!scroller.is_queued(a));
        assert_eq!(scroller.holder_glyphs(), vec![GlyphId::GAP, a]);

        scroller.advance(30);
        assert!(!scroller.is_quiescent());
        scroller.advance(20);
        assert!(!scroller.is_live(a));
        assert!(scroller.is_quiescent());
        let released = scroller.drain_released();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].0, a);
    }

    #[test]
    fn cursors_never_reference_dequeued_glyphs() {
        let (mut scroller, mut timers) = scroller(40);
        let a = scroller.insert(content("a", 15));
        let b = scroller.insert(content("b", 15));
        let c = scroller.insert(content("c", 15));
        scroller.advance(70);

        for id in [b, a, c] {
            scroller.expire_passively(id, &mut timers);
            let (left, right) = scroller.cursors();
            assert!(scroller.is_queued(left), "left cursor {left:?}");
            assert!(scroller.is_queued(right), "right cursor {right:?}");
            scroller.advance(7);
            let (left, right) = scroller.cursors();
            assert!(scroller.is_queued(left), "left cursor {left:?}");
            assert!(scroller.is_queued(right), "right cursor {right:?}");
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let (mut scroller, _) = scroller(70);
        scroller.insert(content("a", 25));
        scroller.insert(content("b", 35));
        scroller.advance(90);

        let widths = scroller.holder_widths();
        let glyphs = scroller.holder_glyphs();
        let offsets = (scroller.left_offset(), scroller.right_offset());

        scroller.normalize();
        scroller.normalize();

        assert_eq!(scroller.holder_widths(), widths);
        assert_eq!(scroller.holder_glyphs(), glyphs);
        assert_eq!(
            (scroller.left_offset(), scroller.right_offset()),
            offsets
        );
    }

    #[test]
    fn empty_queue_never_leaves_terminal_state() {
        let (mut scroller, _) = scroller(30);
        for delta in [1, 7, 30, 45, -3, -60, 2] {
            scroller.advance(delta);
            assert!(scroller.is_quiescent());
            assert_eq!(scroller.holder_widths(), vec![30]);
        }
        scroller.resize(80);
        assert!(scroller.is_quiescent());
        assert_eq!(scroller.holder_widths(), vec![80]);
    }

    #[test]
    fn arrival_pulls_trailing_gap_in() {
        let (mut scroller, _) = scroller(60);
        let a = scroller.insert(content("a", 20));
        scroller.advance(21);
        // [gap 60][a 20][gap 40]: the trailing gap is mostly hidden.
        assert_eq!(scroller.holder_glyphs(), vec![GlyphId::GAP, a, GlyphId::GAP]);
        assert_eq!(scroller.right_offset(), 39);

        let b = scroller.insert(content("b", 15));

        assert_eq!(scroller.holder_widths(), vec![60, 20, 25]);
        assert_eq!(scroller.right_offset(), 24);
        scroller.advance(25);
        assert_eq!(scroller.holder_glyphs().last(), Some(&b));
    }

    #[test]
    fn rightward_scroll_grows_on_the_left() {
        let (mut scroller, mut timers) = scroller(50);
        let a = scroller.insert(content("a", 20));
        let b = scroller.insert(content("b", 10));

        scroller.advance(-10);
        assert_eq!(scroller.direction(), Direction::Rightward);
        assert_eq!(scroller.holder_glyphs(), vec![b, GlyphId::GAP]);
        assert_eq!(scroller.left_offset(), 0);

        scroller.advance(-20);
        assert_eq!(scroller.holder_glyphs(), vec![a, b, GlyphId::GAP]);
        assert_eq!(scroller.holder_widths(), vec![20, 10, 50]);
        let right_offset = scroller.right_offset();

        assert!(scroller.delete(b, &mut timers));
        assert_eq!(scroller.holder_glyphs(), vec![a, GlyphId::GAP]);
        assert_eq!(scroller.holder_widths(), vec![20, 60]);
        assert_eq!(scroller.right_offset(), right_offset);
        scroller.check_consistency("test");
    }

    #[test]
    fn deleting_between_content_opens_a_gap_in_place() {
        let (mut scroller, mut timers) = scroller(50);
        let a = scroller.insert(content("a", 30));
        let b = scroller.insert(content("b", 30));
        let c = scroller.insert(content("c", 30));
        scroller.advance(70);
        assert_eq!(scroller.holder_glyphs(), vec![a, b, c]);
        let total: i32 = scroller.holder_widths().iter().sum();

        assert!(scroller.delete(b, &mut timers));

        assert_eq!(scroller.holder_glyphs(), vec![a, GlyphId::GAP, c]);
        assert_eq!(scroller.holder_widths().iter().sum::<i32>(), total);
        scroller.check_consistency("test");
    }

    #[test]
    fn resize_adjusts_trailing_gap_and_renormalizes() {
        let (mut scroller, _) = scroller(60);
        scroller.insert(content("a", 20));
        scroller.advance(21);
        assert_eq!(scroller.holder_widths(), vec![60, 20, 40]);

        scroller.resize(80);
        assert_eq!(scroller.viewport_width(), 80);
        assert_eq!(scroller.holder_widths(), vec![60, 20, 60]);
        assert_eq!(scroller.right_offset(), 39);

        scroller.resize(30);
        assert_eq!(scroller.viewport_width(), 30);
        assert!(scroller.take_damage().is_full());
        scroller.check_consistency("test");
    }

    #[test]
    fn random_operations_preserve_window_invariants() {
        let mut rng = StdRng::seed_from_u64(0x71c4e7);
        let (mut scroller, mut timers) = scroller(64);
        let mut live: Vec<GlyphId> = Vec::new();

        for round in 0..4000 {
            match rng.random_range(0..10) {
                0 | 1 => {
                    let width = rng.random_range(1..90);
                    live.push(scroller.insert(content(&format!("m{round}"), width)));
                }
                2 if !live.is_empty() => {
                    let index = rng.random_range(0..live.len());
                    let id = live.swap_remove(index);
                    scroller.delete(id, &mut timers);
                }
                3 if !live.is_empty() => {
                    let index = rng.random_range(0..live.len());
                    let id = live.swap_remove(index);
                    scroller.expire_passively(id, &mut timers);
                }
                4 => scroller.resize(rng.random_range(1..160)),
                5 => scroller.advance(rng.random_range(-40..0)),
                _ => scroller.advance(rng.random_range(1..40)),
            }

            scroller.check_consistency("random");
            let (left, right) = scroller.cursors();
            assert!(scroller.is_queued(left));
            assert!(scroller.is_queued(right));
            if scroller.queue_len() == 0 && scroller.holder_glyphs() == vec![GlyphId::GAP] {
                assert!(scroller.is_quiescent());
            }
        }
    }
}
