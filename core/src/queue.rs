//! The master queue: every live glyph, in a circular list anchored by the gap.
//!
//! Content glyphs live in a slot map. A slot stays allocated while the glyph is either queued or
//! referenced by at least one holder. The gap is not in the arena; it exists for the life of the
//! queue.
//! Order around the ring is `gap, oldest, ..., newest, gap, ...`, and new glyphs are linked in
//! immediately before the gap.

use std::sync::Arc;

use slotmap::SlotMap;
use slotmap::new_key_type;
use tickertape_protocol::Notification;

use crate::glyph::Glyph;

new_key_type! {
    /// Arena key of a content glyph. Keys of freed slots never alias later glyphs.
    pub struct ContentKey;
}

/// Handle to a glyph: the gap, or a content glyph in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphId {
    Gap,
    Content(ContentKey),
}

impl GlyphId {
    pub const GAP: GlyphId = GlyphId::Gap;

    pub fn is_gap(self) -> bool {
        self == Self::GAP
    }
}

#[derive(Debug)]
struct Node {
    glyph: Glyph,
    prev: GlyphId,
    next: GlyphId,
    queued: bool,
    holders: u32,
}

#[derive(Debug)]
pub(crate) struct GlyphQueue {
    gap: Glyph,
    /// Oldest queued glyph (the gap's successor).
    head: GlyphId,
    /// Newest queued glyph (the gap's predecessor).
    tail: GlyphId,
    nodes: SlotMap<ContentKey, Node>,
    len: usize,
    released: Vec<(GlyphId, Arc<Notification>)>,
}

impl GlyphQueue {
    pub(crate) fn new() -> Self {
        Self {
            gap: Glyph::Gap,
            head: GlyphId::GAP,
            tail: GlyphId::GAP,
            nodes: SlotMap::with_key(),
            len: 0,
            released: Vec::new(),
        }
    }

    fn node(&self, id: GlyphId) -> Option<&Node> {
        match id {
            GlyphId::Gap => None,
            GlyphId::Content(key) => self.nodes.get(key),
        }
    }

    fn node_mut(&mut self, id: GlyphId) -> Option<&mut Node> {
        match id {
            GlyphId::Gap => None,
            GlyphId::Content(key) => self.nodes.get_mut(key),
        }
    }

    fn set_next(&mut self, id: GlyphId, next: GlyphId) {
        match id {
            GlyphId::Gap => self.head = next,
            GlyphId::Content(_) => {
                if let Some(node) = self.node_mut(id) {
                    node.next = next;
                }
            }
        }
    }

    fn set_prev(&mut self, id: GlyphId, prev: GlyphId) {
        match id {
            GlyphId::Gap => self.tail = prev,
            GlyphId::Content(_) => {
                if let Some(node) = self.node_mut(id) {
                    node.prev = prev;
                }
            }
        }
    }

    /// Number of content glyphs in the queue.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// True when nothing but the gap is queued.
    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_gap()
    }

    /// Whether the glyph is still allocated (queued, or kept alive by a holder). The gap always is.
    pub(crate) fn is_live(&self, id: GlyphId) -> bool {
        id.is_gap() || self.node(id).is_some()
    }

    pub(crate) fn is_queued(&self, id: GlyphId) -> bool {
        id.is_gap() || self.node(id).is_some_and(|node| node.queued)
    }

    pub(crate) fn glyph(&self, id: GlyphId) -> Option<&Glyph> {
        match id {
            GlyphId::Gap => Some(&self.gap),
            GlyphId::Content(_) => self.node(id).map(|node| &node.glyph),
        }
    }

    pub(crate) fn glyph_mut(&mut self, id: GlyphId) -> Option<&mut Glyph> {
        match id {
            GlyphId::Gap => Some(&mut self.gap),
            GlyphId::Content(_) => self.node_mut(id).map(|node| &mut node.glyph),
        }
    }

    /// Successor around the ring. Unqueued ids resolve to the gap.
    pub(crate) fn next(&self, id: GlyphId) -> GlyphId {
        match id {
            GlyphId::Gap => self.head,
            GlyphId::Content(_) => self
                .node(id)
                .filter(|node| node.queued)
                .map_or(GlyphId::GAP, |node| node.next),
        }
    }

    /// Predecessor around the ring. Unqueued ids resolve to the gap.
    pub(crate) fn prev(&self, id: GlyphId) -> GlyphId {
        match id {
            GlyphId::Gap => self.tail,
            GlyphId::Content(_) => self
                .node(id)
                .filter(|node| node.queued)
                .map_or(GlyphId::GAP, |node| node.prev),
        }
    }

    /// Links `glyph` in immediately before the gap.
    pub(crate) fn enqueue(&mut self, glyph: Glyph) -> GlyphId {
        let tail = self.tail;
        let id = GlyphId::Content(self.nodes.insert(Node {
            glyph,
            prev: tail,
            next: GlyphId::GAP,
            queued: true,
            holders: 0,
        }));
        self.set_next(tail, id);
        self.tail = id;
        self.len += 1;
        id
    }

    /// Unlinks a glyph from the ring. The slot survives while holders still reference it.
    ///
    /// Returns false for the gap and for glyphs that are not queued.
    pub(crate) fn unlink(&mut self, id: GlyphId) -> bool {
        let Some(node) = self.node_mut(id).filter(|node| node.queued) else {
            return false;
        };
        let (prev, next) = (node.prev, node.next);
        node.queued = false;
        node.prev = GlyphId::GAP;
        node.next = GlyphId::GAP;

        self.set_next(prev, next);
        self.set_prev(next, prev);
        self.len -= 1;
        self.free_if_unreferenced(id);
        true
    }

    /// Records one more holder referencing `id`. The gap is never counted.
    pub(crate) fn retain(&mut self, id: GlyphId) {
        if let Some(node) = self.node_mut(id) {
            node.holders += 1;
        }
    }

    /// Drops one holder reference; frees the slot once it is neither queued nor held.
    pub(crate) fn release(&mut self, id: GlyphId) {
        if let Some(node) = self.node_mut(id) {
            node.holders = node.holders.saturating_sub(1);
        }
        self.free_if_unreferenced(id);
    }

    fn free_if_unreferenced(&mut self, id: GlyphId) {
        let GlyphId::Content(key) = id else {
            return;
        };
        let unreferenced = self
            .nodes
            .get(key)
            .is_some_and(|node| !node.queued && node.holders == 0);
        if !unreferenced {
            return;
        }
        if let Some(node) = self.nodes.remove(key)
            && let Some(message) = node.glyph.message()
        {
            self.released.push((id, Arc::clone(message)));
        }
    }

    /// Glyph slots freed since the last call, with the message each one carried.
    pub(crate) fn drain_released(&mut self) -> Vec<(GlyphId, Arc<Notification>)> {
        std::mem::take(&mut self.released)
    }

    /// Queued content glyphs from oldest to newest.
    pub(crate) fn iter(&self) -> impl Iterator<Item = GlyphId> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            if cursor.is_gap() {
                return None;
            }
            let current = cursor;
            cursor = self.next(current);
            Some(current)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::ContentGlyph;
    use pretty_assertions::assert_eq;

    fn content(text: &str) -> Glyph {
        Glyph::Content(ContentGlyph::new(
            Arc::new(Notification::new("g", "u", text)),
            text.to_string(),
            text.len() as i32,
        ))
    }

    #[test]
    fn new_queue_is_empty_ring_around_gap() {
        let queue = GlyphQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.next(GlyphId::GAP), GlyphId::GAP);
        assert_eq!(queue.prev(GlyphId::GAP), GlyphId::GAP);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn enqueue_links_before_gap_in_arrival_order() {
        let mut queue = GlyphQueue::new();
        let a = queue.enqueue(content("a"));
        let b = queue.enqueue(content("bb"));

        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(queue.next(GlyphId::GAP), a);
        assert_eq!(queue.next(b), GlyphId::GAP);
        assert_eq!(queue.prev(GlyphId::GAP), b);
        assert_eq!(queue.prev(a), GlyphId::GAP);
    }

    #[test]
    fn unlink_never_removes_gap() {
        let mut queue = GlyphQueue::new();
        assert!(!queue.unlink(GlyphId::GAP));
        assert!(queue.is_queued(GlyphId::GAP));
    }

    #[test]
    fn held_glyph_survives_unlink_until_released() {
        let mut queue = GlyphQueue::new();
        let a = queue.enqueue(content("a"));
        let b = queue.enqueue(content("b"));
        queue.retain(a);

        assert!(queue.unlink(a));
        assert!(queue.is_live(a));
        assert!(!queue.is_queued(a));
        assert_eq!(queue.next(GlyphId::GAP), b);
        assert!(queue.drain_released().is_empty());

        queue.release(a);
        assert!(!queue.is_live(a));
        let released = queue.drain_released();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].0, a);
    }

    #[test]
    fn reused_slot_does_not_alias_stale_id() {
        let mut queue = GlyphQueue::new();
        let a = queue.enqueue(content("a"));
        assert!(queue.unlink(a));
        let b = queue.enqueue(content("b"));

        assert_ne!(a, b);
        assert!(!queue.is_live(a));
        assert!(queue.glyph(a).is_none());
        assert!(queue.is_queued(b));
    }
}
