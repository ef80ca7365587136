//! The holder window: the run of materialized glyphs currently covering the viewport.
//!
//! Each holder freezes the width its glyph had when it was materialized, so the window can be
//! reasoned about purely in pixels. Holders live in a slot map and are doubly linked; the window
//! is never empty.

use slotmap::SlotMap;
use slotmap::new_key_type;

use crate::queue::GlyphId;

new_key_type! {
    pub(crate) struct HolderId;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Holder {
    pub(crate) glyph: GlyphId,
    pub(crate) width: i32,
    prev: Option<HolderId>,
    next: Option<HolderId>,
}

#[derive(Debug)]
pub(crate) struct HolderWindow {
    holders: SlotMap<HolderId, Holder>,
    left: HolderId,
    right: HolderId,
}

impl HolderWindow {
    /// Creates a window holding a single holder.
    pub(crate) fn new(glyph: GlyphId, width: i32) -> Self {
        let mut holders = SlotMap::with_key();
        let only = holders.insert(Holder {
            glyph,
            width,
            prev: None,
            next: None,
        });
        Self {
            holders,
            left: only,
            right: only,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.holders.len()
    }

    pub(crate) fn left(&self) -> HolderId {
        self.left
    }

    pub(crate) fn right(&self) -> HolderId {
        self.right
    }

    pub(crate) fn get(&self, id: HolderId) -> Option<&Holder> {
        self.holders.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: HolderId) -> Option<&mut Holder> {
        self.holders.get_mut(id)
    }

    pub(crate) fn left_holder(&self) -> Option<&Holder> {
        self.get(self.left)
    }

    pub(crate) fn next(&self, id: HolderId) -> Option<HolderId> {
        self.get(id).and_then(|holder| holder.next)
    }

    pub(crate) fn total_width(&self) -> i64 {
        self.iter().map(|(_, holder)| i64::from(holder.width)).sum()
    }

    pub(crate) fn push_left(&mut self, glyph: GlyphId, width: i32) -> HolderId {
        let old_left = self.left;
        let id = self.holders.insert(Holder {
            glyph,
            width,
            prev: None,
            next: Some(old_left),
        });
        if let Some(holder) = self.get_mut(old_left) {
            holder.prev = Some(id);
        }
        self.left = id;
        id
    }

    pub(crate) fn push_right(&mut self, glyph: GlyphId, width: i32) -> HolderId {
        let old_right = self.right;
        let id = self.holders.insert(Holder {
            glyph,
            width,
            prev: Some(old_right),
            next: None,
        });
        if let Some(holder) = self.get_mut(old_right) {
            holder.next = Some(id);
        }
        self.right = id;
        id
    }

    /// Links a new holder directly to the right of `anchor`.
    pub(crate) fn insert_after(
        &mut self,
        anchor: HolderId,
        glyph: GlyphId,
        width: i32,
    ) -> Option<HolderId> {
        let next = self.get(anchor)?.next;
        let id = self.holders.insert(Holder {
            glyph,
            width,
            prev: Some(anchor),
            next,
        });
        if let Some(holder) = self.get_mut(anchor) {
            holder.next = Some(id);
        }
        match next.and_then(|next| self.get_mut(next)) {
            Some(holder) => holder.prev = Some(id),
            None => self.right = id,
        }
        Some(id)
    }

    /// Links a new holder directly to the left of `anchor`.
    pub(crate) fn insert_before(
        &mut self,
        anchor: HolderId,
        glyph: GlyphId,
        width: i32,
    ) -> Option<HolderId> {
        let prev = self.get(anchor)?.prev;
        let id = self.holders.insert(Holder {
            glyph,
            width,
            prev,
            next: Some(anchor),
        });
        if let Some(holder) = self.get_mut(anchor) {
            holder.prev = Some(id);
        }
        match prev.and_then(|prev| self.get_mut(prev)) {
            Some(holder) => holder.next = Some(id),
            None => self.left = id,
        }
        Some(id)
    }

    /// Unlinks a holder and returns it. The last remaining holder is never removed.
    pub(crate) fn remove(&mut self, id: HolderId) -> Option<Holder> {
        if self.holders.len() <= 1 {
            return None;
        }
        let holder = self.holders.remove(id)?;
        match holder.prev {
            Some(prev) => {
                if let Some(prev) = self.get_mut(prev) {
                    prev.next = holder.next;
                }
            }
            None => {
                if let Some(next) = holder.next {
                    self.left = next;
                }
            }
        }
        match holder.next {
            Some(next) => {
                if let Some(next) = self.get_mut(next) {
                    next.prev = holder.prev;
                }
            }
            None => {
                if let Some(prev) = holder.prev {
                    self.right = prev;
                }
            }
        }
        Some(holder)
    }

    /// Holders from left to right.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (HolderId, &Holder)> + '_ {
        let mut cursor = Some(self.left);
        std::iter::from_fn(move || {
            let id = cursor?;
            let holder = self.get(id)?;
            cursor = holder.next;
            Some((id, holder))
        })
    }

    /// Holder ids from left to right, collected so callers can mutate while walking.
    pub(crate) fn ids(&self) -> Vec<HolderId> {
        self.iter().map(|(id, _)| id).collect()
    }
}
