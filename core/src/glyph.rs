//! Visual items carried by the ticker.
//!
//! There are exactly two kinds: the single elastic [`Glyph::Gap`] that separates the newest
//! message from the oldest one, and content glyphs that each wrap one notification.

use std::sync::Arc;

use tickertape_protocol::Notification;

use crate::clock::TimerHandle;
use crate::host::GlyphPaint;

#[derive(Debug)]
pub enum Glyph {
    Gap,
    Content(ContentGlyph),
}

impl Glyph {
    /// Fixed width of a content glyph. The gap has none; holders size it when they materialize it.
    pub fn natural_width(&self) -> Option<i32> {
        match self {
            Glyph::Gap => None,
            Glyph::Content(content) => Some(content.width),
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Glyph::Gap)
    }

    pub fn is_expired(&self) -> bool {
        match self {
            Glyph::Gap => false,
            Glyph::Content(content) => content.expired,
        }
    }

    pub fn content(&self) -> Option<&ContentGlyph> {
        match self {
            Glyph::Gap => None,
            Glyph::Content(content) => Some(content),
        }
    }

    pub(crate) fn content_mut(&mut self) -> Option<&mut ContentGlyph> {
        match self {
            Glyph::Gap => None,
            Glyph::Content(content) => Some(content),
        }
    }

    pub fn message(&self) -> Option<&Arc<Notification>> {
        self.content().map(ContentGlyph::message)
    }

    /// Marks the glyph expired. The gap never expires.
    pub(crate) fn expire(&mut self) {
        if let Glyph::Content(content) = self {
            content.expired = true;
        }
    }

    pub(crate) fn paint_view(&self, max_fade_levels: u8) -> GlyphPaint<'_> {
        match self {
            Glyph::Gap => GlyphPaint::Gap,
            Glyph::Content(content) => GlyphPaint::Content {
                text: &content.text,
                fade_level: content.fade_level,
                max_fade_levels,
                expired: content.expired,
            },
        }
    }
}

/// Result of one fade tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FadeOutcome {
    Faded(u8),
    Expired,
}

#[derive(Debug)]
pub struct ContentGlyph {
    message: Arc<Notification>,
    text: String,
    width: i32,
    fade_level: u8,
    expired: bool,
    fast_fade: bool,
    fade_timer: Option<TimerHandle>,
}

impl ContentGlyph {
    /// `width` is clamped to at least one pixel so every holder makes progress.
    pub fn new(message: Arc<Notification>, text: String, width: i32) -> Self {
        Self {
            message,
            text,
            width: width.max(1),
            fade_level: 0,
            expired: false,
            fast_fade: false,
            fade_timer: None,
        }
    }

    pub fn message(&self) -> &Arc<Notification> {
        &self.message
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn fade_level(&self) -> u8 {
        self.fade_level
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub(crate) fn fade_timer(&self) -> Option<TimerHandle> {
        self.fade_timer
    }

    pub(crate) fn set_fade_timer(&mut self, handle: Option<TimerHandle>) {
        self.fade_timer = handle;
    }

    pub(crate) fn take_fade_timer(&mut self) -> Option<TimerHandle> {
        self.fade_timer.take()
    }

    /// Makes the next fade tick final.
    pub(crate) fn request_fast_fade(&mut self) {
        self.fast_fade = true;
    }

    pub(crate) fn on_fade_tick(&mut self, max_fade_levels: u8) -> FadeOutcome {
        let last_level = max_fade_levels.saturating_sub(1);
        if self.fast_fade || self.fade_level.saturating_add(1) >= max_fade_levels {
            self.fade_level = last_level;
            self.expired = true;
            return FadeOutcome::Expired;
        }
        self.fade_level += 1;
        FadeOutcome::Faded(self.fade_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn content(width: i32) -> ContentGlyph {
        ContentGlyph::new(
            Arc::new(Notification::new("g", "u", "text")),
            "g:u:text".to_string(),
            width,
        )
    }

    #[test]
    fn fades_through_every_level_then_expires() {
        let mut glyph = content(10);
        assert_eq!(glyph.on_fade_tick(3), FadeOutcome::Faded(1));
        assert_eq!(glyph.on_fade_tick(3), FadeOutcome::Faded(2));
        assert_eq!(glyph.on_fade_tick(3), FadeOutcome::Expired);
        assert!(glyph.is_expired());
        assert_eq!(glyph.fade_level(), 2);
    }

    #[test]
    fn fast_fade_expires_on_the_next_tick() {
        let mut glyph = content(10);
        glyph.request_fast_fade();
        assert_eq!(glyph.on_fade_tick(5), FadeOutcome::Expired);
        assert_eq!(glyph.fade_level(), 4);
    }

    #[test]
    fn zero_width_content_is_clamped() {
        assert_eq!(content(0).width(), 1);
    }

    #[test]
    fn gap_never_expires() {
        let mut gap = Glyph::Gap;
        gap.expire();
        assert!(!gap.is_expired());
        assert_eq!(gap.natural_width(), None);
        assert_eq!(gap.paint_view(5), GlyphPaint::Gap);
    }
}
