//! Scrolling ticker engine.
//!
//! Messages become glyphs in a circular queue anchored by a single elastic gap. A window of
//! width-frozen holders covers the viewport and is grown and evicted as content scrolls. The
//! engine owns no window, font or thread: hosts drive it through [`Ticker`], passing in time,
//! a [`Measure`] for text and a [`Surface`] to paint on.

mod clock;
mod config;
mod damage;
mod error;
mod glyph;
mod holder;
mod host;
mod interaction;
mod queue;
mod scroller;
mod ticker;

pub use clock::TimerHandle;
pub use clock::TimerQueue;
pub use clock::TimerTarget;
pub use config::TickerConfig;
pub use damage::Damage;
pub use error::HostError;
pub use glyph::ContentGlyph;
pub use glyph::Glyph;
pub use host::GlyphPaint;
pub use host::Measure;
pub use host::Surface;
pub use host::exposed_range;
pub use interaction::PointerButton;
pub use interaction::PointerEvent;
pub use queue::ContentKey;
pub use queue::GlyphId;
pub use scroller::Direction;
pub use ticker::InsertOutcome;
pub use ticker::Ticker;
pub use ticker::TickerEvent;

#[cfg(test)]
mod test_support {
    use std::sync::Arc;

    use tickertape_protocol::Notification;

    use crate::glyph::ContentGlyph;

    pub(crate) fn content(text: &str, width: i32) -> ContentGlyph {
        ContentGlyph::new(
            Arc::new(Notification::new("", "", text)),
            text.to_string(),
            width,
        )
    }
}
