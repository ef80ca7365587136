//! Seams between the ticker engine and whatever draws it.
//!
//! The engine never owns a window or a font. A host hands it a [`Measure`] when messages are
//! inserted and a [`Surface`] when damage needs to be repainted.

use std::ops::Range;

use crate::HostError;

/// Deterministic text measurement in host pixels, using the host's current font.
pub trait Measure {
    fn measure(&self, text: &str) -> i32;
}

impl<F> Measure for F
where
    F: Fn(&str) -> i32,
{
    fn measure(&self, text: &str) -> i32 {
        self(text)
    }
}

/// What a holder asks the host to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphPaint<'a> {
    /// Blank filler.
    Gap,
    Content {
        text: &'a str,
        fade_level: u8,
        max_fade_levels: u8,
        /// Expired holders keep painting in their final fade color until they scroll away.
        expired: bool,
    },
}

/// A retained one-row image the engine paints into.
pub trait Surface {
    /// Width of the surface in pixels.
    fn width(&self) -> i32;

    /// Moves the previously rendered pixels by `-dx` and returns the x-range that is now stale.
    ///
    /// A positive `dx` means content moved left, so the exposed strip is on the right.
    fn translate_and_expose(&mut self, dx: i32) -> Range<i32>;

    /// Draws one holder whose left edge sits at `x` (possibly negative), touching only pixels in
    /// `clip`.
    fn paint(
        &mut self,
        glyph: GlyphPaint<'_>,
        frozen_width: i32,
        x: i32,
        clip: Range<i32>,
    ) -> Result<(), HostError>;
}

/// Exposed strip for a translation of `dx` on a surface `width` pixels wide.
///
/// Shared by hosts so they agree with the engine about which pixels became stale.
pub fn exposed_range(width: i32, dx: i32) -> Range<i32> {
    if dx >= width || -dx >= width {
        return 0..width;
    }
    if dx > 0 {
        width - dx..width
    } else if dx < 0 {
        0..-dx
    } else {
        0..0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exposed_range_tracks_direction() {
        assert_eq!(exposed_range(100, 3), 97..100);
        assert_eq!(exposed_range(100, -3), 0..3);
        assert_eq!(exposed_range(100, 0), 0..0);
        assert_eq!(exposed_range(100, 250), 0..100);
        assert_eq!(exposed_range(100, -100), 0..100);
    }

    #[test]
    fn closures_measure_text() {
        let measure = |text: &str| text.len() as i32 * 2;
        assert_eq!(Measure::measure(&measure, "abc"), 6);
    }
}
