//! The ticker row as a retained image.
//!
//! [`StripSurface`] keeps the last rendered row between frames so scroll steps only repaint the
//! exposed columns. One terminal cell is one ticker pixel.

use std::ops::Range;

use ratatui::buffer::Buffer;
use ratatui::buffer::Cell;
use ratatui::layout::Rect;
use ratatui::style::Style;
use tickertape_core::GlyphPaint;
use tickertape_core::HostError;
use tickertape_core::Measure;
use tickertape_core::Surface;
use tickertape_core::exposed_range;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::fade_palette::FadePalette;

/// Blank cells trailing every message so neighbours never touch.
pub const MESSAGE_SPACING: i32 = 2;

/// Width of a message in terminal cells, including its trailing spacing.
pub fn measure_cells(text: &str) -> i32 {
    i32::try_from(text.width())
        .unwrap_or(i32::MAX - MESSAGE_SPACING)
        .saturating_add(MESSAGE_SPACING)
}

/// Measures messages in terminal cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalMeasure;

impl Measure for TerminalMeasure {
    fn measure(&self, text: &str) -> i32 {
        measure_cells(text)
    }
}

#[derive(Debug, Clone)]
pub struct StripSurface {
    buffer: Buffer,
    palette: FadePalette,
}

impl StripSurface {
    pub fn new(width: u16, palette: FadePalette) -> Self {
        Self {
            buffer: Buffer::empty(Rect::new(0, 0, width.max(1), 1)),
            palette,
        }
    }

    /// Discards the retained row. The next render must be a full one.
    pub fn resize(&mut self, width: u16) {
        self.buffer = Buffer::empty(Rect::new(0, 0, width.max(1), 1));
    }

    fn cell_mut(&mut self, x: i32) -> Option<&mut Cell> {
        let x = u16::try_from(x).ok()?;
        self.buffer.cell_mut((x, 0))
    }

    fn blank(&mut self, range: Range<i32>) {
        for x in range {
            if let Some(cell) = self.cell_mut(x) {
                cell.reset();
            }
        }
    }

    /// Paints `text` starting at column `x`, touching only graphemes that meet `clip`.
    ///
    /// A grapheme straddling the clip edge is redrawn across its full span as long as it stays
    /// inside `bounds`; one cut by `bounds` is blanked.
    fn paint_text(
        &mut self,
        text: &str,
        style: Style,
        x: i32,
        bounds: Range<i32>,
        clip: Range<i32>,
    ) {
        let mut column = x;
        for grapheme in text.graphemes(true) {
            if column >= clip.end {
                break;
            }
            let width = i32::try_from(grapheme.width()).unwrap_or(0);
            if width == 0 {
                continue;
            }
            let end = column + width;
            if end > clip.start {
                if column >= bounds.start && end <= bounds.end {
                    if let Some(cell) = self.cell_mut(column) {
                        cell.reset();
                        cell.set_symbol(grapheme).set_style(style);
                    }
                    self.blank(column + 1..end);
                } else {
                    self.blank(column.max(bounds.start)..end.min(bounds.end));
                }
            }
            column = end;
        }
        self.blank(column.max(clip.start)..clip.end);
    }

    /// Copies the retained row into `area` of a frame buffer.
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let width = area.width.min(self.buffer.area.width);
        for x in 0..width {
            if let (Some(source), Some(target)) = (
                self.buffer.cell((x, 0)),
                buf.cell_mut((area.x + x, area.y)),
            ) {
                *target = source.clone();
            }
        }
    }

    /// The row as plain text, wide graphemes occupying their full width.
    pub fn row_text(&self) -> String {
        let mut out = String::new();
        let mut skip = 0usize;
        for cell in &self.buffer.content {
            if skip > 0 {
                skip -= 1;
                continue;
            }
            let symbol = cell.symbol();
            skip = symbol.width().saturating_sub(1);
            out.push_str(symbol);
        }
        out
    }
}

impl Surface for StripSurface {
    fn width(&self) -> i32 {
        i32::from(self.buffer.area.width)
    }

    fn translate_and_expose(&mut self, dx: i32) -> Range<i32> {
        let exposed = exposed_range(self.width(), dx);
        let shift = usize::try_from(dx.unsigned_abs()).unwrap_or(usize::MAX);
        let content = &mut self.buffer.content;
        if shift < content.len() {
            if dx > 0 {
                content.rotate_left(shift);
            } else {
                content.rotate_right(shift);
            }
        }
        self.blank(exposed.clone());
        exposed
    }

    fn paint(
        &mut self,
        glyph: GlyphPaint<'_>,
        frozen_width: i32,
        x: i32,
        clip: Range<i32>,
    ) -> Result<(), HostError> {
        let bounds = x.max(0)..(x + frozen_width).min(self.width());
        let clip = clip.start.max(bounds.start)..clip.end.min(bounds.end);
        match glyph {
            GlyphPaint::Gap => self.blank(clip),
            GlyphPaint::Content {
                text,
                fade_level,
                expired,
                ..
            } => {
                let style = Style::default().fg(self.palette.color(fade_level, expired));
                self.paint_text(text, style, x, bounds, clip);
            }
        }
        Ok(())
    }
}
