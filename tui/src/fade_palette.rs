//! Colors used as messages fade out.
//!
//! Level zero is the configured foreground; each further level moves one step towards the
//! background. The last level never reaches the background, so an expired message that is still
//! scrolling out stays readable.

use ratatui::style::Color;

pub const DEFAULT_FOREGROUND_RGB: &str = "#E6E6E6";
pub const DEFAULT_BACKGROUND_RGB: &str = "#1E1E1E";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FadePalette {
    colors: Vec<Color>,
}

impl Default for FadePalette {
    fn default() -> Self {
        Self::new(
            parse_hex_rgb(DEFAULT_FOREGROUND_RGB).unwrap_or((230, 230, 230)),
            parse_hex_rgb(DEFAULT_BACKGROUND_RGB).unwrap_or((30, 30, 30)),
            5,
        )
    }
}

impl FadePalette {
    pub fn new(foreground: (u8, u8, u8), background: (u8, u8, u8), levels: u8) -> Self {
        let levels = levels.max(1);
        let colors = (0..levels)
            .map(|level| {
                let (r, g, b) = blend(foreground, background, level, levels);
                Color::Rgb(r, g, b)
            })
            .collect();
        Self { colors }
    }

    /// Builds a palette from `#RRGGBB` strings, falling back to the defaults for either side that
    /// does not parse.
    pub fn from_hex(foreground: Option<&str>, background: Option<&str>, levels: u8) -> Self {
        let foreground = foreground
            .and_then(parse_hex_rgb)
            .or_else(|| parse_hex_rgb(DEFAULT_FOREGROUND_RGB))
            .unwrap_or((230, 230, 230));
        let background = background
            .and_then(parse_hex_rgb)
            .or_else(|| parse_hex_rgb(DEFAULT_BACKGROUND_RGB))
            .unwrap_or((30, 30, 30));
        Self::new(foreground, background, levels)
    }

    pub fn levels(&self) -> usize {
        self.colors.len()
    }

    /// Color for a message at `fade_level`. Expired messages use the last level.
    pub fn color(&self, fade_level: u8, expired: bool) -> Color {
        let last = self.colors.len().saturating_sub(1);
        let index = if expired {
            last
        } else {
            usize::from(fade_level).min(last)
        };
        self.colors.get(index).copied().unwrap_or(Color::Reset)
    }
}

fn blend(from: (u8, u8, u8), to: (u8, u8, u8), level: u8, levels: u8) -> (u8, u8, u8) {
    let mix = |a: u8, b: u8| {
        let a = i32::from(a);
        let b = i32::from(b);
        let value = a + (b - a) * i32::from(level) / i32::from(levels);
        u8::try_from(value.clamp(0, 255)).unwrap_or(u8::MAX)
    };
    (mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

pub fn parse_hex_rgb(value: &str) -> Option<(u8, u8, u8)> {
    let value = value.trim();
    let value = value.strip_prefix('#').unwrap_or(value);
    if value.len() != 6 || !value.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&value[0..2], 16).ok()?;
    let g = u8::from_str_radix(&value[2..4], 16).ok()?;
    let b = u8::from_str_radix(&value[4..6], 16).ok()?;
    Some((r, g, b))
}
