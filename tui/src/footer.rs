//! The footer row under the ticker strip.
//!
//! The footer is pure rendering: it formats `FooterProps` into a single `Line`. Status messages win
//! over the selected message, which wins over key hints; the scroll speed and the wall clock are
//! always right-aligned.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Widget;
use tickertape_protocol::Notification;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const IDLE_HINTS: &str = "+/- speed  0 pause  q quit";
const ATTACHMENT_MARKER: &str = "  [o]";

#[derive(Clone, Copy, Debug)]
pub struct FooterProps<'a> {
    pub selected: Option<&'a Notification>,
    /// Transient feedback, e.g. a failed attachment launch.
    pub status: Option<&'a str>,
    pub step: i32,
    pub paused: bool,
    /// Preformatted wall clock.
    pub clock: &'a str,
}

pub fn render_footer(area: Rect, buf: &mut Buffer, props: FooterProps<'_>) {
    Paragraph::new(footer_line(props, usize::from(area.width))).render(area, buf);
}

fn footer_line(props: FooterProps<'_>, width: usize) -> Line<'static> {
    let speed = if props.paused {
        "paused".to_string()
    } else {
        format!("speed {}", props.step)
    };
    let right = truncate_to_width(&format!("{speed}  {}", props.clock), width);
    let available = width.saturating_sub(right.width() + 1);

    let left = match (props.status, props.selected) {
        (Some(status), _) => Span::from(truncate_to_width(status, available)).yellow(),
        (None, Some(message)) => {
            let mut text = message.display_text();
            if message.has_attachment() {
                text.push_str(ATTACHMENT_MARKER);
            }
            Span::from(truncate_to_width(&text, available)).bold()
        }
        (None, None) => Span::from(truncate_to_width(IDLE_HINTS, available)).dim(),
    };

    let pad = width.saturating_sub(left.width() + right.width());
    Line::from(vec![left, " ".repeat(pad).into(), Span::from(right).dim()])
}

fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let width = grapheme.width();
        if used + width > max - 1 {
            break;
        }
        out.push_str(grapheme);
        used += width;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn render_row(width: u16, props: FooterProps<'_>) -> String {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        render_footer(area, &mut buf, props);
        let row: String = buf.content.iter().map(|cell| cell.symbol()).collect();
        format!("|{row}|")
    }

    fn props<'a>(selected: Option<&'a Notification>) -> FooterProps<'a> {
        FooterProps {
            selected,
            status: None,
            step: 1,
            paused: false,
            clock: "12:34",
        }
    }

    #[test]
    fn idle_footer_shows_key_hints_and_speed() {
        assert_snapshot!(
            render_row(50, props(None)),
            @"|+/- speed  0 pause  q quit          speed 1  12:34|"
        );
    }

    #[test]
    fn selected_message_marks_attachments() {
        let mut message = Notification::new("alerts", "bob", "disk full");
        message.attachment = Some("https://example.com/disk".to_string());
        let footer = FooterProps {
            paused: true,
            clock: "09:05",
            ..props(Some(&message))
        };
        assert_snapshot!(
            render_row(40, footer),
            @"|alerts:bob:disk full  [o]  paused  09:05|"
        );
    }

    #[test]
    fn long_messages_are_truncated_before_the_speed() {
        let message = Notification::new("group", "user", "a very long message text");
        let footer = FooterProps {
            step: 3,
            clock: "09:05",
            ..props(Some(&message))
        };
        assert_eq!(render_row(20, footer), "|grou… speed 3  09:05|");
    }

    #[test]
    fn status_takes_priority_over_selection() {
        let message = Notification::new("g", "u", "hello");
        let footer = FooterProps {
            status: Some("no opener"),
            ..props(Some(&message))
        };
        assert_eq!(
            render_row(30, footer),
            "|no opener       speed 1  12:34|"
        );
    }
}
