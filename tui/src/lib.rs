// Forbid accidental stdout/stderr writes in the library portion of the TUI.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod app;
mod app_event;
mod attachment;
mod exit;
mod fade_palette;
mod footer;
mod strip;
mod tui;

pub use app::TickerAppOptions;
pub use app::run_ticker_app;
pub use app_event::BusUpdate;
pub use attachment::AttachmentError;
pub use attachment::Opener;
pub use attachment::validate_attachment;
pub use exit::AppExitInfo;
pub use exit::ExitReason;
pub use fade_palette::DEFAULT_BACKGROUND_RGB;
pub use fade_palette::DEFAULT_FOREGROUND_RGB;
pub use fade_palette::FadePalette;
pub use fade_palette::parse_hex_rgb;
pub use strip::MESSAGE_SPACING;
pub use strip::StripSurface;
pub use strip::TerminalMeasure;
pub use strip::measure_cells;
