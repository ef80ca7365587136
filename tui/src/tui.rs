//! Terminal ownership for the ticker.
//!
//! The ticker draws its one-row strip and footer on the alternate screen with the cursor hidden.
//! Mouse capture stays on for the whole session because drags scrub the strip and clicks select
//! messages. Whatever [`init`] switches on, [`restore`] switches off again, also from a panic.

use std::io;
use std::io::IsTerminal;
use std::io::Stdout;
use std::io::stdin;
use std::io::stdout;
use std::panic;

use crossterm::cursor::Hide;
use crossterm::cursor::Show;
use crossterm::event::DisableMouseCapture;
use crossterm::event::EnableMouseCapture;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::disable_raw_mode;
use ratatui::crossterm::terminal::enable_raw_mode;

pub type Terminal = ratatui::Terminal<CrosstermBackend<Stdout>>;

fn require_tty() -> io::Result<()> {
    if !stdin().is_terminal() {
        return Err(io::Error::other("the ticker needs stdin to be a terminal"));
    }
    if !stdout().is_terminal() {
        return Err(io::Error::other("the ticker needs stdout to be a terminal"));
    }
    Ok(())
}

fn enter_ticker_modes() -> io::Result<()> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;
    // A visible cursor would blink on top of the strip.
    let _ = execute!(stdout(), Hide);
    Ok(())
}

/// Takes over the terminal for the ticker and returns a cleared terminal to draw the strip on.
pub fn init() -> io::Result<Terminal> {
    require_tty()?;
    enter_ticker_modes()?;
    restore_on_panic();

    let mut terminal = ratatui::Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;
    Ok(terminal)
}

/// Gives the terminal back: mouse capture off, main screen, cooked mode, cursor shown.
pub fn restore() -> io::Result<()> {
    // Safe to send even when `init` failed before enabling capture.
    let _ = execute!(stdout(), DisableMouseCapture);
    execute!(stdout(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    let _ = execute!(stdout(), Show);
    Ok(())
}

fn restore_on_panic() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = restore();
        previous(info);
    }));
}
