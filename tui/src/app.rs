//! The ticker session: terminal input, bus input and timers multiplexed on one task.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use crossterm::event::Event;
use crossterm::event::EventStream;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use crossterm::event::MouseButton;
use crossterm::event::MouseEvent;
use crossterm::event::MouseEventKind;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use tickertape_core::InsertOutcome;
use tickertape_core::PointerButton;
use tickertape_core::PointerEvent;
use tickertape_core::Ticker;
use tickertape_core::TickerConfig;
use tickertape_core::TickerEvent;
use tickertape_protocol::BusEvent;
use tickertape_protocol::MessageId;
use tickertape_protocol::Notification;
use tokio::select;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;
use tokio_stream::StreamExt;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::AppExitInfo;
use crate::ExitReason;
use crate::app_event::AppEvent;
use crate::app_event::BusUpdate;
use crate::attachment::Opener;
use crate::attachment::validate_attachment;
use crate::fade_palette::FadePalette;
use crate::footer::FooterProps;
use crate::footer::render_footer;
use crate::strip::StripSurface;
use crate::strip::TerminalMeasure;
use crate::tui;

const STRIP_ROW: u16 = 0;

/// Everything a ticker session needs besides the bus.
#[derive(Debug, Clone)]
pub struct TickerAppOptions {
    pub config: TickerConfig,
    pub palette: FadePalette,
    /// Shell-style command used to open attachments; the platform opener when `None`.
    pub attachment_command: Option<String>,
    /// End the session when the bus closes instead of continuing with what is queued.
    pub exit_on_bus_close: bool,
}

/// Runs the ticker until the user quits (or the bus closes, if configured to follow it).
pub async fn run_ticker_app(
    options: TickerAppOptions,
    bus_rx: UnboundedReceiver<BusUpdate>,
) -> anyhow::Result<AppExitInfo> {
    let mut terminal = tui::init().context("failed to initialize terminal")?;
    let width = terminal.size().map(|size| size.width).unwrap_or(80);
    let (app_event_tx, app_event_rx) = unbounded_channel();
    let mut app = App::new(options, width, app_event_tx);
    let result = app.run(&mut terminal, bus_rx, app_event_rx).await;
    if let Err(err) = tui::restore() {
        warn!("failed to restore terminal: {err}");
    }
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FooterSnapshot {
    selected: Option<MessageId>,
    status: Option<String>,
    step: i32,
    paused: bool,
    clock: String,
}

struct App {
    ticker: Ticker,
    strip: StripSurface,
    selected: Option<Arc<Notification>>,
    status: Option<String>,
    attachment_command: Option<String>,
    exit_on_bus_close: bool,
    bus_open: bool,
    last_footer: Option<FooterSnapshot>,
    app_event_tx: UnboundedSender<AppEvent>,
}

impl App {
    fn new(options: TickerAppOptions, width: u16, app_event_tx: UnboundedSender<AppEvent>) -> Self {
        let width = width.max(1);
        Self {
            ticker: Ticker::new(options.config, i32::from(width)),
            strip: StripSurface::new(width, options.palette),
            selected: None,
            status: None,
            attachment_command: options.attachment_command,
            exit_on_bus_close: options.exit_on_bus_close,
            bus_open: true,
            last_footer: None,
            app_event_tx,
        }
    }

    async fn run(
        &mut self,
        terminal: &mut tui::Terminal,
        mut bus_rx: UnboundedReceiver<BusUpdate>,
        mut app_event_rx: UnboundedReceiver<AppEvent>,
    ) -> anyhow::Result<AppExitInfo> {
        let mut events = EventStream::new();
        self.draw(terminal)?;

        loop {
            let deadline = self.ticker.next_deadline();
            let exit = select! {
                event = events.next() => match event {
                    Some(Ok(event)) => self.handle_terminal_event(event, Instant::now()),
                    Some(Err(err)) => return Err(err).context("failed to read terminal event"),
                    None => Some(ExitReason::Fatal("terminal input closed".to_string())),
                },
                update = bus_rx.recv(), if self.bus_open => {
                    self.handle_bus_update(update, Instant::now())
                }
                Some(event) = app_event_rx.recv() => {
                    self.handle_app_event(event);
                    None
                }
                () = sleep_until_deadline(deadline) => {
                    self.ticker.process_due(Instant::now());
                    None
                }
            };

            if let Some(exit_reason) = exit {
                info!(?exit_reason, "ticker session ending");
                return Ok(AppExitInfo {
                    exit_reason,
                    step: self.ticker.step(),
                });
            }
            self.draw(terminal)?;
        }
    }

    fn handle_terminal_event(&mut self, event: Event, now: Instant) -> Option<ExitReason> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key, now),
            Event::Mouse(mouse) => {
                let ticker_event = pointer_event(mouse)
                    .and_then(|pointer| self.ticker.on_pointer_event(pointer, now));
                if let Some(ticker_event) = ticker_event {
                    self.handle_ticker_event(ticker_event);
                }
                None
            }
            Event::Resize(width, _) => {
                self.resize(width);
                None
            }
            _ => None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Option<ExitReason> {
        self.status = None;
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(ExitReason::UserRequested);
            }
            KeyCode::Char('q') | KeyCode::Esc => return Some(ExitReason::UserRequested),
            KeyCode::Char('+') | KeyCode::Char('=') => self.ticker.faster(now),
            KeyCode::Char('-') => self.ticker.slower(now),
            KeyCode::Char('0') => {
                let paused = !self.ticker.is_paused();
                self.ticker.set_paused(paused, now);
            }
            KeyCode::Char('d') => {
                if let Some(message) = self.selected.take() {
                    self.ticker.delete(&message.id);
                }
            }
            KeyCode::Char('k') => {
                if let Some(message) = self.selected.take() {
                    self.ticker.kill(&message.id);
                }
            }
            KeyCode::Char('f') => {
                if let Some(message) = &self.selected {
                    self.ticker.expire_now(&message.id, now);
                }
            }
            KeyCode::Char('o') => {
                if let Some(message) = self.selected.clone() {
                    self.open_attachment(&message);
                }
            }
            _ => {}
        }
        None
    }

    fn handle_ticker_event(&mut self, event: TickerEvent) {
        match event {
            TickerEvent::Selected(message) => {
                self.selected = message;
                self.status = None;
            }
            TickerEvent::OpenAttachment(message) => self.open_attachment(&message),
        }
    }

    fn handle_bus_update(&mut self, update: Option<BusUpdate>, now: Instant) -> Option<ExitReason> {
        let detail = match update {
            Some(BusUpdate::Event(event)) => {
                self.apply_bus_event(event, now);
                return None;
            }
            Some(BusUpdate::Closed { detail }) => detail,
            None => None,
        };

        self.bus_open = false;
        info!(detail = detail.as_deref().unwrap_or(""), "notification bus closed");
        if self.exit_on_bus_close {
            return Some(ExitReason::BusClosed);
        }
        self.status = Some(match detail {
            Some(detail) => format!("bus closed: {detail}"),
            None => "bus closed".to_string(),
        });
        None
    }

    fn apply_bus_event(&mut self, event: BusEvent, now: Instant) {
        debug!(kind = %event, "bus event");
        match event {
            BusEvent::Notify(notification) => {
                if self.ticker.insert(notification, &TerminalMeasure, now) == InsertOutcome::Suppressed
                {
                    debug!("notification suppressed by a killed thread");
                }
            }
            BusEvent::Retract { id } => {
                self.ticker.delete(&id);
            }
            BusEvent::Kill { id } => {
                self.ticker.kill(&id);
            }
        }
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::AttachmentOpened {
                attachment,
                result: Ok(()),
            } => {
                debug!(%attachment, "attachment opened");
                self.status = None;
            }
            AppEvent::AttachmentOpened {
                attachment,
                result: Err(err),
            } => {
                warn!(%attachment, "failed to open attachment: {err}");
                self.status = Some(format!("failed to open {attachment}: {err}"));
            }
        }
    }

    fn open_attachment(&mut self, message: &Notification) {
        let Some(raw) = message.attachment.as_deref() else {
            self.status = Some("message has no attachment".to_string());
            return;
        };
        let opener = validate_attachment(raw).and_then(|url| {
            Opener::resolve(self.attachment_command.as_deref()).map(|opener| (url, opener))
        });
        let (url, opener) = match opener {
            Ok(resolved) => resolved,
            Err(err) => {
                self.status = Some(err.to_string());
                return;
            }
        };

        self.status = Some(format!("opening {url}"));
        let tx = self.app_event_tx.clone();
        tokio::spawn(async move {
            let result = opener.open(&url).await.map_err(|err| err.to_string());
            let _ = tx.send(AppEvent::AttachmentOpened {
                attachment: url.to_string(),
                result,
            });
        });
    }

    fn resize(&mut self, width: u16) {
        let width = width.max(1);
        self.strip.resize(width);
        self.ticker.resize(i32::from(width));
    }

    fn footer_snapshot(&self) -> FooterSnapshot {
        FooterSnapshot {
            selected: self.selected.as_ref().map(|message| message.id.clone()),
            status: self.status.clone(),
            step: self.ticker.step(),
            paused: self.ticker.is_paused(),
            clock: chrono::Local::now().format("%H:%M").to_string(),
        }
    }

    fn draw(&mut self, terminal: &mut tui::Terminal) -> anyhow::Result<()> {
        if self
            .selected
            .as_ref()
            .is_some_and(|message| !self.ticker.contains(&message.id))
        {
            self.selected = None;
        }
        let footer = self.footer_snapshot();
        if !self.ticker.needs_render() && self.last_footer.as_ref() == Some(&footer) {
            return Ok(());
        }

        self.ticker
            .render(&mut self.strip)
            .context("failed to paint ticker strip")?;
        terminal
            .draw(|frame| {
                let area = frame.area();
                self.render(area, frame.buffer_mut(), &footer.clock);
            })
            .context("failed to draw frame")?;
        self.last_footer = Some(footer);
        Ok(())
    }

    fn render(&self, area: Rect, buf: &mut Buffer, clock: &str) {
        let strip_area = Rect::new(area.x, area.y + STRIP_ROW, area.width, 1).intersection(area);
        self.strip.render(strip_area, buf);

        let footer_area = Rect::new(area.x, area.y + STRIP_ROW + 1, area.width, 1).intersection(area);
        if footer_area.is_empty() {
            return;
        }
        render_footer(
            footer_area,
            buf,
            FooterProps {
                selected: self.selected.as_deref(),
                status: self.status.as_deref(),
                step: self.ticker.step(),
                paused: self.ticker.is_paused(),
                clock,
            },
        );
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

fn pointer_event(mouse: MouseEvent) -> Option<PointerEvent> {
    let x = i32::from(mouse.column);
    match mouse.kind {
        MouseEventKind::Down(button) if mouse.row == STRIP_ROW => Some(PointerEvent::Down {
            x,
            button: pointer_button(button),
        }),
        MouseEventKind::Drag(MouseButton::Left) => Some(PointerEvent::Move { x }),
        MouseEventKind::Up(button) => Some(PointerEvent::Up {
            x,
            button: pointer_button(button),
        }),
        _ => None,
    }
}

fn pointer_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right | MouseButton::Middle => PointerButton::Secondary,
    }
}
