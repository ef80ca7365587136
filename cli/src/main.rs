mod bus;
mod config;
mod logging;

use std::path::PathBuf;

use anyhow::Context;
use clap::ArgGroup;
use clap::Parser;
use tickertape_tui::ExitReason;
use tickertape_tui::FadePalette;
use tickertape_tui::TickerAppOptions;
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;

use crate::bus::BusCommand;
use crate::bus::BusSource;
use crate::config::ConfigStore;
use crate::config::TickerSettings;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Scroll notifications from a message bus across the terminal",
    group(ArgGroup::new("source").required(true).args(["bus_command", "input"]))
)]
struct Cli {
    /// Command whose stdout is the notification bus, one event per line.
    #[arg(long, env = "TICKERTAPE_BUS_COMMAND", value_name = "CMD")]
    bus_command: Option<String>,

    /// Replay recorded bus events (JSON lines) instead of running a bus command.
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Scroll speed in cells per tick; negative values scroll to the right, 0 stops.
    #[arg(long, allow_negative_numbers = true)]
    step: Option<i32>,

    /// Lifetime of messages that do not carry their own timeout (0 keeps them forever).
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Number of fade steps before a message expires.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..))]
    fade_levels: Option<u8>,

    /// Narrowest gap between the newest and the oldest message, in cells.
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..))]
    min_gap: Option<i32>,

    /// Interval between scroll steps in milliseconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: Option<u64>,

    /// Config file to read (defaults to `~/.tickertape/config.toml`).
    #[arg(long, env = "TICKERTAPE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory for `tickertape.log` (defaults to `log/` next to the config file).
    #[arg(long, env = "TICKERTAPE_LOG_DIR", value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Quit once the bus closes instead of letting queued messages play out.
    #[arg(long)]
    exit_on_bus_close: bool,
}

impl Cli {
    fn overrides(&self) -> TickerSettings {
        TickerSettings {
            step: self.step,
            min_gap_width: self.min_gap,
            fade_levels: self.fade_levels,
            timeout_secs: self.timeout_secs,
            tick_ms: self.tick_ms,
            ..TickerSettings::default()
        }
    }

    fn bus_source(&self) -> anyhow::Result<BusSource> {
        if let Some(command) = &self.bus_command {
            return Ok(BusSource::Command(BusCommand::parse(command)?));
        }
        match &self.input {
            Some(path) => Ok(BusSource::Replay(path.clone())),
            None => anyhow::bail!("either --bus-command or --input is required"),
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let store = match &cli.config {
        Some(path) => ConfigStore::new(path.clone()),
        None => ConfigStore::new_default()?,
    };
    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| store.path().parent().map(|dir| dir.join("log")));
    let _log_guard = match log_dir.as_deref().map(logging::init) {
        Some(Ok(guard)) => Some(guard),
        Some(Err(err)) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
        None => None,
    };

    let settings = store
        .load()
        .context("load config")?
        .overridden_by(cli.overrides());
    let config = settings.ticker_config();
    let palette = FadePalette::from_hex(
        settings.foreground.as_deref(),
        settings.background.as_deref(),
        config.max_fade_levels,
    );
    let initial_step = config.step;

    let source = cli.bus_source()?;
    let (bus_tx, bus_rx) = unbounded_channel();
    let bus_task = bus::spawn(source, bus_tx);

    let options = TickerAppOptions {
        config,
        palette,
        attachment_command: settings.attachment_command,
        exit_on_bus_close: cli.exit_on_bus_close,
    };
    let exit_info = tickertape_tui::run_ticker_app(options, bus_rx).await;
    bus_task.abort();
    let exit_info = exit_info?;

    if exit_info.step != initial_step {
        info!(step = exit_info.step, "persisting scroll speed");
        if let Err(err) = store.set_step(exit_info.step) {
            eprintln!("warning: failed to persist scroll speed: {err:#}");
        }
    }

    if let ExitReason::Fatal(message) = exit_info.exit_reason {
        eprintln!("{message}");
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn requires_a_bus_source() {
        assert!(Cli::try_parse_from(["tickertape"]).is_err());
        assert!(Cli::try_parse_from(["tickertape", "--input", "events.jsonl"]).is_ok());
    }

    #[test]
    fn negative_step_scrolls_right() {
        let cli = Cli::try_parse_from(["tickertape", "--bus-command", "bus", "--step", "-3"])
            .expect("parse args");
        assert_eq!(cli.overrides().step, Some(-3));
    }

    #[test]
    fn rejects_zero_fade_levels_and_tick_interval() {
        assert!(Cli::try_parse_from(["tickertape", "--input", "x", "--fade-levels", "0"]).is_err());
        assert!(Cli::try_parse_from(["tickertape", "--input", "x", "--tick-ms", "0"]).is_err());
    }

    #[test]
    fn bus_command_is_split_like_a_shell_would() {
        let cli = Cli::try_parse_from(["tickertape", "--bus-command", "tail -f 'my log'"])
            .expect("parse args");
        let BusSource::Command(command) = cli.bus_source().expect("bus source") else {
            panic!("expected a bus command");
        };
        assert_eq!(
            command,
            BusCommand::parse("tail -f \"my log\"").expect("parse command")
        );
    }
}
