//! `~/.tickertape/config.toml`: ticker settings under a `[ticker]` table.
//!
//! ```toml
//! [ticker]
//! step = 2
//! fade_levels = 5
//! timeout_secs = 300
//! attachment_command = "firefox --new-tab"
//! foreground = "#E6E6E6"
//! ```
//!
//! Reads are forgiving: a missing file, invalid TOML or an out-of-range value fall back to the
//! defaults with a warning. Writes edit the document in place so comments and layout survive.

use std::io::ErrorKind;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tempfile::NamedTempFile;
use tickertape_core::TickerConfig;
use toml_edit::DocumentMut;
use toml_edit::TableLike;
use toml_edit::value;
use tracing::warn;

const TICKER_TABLE: &str = "ticker";

/// Values from the `[ticker]` table (or command-line flags). `None` means "not set here".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerSettings {
    pub step: Option<i32>,
    pub min_gap_width: Option<i32>,
    pub fade_levels: Option<u8>,
    pub timeout_secs: Option<u64>,
    pub tick_ms: Option<u64>,
    pub drag_dead_zone: Option<i32>,
    pub attachment_command: Option<String>,
    pub foreground: Option<String>,
    pub background: Option<String>,
}

impl TickerSettings {
    /// Layers `overrides` on top of `self`; values set in `overrides` win.
    pub fn overridden_by(self, overrides: TickerSettings) -> Self {
        Self {
            step: overrides.step.or(self.step),
            min_gap_width: overrides.min_gap_width.or(self.min_gap_width),
            fade_levels: overrides.fade_levels.or(self.fade_levels),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            tick_ms: overrides.tick_ms.or(self.tick_ms),
            drag_dead_zone: overrides.drag_dead_zone.or(self.drag_dead_zone),
            attachment_command: overrides.attachment_command.or(self.attachment_command),
            foreground: overrides.foreground.or(self.foreground),
            background: overrides.background.or(self.background),
        }
    }

    pub fn ticker_config(&self) -> TickerConfig {
        let defaults = TickerConfig::default();
        TickerConfig {
            min_gap_width: self.min_gap_width.unwrap_or(defaults.min_gap_width),
            max_fade_levels: self.fade_levels.unwrap_or(defaults.max_fade_levels),
            default_timeout: self
                .timeout_secs
                .map_or(defaults.default_timeout, Duration::from_secs),
            tick_interval: self
                .tick_ms
                .map_or(defaults.tick_interval, Duration::from_millis),
            drag_dead_zone: self.drag_dead_zone.unwrap_or(defaults.drag_dead_zone),
            step: self.step.unwrap_or(defaults.step),
            ..defaults
        }
        .sanitized()
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn new_default() -> anyhow::Result<Self> {
        let Some(home) = dirs::home_dir() else {
            anyhow::bail!("cannot determine home directory for config path");
        };
        Ok(Self::new(default_config_path(&home)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<TickerSettings> {
        let Some(content) = read_document_string(&self.path)? else {
            return Ok(TickerSettings::default());
        };
        let doc = match content.parse::<DocumentMut>() {
            Ok(doc) => doc,
            Err(err) => {
                warn!(path = %self.path.display(), "ignoring invalid config.toml: {err}");
                return Ok(TickerSettings::default());
            }
        };

        let Some(item) = doc.get(TICKER_TABLE) else {
            return Ok(TickerSettings::default());
        };
        let Some(table) = item.as_table_like() else {
            warn!(path = %self.path.display(), "ignoring `ticker` entry that is not a table");
            return Ok(TickerSettings::default());
        };
        Ok(read_settings(table))
    }

    /// Persists the scroll speed chosen interactively.
    pub fn set_step(&self, step: i32) -> anyhow::Result<()> {
        let content = read_document_string(&self.path)?.unwrap_or_default();
        let mut doc = content
            .parse::<DocumentMut>()
            .with_context(|| format!("refusing to rewrite invalid {}", self.path.display()))?;

        let Some(ticker) = doc
            .entry(TICKER_TABLE)
            .or_insert(toml_edit::table())
            .as_table_like_mut()
        else {
            anyhow::bail!("`{TICKER_TABLE}` in {} is not a table", self.path.display());
        };
        ticker.insert("step", value(i64::from(step)));

        write_atomically(&self.path, &doc.to_string())
    }
}

fn default_config_path(home: &Path) -> PathBuf {
    home.join(".tickertape").join("config.toml")
}

fn read_settings(table: &dyn TableLike) -> TickerSettings {
    TickerSettings {
        step: read_integer(table, "step"),
        min_gap_width: read_integer(table, "min_gap_width"),
        fade_levels: read_integer(table, "fade_levels"),
        timeout_secs: read_integer(table, "timeout_secs"),
        tick_ms: read_integer(table, "tick_ms"),
        drag_dead_zone: read_integer(table, "drag_dead_zone"),
        attachment_command: read_string(table, "attachment_command"),
        foreground: read_string(table, "foreground"),
        background: read_string(table, "background"),
    }
}

fn read_integer<T: TryFrom<i64>>(table: &dyn TableLike, key: &str) -> Option<T> {
    let item = table.get(key)?;
    let Some(raw) = item.as_integer() else {
        warn!(key, "ignoring non-integer config value");
        return None;
    };
    match T::try_from(raw) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, raw, "ignoring out-of-range config value");
            None
        }
    }
}

fn read_string(table: &dyn TableLike, key: &str) -> Option<String> {
    let item = table.get(key)?;
    let Some(raw) = item.as_str() else {
        warn!(key, "ignoring non-string config value");
        return None;
    };
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn read_document_string(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(anyhow::Error::new(err).context(format!("read {}", path.display()))),
    }
}

fn write_atomically(path: &Path, contents: &str) -> anyhow::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(parent).context("create temp file")?;
    tmp.write_all(contents.as_bytes())
        .context("write temp file")?;
    tmp.flush().context("flush temp file")?;
    tmp.persist(path).map_err(|err| {
        anyhow::Error::new(err.error).context(format!("persist {}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store_with(contents: Option<&str>) -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        if let Some(contents) = contents {
            std::fs::write(&path, contents).expect("write config");
        }
        (dir, ConfigStore::new(path))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let (_dir, store) = store_with(None);
        assert_eq!(store.load().expect("load"), TickerSettings::default());
    }

    #[test]
    fn reads_ticker_table() {
        let (_dir, store) = store_with(Some(
            r##"
[ticker]
step = -2
fade_levels = 3
timeout_secs = 60
attachment_command = "firefox --new-tab"
foreground = "#00FF00"
"##,
        ));

        assert_eq!(
            store.load().expect("load"),
            TickerSettings {
                step: Some(-2),
                fade_levels: Some(3),
                timeout_secs: Some(60),
                attachment_command: Some("firefox --new-tab".to_string()),
                foreground: Some("#00FF00".to_string()),
                ..TickerSettings::default()
            }
        );
    }

    #[test]
    fn invalid_values_and_documents_fall_back_to_defaults() {
        let (_dir, store) = store_with(Some("[ticker]\nfade_levels = 900\nstep = \"fast\"\n"));
        assert_eq!(store.load().expect("load"), TickerSettings::default());

        let (_dir, store) = store_with(Some("[ticker\nstep = 3\n"));
        assert_eq!(store.load().expect("load"), TickerSettings::default());
    }

    #[test]
    fn set_step_preserves_comments_and_other_tables() {
        let (_dir, store) = store_with(Some(
            r#"# top comment

[ticker] # keep me
# inner comment
step = 1
fade_levels = 4

[other]
key = 1
"#,
        ));

        store.set_step(-3).expect("set step");

        let updated = std::fs::read_to_string(store.path()).expect("read updated");
        assert!(updated.contains("# top comment"));
        assert!(updated.contains("# inner comment"));
        assert!(updated.contains("[other]"));
        assert!(updated.contains("step = -3"));
        let settings = store.load().expect("load");
        assert_eq!(settings.step, Some(-3));
        assert_eq!(settings.fade_levels, Some(4));
    }

    #[test]
    fn set_step_creates_missing_file_and_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("nested").join("config.toml"));

        store.set_step(4).expect("set step");

        assert_eq!(store.load().expect("load").step, Some(4));
    }

    #[test]
    fn set_step_refuses_to_clobber_invalid_toml() {
        let (_dir, store) = store_with(Some("[ticker\nstep = 3\n"));
        assert!(store.set_step(2).is_err());
        let contents = std::fs::read_to_string(store.path()).expect("read");
        assert_eq!(contents, "[ticker\nstep = 3\n");
    }

    #[test]
    fn flags_override_file_values_in_ticker_config() {
        let file = TickerSettings {
            step: Some(2),
            tick_ms: Some(40),
            min_gap_width: Some(0),
            ..TickerSettings::default()
        };
        let flags = TickerSettings {
            step: Some(5),
            ..TickerSettings::default()
        };

        let config = file.overridden_by(flags).ticker_config();

        assert_eq!(config.step, 5);
        assert_eq!(config.tick_interval, Duration::from_millis(40));
        assert_eq!(config.min_gap_width, 1);
        assert_eq!(config.max_fade_levels, TickerConfig::default().max_fade_levels);
    }

    #[test]
    fn default_config_path_uses_tickertape_home_dir() {
        let home = Path::new("home");
        assert_eq!(
            default_config_path(home),
            home.join(".tickertape").join("config.toml")
        );
    }
}
