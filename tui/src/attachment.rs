//! Opening message attachments with an external program.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::process::Stdio;

use tokio::process::Command;
use url::Url;

#[cfg(target_os = "macos")]
const DEFAULT_OPENER: &str = "open";
#[cfg(not(target_os = "macos"))]
const DEFAULT_OPENER: &str = "xdg-open";

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto", "file"];

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("attachment is not a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("refusing to open `{0}:` URLs")]
    UnsupportedScheme(String),
    #[error("attachment command is empty or malformed: {0:?}")]
    InvalidCommand(String),
    #[error("could not find `{program}`")]
    OpenerNotFound {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to launch attachment opener")]
    Launch(#[from] std::io::Error),
    #[error("attachment opener exited with {0}")]
    Exited(ExitStatus),
}

/// Program and leading arguments used to open attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opener {
    program: PathBuf,
    args: Vec<String>,
}

impl Opener {
    /// Resolves the configured command (shell-style words) or the platform default on `PATH`.
    pub fn resolve(configured: Option<&str>) -> Result<Self, AttachmentError> {
        let command = configured.unwrap_or(DEFAULT_OPENER);
        let mut words = shlex::split(command)
            .filter(|words| !words.is_empty())
            .ok_or_else(|| AttachmentError::InvalidCommand(command.to_string()))?
            .into_iter();
        let Some(program) = words.next() else {
            return Err(AttachmentError::InvalidCommand(command.to_string()));
        };
        let resolved =
            which::which(&program).map_err(|source| AttachmentError::OpenerNotFound {
                program: program.clone(),
                source,
            })?;
        Ok(Self {
            program: resolved,
            args: words.collect(),
        })
    }

    pub async fn open(&self, url: &Url) -> Result<(), AttachmentError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        if !status.success() {
            return Err(AttachmentError::Exited(status));
        }
        Ok(())
    }
}

/// Parses an attachment as a URL with a scheme we are willing to hand to an opener.
pub fn validate_attachment(raw: &str) -> Result<Url, AttachmentError> {
    let url = Url::parse(raw.trim())?;
    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(AttachmentError::UnsupportedScheme(url.scheme().to_string()));
    }
    Ok(url)
}
