use derive_more::IsVariant;

/// Summary information produced when a ticker session exits.
#[derive(Debug, Clone)]
pub struct AppExitInfo {
    /// Why the session ended.
    pub exit_reason: ExitReason,
    /// Scroll step in effect when the session ended, so the caller can persist it.
    pub step: i32,
}

/// Reason why the ticker session terminated.
#[derive(Debug, Clone, PartialEq, Eq, IsVariant)]
pub enum ExitReason {
    /// The user asked to quit.
    UserRequested,
    /// The notification bus went away and the session was configured to follow it.
    BusClosed,
    /// A fatal error occurred and the session cannot continue.
    Fatal(String),
}
