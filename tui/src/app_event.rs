//! Events flowing into the ticker app from outside the terminal.

use tickertape_protocol::BusEvent;

/// Input from the notification bus.
#[derive(Debug)]
pub enum BusUpdate {
    Event(BusEvent),
    /// The bus stopped producing events. `detail` carries diagnostics such as captured stderr.
    Closed { detail: Option<String> },
}

/// Results of background work started by the app itself.
#[derive(Debug)]
pub(crate) enum AppEvent {
    AttachmentOpened {
        attachment: String,
        result: Result<(), String>,
    },
}
