mod bus_event;
mod message_id;
mod notification;

pub use bus_event::BusEvent;
pub use bus_event::PLAIN_TEXT_GROUP;
pub use bus_event::ParseError;
pub use message_id::MessageId;
pub use notification::Notification;
