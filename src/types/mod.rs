pub mod error;
pub mod message;

pub use error::{MessagingError, Result};
pub use message::{Channel, Message, MessagesResponse, ReadState, StoredMessage};
