mod message;
mod submission;
mod transport;
mod workflow;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use message::*;
pub use submission::*;
pub use transport::{DeliveryError, DeliveryStage, MailSession, MailTransport};
pub use workflow::*;
