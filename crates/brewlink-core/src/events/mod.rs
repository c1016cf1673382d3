//! Domain events pushed by the server over the push channel.

pub mod presence;
pub mod receipt;

pub use presence::PresentUser;
pub use receipt::{ReceiptOutcome, ReceiptStatusEvent};
