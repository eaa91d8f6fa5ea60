//! UniSender adapter for the `MailingList` port.

mod client;
mod mock_mailing_list;

pub use client::UniSenderClient;
pub use mock_mailing_list::{ListCall, ListOperation, MockMailingList};
