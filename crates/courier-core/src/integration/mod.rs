//! Integration layer: the traits a platform transport implements.

pub mod credentials;
pub mod sender;
pub mod source;

pub use credentials::{BotCredentials, DEFAULT_BOT};
pub use sender::{BoxedSender, Sender, downcast_sender};
pub use source::UpdateSource;
