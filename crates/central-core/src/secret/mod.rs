//! Secret messaging - anonymous relay between two registered chat users.
//!
//! - `protocol`: register / initiate / relay / block / report
//! - `bot`: chat commands and callbacks on top of the protocol
//! - `texts`: everything the bot says

pub mod bot;
pub mod protocol;
pub mod texts;

pub use self::bot::{BotCommands, BotUpdate, IncomingCallback, IncomingMessage};
pub use self::protocol::{
    RelayOutcome, RelayRequest, ReportAck, SecretMessaging, SecretMessagingPorts,
    SecretMessagingSettings,
};
