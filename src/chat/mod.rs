//! Chat front-end
//!
//! Turns inbound chat messages into ledger operations and replies:
//! - classifier: what a message is (command, wallet, bug report, chatter)
//! - dispatcher: what to do about it, as transport-free instructions
//! - bot: the receive/deliver loop over a `ChatClient`

pub mod bot;
pub mod classifier;
pub mod commands;
pub mod console;
pub mod dispatcher;
pub mod mock;
pub mod replies;
pub mod traits;

pub use bot::ClaimBot;
pub use classifier::{classify, Intent, Topic};
pub use commands::{parse_command, Command};
pub use console::ConsoleClient;
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use mock::MockChatClient;
pub use traits::{
    ChatClient, ChatError, ChatId, ChatResult, InboundEvent, Outbound, Sender, Target, TextFormat,
};
