mod command_registry;
mod intent_parser;

pub use command_registry::CHAT_HELP_TEXT;
pub use intent_parser::{parse_intent, Intent};
