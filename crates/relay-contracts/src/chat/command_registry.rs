#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandAction {
    Bracket,
    Help,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: CommandAction,
}

pub(crate) const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "bracket",
        action: CommandAction::Bracket,
    },
    CommandSpec {
        command: "tournament",
        action: CommandAction::Bracket,
    },
    CommandSpec {
        command: "help",
        action: CommandAction::Help,
    },
];

pub const CHAT_HELP_TEXT: &str = "Send any message to chat.\n\
/bracket <players> draws a single-elimination bracket.\n\
/help shows this message.";
