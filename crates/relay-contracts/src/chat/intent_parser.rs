use super::command_registry::{CommandAction, COMMANDS};
use crate::bracket::MAX_PARTICIPANTS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Noop,
    Help,
    Chat { prompt: String },
    Bracket { participants: i64 },
    InvalidBracket { reason: String },
}

fn find_action(command: &str) -> Option<CommandAction> {
    COMMANDS
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg.split_whitespace().map(str::to_string).collect(),
    }
}

fn parse_participants(arg: &str) -> Intent {
    let parts = parse_args(arg);
    let [value] = parts.as_slice() else {
        return Intent::InvalidBracket {
            reason: "Usage: /bracket <number of players>".to_string(),
        };
    };
    match value.parse::<i64>() {
        Ok(count) if count < 1 => Intent::InvalidBracket {
            reason: format!("The number of players must be positive, got {count}."),
        },
        Ok(count) if count > MAX_PARTICIPANTS => Intent::InvalidBracket {
            reason: format!("At most {MAX_PARTICIPANTS} players are supported, got {count}."),
        },
        Ok(count) => Intent::Bracket {
            participants: count,
        },
        Err(_) => Intent::InvalidBracket {
            reason: format!("'{value}' is not a number of players."),
        },
    }
}

pub fn parse_intent(text: &str) -> Intent {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Intent::Noop;
    }

    if let Some(slash_tail) = trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        let command = slash_tail[..command_len].to_ascii_lowercase();
        let arg = slash_tail[command_len..].trim();
        match find_action(&command) {
            Some(CommandAction::Help) => return Intent::Help,
            Some(CommandAction::Bracket) => return parse_participants(arg),
            None => {}
        }
    }

    Intent::Chat {
        prompt: trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_intent, Intent};

    #[test]
    fn empty_text_is_noop() {
        assert_eq!(parse_intent(""), Intent::Noop);
        assert_eq!(parse_intent("  \n\t"), Intent::Noop);
    }

    #[test]
    fn plain_text_goes_to_chat() {
        assert_eq!(
            parse_intent("  今天天氣如何？ "),
            Intent::Chat {
                prompt: "今天天氣如何？".to_string()
            }
        );
    }

    #[test]
    fn unknown_commands_are_chat_prompts() {
        assert_eq!(
            parse_intent("/weather taipei"),
            Intent::Chat {
                prompt: "/weather taipei".to_string()
            }
        );
    }

    #[test]
    fn help_command() {
        assert_eq!(parse_intent("/help"), Intent::Help);
        assert_eq!(parse_intent("/HELP please"), Intent::Help);
    }

    #[test]
    fn bracket_command_parses_count() {
        assert_eq!(
            parse_intent("/bracket 8"),
            Intent::Bracket { participants: 8 }
        );
        assert_eq!(
            parse_intent("/tournament \"16\""),
            Intent::Bracket { participants: 16 }
        );
    }

    #[test]
    fn bracket_command_rejects_bad_counts() {
        for text in [
            "/bracket",
            "/bracket eight",
            "/bracket 0",
            "/bracket -4",
            "/bracket 4 5",
            "/bracket 100000",
        ] {
            assert!(
                matches!(parse_intent(text), Intent::InvalidBracket { .. }),
                "{text}"
            );
        }
    }
}
