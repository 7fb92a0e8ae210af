//! Parser for bot commands in comment text.
//!
//! Pure: extracts the first structured command from unstructured comment text.

use super::types::Command;

/// Parses the first bot command found in comment text.
///
/// # Arguments
///
/// * `text` - The comment text to parse
/// * `bot_name` - The bot name without the `@` prefix (e.g., `"spackbot"`)
///
/// # Parsing Rules
///
/// - The trigger `@{bot_name}` is case-insensitive (like GitHub mentions)
/// - The trigger must be at a word boundary (not preceded by alphanumeric chars)
/// - Command words are case-insensitive
/// - Whitespace between tokens is flexible (spaces, tabs)
/// - If multiple commands are present, the first valid one wins
/// - Returns `None` if no valid command is found
///
/// # Examples
///
/// ```
/// use spackbot::commands::{Command, parse_command};
///
/// assert_eq!(parse_command("@spackbot hello", "spackbot"), Some(Command::Hello));
/// assert_eq!(parse_command("@SpackBot Fix  Style", "spackbot"), Some(Command::FixStyle));
/// assert_eq!(parse_command("no command here", "spackbot"), None);
/// // Not a valid mention (preceded by alphanumeric):
/// assert_eq!(parse_command("foo@spackbot hello", "spackbot"), None);
/// ```
pub fn parse_command(text: &str, bot_name: &str) -> Option<Command> {
    let trigger = format!("@{}", bot_name);
    let mut search_start = 0;
    while let Some(abs_pos) = find_trigger(text, search_start, &trigger) {
        let after_trigger = &text[abs_pos + trigger.len()..];

        if let Some(cmd) = try_parse_after_trigger(after_trigger) {
            return Some(cmd);
        }

        search_start = abs_pos + trigger.len();
    }
    None
}

/// Finds the next occurrence of the trigger (case-insensitive) at a valid word boundary.
/// Returns the byte position of the `@` character if found.
fn find_trigger(text: &str, start: usize, trigger: &str) -> Option<usize> {
    let mut search_pos = start;

    while search_pos < text.len() {
        let at_pos = text[search_pos..].find('@')?;
        let abs_pos = search_pos + at_pos;

        // `get` returns None if the end lands inside a multi-byte character.
        if let Some(candidate) = text.get(abs_pos..abs_pos + trigger.len()) {
            if candidate.eq_ignore_ascii_case(trigger) {
                let preceded_by_word = text[..abs_pos]
                    .chars()
                    .next_back()
                    .is_some_and(char::is_alphanumeric);
                if !preceded_by_word {
                    return Some(abs_pos);
                }
            }
        }

        search_pos = abs_pos + 1;
    }
    None
}

/// Attempts to parse a command from text immediately following the trigger.
fn try_parse_after_trigger(text: &str) -> Option<Command> {
    // At least one whitespace character must separate trigger and command
    let text = text.strip_prefix(|c: char| c.is_ascii_whitespace())?;

    let (first, rest) = split_first_word(text.trim_start());
    let (second, _) = split_first_word(rest.trim_start());

    match first.to_ascii_lowercase().as_str() {
        "hello" | "hi" => Some(Command::Hello),
        "help" | "commands" => Some(Command::Help),
        "fix" if second.eq_ignore_ascii_case("style") => Some(Command::FixStyle),
        "run" if second.eq_ignore_ascii_case("pipeline") => Some(Command::RunPipeline),
        "rebuild" if second.eq_ignore_ascii_case("everything") => {
            Some(Command::RebuildEverything)
        }
        _ => None,
    }
}

/// Splits text at the first whitespace, returning (word, rest).
/// If no whitespace, returns (text, "").
fn split_first_word(text: &str) -> (&str, &str) {
    match text.find(|c: char| c.is_ascii_whitespace()) {
        Some(pos) => (&text[..pos], &text[pos..]),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BOT: &str = "spackbot";

    fn arb_command() -> impl Strategy<Value = Command> {
        prop::sample::select(Command::ALL.to_vec())
    }

    // ==================== Valid command parsing ====================

    #[test]
    fn every_command_parses() {
        for cmd in Command::ALL {
            let text = format!("@spackbot {}", cmd.words());
            assert_eq!(parse_command(&text, BOT), Some(cmd), "{text}");
        }
    }

    #[test]
    fn aliases_parse() {
        assert_eq!(parse_command("@spackbot hi", BOT), Some(Command::Hello));
        assert_eq!(parse_command("@spackbot commands", BOT), Some(Command::Help));
    }

    #[test]
    fn trailing_punctuation_on_single_word_commands_is_rejected() {
        assert_eq!(parse_command("@spackbot hello!", BOT), None);
    }

    // ==================== Robustness: never panic ====================

    proptest! {
        #[test]
        fn arbitrary_text_never_panics(text: String) {
            let _ = parse_command(&text, BOT);
        }

        #[test]
        fn arbitrary_suffix_after_trigger_never_panics(suffix: String) {
            let text = format!("@spackbot{}", suffix);
            let _ = parse_command(&text, BOT);
        }
    }

    // ==================== Whitespace and case ====================

    proptest! {
        #[test]
        fn whitespace_between_tokens(
            ws1 in "[ \t]{1,5}",
            ws2 in "[ \t]{1,5}",
        ) {
            let text = format!("@spackbot{}rebuild{}everything", ws1, ws2);
            prop_assert_eq!(parse_command(&text, BOT), Some(Command::RebuildEverything));
        }

        #[test]
        fn command_words_are_case_insensitive(cmd in arb_command(), upper in any::<bool>()) {
            let words = if upper {
                cmd.words().to_ascii_uppercase()
            } else {
                cmd.words().to_string()
            };
            let text = format!("@SPACKBOT {}", words);
            prop_assert_eq!(parse_command(&text, BOT), Some(cmd));
        }

        /// The prefix must end with a non-alphanumeric char for the @ to be at a word boundary.
        #[test]
        fn command_embedded_in_text(
            prefix in "[a-zA-Z]{0,10}[ !:.,;?\n]{1,2}",
            cmd in arb_command(),
        ) {
            let text = format!("{}@spackbot {} please", prefix, cmd.words());
            prop_assert_eq!(parse_command(&text, BOT), Some(cmd));
        }

        #[test]
        fn trigger_after_alphanumeric_is_ignored(
            prefix in "[a-zA-Z0-9]{1,10}",
            cmd in arb_command(),
        ) {
            let text = format!("{}@spackbot {}", prefix, cmd.words());
            prop_assert_eq!(parse_command(&text, BOT), None);
        }
    }

    // ==================== Multiple commands: first wins ====================

    #[test]
    fn first_command_wins() {
        assert_eq!(
            parse_command("@spackbot run pipeline\n@spackbot hello", BOT),
            Some(Command::RunPipeline)
        );
        assert_eq!(
            parse_command("@spackbot unknown then @spackbot fix style", BOT),
            Some(Command::FixStyle)
        );
    }

    // ==================== Edge cases ====================

    #[test]
    fn edge_cases() {
        // Two-word commands need both words
        assert_eq!(parse_command("@spackbot fix", BOT), None);
        assert_eq!(parse_command("@spackbot run tests", BOT), None);
        assert_eq!(parse_command("@spackbot rebuild", BOT), None);

        // Empty after trigger
        assert_eq!(parse_command("@spackbot", BOT), None);
        assert_eq!(parse_command("@spackbot   ", BOT), None);

        // Trigger without whitespace before command
        assert_eq!(parse_command("@spackbothello", BOT), None);

        // Similar but not exact trigger
        assert_eq!(parse_command("@spackbots hello", BOT), None);

        // Multi-byte text around the trigger
        assert_eq!(parse_command("héllo @spackbot hello", BOT), Some(Command::Hello));
        assert_eq!(parse_command("@spackbö", BOT), None);
    }

    #[test]
    fn other_bot_names() {
        assert_eq!(parse_command("@my-bot help", "my-bot"), Some(Command::Help));
        assert_eq!(parse_command("@spackbot help", "my-bot"), None);
    }
}
