//! Splitting typed lines into tokens and completing them.

use crate::demo::{DemoDispatcher, TerminalSender};

/// Splits a line with shell quoting rules, falling back to whitespace on
/// unbalanced quotes.
///
/// When `completing` is set and the line ends in whitespace, an empty token
/// is appended: the user is starting a new argument.
pub fn split_line(line: &str, completing: bool) -> Vec<String> {
    let trimmed = line.trim();
    let mut tokens = match shlex::split(trimmed) {
        Some(parts) => parts,
        None => trimmed.split_whitespace().map(String::from).collect(),
    };
    if completing && (tokens.is_empty() || line.ends_with(char::is_whitespace)) {
        tokens.push(String::new());
    }
    tokens
}

/// Completions for the last token of `tokens`, at most `limit` of them.
pub fn complete(
    dispatcher: &DemoDispatcher,
    sender: &TerminalSender,
    tokens: &[String],
    limit: usize,
) -> Vec<String> {
    let mut suggestions = match tokens {
        [] => dispatcher.complete_command(""),
        [partial] => dispatcher.complete_command(partial),
        [command, args @ ..] => dispatcher.complete(sender, command, args),
    };
    suggestions.truncate(limit);
    suggestions
}
