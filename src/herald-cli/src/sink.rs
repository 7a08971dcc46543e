//! Human-readable rendering of dispatcher messages.

use herald_core::{MessageContext, MessageKey, MessageSink};

use crate::demo::ConsoleUser;

/// Prints every message to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Renders a message key and its context into one or two lines.
    pub fn render(key: &MessageKey, context: &MessageContext<'_>) -> String {
        let command = match context.subcommand {
            Some(sub) if sub != herald_core::spec::DEFAULT_SUBCOMMAND => {
                format!("{} {sub}", context.command)
            }
            _ => context.command.to_string(),
        };
        let detail = context.describe().unwrap_or_default();

        let headline = match key.as_str() {
            "unknown.command" => format!("Unknown command `{command}`. Type `help` for a list."),
            "wrong.sender" => format!("`{command}` cannot be run from here: {detail}."),
            "requirement.denied" | "no.permission" => {
                format!("You are not allowed to run `{command}`.")
            }
            "execution.failed" => format!("`{command}` failed: {detail}"),
            _ => format!("{}.", capitalize(&detail)),
        };

        match context.usage {
            Some(usage) if !usage.is_empty() => {
                format!("{headline}\nUsage: {} {usage}", context.command)
            }
            Some(_) => format!("{headline}\nUsage: {}", context.command),
            None => headline,
        }
    }
}

impl MessageSink<ConsoleUser> for ConsoleSink {
    fn send(&self, key: &MessageKey, _sender: &ConsoleUser, context: &MessageContext<'_>) {
        eprintln!("{}", Self::render(key, context));
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
