//! Message keys and the sink that turns them into user feedback.
//!
//! The core never formats text for users. Every failure is handed to a
//! [`MessageSink`] as a stable [`MessageKey`] plus a [`MessageContext`];
//! formatting and translation belong to the embedding application.

use std::borrow::Cow;
use std::fmt;

use tracing::{error, warn};

use crate::error::{DispatchFailure, ExecutionFailure};

/// Stable identifier of a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey(Cow<'static, str>);

impl MessageKey {
    pub const UNKNOWN_COMMAND: MessageKey = MessageKey::new("unknown.command");
    pub const WRONG_SENDER: MessageKey = MessageKey::new("wrong.sender");
    pub const REQUIREMENT_DENIED: MessageKey = MessageKey::new("requirement.denied");
    pub const NO_PERMISSION: MessageKey = MessageKey::new("no.permission");
    pub const NOT_ENOUGH_ARGUMENTS: MessageKey = MessageKey::new("not.enough.arguments");
    pub const TOO_MANY_ARGUMENTS: MessageKey = MessageKey::new("too.many.arguments");
    pub const INVALID_ARGUMENT: MessageKey = MessageKey::new("invalid.argument");
    pub const MISSING_REQUIRED_FLAG_ARGUMENT: MessageKey =
        MessageKey::new("missing.required.flag.argument");
    pub const INVALID_FLAG_ARGUMENT: MessageKey = MessageKey::new("invalid.flag.argument");
    pub const MISSING_REQUIRED_FLAG: MessageKey = MessageKey::new("missing.required.flag");
    pub const EXECUTION_FAILED: MessageKey = MessageKey::new("execution.failed");

    pub const fn new(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }

    pub fn custom(key: impl Into<String>) -> Self {
        Self(Cow::Owned(key.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What went wrong, for sinks that want more than the key.
#[derive(Debug)]
pub enum MessageDetail<'a> {
    None,
    Failure(&'a DispatchFailure),
    Execution(&'a ExecutionFailure),
}

/// Context accompanying a message.
#[derive(Debug)]
pub struct MessageContext<'a> {
    /// Command name as typed.
    pub command: &'a str,
    /// Selected subcommand, if selection got that far.
    pub subcommand: Option<&'a str>,
    /// Usage line of the selected subcommand.
    pub usage: Option<&'a str>,
    pub detail: MessageDetail<'a>,
}

impl<'a> MessageContext<'a> {
    pub fn new(command: &'a str) -> Self {
        Self {
            command,
            subcommand: None,
            usage: None,
            detail: MessageDetail::None,
        }
    }

    pub fn with_subcommand(mut self, subcommand: &'a str) -> Self {
        self.subcommand = Some(subcommand);
        self
    }

    pub fn with_usage(mut self, usage: &'a str) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_detail(mut self, detail: MessageDetail<'a>) -> Self {
        self.detail = detail;
        self
    }

    /// Human-readable description of the detail, if any.
    pub fn describe(&self) -> Option<String> {
        match self.detail {
            MessageDetail::None => None,
            MessageDetail::Failure(failure) => Some(failure.to_string()),
            MessageDetail::Execution(failure) => Some(failure.to_string()),
        }
    }
}

/// Receives every message the dispatcher emits.
pub trait MessageSink<S>: Send + Sync {
    fn send(&self, key: &MessageKey, sender: &S, context: &MessageContext<'_>);
}

impl<S, F> MessageSink<S> for F
where
    F: Fn(&MessageKey, &S, &MessageContext<'_>) + Send + Sync,
{
    fn send(&self, key: &MessageKey, sender: &S, context: &MessageContext<'_>) {
        self(key, sender, context)
    }
}

/// Default sink: logs every message through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl<S> MessageSink<S> for TracingSink {
    fn send(&self, key: &MessageKey, _sender: &S, context: &MessageContext<'_>) {
        let detail = context.describe().unwrap_or_default();
        match context.detail {
            MessageDetail::Execution(_) => error!(
                key = %key,
                command = context.command,
                subcommand = context.subcommand,
                "{detail}"
            ),
            _ => warn!(
                key = %key,
                command = context.command,
                subcommand = context.subcommand,
                "{detail}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<String>>);

    impl MessageSink<String> for RecordingSink {
        fn send(&self, key: &MessageKey, sender: &String, context: &MessageContext<'_>) {
            self.0
                .lock()
                .unwrap()
                .push(format!("{key} {sender} {}", context.command));
        }
    }

    #[test]
    fn test_sink_receives_key_and_context() {
        let sink = RecordingSink::default();
        let failure = DispatchFailure::UnknownCommand {
            command: "flibber".into(),
            subcommand: None,
        };
        let context = MessageContext::new("flibber").with_detail(MessageDetail::Failure(&failure));
        sink.send(&failure.message_key(), &"console".to_string(), &context);

        assert_eq!(
            sink.0.into_inner().unwrap(),
            vec!["unknown.command console flibber".to_string()]
        );
        assert_eq!(
            context.describe().as_deref(),
            Some("unknown command `flibber`")
        );
    }

    #[test]
    fn test_custom_key_equality() {
        assert_eq!(MessageKey::custom("no.permission"), MessageKey::NO_PERMISSION);
    }
}
