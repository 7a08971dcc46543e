//! Error types for registration, dispatch and execution.

use thiserror::Error;

use crate::message::MessageKey;
use crate::value::ArgType;

/// A subcommand declaration that violates an ordering or naming rule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// An optional positional is followed by a required argument.
    #[error("optional argument `{name}` cannot precede a required argument")]
    OptionalNotLast { name: String },

    /// An optional positional would take a token meant for a flags or named block.
    #[error("optional argument `{name}` cannot precede a flags or named block")]
    OptionalBeforeTail { name: String },

    #[error("argument name `{name}` is reserved")]
    ReservedName { name: String },

    #[error("argument `{name}` has an empty list separator")]
    EmptySeparator { name: String },

    #[error("no resolver registered for type {arg_type} of `{name}`")]
    UnknownArgumentType { name: String, arg_type: ArgType },

    #[error("only one limitless argument is allowed")]
    MultipleLimitless,

    /// A limitless argument is followed by something other than one flags block.
    #[error("limitless argument `{name}` must be last, or followed only by flags")]
    LimitlessNotLast { name: String },

    #[error("flags argument requires a non-empty flag group")]
    EmptyFlagGroup,

    #[error("only one flags argument is allowed")]
    DuplicateFlags,

    #[error("flags argument must be the last argument")]
    FlagsNotLast,

    #[error("flag declares neither a short nor a long key")]
    MissingFlagKey,

    #[error("invalid flag key `{key}`")]
    InvalidFlagKey { key: String },

    #[error("flag key `{key}` is declared twice")]
    DuplicateFlagKey { key: String },

    #[error("named argument group must not be empty")]
    EmptyNamedGroup,

    #[error("named arguments must be the last argument")]
    NamedNotLast,

    #[error("named arguments cannot be combined with limitless or flags arguments")]
    NamedWithTail,

    #[error("command `{command}` already has a default subcommand")]
    DuplicateDefault { command: String },

    #[error("unknown sender kind `{kind}`")]
    UnknownSenderKind { kind: String },

    #[error("command and subcommand names must not be empty")]
    EmptyName,
}

/// A subcommand that was left out of a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubCommandRejection {
    pub subcommand: String,
    pub error: RegistrationError,
}

/// Why a dispatch stopped before the handler ran.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DispatchFailure {
    #[error("unknown command `{command}`")]
    UnknownCommand {
        command: String,
        subcommand: Option<String>,
    },

    #[error("this command requires a sender of kind `{required}`")]
    WrongSenderType { required: String },

    #[error("requirement `{requirement}` denied")]
    RequirementDenied {
        requirement: String,
        message: Option<MessageKey>,
    },

    #[error("not enough arguments: missing `{argument}`")]
    NotEnoughArguments { argument: String },

    #[error("too many arguments: unexpected `{}`", unexpected.join(" "))]
    TooManyArguments { unexpected: Vec<String> },

    #[error("invalid value `{raw}` for `{name}` of type {arg_type}")]
    InvalidArgument {
        raw: String,
        name: String,
        arg_type: ArgType,
    },

    #[error("flag `{key}` requires a value of type {arg_type}")]
    MissingRequiredFlagArgument { key: String, arg_type: ArgType },

    #[error("invalid value `{raw}` for flag `{key}` of type {arg_type}")]
    InvalidFlagArgument {
        key: String,
        raw: String,
        arg_type: ArgType,
    },

    #[error("missing required flags: {}", keys.join(", "))]
    MissingRequiredFlags { keys: Vec<String> },
}

impl DispatchFailure {
    /// The message key the sink receives for this failure.
    pub fn message_key(&self) -> MessageKey {
        match self {
            DispatchFailure::UnknownCommand { .. } => MessageKey::UNKNOWN_COMMAND,
            DispatchFailure::WrongSenderType { .. } => MessageKey::WRONG_SENDER,
            DispatchFailure::RequirementDenied { message, .. } => message
                .clone()
                .unwrap_or(MessageKey::REQUIREMENT_DENIED),
            DispatchFailure::NotEnoughArguments { .. } => MessageKey::NOT_ENOUGH_ARGUMENTS,
            DispatchFailure::TooManyArguments { .. } => MessageKey::TOO_MANY_ARGUMENTS,
            DispatchFailure::InvalidArgument { .. } => MessageKey::INVALID_ARGUMENT,
            DispatchFailure::MissingRequiredFlagArgument { .. } => {
                MessageKey::MISSING_REQUIRED_FLAG_ARGUMENT
            }
            DispatchFailure::InvalidFlagArgument { .. } => MessageKey::INVALID_FLAG_ARGUMENT,
            DispatchFailure::MissingRequiredFlags { .. } => MessageKey::MISSING_REQUIRED_FLAG,
        }
    }
}

/// A handler returned an error or panicked.
#[derive(Debug, Error)]
#[error("command `{command} {subcommand}` failed: {cause:#}")]
pub struct ExecutionFailure {
    pub command: String,
    pub subcommand: String,
    #[source]
    pub cause: anyhow::Error,
}

/// Invalid dispatcher configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("escape marker `{0}` collides with flag or named-argument syntax")]
    InvalidEscapeMarker(char),
}
