//! Declarative command tree.
//!
//! A [`CommandSpec`] holds one or more [`SubCommandSpec`]s, each with an
//! ordered list of [`ArgumentSpec`]s and a handler. Specs are built once with
//! the `with_*` builders and never change after registration.

use std::fmt;
use std::sync::Arc;

use crate::flags::FlagGroup;
use crate::named::NamedGroup;
use crate::requirement::{CommandMeta, Requirement};
use crate::sender::SenderKind;
use crate::suggestion::SuggestionKey;
use crate::value::{ArgType, ArgValue, Arguments, FLAGS_ARGUMENT, NAMED_ARGUMENT};

/// Function invoked with the mapped sender and the converted arguments.
pub type Handler<S> = Arc<dyn Fn(&S, &Arguments) -> anyhow::Result<()> + Send + Sync>;

/// Name given to subcommands created with [`SubCommandSpec::default_for`].
pub const DEFAULT_SUBCOMMAND: &str = "default";

// ============================================================
// EXECUTION MODE
// ============================================================

/// Where a handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// On the dispatching thread, before `dispatch` returns.
    #[default]
    Sync,
    /// On a background worker; `dispatch` does not wait.
    Async,
}

// ============================================================
// ARGUMENT SPEC
// ============================================================

/// How a limitless argument turns its tokens into one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitlessKind {
    /// Tokens are joined with the delimiter, then resolved once.
    Joined(String),
    /// Each token is resolved; the result is a list.
    Sequence,
}

/// A positional, split or limitless parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub arg_type: ArgType,
    pub optional: bool,
    /// Bound in place of a missing token.
    pub default_value: Option<ArgValue>,
    pub description: Option<String>,
    pub suggestion: Option<SuggestionKey>,
}

impl Parameter {
    fn new(name: impl Into<String>, arg_type: ArgType) -> Self {
        Self {
            name: name.into(),
            arg_type,
            optional: false,
            default_value: None,
            description: None,
            suggestion: None,
        }
    }
}

/// One entry of a subcommand's parameter list.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentSpec {
    /// Takes exactly one token.
    Positional(Parameter),
    /// Takes one token and splits it on the separator into a list.
    Split(Parameter, String),
    /// Takes every remaining token.
    Limitless(Parameter, LimitlessKind),
    /// Trailing flags block.
    Flags(FlagGroup),
    /// Trailing `name:value` block.
    Named(NamedGroup),
}

impl ArgumentSpec {
    /// Argument taking exactly one token of `arg_type`.
    pub fn positional(name: impl Into<String>, arg_type: ArgType) -> Self {
        ArgumentSpec::Positional(Parameter::new(name, arg_type))
    }

    /// Single token such as `Steve,Alex`, resolved part by part into a list.
    pub fn split(name: impl Into<String>, arg_type: ArgType, separator: impl Into<String>) -> Self {
        ArgumentSpec::Split(Parameter::new(name, arg_type), separator.into())
    }

    /// Limitless argument producing a list of `arg_type` values.
    pub fn limitless(name: impl Into<String>, arg_type: ArgType) -> Self {
        ArgumentSpec::Limitless(Parameter::new(name, arg_type), LimitlessKind::Sequence)
    }

    /// Limitless argument producing one space-joined string.
    pub fn joined(name: impl Into<String>) -> Self {
        Self::joined_with(name, " ")
    }

    /// Limitless argument producing one string joined with `delimiter`.
    pub fn joined_with(name: impl Into<String>, delimiter: impl Into<String>) -> Self {
        ArgumentSpec::Limitless(
            Parameter::new(name, ArgType::STRING),
            LimitlessKind::Joined(delimiter.into()),
        )
    }

    pub fn flags(group: FlagGroup) -> Self {
        ArgumentSpec::Flags(group)
    }

    pub fn named(group: NamedGroup) -> Self {
        ArgumentSpec::Named(group)
    }

    /// Marks a positional, split or limitless argument optional.
    pub fn optional(mut self) -> Self {
        if let Some(parameter) = self.parameter_mut() {
            parameter.optional = true;
        }
        self
    }

    /// Makes the argument optional, binding `value` when it is missing.
    ///
    /// The value is bound as given; it is not run through a resolver.
    pub fn with_default(mut self, value: impl Into<ArgValue>) -> Self {
        if let Some(parameter) = self.parameter_mut() {
            parameter.optional = true;
            parameter.default_value = Some(value.into());
        }
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        if let Some(parameter) = self.parameter_mut() {
            parameter.description = Some(description.into());
        }
        self
    }

    /// Uses a registered dynamic resolver for suggestions.
    pub fn with_suggestion(mut self, key: SuggestionKey) -> Self {
        if let Some(parameter) = self.parameter_mut() {
            parameter.suggestion = Some(key);
        }
        self
    }

    /// Name the converted value is bound under.
    pub fn name(&self) -> &str {
        match self {
            ArgumentSpec::Positional(p) | ArgumentSpec::Split(p, _) | ArgumentSpec::Limitless(p, _) => {
                &p.name
            }
            ArgumentSpec::Flags(_) => FLAGS_ARGUMENT,
            ArgumentSpec::Named(_) => NAMED_ARGUMENT,
        }
    }

    /// Flags and named blocks are always optional.
    pub fn is_optional(&self) -> bool {
        match self.parameter() {
            Some(p) => p.optional,
            None => true,
        }
    }

    pub fn parameter(&self) -> Option<&Parameter> {
        match self {
            ArgumentSpec::Positional(p) | ArgumentSpec::Split(p, _) | ArgumentSpec::Limitless(p, _) => {
                Some(p)
            }
            ArgumentSpec::Flags(_) | ArgumentSpec::Named(_) => None,
        }
    }

    fn parameter_mut(&mut self) -> Option<&mut Parameter> {
        match self {
            ArgumentSpec::Positional(p) | ArgumentSpec::Split(p, _) | ArgumentSpec::Limitless(p, _) => {
                Some(p)
            }
            ArgumentSpec::Flags(_) | ArgumentSpec::Named(_) => None,
        }
    }

    /// Takes exactly one token.
    pub fn is_single(&self) -> bool {
        matches!(self, ArgumentSpec::Positional(_) | ArgumentSpec::Split(..))
    }

    /// Consumes every remaining token.
    pub fn is_tail(&self) -> bool {
        !self.is_single()
    }

    fn usage(&self) -> String {
        match self {
            ArgumentSpec::Positional(p) if p.optional => format!("[{}]", p.name),
            ArgumentSpec::Positional(p) => format!("<{}>", p.name),
            ArgumentSpec::Split(p, sep) if p.optional => format!("[{}{sep}...]", p.name),
            ArgumentSpec::Split(p, sep) => format!("<{}{sep}...>", p.name),
            ArgumentSpec::Limitless(p, _) if p.optional => format!("[{}...]", p.name),
            ArgumentSpec::Limitless(p, _) => format!("<{}...>", p.name),
            ArgumentSpec::Flags(_) => "[flags]".to_string(),
            ArgumentSpec::Named(_) => "[key:value...]".to_string(),
        }
    }
}

// ============================================================
// SUBCOMMAND SPEC
// ============================================================

/// A named, independently invocable unit inside a command.
pub struct SubCommandSpec<S> {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) priority: i32,
    pub(crate) is_default: bool,
    pub(crate) arguments: Vec<ArgumentSpec>,
    pub(crate) requirements: Vec<Requirement<S>>,
    pub(crate) sender: Option<SenderKind>,
    pub(crate) handler: Handler<S>,
    pub(crate) execution: ExecutionMode,
    pub(crate) description: Option<String>,
    pub(crate) meta: CommandMeta,
}

impl<S> SubCommandSpec<S> {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&S, &Arguments) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            priority: 0,
            is_default: false,
            arguments: Vec::new(),
            requirements: Vec::new(),
            sender: None,
            handler: Arc::new(handler),
            execution: ExecutionMode::Sync,
            description: None,
            meta: CommandMeta::default(),
        }
    }

    /// Creates the fallback subcommand, selected when no name matches.
    pub fn default_for<F>(handler: F) -> Self
    where
        F: Fn(&S, &Arguments) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(DEFAULT_SUBCOMMAND, handler).as_default()
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Higher priority wins when several subcommands match a name.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn with_argument(mut self, argument: ArgumentSpec) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement<S>) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Restricts the subcommand to senders of `kind`.
    pub fn with_sender(mut self, kind: SenderKind) -> Self {
        self.sender = Some(kind);
        self
    }

    /// Runs the handler on a background worker.
    pub fn asynchronous(mut self) -> Self {
        self.execution = ExecutionMode::Async;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.set(key, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn arguments(&self) -> &[ArgumentSpec] {
        &self.arguments
    }

    pub fn argument_at(&self, index: usize) -> Option<&ArgumentSpec> {
        self.arguments.get(index)
    }

    pub fn requirements(&self) -> &[Requirement<S>] {
        &self.requirements
    }

    pub fn sender(&self) -> Option<&SenderKind> {
        self.sender.as_ref()
    }

    pub fn execution(&self) -> ExecutionMode {
        self.execution
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    /// Case-insensitive match on the name or an alias.
    pub fn matches_name(&self, token: &str) -> bool {
        self.name.eq_ignore_ascii_case(token)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(token))
    }

    /// Usage line, e.g. `set <key> [value]` or `<name> [flags]` for a default.
    pub fn usage(&self) -> String {
        let mut parts = Vec::with_capacity(self.arguments.len() + 1);
        if !self.is_default {
            parts.push(self.name.clone());
        }
        parts.extend(self.arguments.iter().map(ArgumentSpec::usage));
        parts.join(" ")
    }

    pub(crate) fn handler(&self) -> Handler<S> {
        Arc::clone(&self.handler)
    }
}

impl<S> Clone for SubCommandSpec<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            aliases: self.aliases.clone(),
            priority: self.priority,
            is_default: self.is_default,
            arguments: self.arguments.clone(),
            requirements: self.requirements.clone(),
            sender: self.sender.clone(),
            handler: Arc::clone(&self.handler),
            execution: self.execution,
            description: self.description.clone(),
            meta: self.meta.clone(),
        }
    }
}

impl<S> fmt::Debug for SubCommandSpec<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubCommandSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("priority", &self.priority)
            .field("is_default", &self.is_default)
            .field("arguments", &self.arguments)
            .field("requirements", &self.requirements)
            .field("sender", &self.sender)
            .field("execution", &self.execution)
            .finish_non_exhaustive()
    }
}

// ============================================================
// COMMAND SPEC
// ============================================================

/// A root command: a name, aliases, and its subcommands.
pub struct CommandSpec<S> {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) description: Option<String>,
    pub(crate) subcommands: Vec<SubCommandSpec<S>>,
}

impl<S> CommandSpec<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            subcommands: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_subcommand(mut self, subcommand: SubCommandSpec<S>) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn subcommands(&self) -> &[SubCommandSpec<S>] {
        &self.subcommands
    }

    pub fn default_subcommand(&self) -> Option<&SubCommandSpec<S>> {
        self.subcommands.iter().find(|s| s.is_default)
    }

    /// Finds a non-default subcommand by name or alias.
    ///
    /// Among several matches the highest priority wins, then the earliest
    /// registered.
    pub fn subcommand(&self, token: &str) -> Option<&SubCommandSpec<S>> {
        self.subcommands
            .iter()
            .filter(|s| !s.is_default && s.matches_name(token))
            .fold(None, |best: Option<&SubCommandSpec<S>>, candidate| match best {
                Some(b) if b.priority >= candidate.priority => Some(b),
                _ => Some(candidate),
            })
    }

    /// Selects the subcommand for `args`.
    ///
    /// Returns the subcommand and whether the first token named it.
    pub fn resolve_subcommand(&self, args: &[String]) -> Option<(&SubCommandSpec<S>, bool)> {
        if let Some(named) = args.first().and_then(|first| self.subcommand(first)) {
            return Some((named, true));
        }
        self.default_subcommand().map(|d| (d, false))
    }

    /// Non-default subcommand names and aliases, in registration order.
    pub fn subcommand_names(&self) -> Vec<&str> {
        self.subcommands
            .iter()
            .filter(|s| !s.is_default)
            .flat_map(|s| std::iter::once(s.name.as_str()).chain(s.aliases.iter().map(String::as_str)))
            .collect()
    }

    pub fn matches_name(&self, token: &str) -> bool {
        self.name.eq_ignore_ascii_case(token)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(token))
    }
}

impl<S> Clone for CommandSpec<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            aliases: self.aliases.clone(),
            description: self.description.clone(),
            subcommands: self.subcommands.clone(),
        }
    }
}

impl<S> fmt::Debug for CommandSpec<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("subcommands", &self.subcommands)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FlagSpec;

    fn noop(_: &(), _: &Arguments) -> anyhow::Result<()> {
        Ok(())
    }

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_usage() {
        let sub = SubCommandSpec::new("set", noop)
            .with_argument(ArgumentSpec::positional("key", ArgType::STRING))
            .with_argument(ArgumentSpec::joined("value").optional())
            .with_argument(ArgumentSpec::flags(
                FlagGroup::new().with_flag(FlagSpec::long("force")),
            ));
        assert_eq!(sub.usage(), "set <key> [value...] [flags]");

        let default = SubCommandSpec::default_for(noop)
            .with_argument(ArgumentSpec::positional("name", ArgType::STRING));
        assert_eq!(default.usage(), "<name>");

        let kick = SubCommandSpec::new("kick", noop)
            .with_argument(ArgumentSpec::split("players", ArgType::STRING, ","))
            .with_argument(ArgumentSpec::joined_with("reason", "_").with_default("no reason"));
        assert_eq!(kick.usage(), "kick <players,...> [reason...]");
    }

    #[test]
    fn test_default_makes_optional() {
        let argument = ArgumentSpec::positional("amount", ArgType::INT).with_default(1_i64);
        assert!(argument.is_optional());
        assert_eq!(
            argument.parameter().and_then(|p| p.default_value.clone()),
            Some(ArgValue::Int(1))
        );

        let flags = ArgumentSpec::flags(FlagGroup::new()).with_default(1_i64);
        assert!(flags.parameter().is_none());
    }

    #[test]
    fn test_resolve_by_name_and_alias() {
        let command = CommandSpec::new("config")
            .with_subcommand(SubCommandSpec::new("set", noop).with_alias("put"))
            .with_subcommand(SubCommandSpec::new("get", noop));

        let (sub, consumed) = command.resolve_subcommand(&tokens(&["PUT", "x"])).unwrap();
        assert_eq!(sub.name(), "set");
        assert!(consumed);
        assert!(command.resolve_subcommand(&tokens(&["unset"])).is_none());
        assert!(command.resolve_subcommand(&[]).is_none());
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let command = CommandSpec::new("give")
            .with_subcommand(SubCommandSpec::new("all", noop))
            .with_subcommand(SubCommandSpec::default_for(noop));

        let (sub, consumed) = command.resolve_subcommand(&tokens(&["Steve", "64"])).unwrap();
        assert!(sub.is_default());
        assert!(!consumed);

        let (sub, _) = command.resolve_subcommand(&[]).unwrap();
        assert!(sub.is_default());
    }

    #[test]
    fn test_default_is_never_matched_by_name() {
        let command = CommandSpec::new("give").with_subcommand(SubCommandSpec::default_for(noop));
        let (_, consumed) = command.resolve_subcommand(&tokens(&["default"])).unwrap();
        assert!(!consumed);
    }

    #[test]
    fn test_priority_then_registration_order() {
        let command = CommandSpec::new("tp")
            .with_subcommand(SubCommandSpec::new("here", noop).with_meta("id", "first"))
            .with_subcommand(SubCommandSpec::new("here", noop).with_meta("id", "second"))
            .with_subcommand(
                SubCommandSpec::new("HERE", noop)
                    .with_priority(5)
                    .with_meta("id", "third"),
            )
            .with_subcommand(
                SubCommandSpec::new("here", noop)
                    .with_priority(5)
                    .with_meta("id", "fourth"),
            );

        let sub = command.subcommand("here").unwrap();
        assert_eq!(sub.meta().get("id"), Some("third"));
    }

    #[test]
    fn test_subcommand_names() {
        let command = CommandSpec::new("config")
            .with_subcommand(SubCommandSpec::new("set", noop).with_alias("put"))
            .with_subcommand(SubCommandSpec::default_for(noop))
            .with_subcommand(SubCommandSpec::new("get", noop));
        assert_eq!(command.subcommand_names(), vec!["set", "put", "get"]);
    }
}
