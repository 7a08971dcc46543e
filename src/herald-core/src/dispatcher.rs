//! The dispatcher: registration, dispatch and completion.
//!
//! A dispatch call runs entirely on the caller's thread until the handler is
//! submitted:
//!
//! 1. look the root command up by name or alias
//! 2. select the subcommand (by name, else the default)
//! 3. map the raw sender and check the subcommand's sender kind
//! 4. evaluate requirements in declaration order
//! 5. bind the remaining tokens to the parameter list
//! 6. submit the handler to the sync or async execution provider
//!
//! Every failure is reported to the [`MessageSink`] and returned to the
//! caller as [`DispatchOutcome::Rejected`]; nothing is thrown.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::binder::Binder;
use crate::config::DispatcherConfig;
use crate::error::{ConfigError, DispatchFailure, RegistrationError, SubCommandRejection};
use crate::execution::{AsyncExecution, ExecutionProvider, SyncExecution, run_handler};
use crate::message::{MessageContext, MessageDetail, MessageKey, MessageSink, TracingSink};
use crate::registry::CommandRegistry;
use crate::requirement::check_requirements;
use crate::resolver::ArgumentResolvers;
use crate::sender::{AnySender, SenderMapper, SenderValidator};
use crate::spec::{ArgumentSpec, CommandSpec, ExecutionMode, SubCommandSpec};
use crate::suggestion::{
    SuggestionContext, SuggestionEngine, SuggestionFilter, SuggestionKey, SuggestionRegistry,
};
use crate::validate::validate_subcommand;
use crate::value::{ArgType, ArgValue};

// ============================================================
// OUTCOMES
// ============================================================

/// Result of a dispatch call.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The handler was handed to an execution provider. A sync handler has
    /// already run; its failure, if any, went to the sink.
    Submitted(ExecutionMode),
    /// Dispatch stopped before the handler. The failure went to the sink.
    Rejected(DispatchFailure),
}

impl DispatchOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, DispatchOutcome::Submitted(_))
    }

    pub fn failure(&self) -> Option<&DispatchFailure> {
        match self {
            DispatchOutcome::Rejected(failure) => Some(failure),
            DispatchOutcome::Submitted(_) => None,
        }
    }
}

/// What happened to each subcommand of a registered command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    pub command: String,
    pub accepted: Vec<String>,
    pub rejected: Vec<SubCommandRejection>,
}

impl RegistrationReport {
    /// True if at least one subcommand was registered.
    pub fn is_registered(&self) -> bool {
        !self.accepted.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder<R, S> {
    mapper: Arc<dyn SenderMapper<R, S>>,
    senders: Option<Arc<dyn SenderValidator<S>>>,
    sink: Option<Arc<dyn MessageSink<S>>>,
    sync_execution: Option<Arc<dyn ExecutionProvider>>,
    async_execution: Option<Arc<dyn ExecutionProvider>>,
    filter: Option<Arc<dyn SuggestionFilter>>,
    config: DispatcherConfig,
}

impl<R: 'static, S: Send + 'static> DispatcherBuilder<R, S> {
    pub fn with_sender_validator(mut self, validator: impl SenderValidator<S> + 'static) -> Self {
        self.senders = Some(Arc::new(validator));
        self
    }

    pub fn with_sink(mut self, sink: impl MessageSink<S> + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn with_sync_execution(mut self, provider: impl ExecutionProvider + 'static) -> Self {
        self.sync_execution = Some(Arc::new(provider));
        self
    }

    pub fn with_async_execution(mut self, provider: impl ExecutionProvider + 'static) -> Self {
        self.async_execution = Some(Arc::new(provider));
        self
    }

    /// Overrides the configured suggestion method.
    pub fn with_suggestion_filter(mut self, filter: impl SuggestionFilter + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Dispatcher<R, S>, ConfigError> {
        self.config.validate()?;
        let method = self.config.suggestion_method;
        Ok(Dispatcher {
            registry: CommandRegistry::new(),
            resolvers: ArgumentResolvers::new(),
            suggestions: SuggestionRegistry::new(),
            mapper: self.mapper,
            senders: self.senders.unwrap_or_else(|| Arc::new(AnySender)),
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
            sync_execution: self
                .sync_execution
                .unwrap_or_else(|| Arc::new(SyncExecution)),
            async_execution: self
                .async_execution
                .unwrap_or_else(|| Arc::new(AsyncExecution::new())),
            filter: self.filter.unwrap_or_else(|| Arc::new(method)),
            config: self.config,
        })
    }
}

// ============================================================
// DISPATCHER
// ============================================================

/// Command dispatcher for raw senders `R` mapped to domain senders `S`.
///
/// Registration takes `&mut self`; dispatch and completion take `&self`, so a
/// fully registered dispatcher can be shared across threads.
pub struct Dispatcher<R, S> {
    registry: CommandRegistry<S>,
    resolvers: ArgumentResolvers<S>,
    suggestions: SuggestionRegistry<S>,
    mapper: Arc<dyn SenderMapper<R, S>>,
    senders: Arc<dyn SenderValidator<S>>,
    sink: Arc<dyn MessageSink<S>>,
    sync_execution: Arc<dyn ExecutionProvider>,
    async_execution: Arc<dyn ExecutionProvider>,
    filter: Arc<dyn SuggestionFilter>,
    config: DispatcherConfig,
}

impl<R: 'static, S: Send + 'static> Dispatcher<R, S> {
    /// Starts a builder around the sender mapper.
    pub fn builder(mapper: impl SenderMapper<R, S> + 'static) -> DispatcherBuilder<R, S> {
        DispatcherBuilder {
            mapper: Arc::new(mapper),
            senders: None,
            sink: None,
            sync_execution: None,
            async_execution: None,
            filter: None,
            config: DispatcherConfig::default(),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn registry(&self) -> &CommandRegistry<S> {
        &self.registry
    }

    // --------------------------------------------------------
    // Registration
    // --------------------------------------------------------

    /// Validates and registers a command.
    ///
    /// Each subcommand is checked on its own; a rejected subcommand is left
    /// out and reported while the others are registered. A command whose
    /// name already exists gains the new subcommands. Custom argument types
    /// must be registered before the commands that use them.
    pub fn register_command(&mut self, spec: CommandSpec<S>) -> RegistrationReport {
        let CommandSpec {
            name,
            aliases,
            description,
            subcommands,
        } = spec;

        let mut report = RegistrationReport {
            command: name.clone(),
            ..Default::default()
        };
        let names_valid =
            !name.trim().is_empty() && aliases.iter().all(|a| !a.trim().is_empty());
        let mut has_default = self
            .registry
            .get(&name)
            .is_some_and(|existing| existing.default_subcommand().is_some());

        let mut accepted = Vec::with_capacity(subcommands.len());
        for mut subcommand in subcommands {
            let checked = if !names_valid {
                Err(RegistrationError::EmptyName)
            } else if subcommand.is_default && has_default {
                Err(RegistrationError::DuplicateDefault {
                    command: name.clone(),
                })
            } else {
                validate_subcommand(&subcommand, self.senders.as_ref(), &self.resolvers)
            };

            match checked {
                Ok(()) => {
                    has_default |= subcommand.is_default;
                    subcommand.meta.bind(&name, &subcommand.name);
                    report.accepted.push(subcommand.name.clone());
                    accepted.push(subcommand);
                }
                Err(err) => {
                    warn!(
                        command = %name,
                        subcommand = %subcommand.name,
                        error = %err,
                        "Rejected subcommand"
                    );
                    report.rejected.push(SubCommandRejection {
                        subcommand: subcommand.name.clone(),
                        error: err,
                    });
                }
            }
        }

        if accepted.is_empty() {
            warn!(command = %name, "No subcommand accepted; command not registered");
            return report;
        }

        debug!(command = %name, subcommands = accepted.len(), "Registered command");
        self.registry.insert(CommandSpec {
            name,
            aliases,
            description,
            subcommands: accepted,
        });
        report
    }

    /// Removes a command and its aliases. Returns false if it was unknown.
    pub fn unregister_command(&mut self, name: &str) -> bool {
        let removed = self.registry.remove(name).is_some();
        if removed {
            debug!(command = %name, "Unregistered command");
        }
        removed
    }

    /// Installs or replaces the resolver for a type.
    pub fn register_argument<F>(&mut self, arg_type: ArgType, resolver: F)
    where
        F: Fn(&S, &str) -> Option<ArgValue> + Send + Sync + 'static,
    {
        self.resolvers.register(arg_type, resolver);
    }

    /// Installs a closed enumeration: a case-insensitive resolver plus the
    /// members as the type's static suggestions.
    pub fn register_enum(&mut self, arg_type: ArgType, members: &[&str]) {
        self.resolvers.register_enum(arg_type.clone(), members);
        let members: Vec<String> = members.iter().map(|m| m.to_string()).collect();
        self.suggestions
            .register_static(arg_type, move || members.clone());
    }

    /// Registers a dynamic suggestion provider.
    pub fn register_suggestion<F>(&mut self, key: SuggestionKey, provider: F)
    where
        F: Fn(&SuggestionContext<'_, S>) -> Vec<String> + Send + Sync + 'static,
    {
        self.suggestions.register_dynamic(key, provider);
    }

    /// Registers the static suggestion list of a type.
    pub fn register_static_suggestions<F>(&mut self, arg_type: ArgType, provider: F)
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.suggestions.register_static(arg_type, provider);
    }

    // --------------------------------------------------------
    // Dispatch
    // --------------------------------------------------------

    /// Dispatches a full token line whose first token is the command name.
    pub fn dispatch_tokens(&self, raw_sender: &R, tokens: &[String]) -> DispatchOutcome {
        match tokens.split_first() {
            Some((command, args)) => self.dispatch(command, raw_sender, args),
            None => self.dispatch("", raw_sender, &[]),
        }
    }

    /// Dispatches `raw_args` to the command named `command`.
    pub fn dispatch(&self, command: &str, raw_sender: &R, raw_args: &[String]) -> DispatchOutcome {
        let unknown = || DispatchFailure::UnknownCommand {
            command: command.to_string(),
            subcommand: raw_args.first().cloned(),
        };

        let Some(spec) = self.registry.get(command) else {
            let sender = self.mapper.map(raw_sender);
            return self.reject(&sender, command, None, unknown());
        };

        let Some((subcommand, named)) = spec.resolve_subcommand(raw_args) else {
            let sender = self.mapper.map(raw_sender);
            return self.reject(&sender, command, None, unknown());
        };
        debug!(
            command = %spec.name(),
            subcommand = %subcommand.name(),
            by_name = named,
            "Selected subcommand"
        );

        let sender = self.mapper.map(raw_sender);

        if let Some(kind) = subcommand.sender() {
            if !self.senders.satisfies(&sender, kind) {
                let failure = DispatchFailure::WrongSenderType {
                    required: kind.to_string(),
                };
                return self.reject(&sender, command, Some(subcommand), failure);
            }
        }

        if let Some(denied) = check_requirements(subcommand.requirements(), &sender, subcommand.meta()) {
            let failure = DispatchFailure::RequirementDenied {
                requirement: denied.name().to_string(),
                message: denied.message().cloned(),
            };
            return self.reject(&sender, command, Some(subcommand), failure);
        }

        let tokens = if named { &raw_args[1..] } else { raw_args };
        let binder = Binder {
            resolvers: &self.resolvers,
            escape_marker: self.config.escape_marker,
            ignore_flag_case: self.config.ignore_flag_case,
        };
        let arguments = match binder.bind(&sender, subcommand.arguments(), tokens) {
            Ok(arguments) => arguments,
            Err(failure) => return self.reject(&sender, command, Some(subcommand), failure),
        };

        let mode = subcommand.execution();
        let handler = subcommand.handler();
        let sink = Arc::clone(&self.sink);
        let command_name = spec.name().to_string();
        let subcommand_name = subcommand.name().to_string();
        let task = Box::new(move || {
            if let Err(failure) =
                run_handler(&handler, &sender, &arguments, &command_name, &subcommand_name)
            {
                error!(
                    command = %command_name,
                    subcommand = %subcommand_name,
                    error = %failure,
                    "Command handler failed"
                );
                let context = MessageContext::new(&command_name)
                    .with_subcommand(&subcommand_name)
                    .with_detail(MessageDetail::Execution(&failure));
                sink.send(&MessageKey::EXECUTION_FAILED, &sender, &context);
            }
        });

        match mode {
            ExecutionMode::Sync => self.sync_execution.submit(task),
            ExecutionMode::Async => self.async_execution.submit(task),
        }
        DispatchOutcome::Submitted(mode)
    }

    fn reject(
        &self,
        sender: &S,
        command: &str,
        subcommand: Option<&SubCommandSpec<S>>,
        failure: DispatchFailure,
    ) -> DispatchOutcome {
        debug!(command = %command, failure = %failure, "Dispatch rejected");
        let usage = subcommand.map(SubCommandSpec::usage);
        let mut context = MessageContext::new(command).with_detail(MessageDetail::Failure(&failure));
        if let Some(subcommand) = subcommand {
            context = context.with_subcommand(subcommand.name());
        }
        if let Some(usage) = usage.as_deref() {
            context = context.with_usage(usage);
        }
        self.sink.send(&failure.message_key(), sender, &context);
        DispatchOutcome::Rejected(failure)
    }

    // --------------------------------------------------------
    // Suggestions
    // --------------------------------------------------------

    /// Suggestions for one argument of a subcommand.
    ///
    /// `subcommand` of `None` selects the default subcommand. An index past
    /// the declared arguments falls into a trailing limitless, flags or named
    /// argument if there is one.
    pub fn suggest(
        &self,
        raw_sender: &R,
        command: &str,
        subcommand: Option<&str>,
        index: usize,
        partial: &str,
    ) -> Vec<String> {
        let Some(spec) = self.registry.get(command) else {
            return Vec::new();
        };
        let sub = match subcommand {
            Some(name) => spec.subcommand(name),
            None => spec.default_subcommand(),
        };
        let Some(sub) = sub else {
            return Vec::new();
        };
        let position = if index < sub.arguments().len() {
            index
        } else {
            match sub.arguments().iter().position(ArgumentSpec::is_tail) {
                Some(position) => position,
                None => return Vec::new(),
            }
        };
        let sender = self.mapper.map(raw_sender);
        self.suggest_argument(&sender, spec, sub, position, partial, &[])
            .unwrap_or_default()
    }

    /// Command names and aliases matching `partial`, sorted.
    pub fn complete_command(&self, partial: &str) -> Vec<String> {
        self.registry
            .all_names()
            .into_iter()
            .filter(|name| self.filter.matches(name, partial))
            .map(str::to_string)
            .collect()
    }

    /// Completions for the last token of a partially typed line.
    ///
    /// `raw_args` are the tokens after the command name; the last one is the
    /// token being completed and may be empty. Subcommands the sender may not
    /// run produce no suggestions.
    pub fn complete(&self, raw_sender: &R, command: &str, raw_args: &[String]) -> Vec<String> {
        let Some(spec) = self.registry.get(command) else {
            return Vec::new();
        };
        let (partial, typed) = match raw_args.split_last() {
            Some((last, typed)) => (last.as_str(), typed),
            None => ("", raw_args),
        };
        let sender = self.mapper.map(raw_sender);

        if typed.is_empty() {
            let mut suggestions: Vec<String> = spec
                .subcommands()
                .iter()
                .filter(|sub| !sub.is_default() && self.permits(&sender, sub))
                .flat_map(|sub| std::iter::once(sub.name()).chain(sub.aliases().iter().map(String::as_str)))
                .filter(|name| self.filter.matches(name, partial))
                .map(str::to_string)
                .collect();
            if let Some(default) = spec.default_subcommand() {
                if let Some(values) = self.complete_in(&sender, spec, default, typed, partial) {
                    for value in values {
                        if !suggestions.contains(&value) {
                            suggestions.push(value);
                        }
                    }
                }
            }
            return suggestions;
        }

        let Some((sub, named)) = spec.resolve_subcommand(typed) else {
            return Vec::new();
        };
        let tokens = if named { &typed[1..] } else { typed };
        self.complete_in(&sender, spec, sub, tokens, partial)
            .unwrap_or_default()
    }

    /// Completes the argument following `tokens` within one subcommand.
    fn complete_in(
        &self,
        sender: &S,
        spec: &CommandSpec<S>,
        sub: &SubCommandSpec<S>,
        tokens: &[String],
        partial: &str,
    ) -> Option<Vec<String>> {
        if !self.permits(sender, sub) {
            return None;
        }
        let arguments = sub.arguments();
        let index = tokens.len();
        let tail = arguments.iter().position(ArgumentSpec::is_tail);
        match tail {
            Some(start) if index >= start => {
                self.suggest_argument(sender, spec, sub, start, partial, &tokens[start..])
            }
            _ => self.suggest_argument(sender, spec, sub, index, partial, &[]),
        }
    }

    fn suggest_argument(
        &self,
        sender: &S,
        spec: &CommandSpec<S>,
        sub: &SubCommandSpec<S>,
        index: usize,
        partial: &str,
        preceding: &[String],
    ) -> Option<Vec<String>> {
        let argument = sub.argument_at(index)?;
        let engine = SuggestionEngine {
            registry: &self.suggestions,
            filter: self.filter.as_ref(),
            ignore_flag_case: self.config.ignore_flag_case,
        };
        let context = SuggestionContext {
            sender,
            command: spec.name(),
            subcommand: sub.name(),
            argument_index: index,
            partial,
        };
        Some(engine.suggest(argument, sub.argument_at(index + 1), &context, preceding))
    }

    fn permits(&self, sender: &S, sub: &SubCommandSpec<S>) -> bool {
        let kind_ok = sub
            .sender()
            .is_none_or(|kind| self.senders.satisfies(sender, kind));
        kind_ok && check_requirements(sub.requirements(), sender, sub.meta()).is_none()
    }
}

impl<R, S> fmt::Debug for Dispatcher<R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("resolvers", &self.resolvers)
            .field("suggestions", &self.suggestions)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
