//! Suggestion (tab-completion) engine.
//!
//! Candidates for an argument come from, in order:
//!
//! 1. the static list registered for the argument's type, computed once per
//!    type on first use
//! 2. the dynamic provider registered under the argument's suggestion key,
//!    called on every request
//!
//! The first non-empty source wins. Candidates are then filtered against the
//! partial token with a [`SuggestionFilter`]; order is preserved.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::flags::{FlagArgument, FlagGroup, FlagSpec};
use crate::named::{self, NamedGroup};
use crate::spec::{ArgumentSpec, Parameter};
use crate::value::ArgType;

// ============================================================
// KEYS AND FILTERS
// ============================================================

/// Identifier of a dynamic suggestion provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuggestionKey(Cow<'static, str>);

impl SuggestionKey {
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SuggestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decides whether a candidate matches the partial token.
pub trait SuggestionFilter: Send + Sync {
    fn matches(&self, candidate: &str, partial: &str) -> bool;
}

/// Built-in case-insensitive filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionMethod {
    #[default]
    StartsWith,
    Contains,
}

impl SuggestionFilter for SuggestionMethod {
    fn matches(&self, candidate: &str, partial: &str) -> bool {
        let candidate = candidate.to_lowercase();
        let partial = partial.to_lowercase();
        match self {
            SuggestionMethod::StartsWith => candidate.starts_with(&partial),
            SuggestionMethod::Contains => candidate.contains(&partial),
        }
    }
}

/// What a dynamic provider knows about the request.
#[derive(Debug)]
pub struct SuggestionContext<'a, S> {
    pub sender: &'a S,
    pub command: &'a str,
    pub subcommand: &'a str,
    pub argument_index: usize,
    /// The token being completed, possibly empty.
    pub partial: &'a str,
}

// ============================================================
// REGISTRY
// ============================================================

type StaticProvider = Arc<dyn Fn() -> Vec<String> + Send + Sync>;
type DynamicProvider<S> = Arc<dyn Fn(&SuggestionContext<'_, S>) -> Vec<String> + Send + Sync>;

struct StaticEntry {
    provider: StaticProvider,
    memo: OnceCell<Arc<[String]>>,
}

/// Suggestion providers by type and by key.
pub struct SuggestionRegistry<S> {
    statics: HashMap<ArgType, StaticEntry>,
    dynamics: HashMap<SuggestionKey, DynamicProvider<S>>,
}

impl<S> Default for SuggestionRegistry<S> {
    fn default() -> Self {
        Self {
            statics: HashMap::new(),
            dynamics: HashMap::new(),
        }
    }
}

impl<S> fmt::Debug for SuggestionRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut statics: Vec<_> = self.statics.keys().collect();
        statics.sort();
        let mut dynamics: Vec<_> = self.dynamics.keys().map(SuggestionKey::name).collect();
        dynamics.sort_unstable();
        f.debug_struct("SuggestionRegistry")
            .field("statics", &statics)
            .field("dynamics", &dynamics)
            .finish()
    }
}

impl<S> SuggestionRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the closed candidate list of a type. Replaces any previous
    /// list and clears its memo.
    pub fn register_static<F>(&mut self, arg_type: ArgType, provider: F)
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.statics.insert(
            arg_type,
            StaticEntry {
                provider: Arc::new(provider),
                memo: OnceCell::new(),
            },
        );
    }

    pub fn register_dynamic<F>(&mut self, key: SuggestionKey, provider: F)
    where
        F: Fn(&SuggestionContext<'_, S>) -> Vec<String> + Send + Sync + 'static,
    {
        self.dynamics.insert(key, Arc::new(provider));
    }

    /// The memoized static list of a type.
    pub fn static_for(&self, arg_type: &ArgType) -> Option<Arc<[String]>> {
        self.statics.get(arg_type).map(|entry| {
            Arc::clone(
                entry
                    .memo
                    .get_or_init(|| (entry.provider)().into()),
            )
        })
    }

    /// Unfiltered candidates for a type and an optional suggestion key.
    pub fn candidates(
        &self,
        arg_type: Option<&ArgType>,
        key: Option<&SuggestionKey>,
        context: &SuggestionContext<'_, S>,
    ) -> Vec<String> {
        if let Some(list) = arg_type.and_then(|t| self.static_for(t)) {
            if !list.is_empty() {
                return list.to_vec();
            }
        }
        key.and_then(|k| self.dynamics.get(k))
            .map(|provider| provider(context))
            .unwrap_or_default()
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Computes suggestions for arguments of one subcommand.
pub(crate) struct SuggestionEngine<'r, S> {
    pub(crate) registry: &'r SuggestionRegistry<S>,
    pub(crate) filter: &'r dyn SuggestionFilter,
    pub(crate) ignore_flag_case: bool,
}

impl<S> SuggestionEngine<'_, S> {
    /// Suggestions for `argument`. `preceding` holds the tokens already
    /// typed into a trailing flags or named block.
    pub(crate) fn suggest(
        &self,
        argument: &ArgumentSpec,
        following: Option<&ArgumentSpec>,
        context: &SuggestionContext<'_, S>,
        preceding: &[String],
    ) -> Vec<String> {
        match (argument, following) {
            (ArgumentSpec::Positional(parameter), _) => self.parameter(parameter, context),
            (ArgumentSpec::Split(parameter, separator), _) => {
                let (head, last) = last_item(context.partial, Some(separator.as_str()));
                let candidates = self.registry.candidates(
                    Some(&parameter.arg_type),
                    parameter.suggestion.as_ref(),
                    context,
                );
                self.filtered(candidates, last)
                    .into_iter()
                    .map(|item| format!("{head}{item}"))
                    .collect()
            }
            // A flags block after a limitless takes over once flags are typed.
            (ArgumentSpec::Limitless(parameter, _), Some(ArgumentSpec::Flags(group))) => {
                let in_flags = context.partial.starts_with('-')
                    || awaiting_value(group, preceding, self.ignore_flag_case).is_some();
                if in_flags {
                    self.flags(group, context, preceding)
                } else {
                    self.parameter(parameter, context)
                }
            }
            (ArgumentSpec::Limitless(parameter, _), _) => self.parameter(parameter, context),
            (ArgumentSpec::Flags(group), _) => self.flags(group, context, preceding),
            (ArgumentSpec::Named(group), _) => self.named(group, context, preceding),
        }
    }

    fn parameter(&self, parameter: &Parameter, context: &SuggestionContext<'_, S>) -> Vec<String> {
        let candidates = self.registry.candidates(
            Some(&parameter.arg_type),
            parameter.suggestion.as_ref(),
            context,
        );
        self.filtered(candidates, context.partial)
    }

    fn flags(
        &self,
        group: &FlagGroup,
        context: &SuggestionContext<'_, S>,
        preceding: &[String],
    ) -> Vec<String> {
        let partial = context.partial;

        // `--reason=gr` completes the value after the `=`.
        if let Some((key, value)) = partial.split_once('=') {
            let Some(flag) = group.find_token(key, self.ignore_flag_case) else {
                return Vec::new();
            };
            let candidates = self.registry.candidates(flag.argument_type(), flag.suggestion(), context);
            return self
                .filtered(candidates, value)
                .into_iter()
                .map(|v| format!("{key}={v}"))
                .collect();
        }

        if let Some(flag) = awaiting_value(group, preceding, self.ignore_flag_case) {
            let candidates = self.registry.candidates(flag.argument_type(), flag.suggestion(), context);
            let values = self.filtered(candidates, partial);
            let required = matches!(flag.argument(), FlagArgument::Required(_));
            if required || !values.is_empty() {
                return values;
            }
        }

        let used: Vec<&str> = preceding
            .iter()
            .filter_map(|t| group.find_token(t, self.ignore_flag_case))
            .map(|f| f.key())
            .collect();
        let names = group
            .iter()
            .filter(|f| !used.contains(&f.key()))
            .flat_map(|f| f.names())
            .collect();
        self.filtered(names, partial)
    }

    fn named(
        &self,
        group: &NamedGroup,
        context: &SuggestionContext<'_, S>,
        preceding: &[String],
    ) -> Vec<String> {
        if let Some((key, value)) = named::split_named(context.partial) {
            let Some(spec) = group.find(&key) else {
                return Vec::new();
            };
            let (head, last) = last_item(&value, spec.separator());
            let candidates =
                self.registry
                    .candidates(Some(spec.arg_type()), spec.suggestion(), context);
            return self
                .filtered(candidates, last)
                .into_iter()
                .map(|v| format!("{}{}{head}{v}", spec.name(), named::SEPARATOR))
                .collect();
        }

        let used: Vec<String> = preceding
            .iter()
            .filter_map(|t| named::split_named(t))
            .map(|(k, _)| k.to_lowercase())
            .collect();
        let names = group
            .iter()
            .filter(|s| !used.contains(&s.name().to_lowercase()))
            .map(|s| format!("{}{}", s.name(), named::SEPARATOR))
            .collect();
        self.filtered(names, context.partial)
    }

    fn filtered(&self, candidates: Vec<String>, partial: &str) -> Vec<String> {
        let mut seen = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if self.filter.matches(&candidate, partial) && !seen.contains(&candidate) {
                seen.push(candidate);
            }
        }
        seen
    }
}

/// Splits a partial list into the items already typed, separator included,
/// and the item being typed.
fn last_item<'p>(partial: &'p str, separator: Option<&str>) -> (&'p str, &'p str) {
    match separator.and_then(|sep| partial.rfind(sep).map(|at| at + sep.len())) {
        Some(end) => partial.split_at(end),
        None => ("", partial),
    }
}

/// The flag whose value the next token would be, if any.
fn awaiting_value<'g>(
    group: &'g FlagGroup,
    preceding: &[String],
    ignore_case: bool,
) -> Option<&'g FlagSpec> {
    let last = preceding.last()?;
    if last.contains('=') {
        return None;
    }
    group
        .find_token(last, ignore_case)
        .filter(|flag| flag.has_argument())
}
