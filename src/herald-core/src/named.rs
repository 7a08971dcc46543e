//! `name:value` argument groups.
//!
//! The first unescaped `:` separates the key from the value. `\:` stands
//! for a literal colon on either side. A list argument splits its value on
//! a separator (`,` unless configured) and resolves each part.

use tracing::debug;

use crate::suggestion::SuggestionKey;
use crate::value::{ArgType, ArgValue, split_list};

pub const SEPARATOR: char = ':';
/// Default separator between the items of a list argument.
pub const LIST_SEPARATOR: &str = ",";
const ESCAPE: char = '\\';

/// Declaration of one named argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSpec {
    name: String,
    arg_type: ArgType,
    separator: Option<String>,
    description: Option<String>,
    suggestion: Option<SuggestionKey>,
}

impl NamedSpec {
    /// Creates a named argument holding one value of `arg_type`.
    pub fn new(name: impl Into<String>, arg_type: ArgType) -> Self {
        Self {
            name: name.into(),
            arg_type,
            separator: None,
            description: None,
            suggestion: None,
        }
    }

    /// Creates a named argument holding a `,`-separated list of `arg_type`.
    pub fn list(name: impl Into<String>, arg_type: ArgType) -> Self {
        Self::new(name, arg_type).with_separator(LIST_SEPARATOR)
    }

    /// Turns the argument into a list split on `separator`.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    /// Sets the help text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Uses a registered dynamic resolver for value suggestions.
    pub fn with_suggestion(mut self, key: SuggestionKey) -> Self {
        self.suggestion = Some(key);
        self
    }

    /// Returns the declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the type of the value, or of each item of a list.
    pub fn arg_type(&self) -> &ArgType {
        &self.arg_type
    }

    /// Returns the list separator, if this is a list argument.
    pub fn separator(&self) -> Option<&str> {
        self.separator.as_deref()
    }

    /// Returns true if the value is split into a list.
    pub fn is_list(&self) -> bool {
        self.separator.is_some()
    }

    /// Returns the help text, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the dynamic suggestion key, if any.
    pub fn suggestion(&self) -> Option<&SuggestionKey> {
        self.suggestion.as_ref()
    }
}

/// The set of named arguments a subcommand accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedGroup {
    specs: Vec<NamedSpec>,
}

impl NamedGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named argument.
    pub fn with_argument(mut self, spec: NamedSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Returns true if no argument is declared.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Iterates over the declarations in order.
    pub fn iter(&self) -> impl Iterator<Item = &NamedSpec> {
        self.specs.iter()
    }

    /// Names are matched case-insensitively.
    pub fn find(&self, name: &str) -> Option<&NamedSpec> {
        self.specs
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// Converted named arguments, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedArguments {
    entries: Vec<(String, ArgValue)>,
}

impl NamedArguments {
    fn insert(&mut self, name: &str, value: ArgValue) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Returns the value given for `name`, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Returns a text value.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_str)
    }

    /// Returns an integer value.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ArgValue::as_int)
    }

    /// Returns the items of a list argument.
    pub fn list(&self, name: &str) -> Option<&[ArgValue]> {
        self.get(name).and_then(ArgValue::as_list)
    }

    /// Returns true if `name` was given.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over `(name, value)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of distinct arguments given.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no argument was given.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Splits a token at its first unescaped separator, unescaping `\:`.
///
/// Returns `None` when the token has no unescaped separator.
pub fn split_named(token: &str) -> Option<(String, String)> {
    let mut key = String::new();
    let mut value = String::new();
    let mut separated = false;
    let mut chars = token.chars().peekable();

    while let Some(c) = chars.next() {
        let target = if separated { &mut value } else { &mut key };
        if c == ESCAPE && chars.peek() == Some(&SEPARATOR) {
            target.push(SEPARATOR);
            chars.next();
        } else if c == SEPARATOR && !separated {
            separated = true;
        } else {
            target.push(c);
        }
    }

    separated.then_some((key, value))
}

/// A value that its resolver rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidNamedValue {
    pub name: String,
    pub raw: String,
    pub arg_type: ArgType,
}

/// Parses every token of a named tail against `group`.
///
/// Tokens without a separator, or naming an undeclared argument, are
/// skipped.
pub fn parse<F>(
    tokens: &[String],
    group: &NamedGroup,
    resolve: F,
) -> Result<NamedArguments, InvalidNamedValue>
where
    F: Fn(&ArgType, &str) -> Option<ArgValue>,
{
    let mut parsed = NamedArguments::default();

    for token in tokens {
        let Some((key, raw)) = split_named(token) else {
            debug!(token = %token, "Ignoring token without named separator");
            continue;
        };
        let Some(spec) = group.find(&key) else {
            debug!(key = %key, "Ignoring unknown named argument");
            continue;
        };
        let convert = |part: &str| {
            resolve(&spec.arg_type, part).ok_or_else(|| InvalidNamedValue {
                name: spec.name.clone(),
                raw: part.to_string(),
                arg_type: spec.arg_type.clone(),
            })
        };
        let value = match spec.separator() {
            Some(separator) => ArgValue::List(
                split_list(&raw, separator)
                    .map(convert)
                    .collect::<Result<_, _>>()?,
            ),
            None => convert(&raw)?,
        };
        parsed.insert(&spec.name, value);
    }

    Ok(parsed)
}
