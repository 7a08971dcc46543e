//! Argument type tags and converted argument values.
//!
//! Resolvers are looked up by [`ArgType`], a static tag naming the type of a
//! parameter. Whatever a resolver produces is stored as an [`ArgValue`] and
//! handed to the handler through [`Arguments`].

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::flags::ParsedFlags;
use crate::named::NamedArguments;

// ============================================================
// ARGUMENT TYPE
// ============================================================

/// Tag naming the type of an argument.
///
/// Built-in tags cover strings, integers, floats and booleans. Anything else
/// is a custom tag with a resolver registered on the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArgType(Cow<'static, str>);

impl ArgType {
    /// Free-form text.
    pub const STRING: ArgType = ArgType(Cow::Borrowed("string"));
    /// Signed 64-bit integer.
    pub const INT: ArgType = ArgType(Cow::Borrowed("int"));
    /// 64-bit float.
    pub const FLOAT: ArgType = ArgType(Cow::Borrowed("float"));
    /// `true` or `false`, case-insensitive.
    pub const BOOL: ArgType = ArgType(Cow::Borrowed("bool"));

    /// Creates a tag from a static name.
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a tag from an owned name.
    pub fn custom(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Returns the tag name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================
// ARGUMENT VALUE
// ============================================================

/// A converted argument value.
#[derive(Clone)]
pub enum ArgValue {
    /// Text value.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// Homogeneous sequence produced by a limitless argument.
    List(Vec<ArgValue>),
    /// Parsed flags block.
    Flags(ParsedFlags),
    /// Parsed `name:value` arguments.
    Named(NamedArguments),
    /// Value produced by a custom resolver.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl ArgValue {
    /// Wraps an arbitrary value produced by a custom resolver.
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        ArgValue::Custom(Arc::new(value))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ArgValue::Float(n) => Some(*n),
            ArgValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<&ParsedFlags> {
        match self {
            ArgValue::Flags(flags) => Some(flags),
            _ => None,
        }
    }

    pub fn as_named(&self) -> Option<&NamedArguments> {
        match self {
            ArgValue::Named(named) => Some(named),
            _ => None,
        }
    }

    /// Downcasts a custom value.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            ArgValue::Custom(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            ArgValue::Int(n) => f.debug_tuple("Int").field(n).finish(),
            ArgValue::Float(n) => f.debug_tuple("Float").field(n).finish(),
            ArgValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            ArgValue::List(items) => f.debug_tuple("List").field(items).finish(),
            ArgValue::Flags(flags) => f.debug_tuple("Flags").field(flags).finish(),
            ArgValue::Named(named) => f.debug_tuple("Named").field(named).finish(),
            ArgValue::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ArgValue::Str(a), ArgValue::Str(b)) => a == b,
            (ArgValue::Int(a), ArgValue::Int(b)) => a == b,
            (ArgValue::Float(a), ArgValue::Float(b)) => a == b,
            (ArgValue::Bool(a), ArgValue::Bool(b)) => a == b,
            (ArgValue::List(a), ArgValue::List(b)) => a == b,
            (ArgValue::Flags(a), ArgValue::Flags(b)) => a == b,
            (ArgValue::Named(a), ArgValue::Named(b)) => a == b,
            (ArgValue::Custom(a), ArgValue::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

/// Parts of a list token. Empty parts are dropped, so `a,,b,` has two.
pub(crate) fn split_list<'a>(raw: &'a str, separator: &'a str) -> impl Iterator<Item = &'a str> {
    raw.split(separator).filter(|part| !part.is_empty())
}

// ============================================================
// BOUND ARGUMENTS
// ============================================================

/// Name under which a flags block is bound.
pub const FLAGS_ARGUMENT: &str = "flags";
/// Name under which a named-argument block is bound.
pub const NAMED_ARGUMENT: &str = "arguments";

/// Converted arguments handed to a handler, in declaration order.
///
/// An optional argument that was not supplied is bound as absent, so
/// [`Arguments::len`] always equals the number of declared arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(String, Option<ArgValue>)>,
}

impl Arguments {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: Option<ArgValue>) {
        self.entries.push((name.into(), value));
    }

    /// Returns the value bound to `name`, if present.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Returns the value at a declaration index, if present.
    pub fn at(&self, index: usize) -> Option<&ArgValue> {
        self.entries.get(index).and_then(|(_, v)| v.as_ref())
    }

    /// Returns true if `name` was declared and bound to a value.
    pub fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ArgValue::as_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ArgValue::as_float)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ArgValue::as_bool)
    }

    pub fn list(&self, name: &str) -> Option<&[ArgValue]> {
        self.get(name).and_then(ArgValue::as_list)
    }

    /// Returns the flags block, if the subcommand declares one.
    pub fn flags(&self) -> Option<&ParsedFlags> {
        self.get(FLAGS_ARGUMENT).and_then(ArgValue::as_flags)
    }

    /// Returns the named-argument block, if the subcommand declares one.
    pub fn named(&self) -> Option<&NamedArguments> {
        self.get(NAMED_ARGUMENT).and_then(ArgValue::as_named)
    }

    /// Iterates over `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ArgValue>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_ref()))
    }

    /// Returns the bound values in declaration order.
    pub fn values(&self) -> Vec<Option<&ArgValue>> {
        self.entries.iter().map(|(_, v)| v.as_ref()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_type_display() {
        assert_eq!(ArgType::INT.to_string(), "int");
        assert_eq!(ArgType::custom("player").name(), "player");
        assert_eq!(ArgType::new("player"), ArgType::custom("player"));
    }

    #[test]
    fn test_float_widens_int() {
        assert_eq!(ArgValue::Int(3).as_float(), Some(3.0));
        assert_eq!(ArgValue::Str("3".into()).as_float(), None);
    }

    #[test]
    fn test_custom_downcast() {
        #[derive(Debug, PartialEq)]
        struct Point(i32, i32);

        let value = ArgValue::custom(Point(1, 2));
        assert_eq!(value.downcast_ref::<Point>(), Some(&Point(1, 2)));
        assert!(value.downcast_ref::<String>().is_none());
        assert_eq!(format!("{value:?}"), "Custom(..)");
    }

    #[test]
    fn test_split_list_drops_empty_parts() {
        assert_eq!(split_list("a,,b,", ",").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(split_list("x; y", "; ").collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(split_list("", ",").count(), 0);
    }

    #[test]
    fn test_arguments_absent_values_keep_position() {
        let mut args = Arguments::new();
        args.push("name", Some(ArgValue::from("Steve")));
        args.push("reason", None);

        assert_eq!(args.len(), 2);
        assert_eq!(args.str("name"), Some("Steve"));
        assert!(!args.is_present("reason"));
        assert_eq!(args.at(1), None);
        assert_eq!(args.values(), vec![Some(&ArgValue::from("Steve")), None]);
    }
}
