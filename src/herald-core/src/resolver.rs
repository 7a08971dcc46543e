//! Per-type token converters.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::value::{ArgType, ArgValue};

/// Converts one raw token. `None` marks the token invalid for the type.
pub type Resolver<S> = Arc<dyn Fn(&S, &str) -> Option<ArgValue> + Send + Sync>;

/// Registry of resolvers keyed by argument type.
pub struct ArgumentResolvers<S> {
    resolvers: HashMap<ArgType, Resolver<S>>,
}

impl<S> ArgumentResolvers<S> {
    /// Creates a registry with the built-in types installed.
    pub fn new() -> Self {
        let mut resolvers = Self::empty();
        resolvers.register(ArgType::STRING, |_, raw| Some(ArgValue::Str(raw.to_string())));
        resolvers.register(ArgType::INT, |_, raw| raw.parse().ok().map(ArgValue::Int));
        resolvers.register(ArgType::FLOAT, |_, raw| {
            raw.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(ArgValue::Float)
        });
        resolvers.register(ArgType::BOOL, |_, raw| parse_bool(raw).map(ArgValue::Bool));
        resolvers
    }

    pub fn empty() -> Self {
        Self {
            resolvers: HashMap::new(),
        }
    }

    /// Installs or replaces the resolver for `arg_type`.
    pub fn register<F>(&mut self, arg_type: ArgType, resolver: F)
    where
        F: Fn(&S, &str) -> Option<ArgValue> + Send + Sync + 'static,
    {
        self.resolvers.insert(arg_type, Arc::new(resolver));
    }

    /// Installs a case-insensitive resolver for a closed set of members.
    ///
    /// Resolves to the canonical member spelling.
    pub fn register_enum(&mut self, arg_type: ArgType, members: &[&str]) {
        let members: Vec<String> = members.iter().map(|m| m.to_string()).collect();
        self.register(arg_type, move |_, raw| {
            members
                .iter()
                .find(|m| m.eq_ignore_ascii_case(raw))
                .map(|m| ArgValue::Str(m.clone()))
        });
    }

    pub fn contains(&self, arg_type: &ArgType) -> bool {
        self.resolvers.contains_key(arg_type)
    }

    /// Converts `raw`. A type without a resolver rejects every token.
    pub fn resolve(&self, sender: &S, arg_type: &ArgType, raw: &str) -> Option<ArgValue> {
        match self.resolvers.get(arg_type) {
            Some(resolver) => resolver(sender, raw),
            None => {
                warn!(arg_type = %arg_type, "No resolver registered for argument type");
                None
            }
        }
    }
}

impl<S> Default for ArgumentResolvers<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for ArgumentResolvers<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.resolvers.keys().collect();
        types.sort();
        f.debug_struct("ArgumentResolvers")
            .field("types", &types)
            .finish()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types() {
        let resolvers = ArgumentResolvers::<()>::new();
        assert_eq!(
            resolvers.resolve(&(), &ArgType::STRING, "Steve"),
            Some(ArgValue::from("Steve"))
        );
        assert_eq!(resolvers.resolve(&(), &ArgType::INT, "64"), Some(ArgValue::Int(64)));
        assert_eq!(resolvers.resolve(&(), &ArgType::INT, "-3"), Some(ArgValue::Int(-3)));
        assert_eq!(resolvers.resolve(&(), &ArgType::INT, "6.4"), None);
        assert_eq!(
            resolvers.resolve(&(), &ArgType::FLOAT, "6.5"),
            Some(ArgValue::Float(6.5))
        );
        assert_eq!(resolvers.resolve(&(), &ArgType::FLOAT, "NaN"), None);
        assert_eq!(
            resolvers.resolve(&(), &ArgType::BOOL, "TRUE"),
            Some(ArgValue::Bool(true))
        );
        assert_eq!(resolvers.resolve(&(), &ArgType::BOOL, "yes"), None);
    }

    #[test]
    fn test_enum_resolver() {
        let mode = ArgType::new("gamemode");
        let mut resolvers = ArgumentResolvers::<()>::new();
        resolvers.register_enum(mode.clone(), &["survival", "creative"]);

        assert_eq!(
            resolvers.resolve(&(), &mode, "Creative"),
            Some(ArgValue::from("creative"))
        );
        assert_eq!(resolvers.resolve(&(), &mode, "hardcore"), None);
    }

    #[test]
    fn test_unknown_type_rejects() {
        let resolvers = ArgumentResolvers::<()>::empty();
        assert!(!resolvers.contains(&ArgType::STRING));
        assert_eq!(resolvers.resolve(&(), &ArgType::STRING, "x"), None);
    }

    #[test]
    fn test_resolver_sees_sender() {
        let mut resolvers = ArgumentResolvers::<String>::new();
        resolvers.register(ArgType::new("self"), |sender: &String, raw: &str| {
            (raw == "@s").then(|| ArgValue::Str(sender.clone()))
        });
        assert_eq!(
            resolvers.resolve(&"Alex".to_string(), &ArgType::new("self"), "@s"),
            Some(ArgValue::from("Alex"))
        );
    }
}
