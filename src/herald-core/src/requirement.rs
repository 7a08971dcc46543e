//! Preconditions gating subcommand execution.

use std::fmt;
use std::sync::Arc;

use crate::message::MessageKey;

/// Static facts about a subcommand, handed to requirement predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandMeta {
    command: String,
    subcommand: String,
    entries: Vec<(String, String)>,
}

impl CommandMeta {
    pub fn new(command: impl Into<String>, subcommand: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            subcommand: subcommand.into(),
            entries: Vec::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn subcommand(&self) -> &str {
        &self.subcommand
    }

    pub(crate) fn bind(&mut self, command: &str, subcommand: &str) {
        self.command = command.to_string();
        self.subcommand = subcommand.to_string();
    }
}

type Predicate<S> = Arc<dyn Fn(&S, &CommandMeta) -> bool + Send + Sync>;

/// A precondition with an optional denial message.
///
/// Passes when the predicate result differs from the invert flag.
pub struct Requirement<S> {
    name: String,
    predicate: Predicate<S>,
    invert: bool,
    message: Option<MessageKey>,
}

impl<S> Clone for Requirement<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            predicate: Arc::clone(&self.predicate),
            invert: self.invert,
            message: self.message.clone(),
        }
    }
}

impl<S> fmt::Debug for Requirement<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requirement")
            .field("name", &self.name)
            .field("invert", &self.invert)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl<S> Requirement<S> {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&S, &CommandMeta) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
            invert: false,
            message: None,
        }
    }

    /// Passes when the predicate fails.
    pub fn inverted(mut self) -> Self {
        self.invert = !self.invert;
        self
    }

    pub fn with_message(mut self, key: MessageKey) -> Self {
        self.message = Some(key);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> Option<&MessageKey> {
        self.message.as_ref()
    }

    pub fn is_met(&self, sender: &S, meta: &CommandMeta) -> bool {
        (self.predicate)(sender, meta) != self.invert
    }
}

/// Evaluates requirements in order and returns the first that fails.
pub fn check_requirements<'r, S>(
    requirements: &'r [Requirement<S>],
    sender: &S,
    meta: &CommandMeta,
) -> Option<&'r Requirement<S>> {
    requirements.iter().find(|r| !r.is_met(sender, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_invert() {
        let meta = CommandMeta::new("ban", "default");
        let is_op = Requirement::new("op", |s: &bool, _: &CommandMeta| *s);
        assert!(is_op.is_met(&true, &meta));
        assert!(!is_op.is_met(&false, &meta));

        let not_op = is_op.clone().inverted();
        assert!(!not_op.is_met(&true, &meta));
        assert!(not_op.is_met(&false, &meta));
    }

    #[test]
    fn test_first_failure_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let requirements = vec![
            Requirement::new("always", |_: &(), _: &CommandMeta| true),
            Requirement::new("never", |_: &(), _: &CommandMeta| false)
                .with_message(MessageKey::NO_PERMISSION),
            Requirement::new("counted", move |_: &(), _: &CommandMeta| {
                counter.fetch_add(1, Ordering::SeqCst);
                false
            }),
        ];

        let failed = check_requirements(&requirements, &(), &CommandMeta::default());
        assert_eq!(failed.map(Requirement::name), Some("never"));
        assert_eq!(failed.and_then(Requirement::message), Some(&MessageKey::NO_PERMISSION));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_meta_entries() {
        let meta = CommandMeta::new("config", "set")
            .with("permission", "herald.config")
            .with("permission", "herald.admin");
        assert_eq!(meta.get("permission"), Some("herald.admin"));
        assert_eq!(meta.command(), "config");
        assert_eq!(meta.get("missing"), None);
    }
}
