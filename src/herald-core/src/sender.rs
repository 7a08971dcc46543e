//! Sender mapping and sender-kind checks.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Named capability a sender may have, such as `player` or `console`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SenderKind(Cow<'static, str>);

impl SenderKind {
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

impl fmt::Display for SenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns the host's raw caller into the domain sender handlers receive.
pub trait SenderMapper<R, S>: Send + Sync {
    fn map(&self, raw: &R) -> S;
}

impl<R, S, F> SenderMapper<R, S> for F
where
    F: Fn(&R) -> S + Send + Sync,
{
    fn map(&self, raw: &R) -> S {
        self(raw)
    }
}

/// Decides which sender kinds exist and whether a sender has one.
pub trait SenderValidator<S>: Send + Sync {
    /// Kinds a subcommand may declare.
    fn known_kinds(&self) -> Vec<SenderKind>;

    fn knows(&self, kind: &SenderKind) -> bool {
        self.known_kinds().contains(kind)
    }

    fn satisfies(&self, sender: &S, kind: &SenderKind) -> bool;
}

/// Validator for hosts without sender kinds. No kind may be declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnySender;

impl<S> SenderValidator<S> for AnySender {
    fn known_kinds(&self) -> Vec<SenderKind> {
        Vec::new()
    }

    fn satisfies(&self, _sender: &S, _kind: &SenderKind) -> bool {
        true
    }
}

type KindPredicate<S> = Arc<dyn Fn(&S) -> bool + Send + Sync>;

/// Validator built from one predicate per kind.
pub struct KindValidator<S> {
    kinds: Vec<(SenderKind, KindPredicate<S>)>,
}

impl<S> Default for KindValidator<S> {
    fn default() -> Self {
        Self { kinds: Vec::new() }
    }
}

impl<S> KindValidator<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind<F>(mut self, kind: SenderKind, predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.kinds.push((kind, Arc::new(predicate)));
        self
    }
}

impl<S> fmt::Debug for KindValidator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindValidator")
            .field("kinds", &self.known_kinds())
            .finish()
    }
}

impl<S> SenderValidator<S> for KindValidator<S> {
    fn known_kinds(&self) -> Vec<SenderKind> {
        self.kinds.iter().map(|(k, _)| k.clone()).collect()
    }

    fn satisfies(&self, sender: &S, kind: &SenderKind) -> bool {
        self.kinds
            .iter()
            .find(|(k, _)| k == kind)
            .is_some_and(|(_, predicate)| predicate(sender))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER: SenderKind = SenderKind::new("player");
    const CONSOLE: SenderKind = SenderKind::new("console");

    #[test]
    fn test_kind_validator() {
        let validator = KindValidator::<&str>::new()
            .with_kind(PLAYER, |s| s.starts_with("player:"))
            .with_kind(CONSOLE, |s| *s == "console");

        assert!(validator.knows(&PLAYER));
        assert!(!validator.knows(&SenderKind::custom("block")));
        assert!(validator.satisfies(&"player:Steve", &PLAYER));
        assert!(!validator.satisfies(&"console", &PLAYER));
        assert!(!validator.satisfies(&"console", &SenderKind::custom("block")));
    }

    #[test]
    fn test_closure_mapper() {
        let mapper = |raw: &u32| format!("user-{raw}");
        assert_eq!(SenderMapper::map(&mapper, &7), "user-7");
    }

    #[test]
    fn test_any_sender_knows_nothing() {
        assert!(!SenderValidator::<()>::knows(&AnySender, &PLAYER));
    }
}
