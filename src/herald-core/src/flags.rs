//! Flag parser for trailing flags blocks.
//!
//! Splits a token slice into recognized flags and leftover positional
//! tokens. Supported forms:
//!
//! - Short flags: `-s`
//! - Long flags: `--silent`
//! - Values: `--reason=griefing` or `--reason griefing`
//! - Literals: bare `-` and `--`, and any token starting with the escape
//!   marker (`\-x` yields the positional `-x`)
//!
//! Unknown flags are not an error; the whole token is kept as a leftover.

use crate::suggestion::SuggestionKey;
use crate::value::{ArgType, ArgValue};

/// Default marker that forces a flag-shaped token to be read literally.
pub const ESCAPE_MARKER: char = '\\';

const LONG_PREFIX: &str = "--";
const SHORT_PREFIX: &str = "-";

// ============================================================
// FLAG SPEC
// ============================================================

/// Whether a flag takes a value, and of which type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagArgument {
    /// Switch without a value.
    None,
    /// A value must follow the flag.
    Required(ArgType),
    /// A value may follow the flag.
    Optional(ArgType),
}

/// Declaration of a single flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    short: Option<String>,
    long: Option<String>,
    argument: FlagArgument,
    required: bool,
    description: Option<String>,
    suggestion: Option<SuggestionKey>,
}

impl FlagSpec {
    /// Creates a flag with a short key (`-k`).
    pub fn short(key: impl Into<String>) -> Self {
        Self::with_keys(Some(key.into()), None)
    }

    /// Creates a flag with a long key (`--key`).
    pub fn long(key: impl Into<String>) -> Self {
        Self::with_keys(None, Some(key.into()))
    }

    fn with_keys(short: Option<String>, long: Option<String>) -> Self {
        Self {
            short,
            long,
            argument: FlagArgument::None,
            required: false,
            description: None,
            suggestion: None,
        }
    }

    /// Adds a short key.
    pub fn with_short(mut self, key: impl Into<String>) -> Self {
        self.short = Some(key.into());
        self
    }

    /// Adds a long key.
    pub fn with_long(mut self, key: impl Into<String>) -> Self {
        self.long = Some(key.into());
        self
    }

    /// The flag requires a value of the given type.
    pub fn with_argument(mut self, arg_type: ArgType) -> Self {
        self.argument = FlagArgument::Required(arg_type);
        self
    }

    /// The flag accepts an optional value of the given type.
    pub fn with_optional_argument(mut self, arg_type: ArgType) -> Self {
        self.argument = FlagArgument::Optional(arg_type);
        self
    }

    /// The flag must appear in every invocation.
    pub fn required(mut self) -> Self {
        self.required = true;
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

    /// Canonical key: the long key if declared, else the short key.
    pub fn key(&self) -> &str {
        self.long
            .as_deref()
            .or(self.short.as_deref())
            .unwrap_or_default()
    }

    /// Returns the short key, without the `-` prefix.
    pub fn short_key(&self) -> Option<&str> {
        self.short.as_deref()
    }

    /// Returns the long key, without the `--` prefix.
    pub fn long_key(&self) -> Option<&str> {
        self.long.as_deref()
    }

    /// Returns whether the flag takes a value.
    pub fn argument(&self) -> &FlagArgument {
        &self.argument
    }

    /// Returns true if the flag takes a required or optional value.
    pub fn has_argument(&self) -> bool {
        !matches!(self.argument, FlagArgument::None)
    }

    /// Type of the flag value, if it takes one.
    pub fn argument_type(&self) -> Option<&ArgType> {
        match &self.argument {
            FlagArgument::None => None,
            FlagArgument::Required(t) | FlagArgument::Optional(t) => Some(t),
        }
    }

    /// Returns true if the flag must appear in every invocation.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the help text, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the dynamic suggestion key, if any.
    pub fn suggestion(&self) -> Option<&SuggestionKey> {
        self.suggestion.as_ref()
    }

    /// All spellings of this flag as typed on the command line.
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(2);
        if let Some(long) = &self.long {
            names.push(format!("{LONG_PREFIX}{long}"));
        }
        if let Some(short) = &self.short {
            names.push(format!("{SHORT_PREFIX}{short}"));
        }
        names
    }

    fn matches_preferred(&self, key: &str, long_form: bool, ignore_case: bool) -> bool {
        // `--x` prefers long keys, `-x` prefers short keys.
        let preferred = if long_form { &self.long } else { &self.short };
        key_eq(preferred.as_deref(), key, ignore_case)
    }

    fn matches(&self, key: &str, long_form: bool, ignore_case: bool) -> bool {
        self.matches_preferred(key, long_form, ignore_case)
            || key_eq(self.long.as_deref(), key, ignore_case)
            || key_eq(self.short.as_deref(), key, ignore_case)
    }
}

fn key_eq(candidate: Option<&str>, key: &str, ignore_case: bool) -> bool {
    candidate.is_some_and(|c| {
        if ignore_case {
            c.eq_ignore_ascii_case(key)
        } else {
            c == key
        }
    })
}

// ============================================================
// FLAG GROUP
// ============================================================

/// The set of flags a subcommand accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagGroup {
    flags: Vec<FlagSpec>,
}

impl FlagGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a flag.
    pub fn with_flag(mut self, flag: FlagSpec) -> Self {
        self.flags.push(flag);
        self
    }

    /// Adds a flag in place.
    pub fn push(&mut self, flag: FlagSpec) {
        self.flags.push(flag);
    }

    /// Returns true if no flag is declared.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Number of declared flags.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Iterates over the flags in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FlagSpec> {
        self.flags.iter()
    }

    /// Every flag spelling, long forms first within each flag.
    pub fn all_names(&self) -> Vec<String> {
        self.flags.iter().flat_map(FlagSpec::names).collect()
    }

    /// Finds the flag a flag-shaped token refers to.
    ///
    /// Only the prefix actually present (`--` or `-`) is stripped, and an
    /// `=value` suffix is ignored.
    pub fn find_token(&self, token: &str, ignore_case: bool) -> Option<&FlagSpec> {
        let (key, long_form) = split_prefix(token)?;
        let key = key.split_once('=').map_or(key, |(k, _)| k);
        self.find(key, long_form, ignore_case)
    }

    fn find(&self, key: &str, long_form: bool, ignore_case: bool) -> Option<&FlagSpec> {
        // Matches on the preferred key kind win over fallbacks.
        self.flags
            .iter()
            .find(|f| f.matches_preferred(key, long_form, ignore_case))
            .or_else(|| {
                self.flags
                    .iter()
                    .find(|f| f.matches(key, long_form, ignore_case))
            })
    }
}

/// Strips the flag prefix. Returns `None` for tokens that are not flags.
fn split_prefix(token: &str) -> Option<(&str, bool)> {
    if token == SHORT_PREFIX || token == LONG_PREFIX {
        return None;
    }
    if let Some(rest) = token.strip_prefix(LONG_PREFIX) {
        Some((rest, true))
    } else {
        token.strip_prefix(SHORT_PREFIX).map(|rest| (rest, false))
    }
}

// ============================================================
// PARSED FLAGS
// ============================================================

#[derive(Debug, Clone, PartialEq)]
struct FlagEntry {
    short: Option<String>,
    long: Option<String>,
    value: Option<ArgValue>,
}

impl FlagEntry {
    fn is(&self, key: &str) -> bool {
        self.short.as_deref() == Some(key) || self.long.as_deref() == Some(key)
    }
}

/// Flags observed in one invocation, plus the leftover positional tokens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFlags {
    entries: Vec<FlagEntry>,
    leftovers: Vec<String>,
}

impl ParsedFlags {
    fn insert(&mut self, spec: &FlagSpec, value: Option<ArgValue>) {
        let entry = FlagEntry {
            short: spec.short.clone(),
            long: spec.long.clone(),
            value,
        };
        // A repeated flag keeps its first position but takes the last value.
        match self.entries.iter_mut().find(|e| e.is(spec.key())) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Returns true if the flag was given, by either of its keys.
    pub fn has(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.is(key))
    }

    /// Returns the flag's converted value, if it was given one.
    pub fn value(&self, key: &str) -> Option<&ArgValue> {
        self.entries
            .iter()
            .find(|e| e.is(key))
            .and_then(|e| e.value.as_ref())
    }

    /// Returns a text flag value.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(ArgValue::as_str)
    }

    /// Returns an integer flag value.
    pub fn int(&self, key: &str) -> Option<i64> {
        self.value(key).and_then(ArgValue::as_int)
    }

    /// Canonical keys of the observed flags, in first-seen order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| e.long.as_deref().or(e.short.as_deref()))
            .collect()
    }

    /// Positional tokens that were not consumed as flags or flag values.
    pub fn leftovers(&self) -> &[String] {
        &self.leftovers
    }

    /// Number of distinct flags observed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no flag was observed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn take_leftovers(&mut self) -> Vec<String> {
        std::mem::take(&mut self.leftovers)
    }
}

// ============================================================
// PARSE RESULT
// ============================================================

/// Outcome of parsing a flags block.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    /// Parsing succeeded. Leftovers are available on the flags.
    Success(ParsedFlags),
    /// A flag that requires a value was the last token.
    MissingRequiredFlagArgument { key: String, arg_type: ArgType },
    /// A flag value could not be converted.
    InvalidFlagArgument {
        key: String,
        raw: String,
        arg_type: ArgType,
    },
    /// Required flags that never appeared, in declaration order.
    MissingRequiredFlags { keys: Vec<String> },
}

impl ParseResult {
    /// Returns true if parsing succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ParseResult::Success(_))
    }

    /// Returns the parsed flags if parsing succeeded.
    pub fn into_flags(self) -> Option<ParsedFlags> {
        match self {
            ParseResult::Success(flags) => Some(flags),
            _ => None,
        }
    }
}

// ============================================================
// TOKEN CURSOR
// ============================================================

/// Left-to-right cursor with a one-step rewind.
#[derive(Debug)]
pub(crate) struct TokenCursor<'a> {
    tokens: &'a [String],
    position: usize,
}

impl<'a> TokenCursor<'a> {
    pub(crate) fn new(tokens: &'a [String]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub(crate) fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.position).map(String::as_str)
    }

    pub(crate) fn advance(&mut self) -> Option<&'a str> {
        let token = self.peek()?;
        self.position += 1;
        Some(token)
    }

    pub(crate) fn rewind(&mut self) {
        self.position = self.position.saturating_sub(1);
    }
}

// ============================================================
// FLAG PARSER
// ============================================================

/// Parser bound to one flag group.
#[derive(Debug, Clone, Copy)]
pub struct FlagParser<'g> {
    group: &'g FlagGroup,
    escape_marker: char,
    ignore_case: bool,
}

impl<'g> FlagParser<'g> {
    /// Creates a case-sensitive parser using the default escape marker.
    pub fn new(group: &'g FlagGroup) -> Self {
        Self {
            group,
            escape_marker: ESCAPE_MARKER,
            ignore_case: false,
        }
    }

    /// Sets the marker that makes a flag-shaped token literal.
    pub fn escape_marker(mut self, marker: char) -> Self {
        self.escape_marker = marker;
        self
    }

    /// Matches flag keys case-insensitively.
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Parses `tokens`, converting flag values with `resolve`.
    pub fn parse<F>(&self, tokens: &[String], resolve: F) -> ParseResult
    where
        F: Fn(&ArgType, &str) -> Option<ArgValue>,
    {
        let mut cursor = TokenCursor::new(tokens);
        let mut parsed = ParsedFlags::default();

        while let Some(token) = cursor.advance() {
            if let Some(literal) = token.strip_prefix(self.escape_marker) {
                parsed.leftovers.push(literal.to_string());
                continue;
            }

            let Some((body, long_form)) = split_prefix(token) else {
                parsed.leftovers.push(token.to_string());
                continue;
            };

            let (key, inline) = match body.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (body, None),
            };

            let Some(spec) = self.group.find(key, long_form, self.ignore_case) else {
                parsed.leftovers.push(token.to_string());
                continue;
            };

            match (&spec.argument, inline) {
                // `--switch=value` on a switch is not this flag.
                (FlagArgument::None, Some(_)) => parsed.leftovers.push(token.to_string()),
                (FlagArgument::None, None) => parsed.insert(spec, None),
                (FlagArgument::Required(arg_type) | FlagArgument::Optional(arg_type), Some(raw)) => {
                    match resolve(arg_type, raw) {
                        Some(value) => parsed.insert(spec, Some(value)),
                        None => {
                            return ParseResult::InvalidFlagArgument {
                                key: spec.key().to_string(),
                                raw: raw.to_string(),
                                arg_type: arg_type.clone(),
                            };
                        }
                    }
                }
                (FlagArgument::Required(arg_type), None) => {
                    let Some(raw) = cursor.advance() else {
                        return ParseResult::MissingRequiredFlagArgument {
                            key: spec.key().to_string(),
                            arg_type: arg_type.clone(),
                        };
                    };
                    match resolve(arg_type, raw) {
                        Some(value) => parsed.insert(spec, Some(value)),
                        None => {
                            return ParseResult::InvalidFlagArgument {
                                key: spec.key().to_string(),
                                raw: raw.to_string(),
                                arg_type: arg_type.clone(),
                            };
                        }
                    }
                }
                (FlagArgument::Optional(arg_type), None) => {
                    let next_is_flag = cursor
                        .peek()
                        .is_some_and(|next| self.group.find_token(next, self.ignore_case).is_some());
                    if next_is_flag {
                        parsed.insert(spec, None);
                        continue;
                    }
                    match cursor.advance() {
                        None => parsed.insert(spec, None),
                        Some(raw) => match resolve(arg_type, raw) {
                            Some(value) => parsed.insert(spec, Some(value)),
                            None => {
                                // Not a value for this flag; hand it back.
                                cursor.rewind();
                                parsed.insert(spec, None);
                            }
                        },
                    }
                }
            }
        }

        let missing: Vec<String> = self
            .group
            .iter()
            .filter(|f| f.required && !parsed.has(f.key()))
            .map(|f| f.key().to_string())
            .collect();
        if !missing.is_empty() {
            return ParseResult::MissingRequiredFlags { keys: missing };
        }

        ParseResult::Success(parsed)
    }
}

/// Parses `tokens` against `group` with default options.
pub fn parse<F>(tokens: &[String], group: &FlagGroup, resolve: F) -> ParseResult
where
    F: Fn(&ArgType, &str) -> Option<ArgValue>,
{
    FlagParser::new(group).parse(tokens, resolve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn resolve(arg_type: &ArgType, raw: &str) -> Option<ArgValue> {
        match arg_type.name() {
            "int" => raw.parse().ok().map(ArgValue::Int),
            _ => Some(ArgValue::Str(raw.to_string())),
        }
    }

    fn ban_group() -> FlagGroup {
        FlagGroup::new()
            .with_flag(
                FlagSpec::long("reason")
                    .with_short("r")
                    .with_argument(ArgType::STRING),
            )
            .with_flag(FlagSpec::long("silent").with_short("s"))
    }

    #[test]
    fn test_ban_scenario() {
        let flags = parse(
            &tokens(&["Steve", "--reason=griefing", "--silent"]),
            &ban_group(),
            resolve,
        )
        .into_flags().unwrap();

        assert_eq!(flags.leftovers(), &["Steve".to_string()]);
        assert_eq!(flags.str("reason"), Some("griefing"));
        assert!(flags.has("silent"));
        assert!(flags.has("s"));
        assert_eq!(flags.value("silent"), None);
    }

    #[test]
    fn test_equals_and_separate_forms_agree() {
        let group = ban_group();
        let joined = parse(&tokens(&["--reason=spam"]), &group, resolve).into_flags().unwrap();
        let split = parse(&tokens(&["--reason", "spam"]), &group, resolve).into_flags().unwrap();
        assert_eq!(joined, split);
    }

    #[test]
    fn test_short_key_lookup() {
        let flags = parse(&tokens(&["-r", "afk", "-s"]), &ban_group(), resolve).into_flags().unwrap();
        assert_eq!(flags.str("r"), Some("afk"));
        assert_eq!(flags.keys(), vec!["reason", "silent"]);
    }

    #[test]
    fn test_bare_dashes_are_literal() {
        let flags = parse(&tokens(&["-", "--", "x"]), &ban_group(), resolve).into_flags().unwrap();
        assert!(flags.is_empty());
        assert_eq!(flags.leftovers(), &tokens(&["-", "--", "x"])[..]);
    }

    #[test]
    fn test_escape_marker_strips_and_keeps_literal() {
        let flags = parse(&tokens(&["\\--silent"]), &ban_group(), resolve).into_flags().unwrap();
        assert!(!flags.has("silent"));
        assert_eq!(flags.leftovers(), &["--silent".to_string()]);
    }

    #[test]
    fn test_custom_escape_marker() {
        let group = ban_group();
        let flags = FlagParser::new(&group)
            .escape_marker('!')
            .parse(&tokens(&["!-s"]), resolve)
            .into_flags().unwrap();
        assert_eq!(flags.leftovers(), &["-s".to_string()]);
    }

    #[test]
    fn test_unknown_flag_is_leftover() {
        let flags = parse(&tokens(&["--unknown", "-x=1"]), &ban_group(), resolve).into_flags().unwrap();
        assert!(flags.is_empty());
        assert_eq!(flags.leftovers(), &tokens(&["--unknown", "-x=1"])[..]);
    }

    #[test]
    fn test_switch_with_inline_value_is_leftover() {
        let flags = parse(&tokens(&["--silent=yes"]), &ban_group(), resolve).into_flags().unwrap();
        assert!(!flags.has("silent"));
        assert_eq!(flags.leftovers(), &["--silent=yes".to_string()]);
    }

    #[test]
    fn test_missing_required_flag_argument() {
        let result = parse(&tokens(&["--reason"]), &ban_group(), resolve);
        assert_eq!(
            result,
            ParseResult::MissingRequiredFlagArgument {
                key: "reason".to_string(),
                arg_type: ArgType::STRING,
            }
        );
    }

    #[test]
    fn test_invalid_required_flag_argument() {
        let group = FlagGroup::new().with_flag(FlagSpec::long("days").with_argument(ArgType::INT));
        let result = parse(&tokens(&["--days", "soon"]), &group, resolve);
        assert_eq!(
            result,
            ParseResult::InvalidFlagArgument {
                key: "days".to_string(),
                raw: "soon".to_string(),
                arg_type: ArgType::INT,
            }
        );
    }

    #[test]
    fn test_optional_argument_rewinds_invalid_value() {
        let group =
            FlagGroup::new().with_flag(FlagSpec::long("days").with_optional_argument(ArgType::INT));
        let flags = parse(&tokens(&["--days", "Steve"]), &group, resolve).into_flags().unwrap();
        assert!(flags.has("days"));
        assert_eq!(flags.value("days"), None);
        assert_eq!(flags.leftovers(), &["Steve".to_string()]);
    }

    #[test]
    fn test_optional_argument_at_end_is_present_without_value() {
        let group =
            FlagGroup::new().with_flag(FlagSpec::long("days").with_optional_argument(ArgType::INT));
        let flags = parse(&tokens(&["--days"]), &group, resolve).into_flags().unwrap();
        assert!(flags.has("days"));
        assert_eq!(flags.value("days"), None);
    }

    #[test]
    fn test_optional_argument_does_not_swallow_next_flag() {
        let group = ban_group()
            .with_flag(FlagSpec::long("days").with_optional_argument(ArgType::STRING));
        let flags = parse(&tokens(&["--days", "--silent"]), &group, resolve).into_flags().unwrap();
        assert!(flags.has("days"));
        assert!(flags.has("silent"));
        assert_eq!(flags.value("days"), None);
    }

    #[test]
    fn test_optional_argument_inline_invalid_is_error() {
        let group =
            FlagGroup::new().with_flag(FlagSpec::long("days").with_optional_argument(ArgType::INT));
        let result = parse(&tokens(&["--days=x"]), &group, resolve);
        assert!(matches!(result, ParseResult::InvalidFlagArgument { .. }));
    }

    #[test]
    fn test_missing_required_flags_collects_all() {
        let group = FlagGroup::new()
            .with_flag(FlagSpec::long("reason").with_argument(ArgType::STRING).required())
            .with_flag(FlagSpec::short("t").required())
            .with_flag(FlagSpec::long("silent"));
        let result = parse(&tokens(&["Steve", "--silent"]), &group, resolve);
        assert_eq!(
            result,
            ParseResult::MissingRequiredFlags {
                keys: vec!["reason".to_string(), "t".to_string()],
            }
        );
    }

    #[test]
    fn test_repeated_flag_takes_last_value() {
        let flags = parse(
            &tokens(&["--reason=a", "-s", "--reason=b"]),
            &ban_group(),
            resolve,
        )
        .into_flags().unwrap();
        assert_eq!(flags.str("reason"), Some("b"));
        assert_eq!(flags.keys(), vec!["reason", "silent"]);
    }

    #[test]
    fn test_ignore_case_option() {
        let group = ban_group();
        let exact = FlagParser::new(&group).parse(&tokens(&["--SILENT"]), resolve);
        assert!(!exact.into_flags().unwrap().has("silent"));

        let relaxed = FlagParser::new(&group)
            .ignore_case(true)
            .parse(&tokens(&["--SILENT"]), resolve);
        assert!(relaxed.into_flags().unwrap().has("silent"));
    }

    #[test]
    fn test_find_token() {
        let group = ban_group();
        assert_eq!(group.find_token("--reason=x", false).map(FlagSpec::key), Some("reason"));
        assert_eq!(group.find_token("-s", false).map(FlagSpec::key), Some("silent"));
        assert!(group.find_token("--", false).is_none());
        assert!(group.find_token("reason", false).is_none());
    }

    #[test]
    fn test_all_names() {
        assert_eq!(ban_group().all_names(), vec!["--reason", "-r", "--silent", "-s"]);
    }

    #[test]
    fn test_cursor_rewind() {
        let raw = tokens(&["a", "b"]);
        let mut cursor = TokenCursor::new(&raw);
        assert_eq!(cursor.advance(), Some("a"));
        cursor.rewind();
        assert_eq!(cursor.peek(), Some("a"));
        cursor.rewind();
        assert_eq!(cursor.advance(), Some("a"));
        assert_eq!(cursor.advance(), Some("b"));
        assert_eq!(cursor.advance(), None);
    }
}
