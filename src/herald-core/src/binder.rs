//! Binds tokens to a subcommand's parameter list.

use tracing::debug;

use crate::error::DispatchFailure;
use crate::flags::{FlagGroup, FlagParser, ParseResult, ParsedFlags};
use crate::named;
use crate::resolver::ArgumentResolvers;
use crate::spec::{ArgumentSpec, LimitlessKind, Parameter};
use crate::value::{ArgValue, Arguments, FLAGS_ARGUMENT, NAMED_ARGUMENT, split_list};

pub(crate) struct Binder<'a, S> {
    pub(crate) resolvers: &'a ArgumentResolvers<S>,
    pub(crate) escape_marker: char,
    pub(crate) ignore_flag_case: bool,
}

impl<S> Binder<'_, S> {
    /// Converts `tokens` into one value (or absence) per declared argument.
    pub(crate) fn bind(
        &self,
        sender: &S,
        arguments: &[ArgumentSpec],
        tokens: &[String],
    ) -> Result<Arguments, DispatchFailure> {
        let mut bound = Arguments::new();
        let mut position = 0;

        for (index, argument) in arguments.iter().enumerate() {
            let rest = &tokens[position..];
            match argument {
                ArgumentSpec::Positional(parameter) => {
                    let value = match rest.first() {
                        Some(raw) => {
                            position += 1;
                            Some(self.convert(sender, parameter, raw)?)
                        }
                        None => absent(parameter)?,
                    };
                    bound.push(&parameter.name, value);
                }
                ArgumentSpec::Split(parameter, separator) => {
                    let value = match rest.first() {
                        Some(raw) => {
                            position += 1;
                            let items = split_list(raw, separator)
                                .map(|part| self.convert(sender, parameter, part))
                                .collect::<Result<_, _>>()?;
                            Some(ArgValue::List(items))
                        }
                        None => absent(parameter)?,
                    };
                    bound.push(&parameter.name, value);
                }
                ArgumentSpec::Limitless(parameter, kind) => {
                    position = tokens.len();
                    // Flags after a limitless are parsed first; the limitless
                    // takes what the flag parser leaves over.
                    if let Some(ArgumentSpec::Flags(group)) = arguments.get(index + 1) {
                        let mut flags = self.parse_flags(sender, group, rest)?;
                        let leftovers = flags.take_leftovers();
                        let value = self.bind_limitless(sender, parameter, kind, &leftovers)?;
                        bound.push(&parameter.name, value);
                        bound.push(FLAGS_ARGUMENT, Some(ArgValue::Flags(flags)));
                        break;
                    }
                    let value = self.bind_limitless(sender, parameter, kind, rest)?;
                    bound.push(&parameter.name, value);
                }
                ArgumentSpec::Flags(group) => {
                    position = tokens.len();
                    let flags = self.parse_flags(sender, group, rest)?;
                    bound.push(FLAGS_ARGUMENT, Some(ArgValue::Flags(flags)));
                }
                ArgumentSpec::Named(group) => {
                    position = tokens.len();
                    let parsed = named::parse(rest, group, |arg_type, raw| {
                        self.resolvers.resolve(sender, arg_type, raw)
                    })
                    .map_err(|invalid| DispatchFailure::InvalidArgument {
                        raw: invalid.raw,
                        name: invalid.name,
                        arg_type: invalid.arg_type,
                    })?;
                    bound.push(NAMED_ARGUMENT, Some(ArgValue::Named(parsed)));
                }
            }
        }

        if position < tokens.len() {
            return Err(DispatchFailure::TooManyArguments {
                unexpected: tokens[position..].to_vec(),
            });
        }

        debug!(arguments = bound.len(), tokens = tokens.len(), "Bound arguments");
        Ok(bound)
    }

    fn convert(&self, sender: &S, parameter: &Parameter, raw: &str) -> Result<ArgValue, DispatchFailure> {
        self.resolvers
            .resolve(sender, &parameter.arg_type, raw)
            .ok_or_else(|| DispatchFailure::InvalidArgument {
                raw: raw.to_string(),
                name: parameter.name.clone(),
                arg_type: parameter.arg_type.clone(),
            })
    }

    fn bind_limitless(
        &self,
        sender: &S,
        parameter: &Parameter,
        kind: &LimitlessKind,
        tokens: &[String],
    ) -> Result<Option<ArgValue>, DispatchFailure> {
        if tokens.is_empty() {
            return absent(parameter);
        }

        let value = match kind {
            LimitlessKind::Joined(delimiter) => {
                self.convert(sender, parameter, &tokens.join(delimiter.as_str()))?
            }
            LimitlessKind::Sequence => ArgValue::List(
                tokens
                    .iter()
                    .map(|raw| self.convert(sender, parameter, raw))
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(Some(value))
    }

    fn parse_flags(
        &self,
        sender: &S,
        group: &FlagGroup,
        tokens: &[String],
    ) -> Result<ParsedFlags, DispatchFailure> {
        let result = FlagParser::new(group)
            .escape_marker(self.escape_marker)
            .ignore_case(self.ignore_flag_case)
            .parse(tokens, |arg_type, raw| self.resolvers.resolve(sender, arg_type, raw));

        match result {
            ParseResult::Success(flags) => Ok(flags),
            ParseResult::MissingRequiredFlagArgument { key, arg_type } => {
                Err(DispatchFailure::MissingRequiredFlagArgument { key, arg_type })
            }
            ParseResult::InvalidFlagArgument { key, raw, arg_type } => {
                Err(DispatchFailure::InvalidFlagArgument { key, raw, arg_type })
            }
            ParseResult::MissingRequiredFlags { keys } => {
                Err(DispatchFailure::MissingRequiredFlags { keys })
            }
        }
    }
}

/// Value bound for a parameter that received no token.
fn absent(parameter: &Parameter) -> Result<Option<ArgValue>, DispatchFailure> {
    match (&parameter.default_value, parameter.optional) {
        (Some(default), _) => Ok(Some(default.clone())),
        (None, true) => Ok(None),
        (None, false) => Err(DispatchFailure::NotEnoughArguments {
            argument: parameter.name.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FlagSpec;
    use crate::named::{NamedGroup, NamedSpec};
    use crate::value::ArgType;
    use pretty_assertions::assert_eq;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn bind(arguments: &[ArgumentSpec], raw: &[&str]) -> Result<Arguments, DispatchFailure> {
        let resolvers = ArgumentResolvers::<()>::new();
        let binder = Binder {
            resolvers: &resolvers,
            escape_marker: '\\',
            ignore_flag_case: false,
        };
        binder.bind(&(), arguments, &tokens(raw))
    }

    fn give() -> Vec<ArgumentSpec> {
        vec![
            ArgumentSpec::positional("name", ArgType::STRING),
            ArgumentSpec::positional("amount", ArgType::INT),
        ]
    }

    #[test]
    fn test_positionals_in_order() {
        let bound = bind(&give(), &["Steve", "64"]).unwrap();
        assert_eq!(
            bound.values(),
            vec![Some(&ArgValue::from("Steve")), Some(&ArgValue::Int(64))]
        );
    }

    #[test]
    fn test_not_enough_and_too_many() {
        assert_eq!(
            bind(&give(), &["Steve"]).unwrap_err(),
            DispatchFailure::NotEnoughArguments {
                argument: "amount".into()
            }
        );
        assert_eq!(
            bind(&give(), &["Steve", "1", "extra", "more"]).unwrap_err(),
            DispatchFailure::TooManyArguments {
                unexpected: tokens(&["extra", "more"])
            }
        );
    }

    #[test]
    fn test_invalid_argument() {
        assert_eq!(
            bind(&give(), &["Steve", "lots"]).unwrap_err(),
            DispatchFailure::InvalidArgument {
                raw: "lots".into(),
                name: "amount".into(),
                arg_type: ArgType::INT,
            }
        );
    }

    #[test]
    fn test_trailing_optional_present_or_absent() {
        let arguments = vec![
            ArgumentSpec::positional("target", ArgType::STRING),
            ArgumentSpec::positional("distance", ArgType::INT).optional(),
        ];
        let bound = bind(&arguments, &["Alex"]).unwrap();
        assert_eq!(bound.len(), 2);
        assert_eq!(bound.int("distance"), None);

        let bound = bind(&arguments, &["Alex", "5"]).unwrap();
        assert_eq!(bound.int("distance"), Some(5));
    }

    #[test]
    fn test_limitless_kinds() {
        let joined = [ArgumentSpec::joined("message")];
        let bound = bind(&joined, &["hello", "there"]).unwrap();
        assert_eq!(bound.str("message"), Some("hello there"));
        assert!(matches!(
            bind(&joined, &[]),
            Err(DispatchFailure::NotEnoughArguments { .. })
        ));

        let sequence = [ArgumentSpec::limitless("amounts", ArgType::INT).optional()];
        let bound = bind(&sequence, &["1", "2"]).unwrap();
        assert_eq!(
            bound.list("amounts"),
            Some(&[ArgValue::Int(1), ArgValue::Int(2)][..])
        );
        assert_eq!(bind(&sequence, &[]).unwrap().get("amounts"), None);
        assert!(matches!(
            bind(&sequence, &["1", "x"]),
            Err(DispatchFailure::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_defaults_fill_missing_tokens() {
        let arguments = vec![
            ArgumentSpec::positional("name", ArgType::STRING),
            ArgumentSpec::positional("amount", ArgType::INT).with_default(1_i64),
        ];
        assert_eq!(bind(&arguments, &["Steve"]).unwrap().int("amount"), Some(1));
        assert_eq!(bind(&arguments, &["Steve", "8"]).unwrap().int("amount"), Some(8));

        let joined = [ArgumentSpec::joined("reason").with_default("no reason")];
        assert_eq!(bind(&joined, &[]).unwrap().str("reason"), Some("no reason"));
    }

    #[test]
    fn test_joined_with_delimiter() {
        let arguments = [ArgumentSpec::joined_with("path", "/")];
        let bound = bind(&arguments, &["usr", "local", "bin"]).unwrap();
        assert_eq!(bound.str("path"), Some("usr/local/bin"));
    }

    #[test]
    fn test_split_positional() {
        let arguments = vec![
            ArgumentSpec::split("amounts", ArgType::INT, ","),
            ArgumentSpec::positional("target", ArgType::STRING).optional(),
        ];
        let bound = bind(&arguments, &["1,2,,3", "Alex"]).unwrap();
        assert_eq!(
            bound.list("amounts"),
            Some(&[ArgValue::Int(1), ArgValue::Int(2), ArgValue::Int(3)][..])
        );
        assert_eq!(bound.str("target"), Some("Alex"));

        assert_eq!(
            bind(&arguments, &["1,two"]).unwrap_err(),
            DispatchFailure::InvalidArgument {
                raw: "two".into(),
                name: "amounts".into(),
                arg_type: ArgType::INT,
            }
        );
        assert_eq!(
            bind(&arguments, &[]).unwrap_err(),
            DispatchFailure::NotEnoughArguments {
                argument: "amounts".into()
            }
        );
    }

    #[test]
    fn test_limitless_followed_by_flags() {
        let arguments = vec![
            ArgumentSpec::joined("reason"),
            ArgumentSpec::flags(FlagGroup::new().with_flag(FlagSpec::long("silent").with_short("s"))),
        ];
        let bound = bind(&arguments, &["spamming", "-s", "chat"]).unwrap();
        assert_eq!(bound.str("reason"), Some("spamming chat"));
        let flags = bound.flags().unwrap();
        assert!(flags.has("silent"));
        assert!(flags.leftovers().is_empty());
    }

    #[test]
    fn test_flags_failures_map_one_to_one() {
        let arguments = vec![ArgumentSpec::flags(
            FlagGroup::new()
                .with_flag(FlagSpec::long("reason").with_argument(ArgType::STRING).required())
                .with_flag(FlagSpec::long("days").with_argument(ArgType::INT)),
        )];

        assert_eq!(
            bind(&arguments, &["Steve"]).unwrap_err(),
            DispatchFailure::MissingRequiredFlags {
                keys: vec!["reason".into()]
            }
        );
        assert_eq!(
            bind(&arguments, &["--reason"]).unwrap_err(),
            DispatchFailure::MissingRequiredFlagArgument {
                key: "reason".into(),
                arg_type: ArgType::STRING,
            }
        );
        assert_eq!(
            bind(&arguments, &["--reason=x", "--days=soon"]).unwrap_err(),
            DispatchFailure::InvalidFlagArgument {
                key: "days".into(),
                raw: "soon".into(),
                arg_type: ArgType::INT,
            }
        );
    }

    #[test]
    fn test_named_group() {
        let arguments = vec![ArgumentSpec::named(
            NamedGroup::new().with_argument(NamedSpec::new("slots", ArgType::INT)),
        )];
        let bound = bind(&arguments, &["slots:20"]).unwrap();
        assert_eq!(bound.named().and_then(|n| n.int("slots")), Some(20));

        assert_eq!(
            bind(&arguments, &["slots:many"]).unwrap_err(),
            DispatchFailure::InvalidArgument {
                raw: "many".into(),
                name: "slots".into(),
                arg_type: ArgType::INT,
            }
        );
    }
}
