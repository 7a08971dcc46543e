//! Registration-time checks on subcommand declarations.

use std::collections::HashSet;

use crate::error::RegistrationError;
use crate::flags::FlagGroup;
use crate::resolver::ArgumentResolvers;
use crate::sender::SenderValidator;
use crate::spec::{ArgumentSpec, Parameter, SubCommandSpec};
use crate::value::{ArgType, FLAGS_ARGUMENT, NAMED_ARGUMENT};

/// Checks a subcommand's names, parameter list, sender constraint and
/// argument types.
pub fn validate_subcommand<S>(
    subcommand: &SubCommandSpec<S>,
    senders: &dyn SenderValidator<S>,
    resolvers: &ArgumentResolvers<S>,
) -> Result<(), RegistrationError> {
    if subcommand.name.trim().is_empty() || subcommand.aliases.iter().any(|a| a.trim().is_empty()) {
        return Err(RegistrationError::EmptyName);
    }
    if let Some(kind) = &subcommand.sender {
        if !senders.knows(kind) {
            return Err(RegistrationError::UnknownSenderKind {
                kind: kind.to_string(),
            });
        }
    }
    validate_arguments(&subcommand.arguments)?;
    validate_types(&subcommand.arguments, resolvers)
}

/// Checks the ordering and naming rules of a parameter list.
pub fn validate_arguments(arguments: &[ArgumentSpec]) -> Result<(), RegistrationError> {
    let count = |pred: fn(&ArgumentSpec) -> bool| arguments.iter().filter(|a| pred(a)).count();
    let limitless = count(|a| matches!(a, ArgumentSpec::Limitless(..)));
    let flags = count(|a| matches!(a, ArgumentSpec::Flags(_)));
    let named = count(|a| matches!(a, ArgumentSpec::Named(_)));

    if limitless > 1 {
        return Err(RegistrationError::MultipleLimitless);
    }
    if flags > 1 {
        return Err(RegistrationError::DuplicateFlags);
    }
    if named > 1 {
        return Err(RegistrationError::NamedNotLast);
    }
    if named > 0 && (limitless > 0 || flags > 0) {
        return Err(RegistrationError::NamedWithTail);
    }

    let last = arguments.len().saturating_sub(1);
    for (index, argument) in arguments.iter().enumerate() {
        let rest = &arguments[index + 1..];
        if let Some(parameter) = argument.parameter() {
            if parameter.name == FLAGS_ARGUMENT || parameter.name == NAMED_ARGUMENT {
                return Err(RegistrationError::ReservedName {
                    name: parameter.name.clone(),
                });
            }
        }
        match argument {
            ArgumentSpec::Positional(parameter) => validate_single(parameter, rest)?,
            ArgumentSpec::Split(parameter, separator) => {
                if separator.is_empty() {
                    return Err(RegistrationError::EmptySeparator {
                        name: parameter.name.clone(),
                    });
                }
                validate_single(parameter, rest)?;
            }
            ArgumentSpec::Limitless(parameter, _) => {
                let only_flags_follow = match rest {
                    [] => true,
                    [ArgumentSpec::Flags(_)] => true,
                    _ => false,
                };
                if !only_flags_follow {
                    return Err(RegistrationError::LimitlessNotLast {
                        name: parameter.name.clone(),
                    });
                }
            }
            ArgumentSpec::Flags(group) => {
                if group.is_empty() {
                    return Err(RegistrationError::EmptyFlagGroup);
                }
                if index != last {
                    return Err(RegistrationError::FlagsNotLast);
                }
                validate_flag_group(group)?;
            }
            ArgumentSpec::Named(group) => {
                if group.is_empty() {
                    return Err(RegistrationError::EmptyNamedGroup);
                }
                if index != last {
                    return Err(RegistrationError::NamedNotLast);
                }
                if let Some(spec) = group.iter().find(|s| s.separator() == Some("")) {
                    return Err(RegistrationError::EmptySeparator {
                        name: spec.name().to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// An optional single-token argument binds left to right, so nothing after
/// it may require a token, and it must not sit in front of a flags or named
/// block whose tokens it would take.
fn validate_single(parameter: &Parameter, rest: &[ArgumentSpec]) -> Result<(), RegistrationError> {
    if !parameter.optional {
        return Ok(());
    }
    if rest.iter().any(|a| !a.is_optional()) {
        return Err(RegistrationError::OptionalNotLast {
            name: parameter.name.clone(),
        });
    }
    if rest
        .iter()
        .any(|a| matches!(a, ArgumentSpec::Flags(_) | ArgumentSpec::Named(_)))
    {
        return Err(RegistrationError::OptionalBeforeTail {
            name: parameter.name.clone(),
        });
    }
    Ok(())
}

/// Checks that every declared type, flag values and named values included,
/// has a resolver.
pub fn validate_types<S>(
    arguments: &[ArgumentSpec],
    resolvers: &ArgumentResolvers<S>,
) -> Result<(), RegistrationError> {
    let known = |name: &str, arg_type: &ArgType| {
        if resolvers.contains(arg_type) {
            Ok(())
        } else {
            Err(RegistrationError::UnknownArgumentType {
                name: name.to_string(),
                arg_type: arg_type.clone(),
            })
        }
    };

    for argument in arguments {
        match argument {
            ArgumentSpec::Positional(p) | ArgumentSpec::Split(p, _) | ArgumentSpec::Limitless(p, _) => {
                known(&p.name, &p.arg_type)?;
            }
            ArgumentSpec::Flags(group) => {
                for flag in group.iter() {
                    if let Some(arg_type) = flag.argument_type() {
                        known(flag.key(), arg_type)?;
                    }
                }
            }
            ArgumentSpec::Named(group) => {
                for spec in group.iter() {
                    known(spec.name(), spec.arg_type())?;
                }
            }
        }
    }
    Ok(())
}

/// Checks every key of a flag group and rejects duplicates.
pub fn validate_flag_group(group: &FlagGroup) -> Result<(), RegistrationError> {
    let mut seen = HashSet::new();
    for flag in group.iter() {
        if flag.short_key().is_none() && flag.long_key().is_none() {
            return Err(RegistrationError::MissingFlagKey);
        }
        for key in flag.short_key().into_iter().chain(flag.long_key()) {
            validate_flag_key(key)?;
            if !seen.insert(key) {
                return Err(RegistrationError::DuplicateFlagKey {
                    key: key.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// A one-character key may be alphanumeric, `_`, `?` or `@`. Longer keys
/// may contain alphanumerics, `_` and `-`.
pub fn validate_flag_key(key: &str) -> Result<(), RegistrationError> {
    let mut chars = key.chars();
    let valid = match (chars.next(), chars.next()) {
        (None, _) => false,
        (Some(c), None) => c.is_alphanumeric() || matches!(c, '_' | '?' | '@'),
        _ => key
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-')),
    };
    if valid {
        Ok(())
    } else {
        Err(RegistrationError::InvalidFlagKey {
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FlagSpec;
    use crate::named::{NamedGroup, NamedSpec};
    use crate::sender::{AnySender, KindValidator, SenderKind};
    use crate::value::{ArgValue, Arguments};

    fn pos(name: &str) -> ArgumentSpec {
        ArgumentSpec::positional(name, ArgType::STRING)
    }

    fn flags() -> ArgumentSpec {
        ArgumentSpec::flags(FlagGroup::new().with_flag(FlagSpec::long("silent").with_short("s")))
    }

    fn named() -> ArgumentSpec {
        ArgumentSpec::named(NamedGroup::new().with_argument(NamedSpec::new("motd", ArgType::STRING)))
    }

    #[test]
    fn test_accepts_valid_lists() {
        assert_eq!(validate_arguments(&[]), Ok(()));
        assert_eq!(validate_arguments(&[pos("a"), pos("b").optional()]), Ok(()));
        assert_eq!(
            validate_arguments(&[pos("a").optional(), pos("b").optional()]),
            Ok(())
        );
        assert_eq!(
            validate_arguments(&[pos("a").optional(), ArgumentSpec::joined("rest").optional()]),
            Ok(())
        );
        assert_eq!(
            validate_arguments(&[pos("a"), ArgumentSpec::joined("rest"), flags()]),
            Ok(())
        );
        assert_eq!(
            validate_arguments(&[ArgumentSpec::joined("rest").optional(), flags()]),
            Ok(())
        );
        assert_eq!(validate_arguments(&[pos("a"), named()]), Ok(()));
        assert_eq!(
            validate_arguments(&[ArgumentSpec::split("a", ArgType::STRING, ","), flags()]),
            Ok(())
        );
    }

    #[test]
    fn test_rejects_optional_before_required() {
        assert_eq!(
            validate_arguments(&[pos("a").optional(), pos("b")]),
            Err(RegistrationError::OptionalNotLast { name: "a".into() })
        );
        assert_eq!(
            validate_arguments(&[pos("target").optional(), ArgumentSpec::joined("message")]),
            Err(RegistrationError::OptionalNotLast {
                name: "target".into()
            })
        );
        assert_eq!(
            validate_arguments(&[
                ArgumentSpec::split("a", ArgType::STRING, ",").optional(),
                pos("b"),
            ]),
            Err(RegistrationError::OptionalNotLast { name: "a".into() })
        );
    }

    #[test]
    fn test_rejects_optional_before_flags_or_named() {
        assert_eq!(
            validate_arguments(&[pos("player").optional(), flags()]),
            Err(RegistrationError::OptionalBeforeTail {
                name: "player".into()
            })
        );
        assert_eq!(
            validate_arguments(&[pos("player").optional(), named()]),
            Err(RegistrationError::OptionalBeforeTail {
                name: "player".into()
            })
        );
    }

    #[test]
    fn test_rejects_reserved_names() {
        for name in [FLAGS_ARGUMENT, NAMED_ARGUMENT] {
            assert_eq!(
                validate_arguments(&[pos(name)]),
                Err(RegistrationError::ReservedName { name: name.into() })
            );
        }
        assert_eq!(
            validate_arguments(&[ArgumentSpec::joined("flags"), flags()]),
            Err(RegistrationError::ReservedName {
                name: "flags".into()
            })
        );
    }

    #[test]
    fn test_rejects_empty_separators() {
        assert_eq!(
            validate_arguments(&[ArgumentSpec::split("names", ArgType::STRING, "")]),
            Err(RegistrationError::EmptySeparator {
                name: "names".into()
            })
        );
        let group = NamedGroup::new()
            .with_argument(NamedSpec::new("admins", ArgType::STRING).with_separator(""));
        assert_eq!(
            validate_arguments(&[ArgumentSpec::named(group)]),
            Err(RegistrationError::EmptySeparator {
                name: "admins".into()
            })
        );
    }

    #[test]
    fn test_unknown_argument_types() {
        let resolvers = ArgumentResolvers::<()>::new();
        let location = ArgType::new("location");

        assert_eq!(
            validate_types(&[ArgumentSpec::positional("where", location.clone())], &resolvers),
            Err(RegistrationError::UnknownArgumentType {
                name: "where".into(),
                arg_type: location.clone(),
            })
        );
        assert_eq!(
            validate_types(&[ArgumentSpec::limitless("stops", location.clone())], &resolvers),
            Err(RegistrationError::UnknownArgumentType {
                name: "stops".into(),
                arg_type: location.clone(),
            })
        );
        let flag =
            FlagGroup::new().with_flag(FlagSpec::long("to").with_optional_argument(location.clone()));
        assert_eq!(
            validate_types(&[ArgumentSpec::flags(flag)], &resolvers),
            Err(RegistrationError::UnknownArgumentType {
                name: "to".into(),
                arg_type: location.clone(),
            })
        );
        let group = NamedGroup::new().with_argument(NamedSpec::list("via", location.clone()));
        assert_eq!(
            validate_types(&[ArgumentSpec::named(group)], &resolvers),
            Err(RegistrationError::UnknownArgumentType {
                name: "via".into(),
                arg_type: location.clone(),
            })
        );

        let mut resolvers = resolvers;
        resolvers.register(location.clone(), |_, raw| Some(ArgValue::from(raw)));
        assert_eq!(
            validate_types(&[ArgumentSpec::positional("where", location)], &resolvers),
            Ok(())
        );
        assert_eq!(validate_types(&[flags(), pos("a")], &resolvers), Ok(()));
    }

    #[test]
    fn test_rejects_two_limitless() {
        assert_eq!(
            validate_arguments(&[ArgumentSpec::joined("a"), ArgumentSpec::joined("b")]),
            Err(RegistrationError::MultipleLimitless)
        );
    }

    #[test]
    fn test_rejects_limitless_followed_by_more_than_flags() {
        assert_eq!(
            validate_arguments(&[ArgumentSpec::joined("a"), pos("b")]),
            Err(RegistrationError::LimitlessNotLast { name: "a".into() })
        );
        assert_eq!(
            validate_arguments(&[ArgumentSpec::joined("a"), flags(), pos("b")]),
            Err(RegistrationError::LimitlessNotLast { name: "a".into() })
        );
    }

    #[test]
    fn test_rejects_flags_errors() {
        assert_eq!(
            validate_arguments(&[ArgumentSpec::flags(FlagGroup::new())]),
            Err(RegistrationError::EmptyFlagGroup)
        );
        assert_eq!(
            validate_arguments(&[flags(), flags()]),
            Err(RegistrationError::DuplicateFlags)
        );
        assert_eq!(
            validate_arguments(&[flags(), pos("a")]),
            Err(RegistrationError::FlagsNotLast)
        );
    }

    #[test]
    fn test_rejects_named_errors() {
        assert_eq!(
            validate_arguments(&[ArgumentSpec::named(NamedGroup::new())]),
            Err(RegistrationError::EmptyNamedGroup)
        );
        assert_eq!(
            validate_arguments(&[named(), pos("a")]),
            Err(RegistrationError::NamedNotLast)
        );
        assert_eq!(
            validate_arguments(&[named(), flags()]),
            Err(RegistrationError::NamedWithTail)
        );
    }

    #[test]
    fn test_flag_keys() {
        for key in ["s", "?", "@", "_", "7", "reason", "dry-run", "max_items"] {
            assert_eq!(validate_flag_key(key), Ok(()), "{key}");
        }
        for key in ["", "-", "a b", "re=ason", "x?"] {
            assert!(validate_flag_key(key).is_err(), "{key}");
        }
    }

    #[test]
    fn test_duplicate_flag_keys() {
        let group = FlagGroup::new()
            .with_flag(FlagSpec::long("silent").with_short("s"))
            .with_flag(FlagSpec::long("skip").with_short("s"));
        assert_eq!(
            validate_flag_group(&group),
            Err(RegistrationError::DuplicateFlagKey { key: "s".into() })
        );
    }

    #[test]
    fn test_sender_kind_must_be_known() {
        let player = SenderKind::new("player");
        let sub = SubCommandSpec::new("home", |_: &(), _: &Arguments| Ok(()))
            .with_sender(player.clone());

        assert_eq!(
            validate_subcommand(&sub, &AnySender, &ArgumentResolvers::new()),
            Err(RegistrationError::UnknownSenderKind {
                kind: "player".into()
            })
        );

        let validator = KindValidator::new().with_kind(player, |_: &()| true);
        assert_eq!(
            validate_subcommand(&sub, &validator, &ArgumentResolvers::new()),
            Ok(())
        );
    }

    #[test]
    fn test_empty_names() {
        let sub = SubCommandSpec::new(" ", |_: &(), _: &Arguments| Ok(()));
        assert_eq!(
            validate_subcommand(&sub, &AnySender, &ArgumentResolvers::new()),
            Err(RegistrationError::EmptyName)
        );
    }
}
