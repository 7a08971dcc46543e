//! Herald core: command tree, token parser and dispatcher.
//!
//! Commands are declared as immutable [`CommandSpec`] trees and registered
//! on a [`Dispatcher`], which validates each subcommand's parameter list
//! once. At dispatch time the dispatcher selects a subcommand, maps the raw
//! caller to a domain sender, checks requirements, converts the tokens and
//! submits the handler to a sync or async execution provider. Failures are
//! typed ([`DispatchFailure`], [`ExecutionFailure`]) and routed to a
//! [`MessageSink`].
//!
//! ```no_run
//! use herald_core::{ArgType, ArgumentSpec, CommandSpec, Dispatcher, SubCommandSpec};
//!
//! let mut dispatcher = Dispatcher::<(), String>::builder(|_: &()| "console".to_string())
//!     .build()
//!     .unwrap();
//!
//! dispatcher.register_command(
//!     CommandSpec::new("give").with_subcommand(
//!         SubCommandSpec::default_for(|sender: &String, args: &herald_core::Arguments| {
//!             println!("{sender} gives {:?} x{:?}", args.str("name"), args.int("amount"));
//!             Ok(())
//!         })
//!         .with_argument(ArgumentSpec::positional("name", ArgType::STRING))
//!         .with_argument(ArgumentSpec::positional("amount", ArgType::INT)),
//!     ),
//! );
//!
//! let tokens = ["Steve".to_string(), "64".to_string()];
//! dispatcher.dispatch("give", &(), &tokens);
//! ```

mod binder;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod execution;
pub mod flags;
pub mod message;
pub mod named;
pub mod registry;
pub mod requirement;
pub mod resolver;
pub mod sender;
pub mod spec;
pub mod suggestion;
pub mod validate;
pub mod value;

pub use config::DispatcherConfig;
pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherBuilder, RegistrationReport};
pub use error::{
    ConfigError, DispatchFailure, ExecutionFailure, RegistrationError, SubCommandRejection,
};
pub use execution::{AsyncExecution, ExecutionProvider, SyncExecution, Task};
pub use flags::{FlagArgument, FlagGroup, FlagParser, FlagSpec, ParseResult, ParsedFlags};
pub use message::{MessageContext, MessageDetail, MessageKey, MessageSink, TracingSink};
pub use named::{NamedArguments, NamedGroup, NamedSpec};
pub use registry::CommandRegistry;
pub use requirement::{CommandMeta, Requirement};
pub use resolver::ArgumentResolvers;
pub use sender::{AnySender, KindValidator, SenderKind, SenderMapper, SenderValidator};
pub use spec::{
    ArgumentSpec, CommandSpec, ExecutionMode, Handler, LimitlessKind, Parameter, SubCommandSpec,
};
pub use suggestion::{
    SuggestionContext, SuggestionFilter, SuggestionKey, SuggestionMethod, SuggestionRegistry,
};
pub use value::{ArgType, ArgValue, Arguments};
