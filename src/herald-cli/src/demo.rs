//! Demonstration command set for the terminal.
//!
//! Every argument kind the dispatcher supports is exercised by at least one
//! command here. State lives in a shared [`World`] so handlers stay plain
//! closures.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use herald_core::{
    ArgType, ArgValue, ArgumentSpec, Arguments, CommandMeta, CommandSpec, Dispatcher,
    ExecutionProvider, FlagGroup, FlagSpec, KindValidator, MessageKey, NamedGroup, NamedSpec,
    RegistrationReport, Requirement, SenderKind, SubCommandSpec, SuggestionContext, SuggestionKey,
};
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::sink::ConsoleSink;

pub const OPERATOR: SenderKind = SenderKind::new("operator");

pub const PLAYERS: SuggestionKey = SuggestionKey::new("players");
pub const GAMEMODE: ArgType = ArgType::new("gamemode");

const GAMEMODES: &[&str] = &["survival", "creative", "adventure", "spectator"];

// ============================================================================
// SENDERS
// ============================================================================

/// The raw caller: whoever sits at the terminal.
#[derive(Debug, Clone)]
pub struct TerminalSender {
    pub user: String,
    pub operator: bool,
}

impl TerminalSender {
    /// The local user, taken from `$USER` or `$USERNAME`.
    pub fn local(operator: bool) -> Self {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "console".to_string());
        Self { user, operator }
    }
}

/// Domain sender handed to handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleUser {
    pub name: String,
    pub operator: bool,
}

pub fn map_sender(raw: &TerminalSender) -> ConsoleUser {
    ConsoleUser {
        name: raw.user.clone(),
        operator: raw.operator,
    }
}

fn sender_kinds() -> KindValidator<ConsoleUser> {
    KindValidator::new().with_kind(OPERATOR, |user: &ConsoleUser| user.operator)
}

fn operator_only() -> Requirement<ConsoleUser> {
    Requirement::new("operator", |user: &ConsoleUser, _: &CommandMeta| user.operator)
        .with_message(MessageKey::NO_PERMISSION)
}

// ============================================================================
// WORLD
// ============================================================================

/// State the demo commands read and write.
#[derive(Debug)]
pub struct World {
    online: Vec<String>,
    inventory: Mutex<BTreeMap<String, i64>>,
    banned: Mutex<Vec<String>>,
    settings: Mutex<BTreeMap<String, String>>,
    gamemodes: Mutex<BTreeMap<String, String>>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            online: vec!["Steve".to_string(), "Alex".to_string(), "Notch".to_string()],
            inventory: Mutex::default(),
            banned: Mutex::default(),
            settings: Mutex::default(),
            gamemodes: Mutex::default(),
        }
    }
}

impl World {
    pub fn online(&self) -> &[String] {
        &self.online
    }

    pub fn inventory(&self, player: &str) -> i64 {
        lock(&self.inventory).get(player).copied().unwrap_or_default()
    }

    pub fn banned(&self) -> Vec<String> {
        lock(&self.banned).clone()
    }

    pub fn setting(&self, key: &str) -> Option<String> {
        lock(&self.settings).get(key).cloned()
    }

    pub fn gamemode(&self, player: &str) -> Option<String> {
        lock(&self.gamemodes).get(player).cloned()
    }

    fn require_online(&self, player: &str) -> anyhow::Result<String> {
        self.online
            .iter()
            .find(|p| p.eq_ignore_ascii_case(player))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("player `{player}` is not online"))
    }
}

/// Recovers the data of a poisoned lock; a panicking handler is already
/// reported by the dispatcher.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// SETUP
// ============================================================================

pub type DemoDispatcher = Dispatcher<TerminalSender, ConsoleUser>;

/// Builds a dispatcher wired to the console sink.
pub fn dispatcher(
    config: &CliConfig,
    async_execution: impl ExecutionProvider + 'static,
) -> Result<DemoDispatcher, herald_core::ConfigError> {
    Dispatcher::<TerminalSender, ConsoleUser>::builder(map_sender)
        .with_config(config.dispatcher.clone())
        .with_sender_validator(sender_kinds())
        .with_sink(ConsoleSink)
        .with_async_execution(async_execution)
        .build()
}

/// Registers the demonstration commands.
pub fn register(dispatcher: &mut DemoDispatcher, world: &Arc<World>) {
    let online = Arc::clone(world);
    dispatcher.register_suggestion(PLAYERS, move |_: &SuggestionContext<'_, ConsoleUser>| {
        online.online().to_vec()
    });
    dispatcher.register_enum(GAMEMODE, GAMEMODES);

    let reports = [
        dispatcher.register_command(give(world)),
        dispatcher.register_command(ban(world)),
        dispatcher.register_command(kick(world)),
        dispatcher.register_command(tp(world)),
        dispatcher.register_command(gamemode(world)),
        dispatcher.register_command(broadcast()),
        dispatcher.register_command(config(world)),
        dispatcher.register_command(sleep()),
    ];
    for report in &reports {
        log_report(report);
    }
}

fn log_report(report: &RegistrationReport) {
    for rejected in &report.rejected {
        warn!(
            command = %report.command,
            subcommand = %rejected.subcommand,
            error = %rejected.error,
            "Demo subcommand rejected"
        );
    }
    if report.is_registered() {
        info!(command = %report.command, subcommands = ?report.accepted, "Registered");
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn give(world: &Arc<World>) -> CommandSpec<ConsoleUser> {
    let world = Arc::clone(world);
    CommandSpec::new("give")
        .with_description("Give items to a player")
        .with_subcommand(
            SubCommandSpec::default_for(move |_: &ConsoleUser, args: &Arguments| {
                let player = world.require_online(args.str("name").unwrap_or_default())?;
                let amount = args.int("amount").unwrap_or_default();
                if amount <= 0 {
                    anyhow::bail!("amount must be positive, got {amount}");
                }
                let total = {
                    let mut inventory = lock(&world.inventory);
                    let entry = inventory.entry(player.clone()).or_default();
                    *entry += amount;
                    *entry
                };
                println!("Gave {amount} to {player} ({total} total)");
                Ok(())
            })
            .with_argument(ArgumentSpec::positional("name", ArgType::STRING).with_suggestion(PLAYERS))
            .with_argument(ArgumentSpec::positional("amount", ArgType::INT).with_default(1_i64)),
        )
}

fn ban(world: &Arc<World>) -> CommandSpec<ConsoleUser> {
    let world = Arc::clone(world);
    let flags = FlagGroup::new()
        .with_flag(
            FlagSpec::long("reason")
                .with_short("r")
                .with_argument(ArgType::STRING)
                .required()
                .with_description("Why the players are banned"),
        )
        .with_flag(
            FlagSpec::long("days")
                .with_short("d")
                .with_optional_argument(ArgType::INT)
                .with_description("Ban length; permanent when absent"),
        )
        .with_flag(FlagSpec::long("silent").with_short("s"));

    CommandSpec::new("ban")
        .with_description("Ban one or more players")
        .with_subcommand(
            SubCommandSpec::default_for(move |user: &ConsoleUser, args: &Arguments| {
                let Some(flags) = args.flags() else {
                    anyhow::bail!("flags were not bound");
                };
                if flags.leftovers().is_empty() {
                    anyhow::bail!("name at least one player to ban");
                }
                let reason = flags.str("reason").unwrap_or_default();
                let length = match flags.int("days") {
                    Some(days) => format!("{days} days"),
                    None => "good".to_string(),
                };
                lock(&world.banned).extend(flags.leftovers().iter().cloned());
                if !flags.has("silent") {
                    println!(
                        "{} banned {} for {length}: {reason}",
                        user.name,
                        flags.leftovers().join(", ")
                    );
                }
                Ok(())
            })
            .with_sender(OPERATOR)
            .with_argument(ArgumentSpec::flags(flags)),
        )
}

fn kick(world: &Arc<World>) -> CommandSpec<ConsoleUser> {
    let world = Arc::clone(world);
    CommandSpec::new("kick")
        .with_description("Disconnect players, e.g. `kick Steve,Alex too loud`")
        .with_subcommand(
            SubCommandSpec::default_for(move |_: &ConsoleUser, args: &Arguments| {
                let players = args
                    .list("players")
                    .unwrap_or_default()
                    .iter()
                    .filter_map(ArgValue::as_str)
                    .map(|player| world.require_online(player))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                let reason = args.str("reason").unwrap_or_default();
                println!("Kicked {}: {reason}", players.join(", "));
                Ok(())
            })
            .with_requirement(operator_only())
            .with_argument(
                ArgumentSpec::split("players", ArgType::STRING, ",").with_suggestion(PLAYERS),
            )
            .with_argument(ArgumentSpec::joined("reason").with_default("Kicked by an operator")),
        )
}

fn tp(world: &Arc<World>) -> CommandSpec<ConsoleUser> {
    let world = Arc::clone(world);
    CommandSpec::new("tp")
        .with_alias("teleport")
        .with_subcommand(
            SubCommandSpec::default_for(move |user: &ConsoleUser, args: &Arguments| {
                let target = world.require_online(args.str("target").unwrap_or_default())?;
                println!("Teleported {} to {target}", user.name);
                Ok(())
            })
            .with_requirement(operator_only())
            .with_argument(
                ArgumentSpec::positional("target", ArgType::STRING).with_suggestion(PLAYERS),
            ),
        )
}

fn gamemode(world: &Arc<World>) -> CommandSpec<ConsoleUser> {
    let world = Arc::clone(world);
    CommandSpec::new("gamemode")
        .with_alias("gm")
        .with_subcommand(
            SubCommandSpec::default_for(move |user: &ConsoleUser, args: &Arguments| {
                let mode = args.str("mode").unwrap_or_default().to_string();
                let player = match args.str("player") {
                    Some(player) => world.require_online(player)?,
                    None => user.name.clone(),
                };
                println!("Set {player}'s game mode to {mode}");
                lock(&world.gamemodes).insert(player, mode);
                Ok(())
            })
            .with_argument(ArgumentSpec::positional("mode", GAMEMODE))
            .with_argument(
                ArgumentSpec::positional("player", ArgType::STRING)
                    .optional()
                    .with_suggestion(PLAYERS),
            ),
        )
}

fn broadcast() -> CommandSpec<ConsoleUser> {
    CommandSpec::new("broadcast")
        .with_alias("say")
        .with_subcommand(
            SubCommandSpec::default_for(|user: &ConsoleUser, args: &Arguments| {
                println!("[{}] {}", user.name, args.str("message").unwrap_or_default());
                Ok(())
            })
            .with_argument(ArgumentSpec::joined("message")),
        )
}

fn config(world: &Arc<World>) -> CommandSpec<ConsoleUser> {
    let writer = Arc::clone(world);
    let reader = Arc::clone(world);
    let settings = NamedGroup::new()
        .with_argument(NamedSpec::new("motd", ArgType::STRING).with_description("Message of the day"))
        .with_argument(NamedSpec::new("slots", ArgType::INT))
        .with_argument(NamedSpec::new("pvp", ArgType::BOOL))
        .with_argument(NamedSpec::new("mode", GAMEMODE))
        .with_argument(NamedSpec::list("admins", ArgType::STRING).with_suggestion(PLAYERS));

    CommandSpec::new("config")
        .with_description("Show or change server settings")
        .with_subcommand(
            SubCommandSpec::new("set", move |_: &ConsoleUser, args: &Arguments| {
                let Some(named) = args.named().filter(|n| !n.is_empty()) else {
                    anyhow::bail!("nothing to set");
                };
                let mut settings = lock(&writer.settings);
                for (key, value) in named.iter() {
                    let text = display_value(value);
                    println!("{key} = {text}");
                    settings.insert(key.to_string(), text);
                }
                Ok(())
            })
            .with_requirement(operator_only())
            .with_argument(ArgumentSpec::named(settings)),
        )
        .with_subcommand(
            SubCommandSpec::new("show", move |_: &ConsoleUser, _: &Arguments| {
                let settings = lock(&reader.settings);
                if settings.is_empty() {
                    println!("(no settings)");
                }
                for (key, value) in settings.iter() {
                    println!("{key} = {value}");
                }
                Ok(())
            })
            .with_alias("list"),
        )
}

fn sleep() -> CommandSpec<ConsoleUser> {
    CommandSpec::new("sleep").with_subcommand(
        SubCommandSpec::default_for(|user: &ConsoleUser, args: &Arguments| {
            let millis = args.int("millis").unwrap_or_default();
            let millis = u64::try_from(millis)
                .map_err(|_| anyhow::anyhow!("cannot sleep for {millis} ms"))?;
            std::thread::sleep(Duration::from_millis(millis));
            println!("{} woke up after {millis} ms", user.name);
            Ok(())
        })
        .with_argument(ArgumentSpec::positional("millis", ArgType::INT))
        .asynchronous(),
    )
}

fn display_value(value: &ArgValue) -> String {
    match value {
        ArgValue::Str(s) => s.clone(),
        ArgValue::Int(n) => n.to_string(),
        ArgValue::Float(n) => n.to_string(),
        ArgValue::Bool(b) => b.to_string(),
        ArgValue::List(items) => items.iter().map(display_value).collect::<Vec<_>>().join(","),
        other => format!("{other:?}"),
    }
}
