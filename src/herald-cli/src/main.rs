//! Herald - terminal front-end for the command dispatcher.

mod config;
mod demo;
mod execution;
mod line;
mod sink;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::CliConfig;
use crate::demo::{DemoDispatcher, TerminalSender, World};
use crate::execution::TrackedExecution;

/// Herald command console
#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Dispatch commands typed at a terminal")]
#[command(version)]
struct Args {
    /// Configuration file path (defaults to ./herald.toml when present)
    #[arg(short, long, env = "HERALD_CONFIG")]
    config: Option<PathBuf>,

    /// Log level, overriding the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,

    /// Run without operator rights
    #[arg(long)]
    guest: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Dispatch one line and exit
    Run {
        /// The command line, as one quoted string or as separate words
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        line: Vec<String>,
    },
    /// Print completions for a partially typed line
    Complete {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Tokens of a line given on the command line: one argument is split like a
/// typed line, several are taken as already split.
fn line_tokens(words: &[String], completing: bool) -> Vec<String> {
    match words {
        [single] => line::split_line(single, completing),
        [] if completing => vec![String::new()],
        _ => words.to_vec(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = match CliConfig::discover(args.config.as_deref(), &cwd) {
        Ok(config) => config,
        Err(e) => {
            setup_logging(args.log_level.as_deref().unwrap_or("warn"), args.json_logs);
            error!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = args.log_level.as_deref().unwrap_or(&config.log_level);
    setup_logging(level, args.json_logs || config.json_logs);
    debug!(?config, "Loaded configuration");

    match run(args, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, config: CliConfig) -> anyhow::Result<ExitCode> {
    let execution = TrackedExecution::new(Handle::current());
    let world = Arc::new(World::default());
    let mut dispatcher =
        demo::dispatcher(&config, execution.clone()).context("invalid dispatcher configuration")?;
    demo::register(&mut dispatcher, &world);

    let sender = TerminalSender::local(!args.guest);

    let code = match args.command {
        Some(Command::Run { line: words }) => {
            let outcome = dispatcher.dispatch_tokens(&sender, &line_tokens(&words, false));
            execution.drain().await;
            if outcome.is_submitted() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Some(Command::Complete { line: words }) => {
            let tokens = line_tokens(&words, true);
            for suggestion in line::complete(&dispatcher, &sender, &tokens, config.max_suggestions) {
                println!("{suggestion}");
            }
            ExitCode::SUCCESS
        }
        None => {
            repl(&dispatcher, &sender, &config).await?;
            execution.drain().await;
            ExitCode::SUCCESS
        }
    };
    Ok(code)
}

/// Reads lines from stdin until EOF or `exit`.
///
/// Besides commands, `help` lists usage lines and `?<line>` prints
/// completions for `<line>`.
async fn repl(
    dispatcher: &DemoDispatcher,
    sender: &TerminalSender,
    config: &CliConfig,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", config.prompt);
        std::io::stdout().flush().context("failed to flush stdout")?;

        let Some(input) = lines.next_line().await.context("failed to read stdin")? else {
            println!();
            return Ok(());
        };
        match input.trim() {
            "" => continue,
            "exit" | "quit" => return Ok(()),
            "help" => print_help(dispatcher),
            trimmed => {
                if let Some(partial) = input.trim_start().strip_prefix('?') {
                    let tokens = line::split_line(partial, true);
                    let suggestions =
                        line::complete(dispatcher, sender, &tokens, config.max_suggestions);
                    println!("{}", suggestions.join("  "));
                } else {
                    dispatcher.dispatch_tokens(sender, &line::split_line(trimmed, false));
                }
            }
        }
    }
}

fn print_help(dispatcher: &DemoDispatcher) {
    let registry = dispatcher.registry();
    for command in registry.command_names().into_iter().filter_map(|name| registry.get(name)) {
        let description = command.description().unwrap_or_default();
        println!("{:<12} {description}", command.name());
        for subcommand in command.subcommands() {
            println!("    {} {}", command.name(), subcommand.usage());
        }
    }
}
