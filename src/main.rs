//! Parley CLI - a terminal assistant backed by a chat-completion API.

use clap::Parser;
use parley::cli::{Cli, Commands, ConfigCommands, MemoryCommands, NoteCommands, TaskCommands};
use parley::commands::{self, Output};
use parley::config::{self, ConfigOverrides};
use parley::llm::OpenAiClient;
use parley::orchestrator::Orchestrator;
use parley::storage::{Store, get_data_dir};
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let human = cli.human_readable;
    let overrides = ConfigOverrides {
        model: cli.model.clone(),
    };

    if let Err(e) = run_command(cli.command, &overrides, human) {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Logs go to stderr so stdout stays clean for JSON and the chat loop.
/// Quiet by default; use RUST_LOG=info or RUST_LOG=debug for more.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run_command(
    command: Commands,
    overrides: &ConfigOverrides,
    human: bool,
) -> Result<(), parley::Error> {
    match command {
        Commands::Chat => {
            let mut orchestrator = build_orchestrator(overrides)?;
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            commands::chat::run(&mut orchestrator, stdin.lock(), &mut stdout)?;
        }

        Commands::Ask { message } => {
            let mut orchestrator = build_orchestrator(overrides)?;
            let result = commands::ask(&mut orchestrator, &message)?;
            output(&result, human);
        }

        Commands::Tool { directive } => {
            let mut store = Store::open_default()?;
            let result = commands::tool_run(&mut store, &directive);
            output(&result, human);
        }

        Commands::Note { command } => {
            let mut store = Store::open_default()?;
            match command {
                NoteCommands::Add { text } => {
                    let result = commands::note_add(&mut store, &text)?;
                    output(&result, human);
                }
                NoteCommands::List { limit } => {
                    let result = commands::note_list(&store, limit)?;
                    output(&result, human);
                }
                NoteCommands::Search { query, limit } => {
                    let result = commands::note_search(&store, &query, limit)?;
                    output(&result, human);
                }
            }
        }

        Commands::Task { command } => {
            let mut store = Store::open_default()?;
            match command {
                TaskCommands::Add { text } => {
                    let result = commands::task_add(&mut store, &text)?;
                    output(&result, human);
                }
                TaskCommands::List { status, limit } => {
                    let result = commands::task_list(&store, &status, limit)?;
                    output(&result, human);
                }
                TaskCommands::Close { id } => {
                    let result = commands::task_close(&mut store, id)?;
                    output(&result, human);
                }
            }
        }

        Commands::Memory { command } => {
            let mut store = Store::open_default()?;
            match command {
                MemoryCommands::Set { key, value } => {
                    let result = commands::memory_set(&mut store, &key, &value)?;
                    output(&result, human);
                }
                MemoryCommands::Get { key } => {
                    let result = commands::memory_get(&store, &key)?;
                    output(&result, human);
                }
                MemoryCommands::List => {
                    let result = commands::memory_list(&store)?;
                    output(&result, human);
                }
            }
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let result = commands::config_show(
                    &config::get_config_dir()?,
                    &get_data_dir()?,
                    overrides,
                )?;
                output(&result, human);
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config_set(&config::get_config_dir()?, &key, &value)?;
                output(&result, human);
            }
            ConfigCommands::SetKey { key } => {
                let result = commands::config_set_key(&get_data_dir()?, &key)?;
                output(&result, human);
            }
        },
    }

    Ok(())
}

/// Resolve settings and wire the orchestrator. A missing API key fails here,
/// before any turn runs.
fn build_orchestrator(
    overrides: &ConfigOverrides,
) -> Result<Orchestrator<OpenAiClient>, parley::Error> {
    let settings = config::load(overrides)?;
    let api_key = settings.require_api_key()?;
    let client = OpenAiClient::new(api_key, settings.api_base.value.clone());
    let store = Store::open_default()?;

    tracing::info!(
        model = %settings.model.value,
        source = %settings.model.source,
        "starting conversation"
    );
    Ok(Orchestrator::new(client, store, settings.turn_settings()))
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
