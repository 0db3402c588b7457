mod config;
mod payload;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use rolltreppe_chaincode::Chaincode;
use rolltreppe_ledger::MemoryLedger;

use crate::config::Settings;

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "ROLLTREPPE_LOG";

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Escalator repair ticket chaincode.
#[derive(Parser)]
#[command(name = "rolltreppe", version, about = "Escalator repair ticket chaincode")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to the settings file (default: ./rolltreppe.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger state file, overriding [ledger] state_file
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed a fresh ledger with the default escalator
    Init,

    /// Run a mutating chaincode function and save the ledger
    Invoke {
        /// Function name, e.g. createTicket
        function: String,
        /// Positional string arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run a read-only chaincode function
    Query {
        /// Function name, e.g. getAllTickets
        function: String,
        /// Positional string arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Start the HTTP JSON API server
    Serve {
        /// Port to listen on, overriding [server] port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Clone, Copy)]
enum Mode {
    Invoke,
    Query,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let mut settings = match Settings::load(cli.config.as_deref()) {
        Ok(s) => s,
        Err(msg) => {
            report_error(&msg, cli.output, cli.quiet);
            process::exit(1);
        }
    };
    if let Some(state) = cli.state {
        settings.ledger.state_file = state;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("failed to create tokio runtime: {}", e),
                cli.output,
                cli.quiet,
            );
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Init => rt.block_on(cmd_init(&settings, cli.output, cli.quiet)),
        Commands::Invoke { function, args } => rt.block_on(cmd_call(
            &settings,
            Mode::Invoke,
            &function,
            &args,
            cli.output,
        )),
        Commands::Query { function, args } => rt.block_on(cmd_call(
            &settings,
            Mode::Query,
            &function,
            &args,
            cli.output,
        )),
        Commands::Serve { port } => {
            let port = port.unwrap_or(settings.server.port);
            match rt.block_on(open_seeded(&settings)) {
                Ok(chaincode) => rt
                    .block_on(serve::start_server(
                        port,
                        chaincode,
                        settings.ledger.state_file.clone(),
                    ))
                    .map_err(|e| format!("server error: {}", e)),
                Err(e) => Err(e),
            }
        }
    };

    if let Err(msg) = result {
        report_error(&msg, cli.output, cli.quiet);
        process::exit(1);
    }
}

/// Install the stderr log subscriber; stdout carries payloads only.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_chaincode(settings: &Settings) -> Result<Chaincode<MemoryLedger>, String> {
    let path = &settings.ledger.state_file;
    let ledger = MemoryLedger::load(path)
        .map_err(|e| format!("could not load '{}': {}", path.display(), e))?;
    Ok(Chaincode::new(ledger).with_config(settings.chaincode_config()))
}

/// Open the ledger and seed it on first use, saving only when seeding wrote
/// something.
async fn open_seeded(settings: &Settings) -> Result<Chaincode<MemoryLedger>, String> {
    let chaincode = open_chaincode(settings)?;
    let seeded = chaincode
        .init()
        .await
        .map_err(|e| payload::error_message(&e))?;
    if seeded {
        save_ledger(settings, &chaincode)?;
    }
    Ok(chaincode)
}

fn save_ledger(settings: &Settings, chaincode: &Chaincode<MemoryLedger>) -> Result<(), String> {
    let path = &settings.ledger.state_file;
    chaincode
        .ledger()
        .save(path)
        .map_err(|e| format!("could not save '{}': {}", path.display(), e))
}

async fn cmd_init(settings: &Settings, output: OutputFormat, quiet: bool) -> Result<(), String> {
    let chaincode = open_chaincode(settings)?;
    let seeded = chaincode
        .init()
        .await
        .map_err(|e| payload::error_message(&e))?;
    if seeded {
        save_ledger(settings, &chaincode)?;
    }

    if !quiet {
        let path = settings.ledger.state_file.display();
        match output {
            OutputFormat::Text => {
                if seeded {
                    println!("Initialized ledger at {}", path);
                } else {
                    println!("Ledger at {} already initialized", path);
                }
            }
            OutputFormat::Json => {
                let result = serde_json::json!({
                    "initialized": seeded,
                    "state_file": path.to_string(),
                });
                println!("{}", result);
            }
        }
    }
    Ok(())
}

async fn cmd_call(
    settings: &Settings,
    mode: Mode,
    function: &str,
    args: &[String],
    output: OutputFormat,
) -> Result<(), String> {
    let chaincode = open_seeded(settings).await?;
    let result = match mode {
        Mode::Invoke => chaincode.invoke(function, args).await,
        Mode::Query => chaincode.query(function, args).await,
    };
    let bytes = result.map_err(|e| payload::error_message(&e))?;
    if let Mode::Invoke = mode {
        save_ledger(settings, &chaincode)?;
    }

    // Payloads are printed even with --quiet; they are the command's output.
    match output {
        OutputFormat::Text => {
            if !bytes.is_empty() {
                println!("{}", String::from_utf8_lossy(&bytes));
            }
        }
        OutputFormat::Json => {
            let result = serde_json::json!({ "payload": payload::to_json(&bytes) });
            println!("{}", result);
        }
    }
    Ok(())
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
