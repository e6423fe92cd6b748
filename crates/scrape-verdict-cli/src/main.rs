//! scrape-verdict: entry point.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use scrape_verdict::SignatureRegistry;
use scrape_verdict_cli::check::{self, CheckArgs};
use scrape_verdict_cli::report::EXIT_TOOL_ERROR;

#[derive(Parser)]
#[command(
    name = "scrape-verdict",
    about = "Classify a scrape attempt: blocked, bot-protected, or good data",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a response document and extracted records.
    ///
    /// Exit codes: 0 success, 1 data-quality failure, 2 blocked, 3 error.
    Check(CheckArgs),

    /// Print the built-in detection signatures as JSON.
    Signatures,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   scrape-verdict completions bash > ~/.local/share/bash-completion/completions/scrape-verdict
    ///   scrape-verdict completions zsh > ~/.zfunc/_scrape-verdict
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_TOOL_ERROR } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(EXIT_TOOL_ERROR);
        }
    }
}

fn run(command: Commands) -> anyhow::Result<i32> {
    match command {
        Commands::Check(args) => check::run(&args),

        Commands::Signatures => {
            let registry = SignatureRegistry::shared()?;
            println!("{}", serde_json::to_string_pretty(registry.document())?);
            Ok(0)
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "scrape-verdict", &mut std::io::stdout());
            Ok(0)
        }
    }
}
