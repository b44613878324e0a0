use std::path::PathBuf;
use std::process::ExitCode;

use clap::{FromArgMatches, Parser};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod browse;
mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "entrez",
    version,
    about = "Command-line interface for the NCBI Entrez E-utilities",
    long_about = "Query NCBI databases through the E-utilities. The subcommand is the \
                  tool; every parameter of the tool is available as a flag of the same name.",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Email for NCBI requests (recommended)
    #[arg(long, env = "NCBI_EMAIL", global = true)]
    pub email: Option<String>,

    /// API key for NCBI E-utilities (increases rate limit)
    #[arg(long, env = "NCBI_API_KEY", global = true)]
    pub api_key: Option<String>,

    /// Tool name sent to NCBI with every request
    #[arg(long, env = "NCBI_TOOL", default_value = "entrez-cli", global = true)]
    pub tool_id: String,

    /// Write output to FILE instead of stdout
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// Parse the XML response (interactive browser on a terminal, JSON otherwise)
    #[arg(long, global = true)]
    pub parse_xml: bool,

    /// Search for TERM first and run the tool on the hits
    #[arg(long, value_name = "TERM", global = true)]
    pub on_search: Option<String>,

    /// Database searched by --on-search (defaults to --db)
    #[arg(long, value_name = "DB", global = true, requires = "on_search")]
    pub search_db: Option<String>,

    /// Records requested per call when paging
    #[arg(long, value_name = "N", global = true)]
    pub batch_size: Option<usize>,

    /// Extra parameter passed through verbatim (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", global = true, value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = commands::build_cli().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };

    init_tracing(cli.verbose);

    tokio::select! {
        result = commands::execute(&cli, &matches) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("Error: {err:#}");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
            // The browser may still be blocked reading stdin, which would
            // hold up runtime shutdown.
            std::process::exit(130)
        }
    }
}
