#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, Reported};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tramnet_core::config;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tram: tram network store and router",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Network database path (overrides `TRAMNET_DB` and `tramnet.toml`).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Output mode usable before configuration has been resolved.
    fn fallback_output(&self) -> OutputMode {
        self.format.unwrap_or(if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        })
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Create the network database",
        long_about = "Write a default tramnet.toml (when absent) and create or migrate the network database.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    tram init\n\n    # Use a specific database file\n    tram --db /srv/tram/network.db init"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Network",
        about = "List, show and edit stops",
        after_help = "EXAMPLES:\n    # Add a stop with coordinates\n    tram stops add \"Rondo Mogilskie\" --lat 50.0656 --lon 19.9569\n\n    # Take a stop out of service\n    tram stops deactivate \"RONDO MOGILSKIE\"\n\n    # Active/inactive split as JSON\n    tram stops list --status --json"
    )]
    Stops(cmd::stops::StopsArgs),

    #[command(
        next_help_heading = "Network",
        about = "List, add and remove connections",
        after_help = "EXAMPLES:\n    # Connect two stops, 4 minutes apart\n    tram conn add P Q 4\n\n    # Remove the link in both directions\n    tram conn rm Q P"
    )]
    Conn(cmd::conn::ConnArgs),

    #[command(
        next_help_heading = "Routing",
        about = "Find the fastest route between two stops",
        long_about = "Find the minimum-time route between two active stops. Inactive stops are never traversed.",
        after_help = "EXAMPLES:\n    # Route by stop id\n    tram route P R\n\n    # Print ids instead of names\n    tram route P R --ids"
    )]
    Route(cmd::route::RouteArgs),

    #[command(
        next_help_heading = "Routing",
        about = "Show the routable network graph"
    )]
    Graph(cmd::graph::GraphArgs),

    #[command(next_help_heading = "Read", about = "List tram lines")]
    Lines(cmd::lines::LinesArgs),

    #[command(next_help_heading = "Read", about = "Show congestion history for a stop")]
    Traffic(cmd::traffic::TrafficArgs),

    #[command(next_help_heading = "Read", about = "Show network totals")]
    Stats(cmd::stats::StatsArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Import timetables or traffic history",
        after_help = "EXAMPLES:\n    # Rebuild the network from timetables with coordinates\n    tram import schedule ./rozklady --coords stops.csv --fresh\n\n    # Load congestion history\n    tram import traffic traffic_data.json"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        next_help_heading = "Serve",
        about = "Run the HTTP API",
        after_help = "EXAMPLES:\n    # Serve on the configured address\n    tram serve\n\n    # Serve on all interfaces\n    tram serve --host 0.0.0.0 --port 9000"
    )]
    Serve(cmd::serve::ServeArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    tram completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TRAMNET_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "tramnet=debug,info"
        } else {
            "tramnet=info,warn"
        })
    });

    let format = env::var("TRAMNET_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries command output.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if !err.is::<Reported>() {
                let error = CliError {
                    message: format!("{err:#}"),
                    suggestion: None,
                    error_code: None,
                };
                if let Err(render_failure) = output::render_error(cli.fallback_output(), &error) {
                    eprintln!("error: {err:#} ({render_failure})");
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let project_root = env::current_dir()?;
    let effective = config::resolve_config(&project_root, cli.db.as_deref(), cli.json)?;
    let output = output::resolve_output_mode(cli.format, &effective.resolved_output);
    debug!(db = %effective.db_path.display(), ?output, "resolved configuration");

    let ctx = cmd::Context {
        output,
        config: effective,
    };

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, &ctx, &project_root),
        Commands::Stops(args) => cmd::stops::run_stops(args, &ctx),
        Commands::Conn(args) => cmd::conn::run_conn(args, &ctx),
        Commands::Route(args) => cmd::route::run_route(args, &ctx),
        Commands::Graph(args) => cmd::graph::run_graph(args, &ctx),
        Commands::Lines(args) => cmd::lines::run_lines(args, &ctx),
        Commands::Traffic(args) => cmd::traffic::run_traffic(args, &ctx),
        Commands::Stats(args) => cmd::stats::run_stats(args, &ctx),
        Commands::Import(args) => cmd::import::run_import(args, &ctx),
        Commands::Serve(args) => cmd::serve::run_serve(args, &ctx),
        Commands::Completions(_) => Ok(()),
    }
}
