mod config_commands;
mod send_commands;
mod serve_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "herald", version, about = "herald, an IRC notification relay")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (overrides discovery of herald.{toml,yaml,json}).
    #[arg(long, short, global = true, env = "HERALD_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay (default when no subcommand is provided).
    Serve,
    /// Send notifications to a running relay.
    Send(send_commands::SendArgs),
    /// Validate the configuration file and report errors/warnings.
    CheckConfig {
        /// File to check instead of the discovered one.
        path: Option<PathBuf>,
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "herald starting");

    match cli.command {
        None | Some(Commands::Serve) => serve_commands::serve(cli.config.as_deref()).await,
        Some(Commands::Send(args)) => send_commands::send(args).await,
        Some(Commands::CheckConfig { path, verbose }) => {
            config_commands::check(path.or(cli.config).as_deref(), verbose)
        },
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, clap::CommandFactory};

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["herald", "--log-level", "debug"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn check_config_takes_a_path() {
        let cli = Cli::try_parse_from(["herald", "check-config", "/etc/herald/herald.toml"])
            .unwrap();
        let Some(Commands::CheckConfig { path, verbose }) = cli.command else {
            panic!("expected check-config");
        };
        assert_eq!(path, Some(PathBuf::from("/etc/herald/herald.toml")));
        assert!(!verbose);
    }
}
