//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indexsync_client::{HttpClient, HttpClientConfig};
use indexsync_shared::{AppConfig, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// IndexSync — keep a search-engine index in sync with your domain objects.
#[derive(Parser)]
#[command(
    name = "indexsync",
    version,
    about = "Administer the search-engine cluster IndexSync synchronizes into.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Check that the configured engine endpoint answers.
    Ping,

    /// Show cluster health, optionally waiting for a target status.
    Health {
        /// Status to wait for ("green"/"yellow"); overrides the config file.
        #[arg(long)]
        wait_for: Option<String>,
    },

    /// Delete every index under the configured prefix.
    Purge {
        /// Confirm the deletion; nothing happens without this flag.
        #[arg(long)]
        yes: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "indexsync=info",
        1 => "indexsync=debug",
        _ => "indexsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Ping => cmd_ping(),
        Command::Health { wait_for } => cmd_health(wait_for.as_deref()),
        Command::Purge { yes } => cmd_purge(yes),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Build an HTTP client from the config file, optionally overriding the
/// wait-for-status setting.
fn client_from_config(wait_for: Option<&str>) -> Result<HttpClient> {
    let config = load_config()?;
    let mut client_config = HttpClientConfig::from(&config);
    if wait_for.is_some() {
        client_config.wait_for_status = wait_for.map(str::to_string);
    }
    Ok(HttpClient::new(&client_config)?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_ping() -> Result<()> {
    let client = client_from_config(None)?;
    let answer = client.ping()?;

    let version = answer
        .pointer("/version/number")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown");
    let cluster = answer
        .get("cluster_name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown");

    println!();
    println!("  Engine is reachable!");
    println!("  Cluster: {cluster}");
    println!("  Version: {version}");
    println!();

    Ok(())
}

fn cmd_health(wait_for: Option<&str>) -> Result<()> {
    let client = client_from_config(wait_for)?;

    info!(wait_for = wait_for.unwrap_or("none"), "checking cluster health");
    client.wait_for_status()?;
    let health = client.cluster_health()?;

    let status = health
        .get("status")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown");
    let nodes = health
        .get("number_of_nodes")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);

    println!();
    println!("  Cluster status: {status}");
    println!("  Nodes:          {nodes}");
    println!();

    Ok(())
}

fn cmd_purge(yes: bool) -> Result<()> {
    if !yes {
        return Err(eyre!(
            "purge deletes every prefixed index; re-run with --yes to confirm"
        ));
    }

    let config = load_config()?;
    let prefix = config.index.prefix.clone();
    let client = client_from_config(None)?;

    info!(prefix = %prefix, "purging prefixed indexes");
    client.delete_all()?;

    println!();
    println!("  Deleted all indexes under prefix '{prefix}_'");
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
