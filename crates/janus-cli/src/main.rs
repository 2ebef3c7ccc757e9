//! Janus - authentication with local credentials or an LDAP directory
//!
//! Operator tool for creating accounts, checking logins and probing the
//! configured directory.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use janus_core::config::{AuthStrategy, JanusConfig, LoggingConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "janus")]
#[command(author = "Janus Team")]
#[command(version = janus_core::VERSION)]
#[command(about = "Authentication with local credentials or an LDAP directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "JANUS_CONFIG")]
    config: Option<String>,

    /// Authentication strategy (local, directory)
    #[arg(long, global = true, env = "JANUS_AUTH_STRATEGY")]
    strategy: Option<String>,

    /// Database URL
    #[arg(long, global = true, env = "JANUS_DATABASE_URL")]
    database_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "JANUS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a local account
    Signup {
        /// Email address
        email: String,

        /// First name
        #[arg(long)]
        first_name: String,

        /// Last name
        #[arg(long)]
        last_name: String,

        /// Password (prompted on stdin when omitted)
        #[arg(long, env = "JANUS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Check credentials and print the resolved identity id
    Login {
        /// Email address
        email: String,

        /// Password (prompted on stdin when omitted)
        #[arg(long, env = "JANUS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Bind with the service account and read the directory root DSE
    CheckDirectory,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Load config
    let mut config = match &cli.config {
        Some(path) => JanusConfig::from_file(path)?,
        None => JanusConfig::from_env()?,
    };

    // Override with CLI args
    if let Some(strategy) = &cli.strategy {
        config.auth.strategy = strategy.parse::<AuthStrategy>()?;
    }
    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    init_logging(&config.logging);

    let ctx = CommandContext {
        config,
        output_format: cli.output,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Signup {
            email,
            first_name,
            last_name,
            password,
        } => {
            let password = read_password(password)?;
            commands::signup::execute(&ctx, &email, &password, &first_name, &last_name).await
        }
        Commands::Login { email, password } => {
            let password = read_password(password)?;
            commands::login::execute(&ctx, &email, &password).await
        }
        Commands::CheckDirectory => commands::check_directory::execute(&ctx).await,
        Commands::Version => {
            println!("janus {}", janus_core::VERSION);
            Ok(())
        }
    }
}

/// Logs go to stderr so command output on stdout stays parseable.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn read_password(password: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
