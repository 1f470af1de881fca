use clap::{Parser, Subcommand};
use installdesk_core::{AppConfig, Role};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "installdesk", version, about = "InstallDesk back office")]
struct Cli {
    /// Path to a YAML configuration file.
    #[arg(long, global = true, env = "INSTALLDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Postgres URL, overrides the configured database.
    #[arg(long, global = true, env = "INSTALLDESK_DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Hex-encoded session signing key.
    #[arg(long, global = true, env = "INSTALLDESK_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Static key accepted by the reminder function.
    #[arg(long, global = true, env = "INSTALLDESK_ANON_KEY", hide_env_values = true)]
    anon_key: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Address to listen on, overrides `server.bind`.
        #[arg(long, env = "INSTALLDESK_BIND")]
        bind: Option<String>,

        /// Use an in-memory store seeded with one admin profile.
        #[arg(long, default_value_t = false)]
        memory: bool,
    },

    /// Send installation reminders once and print the report.
    SendReminders,

    /// Session key management.
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },

    /// Session token management.
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },

    /// User profile provisioning.
    Users {
        #[command(subcommand)]
        cmd: UsersCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate a new signing keypair.
    Generate {
        /// Directory to write `private.key` and `public.key` into.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Mint a session token for a user.
    Mint {
        #[arg(long)]
        user: Uuid,

        #[arg(long, default_value = "user")]
        role: Role,

        /// Lifetime in hours, defaults to `auth.token_ttl_hours`.
        #[arg(long)]
        ttl_hours: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
    /// Create or replace a user profile.
    Add {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value = "user")]
        role: Role,

        /// Keep an existing id, e.g. one issued by an identity provider.
        #[arg(long)]
        id: Option<Uuid>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url {
        config.database.database_url = Some(url);
        config.database.database_url_env = None;
    }
    if let Some(key) = cli.private_key {
        config.auth.private_key = Some(key);
        config.auth.private_key_env = None;
        config.auth.private_key_file = None;
    }
    if let Some(key) = cli.anon_key {
        config.auth.function_key = Some(key);
        config.auth.function_key_env = None;
    }

    match cli.cmd {
        Command::Serve { bind, memory } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            commands::serve::run(&config, memory).await
        }
        Command::SendReminders => commands::reminders::run(&config).await,
        Command::Keys { cmd } => match cmd {
            KeysCommand::Generate { out } => commands::keys::generate(out),
        },
        Command::Token { cmd } => match cmd {
            TokenCommand::Mint {
                user,
                role,
                ttl_hours,
            } => commands::token::mint(&config, user, role, ttl_hours),
        },
        Command::Users { cmd } => match cmd {
            UsersCommand::Add {
                email,
                name,
                role,
                id,
            } => commands::users::add(&config, id, email, name, role).await,
        },
    }
}
