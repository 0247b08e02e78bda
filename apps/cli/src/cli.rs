use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "vaultup", version, about = "Upload files into a vault server.")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Configuration file (defaults to the per-user location).
    #[arg(long, global = true, env = "VAULTUP_CONFIG")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a file: begin a transaction, send it in chunks, commit.
    Upload(UploadArgs),
    /// Authenticate only, to check the connection settings.
    Token(ConnectionArgs),
    Config(ConfigCommand),
}

/// Connection settings. Unset values fall back to the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    /// Server base URL, e.g. http://localhost/InnovatorServer
    #[arg(long, env = "VAULTUP_URL")]
    pub url: Option<String>,
    #[arg(long, env = "VAULTUP_DATABASE")]
    pub database: Option<String>,
    #[arg(short, long, env = "VAULTUP_USER")]
    pub user: Option<String>,
    /// Plaintext password; hashed before it is sent.
    #[arg(long, env = "VAULTUP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// The password is already an MD5 hex digest.
    #[arg(long)]
    pub password_hashed: bool,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    pub file: PathBuf,
    /// Store the file under a different name.
    #[arg(long)]
    pub name: Option<String>,
    /// Maximum bytes per upload request.
    #[arg(long)]
    pub chunk_size: Option<u64>,
    /// Attempts per request before giving up.
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Parser)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub cmd: ConfigSubCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubCommand {
    /// Print the effective configuration.
    Show,
    /// Write a default configuration file if none exists.
    Init,
}
