//! Command dispatch: wires configuration, credentials and the upload engine.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use vaultup_auth::{AuthProvider, OAuthProvider};
use vaultup_http::RequestClient;
use vaultup_protocol::{Credentials, ValidationError};
use vaultup_transfer::{FileSource, PayloadSource};
use vaultup_upload::{
    CredentialSource, Notifier, UploadEvent, VaultUploader, success_message,
};

use crate::cli::{Cli, Command, ConfigSubCommand, ConnectionArgs, UploadArgs};
use crate::config::{Config, config_path};

/// Hex MD5 of a plaintext password, the form the server expects.
pub fn hash_password(password: &str) -> String {
    format!("{:x}", md5::compute(password.as_bytes()))
}

/// Credentials from flags and environment, falling back to the config file.
pub struct CliCredentials<'a> {
    pub args: &'a ConnectionArgs,
    pub config: &'a Config,
}

impl CredentialSource for CliCredentials<'_> {
    fn read(&self) -> Result<Credentials, ValidationError> {
        let pick = |flag: &Option<String>, stored: &str| {
            flag.clone().unwrap_or_else(|| stored.to_string())
        };

        let password = self.args.password.clone().unwrap_or_default();
        // An empty password stays empty so validation can name it.
        let secret = if password.is_empty() || self.args.password_hashed {
            password
        } else {
            hash_password(&password)
        };

        Credentials::new(
            pick(&self.args.url, &self.config.server_url),
            pick(&self.args.database, &self.config.database),
            pick(&self.args.user, &self.config.username),
            secret,
        )
    }
}

/// Success lines go to stdout, errors to stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn report_success(&self, message: &str) {
        println!("{message}");
    }

    fn report_error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let path = cli.config.clone().unwrap_or_else(config_path);
    let config = Config::load(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;

    match cli.cmd {
        Command::Upload(args) => upload(&config, &args, &ConsoleNotifier).await,
        Command::Token(args) => token(&config, &args, &ConsoleNotifier).await,
        Command::Config(cmd) => match cmd.cmd {
            ConfigSubCommand::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(ExitCode::SUCCESS)
            }
            ConfigSubCommand::Init => init_config(&path),
        },
    }
}

fn init_config(path: &Path) -> anyhow::Result<ExitCode> {
    if path.exists() {
        println!("config already exists at {}", path.display());
    } else {
        Config::default().save(path)?;
        println!("wrote {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn build_client(config: &Config) -> anyhow::Result<RequestClient> {
    RequestClient::new(config.retry_policy()).context("failed to build HTTP client")
}

pub async fn upload(
    config: &Config,
    args: &UploadArgs,
    notifier: &dyn Notifier,
) -> anyhow::Result<ExitCode> {
    let credentials = match (CliCredentials {
        args: &args.connection,
        config,
    })
    .read()
    {
        Ok(c) => c,
        Err(e) => {
            notifier.report_error(&e.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    let source = FileSource {
        path: args.file.clone(),
        name: args.name.clone(),
    };
    let payload = match source.open() {
        Ok(p) => p,
        Err(e) => {
            notifier.report_error(&format!("{}: {e}", args.file.display()));
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut options = config.transfer_options();
    if let Some(size) = args.chunk_size {
        options.chunk_size = size;
    }
    if let Some(attempts) = args.max_attempts {
        options.max_attempts = attempts;
    }

    let client = build_client(config)?;
    let auth: Arc<dyn AuthProvider> =
        Arc::new(OAuthProvider::new(client.clone(), config.oauth.clone()));
    let mut uploader = match VaultUploader::new(&client, auth, options) {
        Ok(u) => u,
        Err(e) => {
            notifier.report_error(&e.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    let progress = uploader.take_events().map(|rx| tokio::spawn(print_progress(rx)));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling upload");
            interrupt.cancel();
        }
    });

    let outcome = uploader.upload(&credentials, payload, &cancel).await;
    // Closes the event channel so the printer drains and exits.
    drop(uploader);
    if let Some(task) = progress {
        let _ = task.await;
    }

    match outcome {
        Ok(report) => {
            notifier.report_success(&success_message(&report.result));
            tracing::debug!(sha256 = %report.sha256, chunks = report.chunks, "transfer report");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            notifier.report_error(&e.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn print_progress(mut rx: mpsc::Receiver<UploadEvent>) {
    let mut stderr = std::io::stderr();
    let mut drew_bar = false;
    while let Some(event) = rx.recv().await {
        if let UploadEvent::ChunkUploaded {
            bytes_sent,
            total,
            bytes_per_second,
            ..
        } = event
        {
            let percent = if total == 0 {
                100.0
            } else {
                bytes_sent as f64 * 100.0 / total as f64
            };
            let _ = write!(
                stderr,
                "\r{bytes_sent}/{total} bytes ({percent:.0}%) {:.1} KiB/s",
                bytes_per_second / 1024.0
            );
            let _ = stderr.flush();
            drew_bar = true;
        }
    }
    if drew_bar {
        let _ = writeln!(stderr);
    }
}

pub async fn token(
    config: &Config,
    args: &ConnectionArgs,
    notifier: &dyn Notifier,
) -> anyhow::Result<ExitCode> {
    let credentials = match (CliCredentials { args, config }).read() {
        Ok(c) => c,
        Err(e) => {
            notifier.report_error(&e.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    let provider = OAuthProvider::new(build_client(config)?, config.oauth.clone());
    match provider.fetch_token(&credentials).await {
        Ok(_) => {
            notifier.report_success(&format!(
                "Authenticated as '{}' on '{}'",
                credentials.username(),
                credentials.database()
            ));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            notifier.report_error(&e.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}
