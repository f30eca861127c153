use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::api::{BrainApi, HttpBrainApi};
use crate::app::App;
use crate::auth::{AuthContext, TokenStore};
use crate::config::{AppConfig, ConfigLoader};

pub mod commands;

use self::commands::{AddContentArgs, TokenArgs, UploadImageArgs};

const LOG_FILE: &str = "brain.log";

#[derive(Parser, Debug)]
#[command(
    name = "brain",
    version,
    about = "Terminal client for your second brain: sticky notes, saved content and images"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over BRAIN_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory holding the session store (takes precedence over BRAIN_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Backend base URL (takes precedence over BRAIN_BACKEND_URL and the config file)
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Save a piece of content to the backend
    AddContent(AddContentArgs),
    /// Upload an image and print its link
    UploadImage(UploadImageArgs),
    /// Manage the stored session token
    Token(TokenArgs),
}

/// Where log lines go. The TUI owns the terminal, so it logs to a file.
enum LogSink<'a> {
    Stderr,
    File(&'a Path),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("BRAIN_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("BRAIN_DATA", path);
    }
    if let Some(url) = &cli.backend_url {
        env::set_var("BRAIN_BACKEND_URL", url);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();

    let command = cli.command.unwrap_or(Commands::Tui);
    let log_file = paths.log_dir.join(LOG_FILE);
    let sink = match command {
        Commands::Tui => LogSink::File(&log_file),
        _ => LogSink::Stderr,
    };
    init_tracing(&cli.log_level, sink)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let config = Arc::new(loader.load_or_init()?);
    let tokens = TokenStore::new(&paths.session_store);

    match command {
        Commands::Token(args) => commands::handle_token_command(&tokens, args),
        Commands::Tui => {
            let (auth, api) = connect(&config, &tokens)?;
            let mut app = App::new(Arc::clone(&config), &auth, api);
            commands::run_tui(&mut app)
        }
        Commands::AddContent(args) => commands::add_content(connect(&config, &tokens)?.1, args),
        Commands::UploadImage(args) => {
            commands::upload_image(connect(&config, &tokens)?.1, args)
        }
    }
}

/// Reads the session token once and builds the backend client around it.
fn connect(config: &AppConfig, tokens: &TokenStore) -> Result<(AuthContext, Arc<dyn BrainApi>)> {
    let auth = AuthContext::load(tokens)?;
    tracing::info!(
        backend = %config.backend.base_url,
        signed_in = auth.is_authenticated(),
        "connecting to backend"
    );
    let api = HttpBrainApi::new(
        &config.backend.base_url,
        config.backend.timeout(),
        auth.clone(),
    )?;
    Ok((auth, Arc::new(api)))
}

fn init_tracing(level: &str, sink: LogSink<'_>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match sink {
            LogSink::Stderr => fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init(),
            LogSink::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
        }
        Ok::<(), anyhow::Error>(())
    })
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_defaults_to_tui() {
        let cli = Cli::try_parse_from(["brain"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn add_content_flags_parse() {
        let cli = Cli::try_parse_from([
            "brain",
            "--backend-url",
            "http://api.local",
            "add-content",
            "--title",
            "Rust book",
            "--link",
            "https://doc.rust-lang.org/book",
            "--tags",
            "#rust,#learn",
        ])
        .expect("parse");
        assert_eq!(cli.backend_url.as_deref(), Some("http://api.local"));
        assert_matches!(cli.command, Some(Commands::AddContent(args)) => {
            assert_eq!(args.title, "Rust book");
            assert_eq!(args.tags, "#rust,#learn");
            assert!(args.image.is_none());
        });
    }

    #[test]
    fn token_subcommands_parse() {
        let cli = Cli::try_parse_from(["brain", "token", "set", "abc"]).expect("parse");
        assert_matches!(cli.command, Some(Commands::Token(_)));
        assert!(Cli::try_parse_from(["brain", "token"]).is_err());
    }
}
