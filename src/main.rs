use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use plex_watch::config::TorrentClientConfig;
use plex_watch::library::{collect_show_info, populate_library, remove_empty_dirs};
use plex_watch::logging::{self, LogSettings};
use plex_watch::prompt::{NoPrompt, Prompt, TerminalPrompt};
use plex_watch::torrent_status::QBittorrentClient;
use plex_watch::watch::{self, WatchRequest};
use plex_watch::watch_registry::{WatchRegistry, expand_home};
use plex_watch::Error;

#[derive(Parser, Debug)]
#[command(author, version, about = "Rename downloaded media to Plex library format and keep watched downloads in sync")]
struct Cli {
    /// Watch database
    #[arg(long, env = "PLEX_WATCH_STORE", default_value = "watch.json", global = true)]
    store: PathBuf,

    /// Directory for the rotating log files
    #[arg(long, env = "PLEX_WATCH_LOG_DIR", default_value = "logs", global = true)]
    log_dir: PathBuf,

    /// key=value file with the qBittorrent connection settings
    #[arg(long, env = "PLEX_WATCH_TORRENT_CONFIG", default_value = ".env", global = true)]
    torrent_config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a new watch
    Add(WatchArgs),
    /// List all watches
    List,
    /// Remove a watch
    Remove {
        /// Source of the watch
        #[arg(long)]
        src: Option<String>,
    },
    /// Update a watch
    Update(WatchArgs),
    /// Move new episodes of every watch into the library
    Refresh,
    /// Rewrite stored source paths in normalized form
    NormalizeKeys,
    /// Rename a finished download into a new library folder
    Rename {
        /// Path to the downloaded media files
        #[arg(long)]
        src: String,
        /// Library root the show folder is created in
        #[arg(long)]
        dest: String,
    },
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Source of the watch
    #[arg(long)]
    src: Option<String>,
    /// Destination of the watch
    #[arg(long)]
    dest: Option<String>,
    /// Show name used in the renamed files
    #[arg(long)]
    show_name: Option<String>,
    /// Season folder, i.e. "Season 01", "Specials" or "Extras"
    #[arg(long)]
    season: Option<String>,
}

impl From<WatchArgs> for WatchRequest {
    fn from(args: WatchArgs) -> Self {
        Self {
            source: args.src,
            destination: args.dest,
            show_name: args.show_name,
            season: args.season,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (dispatch, _guard) = match logging::build(&LogSettings::new(&cli.log_dir)) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("✗ Error: could not set up logging in {}: {e:#}", cli.log_dir.display());
            return ExitCode::FAILURE;
        }
    };
    if tracing::dispatcher::set_global_default(dispatch).is_err() {
        eprintln!("⚠ Logging was already initialised");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.downcast_ref::<Error>().map(Error::exit_code).unwrap_or(1);
            if code != 0 {
                let message = format!("{err:#}");
                eprintln!("✗ Error: {message}");
                tracing::error!(error = %message, exit_code = code, "run failed");
            }
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!(command = ?cli.command, "starting");

    let registry = match cli.command {
        Command::Add(args) => {
            let mut registry = open_registry(&cli.store)?;
            watch::add_watch(&mut registry, &mut TerminalPrompt::stdio(), args.into())?;
            Some(registry)
        }
        Command::List => {
            let registry = open_registry(&cli.store)?;
            watch::list_watches(&registry, &mut TerminalPrompt::stdio());
            Some(registry)
        }
        Command::Remove { src } => {
            let mut registry = open_registry(&cli.store)?;
            watch::remove_watch(&mut registry, &mut TerminalPrompt::stdio(), src)?;
            Some(registry)
        }
        Command::Update(args) => {
            let mut registry = open_registry(&cli.store)?;
            watch::update_watch(&mut registry, &mut TerminalPrompt::stdio(), args.into())?;
            Some(registry)
        }
        Command::Refresh => {
            let registry = open_registry(&cli.store)?;
            let config = TorrentClientConfig::from_file(&cli.torrent_config)?;
            let client = QBittorrentClient::new(&config)?;
            watch::refresh_watches(&registry, &client, &mut NoPrompt).await?;
            Some(registry)
        }
        Command::NormalizeKeys => {
            let mut registry = open_registry(&cli.store)?;
            watch::normalize_watch_keys(&mut registry, &mut TerminalPrompt::stdio());
            Some(registry)
        }
        Command::Rename { src, dest } => {
            rename(&mut TerminalPrompt::stdio(), &src, &dest)?;
            None
        }
    };

    if let Some(mut registry) = registry {
        if registry.save_if_dirty()? {
            tracing::info!(store = %registry.path().display(), "watch database saved");
        }
    }
    Ok(())
}

fn open_registry(store: &Path) -> anyhow::Result<WatchRegistry> {
    WatchRegistry::open(store).with_context(|| format!("failed to open watch database {}", store.display()))
}

fn rename<P: Prompt>(prompt: &mut P, src: &str, dest: &str) -> anyhow::Result<()> {
    let source = PathBuf::from(expand_home(src));
    let library_root = PathBuf::from(expand_home(dest));

    let show = collect_show_info(prompt, None)?;
    let destinations = populate_library(prompt, &source, &library_root, &show)?;
    for destination in &destinations {
        prompt.tell(&format!("✓ Populated {}", destination.display()));
    }

    let cleanup = prompt.ask("Clean up empty directories left in the source? [y/n]")?;
    if cleanup.trim().eq_ignore_ascii_case("y") {
        let removed = remove_empty_dirs(&source)?;
        prompt.tell(&format!("Removed {removed} empty directories"));
    }
    prompt.tell("Done");
    Ok(())
}
