use clap::Parser;
use horrible_organizer::{
    AuthManager, Config, CredentialFile, MetadataStore, OrganizeMode, Organizer, ProgressEvent,
    TerminalPrompt, TheTvDbClient, organize_files,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Organize HorribleSubs releases into a Show/Season NN layout
#[derive(Debug, Parser)]
#[command(name = "horrible-organizer", version, about)]
struct Cli {
    /// Path to a HorribleSubs-downloaded video file
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Print what would be done but do not move or rename files
    #[arg(long)]
    dry: bool,

    /// Do not look up episode titles
    #[arg(long)]
    offline: bool,

    /// Path to the show configuration
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Path to the API credential file
    #[arg(long)]
    auth: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Handles progress events and prints the rename report
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Planned { source, relative } => {
            println!("'{}'\t=>\t'{}'", file_name(&source), relative.display());
        }
        ProgressEvent::Failed { source, error } => {
            eprintln!("Error: {}: {}", file_name(&source), error);
        }
        ProgressEvent::Started { .. } | ProgressEvent::Moved { .. } | ProgressEvent::Complete { .. } => {}
    }
}

fn build_organizer(cli: &Cli, config: Config) -> Result<Organizer, String> {
    if cli.offline {
        return Ok(Organizer::offline(config));
    }

    let credentials = match &cli.auth {
        Some(path) => CredentialFile::new(path),
        None => CredentialFile::default_location()
            .ok_or("Failed to determine configuration directory for credentials")?,
    };
    tracing::debug!(path = %credentials.path().display(), "using credential file");

    let auth = AuthManager::new(credentials, TerminalPrompt);
    let client = TheTvDbClient::new(auth).map_err(|e| e.to_string())?;

    Ok(Organizer::new(config, MetadataStore::new(client)))
}

fn main() {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick a default from the verbose flag
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("horrible_organizer=debug")
        } else {
            EnvFilter::new("horrible_organizer=info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut organizer = match build_organizer(&cli, config) {
        Ok(organizer) => organizer,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mode = if cli.dry {
        OrganizeMode::DryRun
    } else {
        OrganizeMode::Move
    };

    match organize_files(&mut organizer, &cli.files, mode, handle_progress_event) {
        Ok(summary) if summary.failed > 0 => {
            eprintln!("Error: failed to organize {} files", summary.failed);
            process::exit(1);
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
