use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use backup_file_selector::config::{AppConfig, GeneralConfig, ListingConfig, LoggingConfig};
use backup_file_selector::error::{self, AppError};
use backup_file_selector::fs::lister::{DirectoryLister, FixtureLister, LocalLister};
use backup_file_selector::handler::{self, Command};
use backup_file_selector::logging;
use backup_file_selector::session::{Session, SessionOptions};

/// Choose files to back up or restore from a lazily-loaded directory tree.
///
/// Reads commands from stdin; type `help` for the list.
#[derive(Parser, Debug)]
#[command(name = "bfs", version, about)]
struct Cli {
    /// Config file applied on top of the default locations
    #[arg(long)]
    config: Option<PathBuf>,

    /// Local directory mapped onto the tree root
    #[arg(long)]
    root: Option<PathBuf>,

    /// Serve recorded JSON listings instead of the local filesystem
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Directory the tree starts at
    #[arg(long)]
    start: Option<String>,

    /// Backup the selection belongs to
    #[arg(long)]
    backup_id: Option<String>,

    /// Snapshot to restore from (switches to restore mode)
    #[arg(long)]
    snapshot: Option<String>,

    /// Log format: text or json
    #[arg(long)]
    log_format: Option<String>,
}

impl Cli {
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                start_path: self.start.clone(),
            },
            listing: ListingConfig {
                root: self.root.clone(),
                fixture: self.fixture.clone(),
                backup_id: self.backup_id.clone(),
                snapshot: self.snapshot.clone(),
                ..Default::default()
            },
            logging: LoggingConfig {
                format: self.log_format.clone(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

fn build_lister(config: &AppConfig) -> error::Result<Arc<dyn DirectoryLister>> {
    if let Some(fixture) = config.fixture() {
        return Ok(Arc::new(FixtureLister::from_file(fixture)?));
    }
    let root = config.listing_root();
    if !root.is_dir() {
        return Err(AppError::InvalidPath(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    Ok(Arc::new(
        LocalLister::new(root).show_hidden(config.show_hidden()),
    ))
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));
    logging::init_logging(&config)?;

    let lister = build_lister(&config)?;
    let mut session = Session::open(lister, SessionOptions::from_config(&config))?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handler::parse_command(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(Command::Intent(intent))) => {
                        if let Err(e) = session.apply(intent) {
                            println!("error: {}", e);
                        }
                    }
                    Ok(Some(command)) => match handler::describe(&session, &command) {
                        Ok(text) => println!("{}", text),
                        Err(e) => println!("error: {}", e),
                    },
                    Ok(None) => {}
                    Err(e) => println!("error: {}", e),
                }
            }
            event = session.next_event() => {
                if let Err(e) = session.handle_event(event?) {
                    warn!(error = %e, "event failed");
                    println!("error: {}", e);
                }
            }
        }
    }

    info!(
        pending = session.pending_fetches(),
        "session closed, abandoning pending listings"
    );
    Ok(())
}
