//! Interactive front end for the fcache file cache.
use std::io::{BufRead as _, Write as _};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing::{error, info, info_span, warn};

use fcache::CacheManager;

mod app_config;
mod trc;

use crate::app_config::Config;
use crate::trc::Trc;

/// How often `warm` re-checks loader progress.
const WARM_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Parser)]
#[command(version, about = "A self-populating in-memory file cache.")]
struct Args {
    #[arg(
        short,
        long,
        value_parser,
        help = "Optional path to an fcache config TOML."
    )]
    config_path: Option<PathBuf>,

    #[arg(short, long, help = "Override the root directory from the configuration.")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Request files interactively and inspect the cache.
    Shell,

    /// Load the given files, wait for the loader to finish, and print the cache status.
    Warm {
        /// Virtual paths to load, relative to the root.
        #[arg(required = true)]
        paths: Vec<String>,

        /// Give up waiting after this many milliseconds.
        #[arg(long, default_value_t = 10_000)]
        timeout_ms: u64,
    },

    /// Print the effective configuration as TOML.
    Config,
}

/// Main entry point for the application.
fn main() {
    let args = Args::parse();

    if let Err(e) = Trc::default().init() {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let mut config = Config::load_or_default(args.config_path.as_deref()).unwrap_or_else(|e| {
        error!("Failed to load configuration: {e}");
        std::process::exit(1);
    });
    if let Some(root) = args.root {
        config.root = root;
    }

    match args.command.unwrap_or(Command::Shell) {
        Command::Config => match config.to_toml() {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                error!("Failed to render configuration: {e}");
                std::process::exit(1);
            }
        },
        Command::Shell => {
            let manager = start_manager(&config);
            run_shell(&manager);
            manager.shutdown();
        }
        Command::Warm { paths, timeout_ms } => {
            let manager = start_manager(&config);
            let finished = warm(&manager, &paths, Duration::from_millis(timeout_ms));
            manager.shutdown();
            if !finished {
                std::process::exit(2);
            }
        }
    }
}

/// Build the cache manager from the configuration, exiting if that is impossible.
fn start_manager(config: &Config) -> CacheManager {
    let manager_config = config.manager_config().unwrap_or_else(|e| {
        error!("Configuration is invalid: {e}");
        std::process::exit(1);
    });
    CacheManager::new(manager_config).unwrap_or_else(|e| {
        error!("{e}");
        std::process::exit(1);
    })
}

/// Request every path and wait until the loader has processed all of them.
///
/// Returns `false` if the timeout elapsed first.
fn warm(manager: &CacheManager, paths: &[String], timeout: Duration) -> bool {
    let _span = info_span!("warm", files = paths.len()).entered();
    let target = manager.status().loader.processed + paths.len() as u64;
    for path in paths {
        manager.request(path);
    }

    let deadline = Instant::now() + timeout;
    let finished = loop {
        let status = manager.status();
        if status.loader.processed >= target {
            break true;
        }
        if Instant::now() >= deadline {
            break false;
        }
        std::thread::sleep(WARM_POLL_INTERVAL);
    };

    let status = manager.status();
    if finished {
        info!(
            loaded = status.loader.loaded,
            skipped = status.loader.skipped,
            failed = status.loader.failed,
            "Finished warming cache."
        );
    } else {
        warn!(
            pending = status.pending.len(),
            "Timed out waiting for the loader."
        );
    }
    println!("{status}");
    finished
}

fn run_shell(manager: &CacheManager) {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("Enter file to request or 's' for status: ");
        if let Err(e) = std::io::stdout().flush() {
            warn!("Failed to flush prompt: {e}");
        }

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                error!("Failed to read input: {e}");
                return;
            }
            None => return,
        };

        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (None, _) => {}
            (Some("q"), None) => return,
            (Some("s"), None) => println!("{}", manager.status()),
            (Some("l"), Some(path)) => println!("{path}: {}", manager.lookup(path)),
            (Some("root"), Some(dir)) => manager.set_root(dir),
            (Some("r"), Some(path)) => {
                let offset = words.next().and_then(|w| w.parse().ok()).unwrap_or(0);
                let length = words
                    .next()
                    .and_then(|w| w.parse().ok())
                    .unwrap_or(manager.chunk_size());
                let data = manager.read_range(path, offset, length);
                println!("{path}: read {} bytes at offset {offset}", data.len());
            }
            (Some(_), _) => manager.request(line.trim()),
        }
    }
}
