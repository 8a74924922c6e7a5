use std::{io::Write, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use weatherfeed_core::{
    Board, Config, Inbox, Scope, Surface, TemperatureUnit, WeatherFetcher, WeatherSource,
    fetch_every, fetch_once, fetch_pair, ops::MAX_POLL_INTERVAL,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherfeed", version, about = "Fetch, poll and pair current weather")]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Per-invocation overrides of the stored configuration.
#[derive(Debug, Args)]
pub struct Overrides {
    /// API key for the weather endpoint.
    #[arg(long, env = "WEATHERFEED_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Location name, e.g. "London,uk".
    #[arg(long, global = true)]
    pub location: Option<String>,

    /// Base URL of the current-weather endpoint.
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Unit system: standard (Kelvin), metric or imperial.
    #[arg(long, global = true)]
    pub units: Option<String>,

    /// Worker threads of the runtime.
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// File the display board is restored from and saved to.
    #[arg(long, global = true)]
    pub board: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store API key, location and units interactively.
    Configure,

    /// Fetch the weather once.
    Once,

    /// Fetch the weather periodically until interrupted.
    Poll {
        /// Seconds between fetches; defaults to the configured interval.
        #[arg(long)]
        every: Option<u64>,

        /// Stop after this many updates.
        #[arg(long)]
        count: Option<usize>,
    },

    /// Fetch two locations concurrently and print them joined.
    Pair {
        /// Second location; defaults to the configured pair location.
        #[arg(long = "with")]
        with: Option<String>,
    },

    /// Print the saved display board.
    Board,
}

impl Cli {
    /// Stored configuration with command-line overrides applied.
    pub fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load()?;
        let o = &self.overrides;

        if let Some(key) = &o.api_key {
            config.set_api_key(key.clone());
        }
        if let Some(location) = &o.location {
            config.location = location.clone();
        }
        if let Some(endpoint) = &o.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(units) = &o.units {
            config.units = TemperatureUnit::try_from(units.as_str())?;
        }
        if o.workers.is_some() {
            config.workers = o.workers;
        }

        Ok(config)
    }

    pub async fn run(self, config: Config) -> anyhow::Result<()> {
        let board_path = self.overrides.board;

        match self.command {
            Command::Configure => {
                tokio::task::spawn_blocking(configure)
                    .await
                    .context("Configuration prompt panicked")??;
            }
            Command::Board => {
                let path = board_path.ok_or_else(|| {
                    anyhow::anyhow!("No board file given.\nHint: pass --board <path>.")
                })?;
                print_board(&Board::load(&path)?);
            }
            Command::Once => {
                let (scope, inbox) = Scope::new();
                fetch_once(&scope, source_for(&config)?, config.query()?);
                watch(scope, inbox, board_path, Some(1), true).await?;
            }
            Command::Poll { every, count } => {
                let period = poll_period(every, &config)?;

                tracing::info!(location = %config.location, ?period, "polling weather, Ctrl-C to stop");
                let (scope, inbox) = Scope::new();
                fetch_every(&scope, source_for(&config)?, config.query()?, period);
                watch(scope, inbox, board_path, count, false).await?;
            }
            Command::Pair { with } => {
                let left = config.query()?;
                let right = config.query_for(with.as_deref().unwrap_or(config.pair_location()))?;

                let (scope, inbox) = Scope::new();
                fetch_pair(&scope, source_for(&config)?, left, right);
                watch(scope, inbox, board_path, Some(1), true).await?;
            }
        }

        Ok(())
    }
}

/// Period from `--every` or the config, rejected outside 1s ..= one day.
fn poll_period(every: Option<u64>, config: &Config) -> anyhow::Result<Duration> {
    let secs = every.unwrap_or(config.poll_interval_secs);
    let max = MAX_POLL_INTERVAL.as_secs();

    if secs == 0 || secs > max {
        bail!(
            "Polling interval must be between 1 and {max} seconds, got {secs}.\n\
             Hint: pass --every <secs> or fix `poll_interval_secs` in {}.",
            Config::config_file_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "the config file".to_string())
        );
    }

    Ok(Duration::from_secs(secs))
}

fn source_for(config: &Config) -> anyhow::Result<Arc<dyn WeatherSource>> {
    let fetcher = match config.timeout() {
        Some(timeout) => WeatherFetcher::with_timeout(timeout)
            .context("Failed to build HTTP client")?,
        None => WeatherFetcher::new(),
    };
    Ok(Arc::new(fetcher))
}

/// Print updates until `expected` have arrived or Ctrl-C, then cancel
/// whatever is still running and persist the board.
async fn watch(
    scope: Scope,
    inbox: Inbox,
    board_path: Option<PathBuf>,
    expected: Option<usize>,
    fail_on_error: bool,
) -> anyhow::Result<()> {
    let mut board = match &board_path {
        Some(path) => Board::load(path)?,
        None => Board::default(),
    };

    let (seen, failures) = drive(scope, inbox, &mut board, expected).await?;

    if let Some(path) = &board_path {
        board.save(path)?;
        tracing::debug!(path = %path.display(), "saved board");
    }

    if fail_on_error && failures > 0 {
        bail!("{failures} of {seen} weather updates failed");
    }

    Ok(())
}

async fn drive(
    mut scope: Scope,
    mut inbox: Inbox,
    board: &mut Board,
    expected: Option<usize>,
) -> anyhow::Result<(usize, usize)> {
    let mut seen = 0;
    let mut failures = 0;
    let mut stdout = std::io::stdout();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while expected.is_none_or(|n| seen < n) {
        tokio::select! {
            update = inbox.recv() => {
                let Some(update) = update else { break };
                seen += 1;

                match update.outcome {
                    Ok(text) => {
                        write!(stdout, "{text}")?;
                        stdout.flush()?;
                        board.append(update.surface, &text);
                    }
                    Err(err) => {
                        failures += 1;
                        tracing::error!(surface = %update.surface, "{err}");
                    }
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("interrupted, cancelling outstanding operations");
                scope.pause();
                break;
            }
        }
    }

    scope.shutdown().await;
    Ok((seen, failures))
}

fn print_board(board: &Board) {
    if board.is_empty() {
        println!("(board is empty)");
        return;
    }

    for surface in Surface::all() {
        let text = board.text(*surface);
        if text.is_empty() {
            continue;
        }
        println!("== {surface}");
        print!("{text}");
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    config.set_api_key(api_key);

    let location = inquire::Text::new("Location:")
        .with_default(&config.location)
        .prompt()
        .context("Failed to read location")?;
    config.location = location;

    let pair_location = inquire::Text::new("Second location for `pair`:")
        .with_default(config.pair_location())
        .prompt()
        .context("Failed to read pair location")?;
    config.pair_location = (pair_location != config.location).then_some(pair_location);

    let units = TemperatureUnit::all();
    let current = units.iter().position(|u| *u == config.units).unwrap_or(0);
    config.units = inquire::Select::new("Units:", units.to_vec())
        .with_starting_cursor(current)
        .prompt()
        .context("Failed to read units")?;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}
