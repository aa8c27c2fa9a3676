use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use flightbox::config::save_recordings_dir;
use flightbox::narrate::render;
use flightbox::{util, Config, FlightStore, LineByLineLog, Narrator};

/// Inspect flight recordings of traced program runs.
#[derive(Parser)]
#[command(name = "flightbox", version)]
struct Cli {
    /// Data directory for config and logs (default: ~/.flightbox)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Narrate a recording step by step
    Replay {
        /// `~N` for the N-th most recent recording, or a path to a .fb file
        reference: Option<String>,

        /// Print the stored events instead of the narrative
        #[arg(long)]
        raw: bool,

        /// Also write the narrative to the line-by-line log directory
        #[arg(long, conflicts_with = "raw")]
        write: bool,

        /// Recordings directory (overrides the config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// List recordings, most recent first
    List {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Persist the recordings directory in the config file
    SetDir { dir: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    util::init_data_dir(cli.data_dir);

    // Initialize logging to file (~/.flightbox/logs/flightbox.log)
    fs::create_dir_all(util::logs_dir())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let config = Config::load();

    match cli.command {
        Commands::Replay {
            reference,
            raw,
            write,
            dir,
        } => replay(&store_for(&config, dir), &config, reference.as_deref(), raw, write),
        Commands::List { dir } => list(&store_for(&config, dir)),
        Commands::SetDir { dir } => {
            save_recordings_dir(&dir).context("Failed to update config")?;
            println!("Recordings directory set to {}", dir.display());
            Ok(())
        }
    }
}

fn store_for(config: &Config, dir: Option<PathBuf>) -> FlightStore {
    match dir {
        Some(dir) => FlightStore::from_config(&config.clone().with_recordings_dir(dir)),
        None => FlightStore::from_config(config),
    }
}

fn replay(
    store: &FlightStore,
    config: &Config,
    reference: Option<&str>,
    raw: bool,
    write: bool,
) -> Result<()> {
    let path = store.resolve(reference)?;
    let recording = FlightStore::load(&path)?;
    let mut stdout = io::stdout().lock();

    if raw {
        writeln!(
            stdout,
            "# {} target={} created_at={}",
            path.display(),
            recording.target,
            recording.created_at.to_rfc3339()
        )?;
        for event in &recording.events {
            writeln!(stdout, "{}", serde_json::to_string_pretty(event)?)?;
        }
        return Ok(());
    }

    let narrative = Narrator::narrate(&recording);
    stdout.write_all(render(&narrative).as_bytes())?;

    if write {
        let log = LineByLineLog::for_recording(&path, &config.narrative_dir_name)?;
        let written = log.write(&narrative)?;
        eprintln!("Wrote {}", written.display());
    }

    if let Some(err) = narrative.error {
        bail!("{}: {err}", path.display());
    }
    Ok(())
}

fn list(store: &FlightStore) -> Result<()> {
    let paths = store.list()?;
    if paths.is_empty() {
        eprintln!("No recordings in {}", store.dir().display());
        return Ok(());
    }

    let mut stdout = io::stdout().lock();
    for (index, path) in paths.iter().enumerate() {
        writeln!(stdout, "~{index}  {}", path.display())?;
    }
    Ok(())
}
