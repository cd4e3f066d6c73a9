//! Headless Terminal Runner
//!
//! Reads input from stdin or a file, runs it through a terminal session
//! and prints the resulting screen as text or JSON.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vt_emu::{Config, Session};

#[derive(Parser, Debug)]
#[command(name = "vt-headless")]
#[command(version)]
#[command(about = "Run terminal output through the emulator and print the screen", long_about = None)]
struct Args {
    /// Input file; reads stdin when omitted
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Terminal width
    #[arg(short = 'c', long = "cols", value_name = "COLS")]
    columns: Option<usize>,

    /// Terminal height
    #[arg(short, long, value_name = "ROWS")]
    rows: Option<usize>,

    /// Output snapshot as JSON
    #[arg(short, long)]
    json: bool,

    /// Print the whole history, scrollback included, instead of the screen
    #[arg(long)]
    scrollback: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    if let Some(columns) = args.columns {
        config.columns = columns;
    }
    if let Some(rows) = args.rows {
        config.rows = rows;
    }

    let mut session = match Session::from_config(&config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let input = match &args.input {
        Some(path) => match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            let mut data = Vec::new();
            if let Err(e) = io::stdin().read_to_end(&mut data) {
                eprintln!("Error reading stdin: {}", e);
                return ExitCode::FAILURE;
            }
            data
        }
    };

    session.feed(&input);
    tracing::debug!(bytes = input.len(), "processed input");

    let snapshot = session.text_snapshot();
    if args.json {
        match snapshot.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing snapshot: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else if args.scrollback {
        println!("{}", session.screen().scrollback_text());
    } else {
        print!("{}", snapshot.to_text());
    }

    ExitCode::SUCCESS
}
