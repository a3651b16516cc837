use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use lox_walk::diagnostics::Diagnostics;
use lox_walk::driver;
use lox_walk::interpreter::RECOMMENDED_STACK_BYTES;

/// Exit code for bad invocations and unreadable input files.
const EXIT_USAGE: u8 = 1;

#[derive(ClapParser, Debug)]
#[command(version, about = "Tree-walking Lox interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },
}

/// Reads the whole file as UTF-8 text.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let source = std::fs::read_to_string(filename)
        .with_context(|| format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", source.len(), filename);

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // `[module:line] - message`, filtered by RUST_LOG when set.
    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("lox_walk::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn main() -> ExitCode {
    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let help = matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion);
            if help {
                print!("{}", e);
            } else {
                eprint!("{}", e);
            }
            return if help {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_USAGE)
            };
        }
    };

    if args.log {
        if let Err(e) = init_logger() {
            eprintln!("{:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    let filename: &Path = match &args.commands {
        Commands::Tokenize { filename }
        | Commands::Parse { filename }
        | Commands::Evaluate { filename }
        | Commands::Run { filename } => filename.as_path(),
    };

    let source: String = match read_file(filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading file: {:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let worker = thread::Builder::new()
        .name("interpreter".to_string())
        .stack_size(RECOMMENDED_STACK_BYTES)
        .spawn(move || execute(args.commands, &source));

    let code: u8 = match worker.map(|handle| handle.join()) {
        Ok(Ok(code)) => code,
        Ok(Err(_)) => {
            eprintln!("Interpreter thread panicked");
            EXIT_USAGE
        }
        Err(e) => {
            eprintln!("Failed to start interpreter thread: {}", e);
            EXIT_USAGE
        }
    };

    info!("Exiting with code {}", code);

    ExitCode::from(code)
}

/// Run one command over `source`, returning the process exit code.
fn execute(command: Commands, source: &str) -> u8 {
    let mut diagnostics = Diagnostics::new();

    let outcome = match command {
        Commands::Tokenize { .. } => {
            driver::tokenize(source, &mut io::stdout().lock(), &mut diagnostics)
        }
        Commands::Parse { .. } => driver::parse(source, &mut io::stdout().lock(), &mut diagnostics),
        Commands::Evaluate { .. } => {
            driver::evaluate(source, Box::new(io::stdout()), &mut diagnostics)
        }
        Commands::Run { .. } => driver::run(source, Box::new(io::stdout()), &mut diagnostics),
    };

    if let Err(e) = outcome {
        debug!("Driver failed: {}", e);
        eprintln!("{}", e);
        return EXIT_USAGE;
    }

    diagnostics.exit_code() as u8
}
