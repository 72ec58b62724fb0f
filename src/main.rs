use clap::{Arg, ArgAction, Command};
use log::{debug, error, info, warn, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Handle;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use missing_reset::app_state::AppState;
use missing_reset::catalog::StorageId;
use missing_reset::config::{AppConfig, LoggingConfig};
use missing_reset::error::ResetError;
use missing_reset::service::{JsonReport, OutputFormat};

struct ResetArgs {
    storage: Option<StorageId>,
    config_file: Option<PathBuf>,
    format: Option<OutputFormat>,
    dry_run: bool,
}

fn parse_args() -> ResetArgs {
    let matches = Command::new("missing-reset")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resets missing files")
        .arg(
            Arg::new("storage")
                .short('s')
                .long("storage")
                .value_name("ID")
                .help("Reset files from a specific storage only")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .help("Report format, overrides the configuration")
                .value_parser(["text", "json"]),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Only count missing files, do not reset them")
                .action(ArgAction::SetTrue),
        )
        .try_get_matches();

    let matches = match matches {
        Ok(m) => m,
        Err(e) => {
            if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                print!("{}", e);
                std::process::exit(0);
            }
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    ResetArgs {
        storage: matches.get_one::<i64>("storage").copied(),
        config_file: matches.get_one::<PathBuf>("config").cloned(),
        format: matches
            .get_one::<String>("format")
            .and_then(|f| f.parse::<OutputFormat>().ok()),
        dry_run: matches.get_flag("dry-run"),
    }
}

/// Stderr logging used until the configured log file is known
fn bootstrap_logging() -> Option<Handle> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {l} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Warn));

    match config {
        Ok(config) => log4rs::init_config(config).ok(),
        Err(e) => {
            eprintln!("Failed to build bootstrap logging: {}", e);
            None
        }
    }
}

/// Switch to the log4rs configuration file when it exists
fn apply_logging_config(handle: Option<&Handle>, config: &LoggingConfig) {
    let path = Path::new(&config.config_file);
    if !path.exists() {
        debug!("Log configuration {} not found, keeping stderr logging", path.display());
        return;
    }

    match (handle, log4rs::config::load_config_file(path, Default::default())) {
        (Some(handle), Ok(log_config)) => handle.set_config(log_config),
        (None, Ok(_)) => {}
        (_, Err(e)) => warn!("Failed to load log configuration {}: {}", path.display(), e),
    }
}

fn run(args: ResetArgs, log_handle: Option<&Handle>) -> Result<(), ResetError> {
    let config = AppConfig::load(args.config_file.as_deref())?;
    apply_logging_config(log_handle, &config.logging);

    let format = args.format.unwrap_or(config.output.format);
    let state = AppState::from_config(config)?;
    match args.storage {
        Some(storage_id) => info!("Resetting missing files in storage {}", storage_id),
        None => info!("Resetting missing files in all enabled storages"),
    }

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    let mut sink = io::sink();
    let out: &mut dyn Write = match format {
        OutputFormat::Text => &mut stdout,
        OutputFormat::Json => &mut sink,
    };

    let result = if args.dry_run {
        state.resetter.preview(args.storage, out)
    } else {
        state.resetter.reset(args.storage, out)
    };

    if format == OutputFormat::Json {
        let report = match &result {
            Ok(summaries) => JsonReport::new(summaries.clone(), args.dry_run),
            Err(e) => JsonReport::failed(e.completed().to_vec(), args.dry_run, e),
        };
        let json = report.to_json().map_err(|e| ResetError::Output(e.into()))?;
        writeln!(stdout, "{}", json)?;
    }
    stdout.flush()?;

    result.map(|_| ())
}

fn main() -> ExitCode {
    let args = parse_args();
    let log_handle = bootstrap_logging();
    match run(args, log_handle.as_ref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
