// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_arguments)]
// Add other lints specific to this module that you want to allow but not auto-fix

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::File;
use std::io::BufReader;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use crate::app_controller::CancelFlag;
use crate::registry::store::RegistryStore;
use crate::registry::RegistrySnapshot;
use crate::splitter::RunPeriod;
use app_controller::Controller;

mod app_config;
mod app_controller;
mod audit;
mod errors;
mod extraction;
mod file_utils;
mod matching;
mod ocr;
mod pdf_document;
mod registry;
mod splitter;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split a payroll batch PDF into per-recipient documents (default command)
    #[command(alias = "split")]
    Split(SplitArgs),

    /// Manage the recipient registry
    Registry(RegistryArgs),

    /// Generate shell completions for paysplit
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct SplitArgs {
    /// Batch PDF document to split
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output directory for per-recipient documents, defaults to the input's directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Accounting period the batch belongs to, as YYYY-MM
    #[arg(short, long)]
    period: String,

    /// Registry database path, defaults to the per-user data directory
    #[arg(long)]
    registry_db: Option<PathBuf>,

    /// Plain text roster to match against instead of the registry database
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Enable synonym and nickname matching
    #[arg(long)]
    synonyms: bool,

    /// Disable the OCR fallback for scanned pages
    #[arg(long)]
    no_ocr: bool,

    /// Back up the source document before splitting
    #[arg(short, long)]
    backup: bool,
}

#[derive(Parser, Debug)]
struct RegistryArgs {
    /// Registry database path, defaults to the per-user data directory
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    action: RegistryAction,
}

#[derive(Subcommand, Debug)]
enum RegistryAction {
    /// List recipients
    List {
        /// Include deactivated recipients
        #[arg(long)]
        all: bool,
    },

    /// Add a recipient
    Add {
        /// Recipient name as it appears on payroll pages
        name: String,

        /// Delivery email address
        #[arg(long)]
        email: Option<String>,

        /// Department label
        #[arg(long)]
        department: Option<String>,
    },

    /// Remove a recipient and their aliases
    Remove {
        /// Recipient name
        name: String,
    },

    /// Add an alternative name for a recipient
    Alias {
        /// Recipient name
        name: String,

        /// The alias to add
        alias: String,
    },

    /// Import recipients from a plain text roster, one name per line
    Import {
        /// Roster file path
        file: PathBuf,
    },

    /// Make a recipient eligible for matching again
    Activate {
        /// Recipient name
        name: String,
    },

    /// Exclude a recipient from matching without deleting them
    Deactivate {
        /// Recipient name
        name: String,
    },

    /// Override the attachment extension whitelist for a recipient
    Extensions {
        /// Recipient name
        name: String,

        /// Allowed extensions, e.g. pdf xlsx
        #[arg(required = true)]
        extensions: Vec<String>,
    },
}

/// paysplit - Payroll batch PDF splitter
///
/// Splits multi-recipient payroll batch documents into per-recipient PDFs
/// by matching page text against a recipient registry, with an OCR fallback
/// for scanned pages.
#[derive(Parser, Debug)]
#[command(name = "paysplit")]
#[command(author = "paysplit contributors")]
#[command(version = "1.0.0")]
#[command(about = "Payroll batch PDF splitter")]
#[command(long_about = "paysplit matches each page of a payroll batch PDF against a recipient registry and writes one document per recipient.

EXAMPLES:
    paysplit folha_junho.pdf -p 2025-06              # Split using default config
    paysplit folha.pdf -p 2025-06 -o /out            # Choose the output directory
    paysplit folha.pdf -p 2025-06 --roster names.txt # Match against a plain roster file
    paysplit folha.pdf -p 2025-06 --synonyms         # Enable nickname matching
    paysplit folha.pdf -p 2025-06 --no-ocr           # Skip OCR for scanned pages
    paysplit registry add \"Maria Silva\" --email maria@example.com
    paysplit registry list                           # Show active recipients
    paysplit completions bash > paysplit.bash        # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

OCR REQUIREMENTS:
    The OCR fallback shells out to tesseract and pdftoppm. Both must be on the
    PATH when OCR is enabled; runs fail upfront when they are missing.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Batch PDF document to split
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Output directory for per-recipient documents, defaults to the input's directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Accounting period the batch belongs to, as YYYY-MM
    #[arg(short, long)]
    period: Option<String>,

    /// Registry database path, defaults to the per-user data directory
    #[arg(long)]
    registry_db: Option<PathBuf>,

    /// Plain text roster to match against instead of the registry database
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Enable synonym and nickname matching
    #[arg(long)]
    synonyms: bool,

    /// Disable the OCR fallback for scanned pages
    #[arg(long)]
    no_ocr: bool,

    /// Back up the source document before splitting
    #[arg(short, long)]
    backup: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");

            let mut stderr = std::io::stderr();
            let _ = match record.level() {
                Level::Error => {
                    let emoji = Self::get_emoji_for_level(record.level());
                    writeln!(
                        stderr,
                        "\x1B[1;31m{} {} {}\x1B[0m",
                        now, emoji, record.args()
                    )
                },
                Level::Warn => {
                    let emoji = Self::get_emoji_for_level(record.level());
                    writeln!(
                        stderr,
                        "\x1B[1;33m{} {} {}\x1B[0m",
                        now, emoji, record.args()
                    )
                },
                Level::Info => {
                    let emoji = Self::get_emoji_for_level(record.level());
                    writeln!(
                        stderr,
                        "\x1B[1;32m{} {} {}\x1B[0m",
                        now, emoji, record.args()
                    )
                },
                Level::Debug => {
                    let emoji = Self::get_emoji_for_level(record.level());
                    writeln!(
                        stderr,
                        "\x1B[1;36m{} {} {}\x1B[0m",
                        now, emoji, record.args()
                    )
                },
                Level::Trace => {
                    let emoji = Self::get_emoji_for_level(record.level());
                    writeln!(
                        stderr,
                        "\x1B[1;35m{} {} {}\x1B[0m",
                        now, emoji, record.args()
                    )
                },
            };
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    // Handle subcommands
    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "paysplit", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Registry(args)) => run_registry(args).await,
        Some(Commands::Split(args)) => run_split(args).await,
        None => {
            // Default behavior - use top-level args for backwards compatibility
            let input_path = cli
                .input_path
                .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;
            let period = cli
                .period
                .ok_or_else(|| anyhow!("--period is required when no subcommand is specified"))?;

            let split_args = SplitArgs {
                input_path,
                output_dir: cli.output_dir,
                period,
                registry_db: cli.registry_db,
                roster: cli.roster,
                config_path: cli.config_path,
                log_level: cli.log_level,
                synonyms: cli.synonyms,
                no_ocr: cli.no_ocr,
                backup: cli.backup,
            };
            run_split(split_args).await
        }
    }
}

async fn run_split(options: SplitArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        let log_level = match config_log_level {
            app_config::LogLevel::Error => LevelFilter::Error,
            app_config::LogLevel::Warn => LevelFilter::Warn,
            app_config::LogLevel::Info => LevelFilter::Info,
            app_config::LogLevel::Debug => LevelFilter::Debug,
            app_config::LogLevel::Trace => LevelFilter::Trace,
        };
        log::set_max_level(log_level);
    }

    // Load or create configuration
    let config_path = &options.config_path;
    let mut config = if Path::new(config_path).exists() {
        // Load existing configuration
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?;

        config
    } else {
        // Create default configuration if not exists
        warn!(
            "Config file not found at '{}', creating default config.",
            config_path
        );

        let config = Config::default();

        // Save default config
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    // Override config with CLI options if provided
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    if options.synonyms {
        config.matching.enable_synonyms = true;
    }
    if options.no_ocr {
        config.extraction.ocr.enabled = false;
    }
    if options.backup {
        config.output.backup_enabled = true;
    }

    // Validate the configuration after loading and overriding
    config
        .validate()
        .context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        let log_level = match config.log_level {
            app_config::LogLevel::Error => LevelFilter::Error,
            app_config::LogLevel::Warn => LevelFilter::Warn,
            app_config::LogLevel::Info => LevelFilter::Info,
            app_config::LogLevel::Debug => LevelFilter::Debug,
            app_config::LogLevel::Trace => LevelFilter::Trace,
        };

        // Just update the max level without reinitializing the logger
        log::set_max_level(log_level);
    }

    let period: RunPeriod = options.period.parse()?;

    if !options.input_path.is_file() {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    }

    // A roster file gives a one-off snapshot, otherwise snapshot the database
    let snapshot = match &options.roster {
        Some(roster) => RegistrySnapshot::from_roster_file(roster)?,
        None => {
            let store = match &options.registry_db {
                Some(path) => RegistryStore::new(path)?,
                None => RegistryStore::new_default()?,
            };
            store.snapshot().await?
        }
    };

    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| {
            options
                .input_path
                .parent()
                .unwrap_or(Path::new("."))
                .to_path_buf()
        });

    // Create controller
    let controller = Controller::with_config(config.clone())?;

    // Ctrl-C requests cancellation, in-flight pages finish first
    let cancel = CancelFlag::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancellation requested, finishing in-flight pages");
            signal_cancel.cancel();
        }
    });

    let summary = controller
        .run(
            options.input_path.clone(),
            output_dir,
            period,
            snapshot,
            cancel,
        )
        .await?;

    if summary.cancelled {
        warn!(
            "Run {} cancelled, partial results kept",
            summary.run_id.get(..8).unwrap_or(&summary.run_id)
        );
    }
    for failure in &summary.split_failures {
        warn!(
            "No document written for '{}': {}",
            failure.recipient_name, failure.error
        );
    }
    if summary.unmatched_pages > 0 {
        warn!(
            "{} pages could not be assigned, see the unmatched log for details",
            summary.unmatched_pages
        );
    }

    Ok(())
}

async fn run_registry(args: RegistryArgs) -> Result<()> {
    let store = match &args.db {
        Some(path) => RegistryStore::new(path)?,
        None => RegistryStore::new_default()?,
    };

    match args.action {
        RegistryAction::List { all } => {
            let recipients = store.list_recipients(all).await?;
            if recipients.is_empty() {
                info!("Registry is empty");
                return Ok(());
            }
            for recipient in &recipients {
                let status = if recipient.active { "" } else { " (inactive)" };
                let email = recipient.email.as_deref().unwrap_or("-");
                let aliases = if recipient.aliases.is_empty() {
                    String::new()
                } else {
                    format!("  aka {}", recipient.aliases.join(", "))
                };
                println!(
                    "{:>5}  {:<32} {:<28}{}{}",
                    recipient.id, recipient.name, email, status, aliases
                );
            }
            let stats = store.stats().await?;
            println!("{}", stats);
        }
        RegistryAction::Add {
            name,
            email,
            department,
        } => {
            let id = store
                .add_recipient(&name, email.as_deref(), department.as_deref())
                .await?;
            info!("Added recipient '{}' with id {}", name, id);
        }
        RegistryAction::Remove { name } => {
            store.remove_recipient(&name).await?;
            info!("Removed recipient '{}'", name);
        }
        RegistryAction::Alias { name, alias } => {
            store.add_alias(&name, &alias).await?;
            info!("Added alias '{}' for '{}'", alias, name);
        }
        RegistryAction::Import { file } => {
            let added = store.import_roster(&file).await?;
            info!("Imported {} recipients from {:?}", added, file);
        }
        RegistryAction::Activate { name } => {
            store.set_active(&name, true).await?;
            info!("Activated recipient '{}'", name);
        }
        RegistryAction::Deactivate { name } => {
            store.set_active(&name, false).await?;
            info!("Deactivated recipient '{}'", name);
        }
        RegistryAction::Extensions { name, extensions } => {
            store
                .set_allowed_extensions(&name, Some(extensions.clone()))
                .await?;
            info!(
                "Set allowed extensions for '{}' to {}",
                name,
                extensions.join(", ")
            );
        }
    }

    Ok(())
}
