use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use novel_wizard::app::App;
use novel_wizard::auth::{AuthGate, GateState};
use novel_wizard::config::Config;
use novel_wizard::export::{ExportFormat, Exporter, SystemClipboard};
use novel_wizard::logging;
use novel_wizard::state::SessionStore;
use novel_wizard::steps::WizardStep;
use novel_wizard::storage::{FileStore, KeyValueStore, MemoryStore};
use novel_wizard::templates::Section;
use novel_wizard::ui::install_panic_hook;

#[derive(Parser)]
#[command(name = "novel-wizard")]
#[command(about = "Draft a novel's background and chapter outline, step by step")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show license and saved session status
    Status,

    /// Activate a license code
    Activate {
        /// License code
        code: String,
    },

    /// Export a section of the saved draft
    Export {
        /// Section to export
        #[arg(short, long, value_enum, default_value_t = SectionArg::Outline)]
        section: SectionArg,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = FormatArg::Doc)]
        format: FormatArg,

        /// Output directory (default: paths.exports from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Discard the saved session
    Reset {
        /// Also remove the license activation
        #[arg(long)]
        auth: bool,
    },

    /// Write the default config to the user config directory
    InitConfig,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SectionArg {
    Background,
    Outline,
}

impl From<SectionArg> for Section {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::Background => Section::Background,
            SectionArg::Outline => Section::Outline,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Doc,
    Text,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Doc => ExportFormat::Doc,
            FormatArg::Text => ExportFormat::Text,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    // Determine if we're running in TUI mode (no subcommand)
    let is_tui_mode = cli.command.is_none();

    // Initialize logging (file-based for TUI, stderr for CLI)
    let logging_handle = logging::init_logging(&config, is_tui_mode, cli.debug)?;

    match cli.command {
        Some(Commands::Status) => cmd_status(&config)?,
        Some(Commands::Activate { code }) => cmd_activate(&config, &code)?,
        Some(Commands::Export {
            section,
            format,
            output,
        }) => cmd_export(&config, section.into(), format.into(), output)?,
        Some(Commands::Reset { auth }) => cmd_reset(&config, auth)?,
        Some(Commands::InitConfig) => cmd_init_config()?,
        None => {
            // No subcommand = launch the wizard
            run_tui(config, logging_handle.log_file_path).await?;
        }
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let store = FileStore::open_in(&config.data_path()).context("Failed to open storage")?;
    tracing::debug!(path = %store.path().display(), "Opened storage");
    Ok(Arc::new(store))
}

async fn run_tui(config: Config, log_file_path: Option<PathBuf>) -> Result<()> {
    install_panic_hook();

    // The wizard still runs without a usable data dir, it just forgets on exit
    let store = open_store(&config).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Storage unavailable, progress will not be kept");
        Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>
    });
    let clipboard = SystemClipboard::detect();
    let mut app = App::new(config, store, Box::new(clipboard))?;
    let result = app.run().await;

    // Print log file path on exit if logs were written
    if let Some(log_path) = log_file_path {
        if let Ok(metadata) = log_path.metadata() {
            if metadata.len() > 0 {
                eprintln!("Session log: {}", log_path.display());
            }
        }
    }

    result
}

fn cmd_status(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let now = Utc::now();

    let mut gate = AuthGate::new(Arc::clone(&store));
    match gate.check_status(now) {
        GateState::Unlocked(authorization) => {
            println!(
                "License: {} ({}), {} days remaining",
                authorization.code,
                authorization.label,
                authorization.remaining_days(now)
            );
            println!(
                "  Activated: {}",
                authorization.activated_at.format("%Y-%m-%d %H:%M UTC")
            );
            println!(
                "  Expires:   {}",
                authorization.expires_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        GateState::Locked => println!("License: not activated"),
    }
    println!();

    let Some(session) = SessionStore::new(store).load() else {
        println!("No saved session");
        return Ok(());
    };

    let step_label = WizardStep::from_number(session.current_step)
        .map(|s| s.label())
        .unwrap_or("?");
    println!("Saved session");
    println!("{}", "─".repeat(40));
    println!("  Step:       {} ({})", session.current_step, step_label);
    println!("  Title:      {}", session.title);
    println!("  Genre:      {}", session.genre);
    println!(
        "  Background: {} chars",
        session.background_text.chars().count()
    );
    println!("  Outline:    {} chars", session.outline_text.chars().count());
    println!(
        "  Updated:    {}",
        session.last_updated.format("%Y-%m-%d %H:%M UTC")
    );

    Ok(())
}

fn cmd_activate(config: &Config, code: &str) -> Result<()> {
    let now = Utc::now();
    let mut gate = AuthGate::new(open_store(config)?);
    let verified = gate
        .verify(code, now)
        .context("License activation failed")?;

    println!("{}", verified.message(now));
    println!(
        "Expires: {}",
        verified.authorization.expires_at.format("%Y-%m-%d")
    );
    Ok(())
}

fn cmd_export(
    config: &Config,
    section: Section,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let store = open_store(config)?;

    let mut gate = AuthGate::new(Arc::clone(&store));
    if !matches!(gate.check_status(Utc::now()), GateState::Unlocked(_)) {
        bail!("No valid license. Run `novel-wizard activate <CODE>` first.");
    }

    let Some(session) = SessionStore::new(store).load() else {
        bail!("No saved session to export");
    };

    let body = match section {
        Section::Background => &session.background_text,
        Section::Outline => &session.outline_text,
    };

    let exporter = Exporter::new(output.unwrap_or_else(|| config.exports_path()));
    let path = exporter
        .export(&session.title, section, body, format)
        .context("Export failed")?;

    println!("Exported {} to {}", section.label(), path.display());
    Ok(())
}

fn cmd_reset(config: &Config, auth: bool) -> Result<()> {
    let store = open_store(config)?;

    SessionStore::new(Arc::clone(&store))
        .clear()
        .context("Failed to clear saved session")?;
    println!("Saved session cleared");

    if auth {
        AuthGate::new(store).lock();
        println!("License activation removed");
    }
    Ok(())
}

fn cmd_init_config() -> Result<()> {
    let path = Config::default().save()?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
